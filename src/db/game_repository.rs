use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::queries::{attach_categories, GAME_COLUMNS};
use crate::{
    catalog::{GameQuery, GameRepository, RepositoryError, Sort, SortField},
    models::{Game, GameRecord},
};

/// `GameRepository` backed by the `games` / `game_categories` tables
pub struct PgGameRepository {
    pool: PgPool,
}

impl PgGameRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Escape `%`, `_` and `\` so user input is matched literally by ILIKE
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn sort_column(field: SortField) -> &'static str {
    match field {
        // Byte-wise collation keeps ordering independent of the server locale
        SortField::Title => r#"g.title COLLATE "C""#,
        SortField::CreatedAt => "g.created_at",
    }
}

/// Append the WHERE clause shared by the search and count queries
fn push_filters(builder: &mut QueryBuilder<'static, Postgres>, query: &GameQuery) {
    let mut has_condition = false;
    let mut next_condition = |builder: &mut QueryBuilder<'static, Postgres>| {
        builder.push(if has_condition { " AND " } else { " WHERE " });
        has_condition = true;
    };

    if let Some(title) = &query.title {
        next_condition(builder);
        builder
            .push("g.title ILIKE ")
            .push_bind(format!("%{}%", escape_like(title)));
    }

    if !query.categories.is_empty() {
        next_condition(builder);
        builder
            .push(
                "EXISTS (SELECT 1 FROM game_categories gc \
                 JOIN categories c ON c.category_id = gc.category_id \
                 WHERE gc.game_id = g.game_id AND c.label = ANY(",
            )
            .push_bind(query.categories.clone())
            .push("))");
    }

    if query.visible_only {
        next_condition(builder);
        builder.push("g.is_visible = TRUE");
    }
}

/// Build the SELECT for a game search; every user value is a bind parameter
pub fn build_search_query(query: &GameQuery) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!("SELECT {} FROM games g", GAME_COLUMNS));
    push_filters(&mut builder, query);

    builder.push(" ORDER BY ");
    match query.sort {
        Some(Sort { by, order }) => {
            builder
                .push(sort_column(by))
                .push(" ")
                .push(order.as_sql())
                .push(", g.game_id ASC");
        }
        None => {
            builder.push("g.created_at ASC, g.game_id ASC");
        }
    }

    if let Some(page) = query.pagination {
        builder
            .push(" LIMIT ")
            .push_bind(page.limit() as i64)
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);
    }

    builder
}

/// Build the COUNT for a game search, same filters without ordering or paging
pub fn build_count_query(query: &GameQuery) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM games g");
    push_filters(&mut builder, query);
    builder
}

#[async_trait]
impl GameRepository for PgGameRepository {
    async fn find_all(&self) -> Result<Vec<Game>, RepositoryError> {
        let records = sqlx::query_as::<_, GameRecord>(&format!(
            "SELECT {} FROM games g ORDER BY g.created_at ASC, g.game_id ASC",
            GAME_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(attach_categories(&self.pool, records).await?)
    }

    async fn search(&self, query: &GameQuery) -> Result<Vec<Game>, RepositoryError> {
        let mut builder = build_search_query(query);
        tracing::debug!("Game search SQL: {}", builder.sql());

        let records = builder
            .build_query_as::<GameRecord>()
            .fetch_all(&self.pool)
            .await?;

        Ok(attach_categories(&self.pool, records).await?)
    }

    async fn count(&self, query: &GameQuery) -> Result<u64, RepositoryError> {
        let mut builder = build_count_query(query);
        let total: i64 = builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        Ok(total.max(0) as u64)
    }
}
