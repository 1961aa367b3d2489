use std::collections::{HashMap, HashSet};

use sqlx::{FromRow, PgPool, Result};
use uuid::Uuid;

use crate::{
    catalog::{is_variant_of, ValidatedGame},
    models::{Category, Game, GameRecord, User},
};

/// Column list for `GameRecord`, expecting the `games` table aliased as `g`
pub const GAME_COLUMNS: &str = "g.game_id, g.title, g.slug, g.description, g.poster, \
     g.is_virtual, g.is_visible, g.created_at, g.updated_at";

// User queries
pub async fn get_user(pool: &PgPool, user_id: Uuid) -> Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn get_user_by_username(pool: &PgPool, username: &str) -> Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await
}

/// Insert a new account; a taken username surfaces as a unique violation
pub async fn create_user(
    pool: &PgPool,
    username: &str,
    password_hash: &str,
    is_admin: bool,
) -> Result<User> {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (user_id, username, password_hash, is_admin)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(username)
    .bind(password_hash)
    .bind(is_admin)
    .fetch_one(pool)
    .await
}

// Category queries
pub async fn list_categories(pool: &PgPool) -> Result<Vec<Category>> {
    sqlx::query_as::<_, Category>("SELECT category_id, label FROM categories ORDER BY label ASC")
        .fetch_all(pool)
        .await
}

pub async fn create_category(pool: &PgPool, label: &str) -> Result<Category> {
    let category = Category::new(label);
    sqlx::query("INSERT INTO categories (category_id, label) VALUES ($1, $2)")
        .bind(category.category_id)
        .bind(&category.label)
        .execute(pool)
        .await?;

    Ok(category)
}

/// Ids from `ids` that have no matching category row
pub async fn find_missing_categories(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Uuid>> {
    let existing =
        sqlx::query_scalar::<_, Uuid>("SELECT category_id FROM categories WHERE category_id = ANY($1)")
            .bind(ids)
            .fetch_all(pool)
            .await?;

    Ok(ids
        .iter()
        .filter(|id| !existing.contains(id))
        .copied()
        .collect())
}

// Game queries
#[derive(Debug, FromRow)]
struct GameCategoryRow {
    game_id: Uuid,
    category_id: Uuid,
    label: String,
}

/// Load the categories of every record in one round trip and attach them
pub async fn attach_categories(pool: &PgPool, records: Vec<GameRecord>) -> Result<Vec<Game>> {
    if records.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = records.iter().map(|r| r.game_id).collect();
    let rows = sqlx::query_as::<_, GameCategoryRow>(
        r#"
        SELECT gc.game_id, c.category_id, c.label
        FROM game_categories gc
        JOIN categories c ON c.category_id = gc.category_id
        WHERE gc.game_id = ANY($1)
        ORDER BY c.label ASC
        "#,
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    let mut by_game: HashMap<Uuid, Vec<Category>> = HashMap::new();
    for row in rows {
        by_game.entry(row.game_id).or_default().push(Category {
            category_id: row.category_id,
            label: row.label,
        });
    }

    Ok(records
        .into_iter()
        .map(|record| {
            let categories = by_game.remove(&record.game_id).unwrap_or_default();
            record.with_categories(categories)
        })
        .collect())
}

pub async fn get_game_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Game>> {
    let record = sqlx::query_as::<_, GameRecord>(&format!(
        "SELECT {} FROM games g WHERE g.slug = $1",
        GAME_COLUMNS
    ))
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    match record {
        Some(record) => Ok(attach_categories(pool, vec![record]).await?.pop()),
        None => Ok(None),
    }
}

/// Slugs starting with `$1`, optionally ignoring the game `$2`
const TAKEN_SLUGS_SQL: &str = r#"
        SELECT slug FROM games
        WHERE (slug = $1 OR slug LIKE $1 || '-%')
          AND ($2::uuid IS NULL OR game_id <> $2)
        "#;

/// Slugs already held by other games that collide with `base`
///
/// Slugs only contain `[a-z0-9-]`, so `base` has no LIKE wildcards. The
/// prefix match over-selects (`tetris-attack` for `tetris`); those rows are
/// dropped here.
pub async fn find_taken_slugs(
    pool: &PgPool,
    base: &str,
    exclude_game: Option<Uuid>,
) -> Result<HashSet<String>> {
    let slugs = sqlx::query_scalar::<_, String>(TAKEN_SLUGS_SQL)
        .bind(base)
        .bind(exclude_game)
        .fetch_all(pool)
        .await?;

    Ok(slugs
        .into_iter()
        .filter(|slug| is_variant_of(base, slug))
        .collect())
}

pub async fn create_game(pool: &PgPool, game: &ValidatedGame, slug: &str) -> Result<Game> {
    let mut tx = pool.begin().await?;

    let record = sqlx::query_as::<_, GameRecord>(
        r#"
        INSERT INTO games (game_id, title, slug, description, poster, is_virtual, is_visible)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING game_id, title, slug, description, poster, is_virtual, is_visible,
                  created_at, updated_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&game.title)
    .bind(slug)
    .bind(&game.description)
    .bind(&game.poster)
    .bind(game.is_virtual)
    .bind(game.is_visible)
    .fetch_one(&mut *tx)
    .await?;

    link_categories(&mut tx, record.game_id, &game.category_ids).await?;
    tx.commit().await?;

    let mut games = attach_categories(pool, vec![record]).await?;
    games
        .pop()
        .ok_or_else(|| sqlx::Error::Protocol("inserted game vanished".to_string()))
}

/// Replace every field and the category set of an existing game
pub async fn update_game(
    pool: &PgPool,
    game_id: Uuid,
    game: &ValidatedGame,
    slug: &str,
) -> Result<Option<Game>> {
    let mut tx = pool.begin().await?;

    let record = sqlx::query_as::<_, GameRecord>(
        r#"
        UPDATE games
        SET title = $2,
            slug = $3,
            description = $4,
            poster = $5,
            is_virtual = $6,
            is_visible = $7,
            updated_at = NOW()
        WHERE game_id = $1
        RETURNING game_id, title, slug, description, poster, is_virtual, is_visible,
                  created_at, updated_at
        "#,
    )
    .bind(game_id)
    .bind(&game.title)
    .bind(slug)
    .bind(&game.description)
    .bind(&game.poster)
    .bind(game.is_virtual)
    .bind(game.is_visible)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(record) = record else {
        return Ok(None);
    };

    sqlx::query("DELETE FROM game_categories WHERE game_id = $1")
        .bind(game_id)
        .execute(&mut *tx)
        .await?;
    link_categories(&mut tx, game_id, &game.category_ids).await?;
    tx.commit().await?;

    Ok(attach_categories(pool, vec![record]).await?.pop())
}

async fn link_categories(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    game_id: Uuid,
    category_ids: &[Uuid],
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO game_categories (game_id, category_id)
        SELECT $1, category_id FROM UNNEST($2::uuid[]) AS t(category_id)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(game_id)
    .bind(category_ids)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// True when any game still points at `poster`
pub async fn poster_in_use(pool: &PgPool, poster: &str) -> Result<bool> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM games WHERE poster = $1)")
        .bind(poster)
        .fetch_one(pool)
        .await
}

/// Returns false when no game had that id
pub async fn delete_game(pool: &PgPool, game_id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM games WHERE game_id = $1")
        .bind(game_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
