//! In-memory `GameRepository` used by unit and router tests.

use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::search::{GameQuery, GameRepository, RepositoryError, SortField, SortOrder};
use crate::models::{Category, Game};

/// Keeps games in insertion order, which doubles as the default order
pub struct InMemoryGameRepository {
    games: RwLock<Vec<Game>>,
}

impl InMemoryGameRepository {
    pub fn new(games: Vec<Game>) -> Self {
        Self {
            games: RwLock::new(games),
        }
    }

    pub async fn insert(&self, game: Game) {
        self.games.write().await.push(game);
    }
}

fn matches(query: &GameQuery, game: &Game) -> bool {
    if query.visible_only && !game.is_visible {
        return false;
    }
    if let Some(title) = &query.title {
        if !game.title.to_lowercase().contains(&title.to_lowercase()) {
            return false;
        }
    }
    query.categories.is_empty() || game.belongs_to_any(&query.categories)
}

fn compare(a: &Game, b: &Game, by: SortField) -> Ordering {
    match by {
        SortField::Title => a.title.cmp(&b.title),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
    }
}

#[async_trait]
impl GameRepository for InMemoryGameRepository {
    async fn find_all(&self) -> Result<Vec<Game>, RepositoryError> {
        Ok(self.games.read().await.clone())
    }

    async fn search(&self, query: &GameQuery) -> Result<Vec<Game>, RepositoryError> {
        let mut games: Vec<Game> = self
            .games
            .read()
            .await
            .iter()
            .filter(|game| matches(query, game))
            .cloned()
            .collect();

        if let Some(sort) = query.sort {
            games.sort_by(|a, b| {
                let primary = match sort.order {
                    SortOrder::Asc => compare(a, b, sort.by),
                    SortOrder::Desc => compare(b, a, sort.by),
                };
                primary.then_with(|| a.game_id.cmp(&b.game_id))
            });
        }

        if let Some(page) = query.pagination {
            games = games
                .into_iter()
                .skip(page.offset() as usize)
                .take(page.limit() as usize)
                .collect();
        }

        Ok(games)
    }

    async fn count(&self, query: &GameQuery) -> Result<u64, RepositoryError> {
        let games = self.games.read().await;
        Ok(games.iter().filter(|game| matches(query, game)).count() as u64)
    }
}

/// Visible game tagged with `labels`, created `minute` minutes after a fixed epoch
pub fn fixture_game(title: &str, labels: &[&str], minute: i64) -> Game {
    let created_at =
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap() + Duration::minutes(minute);

    Game {
        game_id: Uuid::new_v4(),
        title: title.to_string(),
        slug: super::slug::slugify(title),
        description: format!("{} description", title),
        poster: format!("{}.png", Uuid::new_v4()),
        categories: labels.iter().map(|label| Category::new(*label)).collect(),
        is_virtual: false,
        is_visible: true,
        created_at,
        updated_at: created_at,
    }
}
