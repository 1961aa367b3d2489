use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::Category;

/// Row of the `games` table, before its categories are attached
#[derive(Debug, Clone, FromRow)]
pub struct GameRecord {
    pub game_id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub poster: String,
    pub is_virtual: bool,
    pub is_visible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GameRecord {
    pub fn with_categories(self, categories: Vec<Category>) -> Game {
        Game {
            game_id: self.game_id,
            title: self.title,
            slug: self.slug,
            description: self.description,
            poster: self.poster,
            categories,
            is_virtual: self.is_virtual,
            is_visible: self.is_visible,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub game_id: Uuid,
    pub title: String,
    /// URL-safe identifier derived from the title, unique across games
    pub slug: String,
    pub description: String,
    /// Opaque reference to the stored poster file
    pub poster: String,
    pub categories: Vec<Category>,
    pub is_virtual: bool,
    pub is_visible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Game {
    /// True when the game is tagged with at least one of `labels`
    pub fn belongs_to_any(&self, labels: &[String]) -> bool {
        self.categories
            .iter()
            .any(|category| labels.iter().any(|label| *label == category.label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str) -> GameRecord {
        let now = Utc::now();
        GameRecord {
            game_id: Uuid::new_v4(),
            title: title.to_string(),
            slug: title.to_lowercase(),
            description: "A game".to_string(),
            poster: "poster.png".to_string(),
            is_virtual: false,
            is_visible: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_with_categories_keeps_record_fields() {
        let rec = record("Tetris");
        let id = rec.game_id;
        let game = rec.with_categories(vec![Category::new("Puzzle")]);

        assert_eq!(game.game_id, id);
        assert_eq!(game.title, "Tetris");
        assert_eq!(game.categories.len(), 1);
        assert_eq!(game.categories[0].label, "Puzzle");
    }

    #[test]
    fn test_belongs_to_any_matches_one_of_many() {
        let game = record("Secret of Mana")
            .with_categories(vec![Category::new("Arcade"), Category::new("RPG")]);

        assert!(game.belongs_to_any(&["Puzzle".to_string(), "RPG".to_string()]));
        assert!(!game.belongs_to_any(&["Platformer".to_string()]));
        assert!(
            !game.belongs_to_any(&[]),
            "An empty label list should never match"
        );
    }

    #[test]
    fn test_belongs_to_any_is_case_sensitive_on_labels() {
        let game = record("Pac-Man").with_categories(vec![Category::new("Arcade")]);
        assert!(!game.belongs_to_any(&["arcade".to_string()]));
    }
}
