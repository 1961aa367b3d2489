use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A labeled tag used to group and filter games
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub category_id: Uuid,
    /// Unique display name, also the value matched by the search filter
    pub label: String,
}

impl Category {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            category_id: Uuid::new_v4(),
            label: label.into(),
        }
    }
}
