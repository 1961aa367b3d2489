use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;
use uuid::Uuid;

pub const TITLE_MIN: usize = 2;
pub const TITLE_MAX: usize = 100;
pub const DESCRIPTION_MIN: usize = 2;
pub const DESCRIPTION_MAX: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Game create/edit payload as submitted by an administrator
#[derive(Debug, Clone, Deserialize)]
pub struct GameForm {
    pub title: String,
    pub description: String,
    /// Reference returned by the poster upload endpoint
    pub poster: String,
    #[serde(default)]
    pub categories: Vec<Uuid>,
    #[serde(default)]
    pub is_virtual: bool,
    #[serde(default)]
    pub is_visible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedGame {
    pub title: String,
    pub description: String,
    pub poster: String,
    pub category_ids: Vec<Uuid>,
    pub is_virtual: bool,
    pub is_visible: bool,
}

/// Check that a trimmed value is present and within bounds
///
/// The minimum counts visible characters (graphemes) so a lone combining
/// sequence does not pass for two letters. The maximum counts code points,
/// the unit of the `VARCHAR(n)` column the value is stored in.
pub fn check_length(
    field: &str,
    value: &str,
    min: usize,
    max: usize,
    errors: &mut Vec<FieldError>,
) {
    if value.is_empty() {
        errors.push(FieldError::new(field, format!("Please enter the {}", field)));
        return;
    }
    if value.graphemes(true).count() < min {
        errors.push(FieldError::new(
            field,
            format!("Your {} should be at least {} characters", field, min),
        ));
    } else if value.chars().count() > max {
        errors.push(FieldError::new(
            field,
            format!("Your {} should not be longer than {} characters", field, max),
        ));
    }
}

impl GameForm {
    pub fn validate(self) -> Result<ValidatedGame, Vec<FieldError>> {
        let mut errors = Vec::new();

        let title = self.title.trim().to_string();
        check_length("title", &title, TITLE_MIN, TITLE_MAX, &mut errors);

        let description = self.description.trim().to_string();
        check_length(
            "description",
            &description,
            DESCRIPTION_MIN,
            DESCRIPTION_MAX,
            &mut errors,
        );

        let poster = self.poster.trim().to_string();
        if poster.is_empty() {
            errors.push(FieldError::new("poster", "Please upload a poster"));
        }

        let mut category_ids: Vec<Uuid> = Vec::with_capacity(self.categories.len());
        for id in self.categories {
            if !category_ids.contains(&id) {
                category_ids.push(id);
            }
        }
        if category_ids.is_empty() {
            errors.push(FieldError::new("categories", "Select at least one category"));
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(ValidatedGame {
            title,
            description,
            poster,
            category_ids,
            is_virtual: self.is_virtual,
            is_visible: self.is_visible,
        })
    }
}
