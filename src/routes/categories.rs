use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use crate::{
    auth::AdminUser, catalog::validation::check_length, db, error::AppError, models::Category,
    AppState,
};

const LABEL_MAX: usize = 100;

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub label: String,
}

/// All categories ordered by label, used to build the search form
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Category>>, AppError> {
    Ok(Json(db::queries::list_categories(&state.db).await?))
}

pub async fn create_category(
    AdminUser(admin): AdminUser,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    let label = payload.label.trim();
    let mut errors = Vec::new();
    check_length("label", label, 1, LABEL_MAX, &mut errors);
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let category = db::queries::create_category(&state.db, label)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => {
                AppError::Conflict(format!("category '{}' already exists", label))
            }
            other => other,
        })?;

    tracing::info!("Category '{}' created by {}", category.label, admin.username);
    Ok((StatusCode::CREATED, Json(category)))
}
