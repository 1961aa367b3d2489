use std::sync::Arc;

use axum::{
    extract::{Path, RawQuery, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use super::posters;
use crate::{
    auth::AdminUser,
    catalog::{self, FieldError, GameForm, GameQuery, GameSearchParams},
    db,
    error::AppError,
    models::Game,
    AppState,
};

/// Search results plus the normalized query, so a client can re-fill its form
#[derive(Debug, Serialize)]
pub struct GameListResponse {
    pub games: Vec<Game>,
    /// Games on this page
    pub count: usize,
    /// Matches across every page
    pub total: u64,
    pub query: GameQuery,
}

fn parse_query(raw: Option<String>) -> Result<GameQuery, AppError> {
    let params = GameSearchParams::from_query_string(raw.as_deref().unwrap_or_default())?;
    Ok(GameQuery::from_params(params)?)
}

async fn list_response(
    state: &AppState,
    query: GameQuery,
) -> Result<Json<GameListResponse>, AppError> {
    let page = catalog::search_page(state.games.as_ref(), &query).await?;

    Ok(Json(GameListResponse {
        count: page.games.len(),
        total: page.total,
        games: page.games,
        query,
    }))
}

/// Public catalog search; hidden games are never listed
pub async fn list_games(
    State(state): State<Arc<AppState>>,
    RawQuery(raw): RawQuery,
) -> Result<Json<GameListResponse>, AppError> {
    let query = parse_query(raw)?.visible_only();
    list_response(&state, query).await
}

/// Admin catalog search over every game, visible or not
pub async fn admin_list_games(
    _admin: AdminUser,
    State(state): State<Arc<AppState>>,
    RawQuery(raw): RawQuery,
) -> Result<Json<GameListResponse>, AppError> {
    let query = parse_query(raw)?;
    list_response(&state, query).await
}

fn game_not_found(slug: &str) -> AppError {
    AppError::NotFound(format!("game '{}'", slug))
}

/// Hidden games do not exist as far as the public is concerned
fn visible_or_not_found(game: Game, slug: &str) -> Result<Game, AppError> {
    if game.is_visible {
        Ok(game)
    } else {
        Err(game_not_found(slug))
    }
}

/// Field errors for category ids that matched no row
fn reject_unknown_categories(missing: &[Uuid]) -> Result<(), AppError> {
    if missing.is_empty() {
        return Ok(());
    }
    Err(AppError::Validation(
        missing
            .iter()
            .map(|id| FieldError::new("categories", format!("Unknown category {}", id)))
            .collect(),
    ))
}

async fn find_game(state: &AppState, slug: &str) -> Result<Game, AppError> {
    db::queries::get_game_by_slug(&state.db, slug)
        .await?
        .ok_or_else(|| game_not_found(slug))
}

pub async fn show_game(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<Game>, AppError> {
    let game = find_game(&state, &slug).await?;
    Ok(Json(visible_or_not_found(game, &slug)?))
}

pub async fn admin_show_game(
    _admin: AdminUser,
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<Game>, AppError> {
    Ok(Json(find_game(&state, &slug).await?))
}

async fn ensure_categories_exist(state: &AppState, ids: &[Uuid]) -> Result<(), AppError> {
    let missing = db::queries::find_missing_categories(&state.db, ids).await?;
    reject_unknown_categories(&missing)
}

/// Slug for `title` that no other game holds
async fn resolve_slug(
    state: &AppState,
    title: &str,
    current_game: Option<Uuid>,
) -> Result<String, AppError> {
    let base = catalog::slugify(title);
    let taken = db::queries::find_taken_slugs(&state.db, &base, current_game).await?;
    Ok(catalog::unique_slug(&base, &taken))
}

/// Delete a poster file once no game references it
async fn release_poster(state: &AppState, poster: &str) {
    match db::queries::poster_in_use(&state.db, poster).await {
        Ok(false) => posters::remove_poster(&state.config.uploads, poster).await,
        Ok(true) => tracing::debug!("Poster {} is still in use, keeping it", poster),
        Err(e) => tracing::warn!("Could not check whether poster {} is in use: {}", poster, e),
    }
}

pub async fn create_game(
    AdminUser(admin): AdminUser,
    State(state): State<Arc<AppState>>,
    Json(form): Json<GameForm>,
) -> Result<(StatusCode, Json<Game>), AppError> {
    let game = form.validate()?;
    posters::ensure_poster_exists(&state.config.uploads, &game.poster).await?;
    ensure_categories_exist(&state, &game.category_ids).await?;

    let slug = resolve_slug(&state, &game.title, None).await?;
    let created = db::queries::create_game(&state.db, &game, &slug).await?;

    tracing::info!(
        "Game '{}' created with slug {} by {}",
        created.title,
        created.slug,
        admin.username
    );

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_game(
    AdminUser(admin): AdminUser,
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Json(form): Json<GameForm>,
) -> Result<Json<Game>, AppError> {
    let existing = find_game(&state, &slug).await?;
    let game = form.validate()?;
    posters::ensure_poster_exists(&state.config.uploads, &game.poster).await?;
    ensure_categories_exist(&state, &game.category_ids).await?;

    let new_slug = resolve_slug(&state, &game.title, Some(existing.game_id)).await?;
    let updated = db::queries::update_game(&state.db, existing.game_id, &game, &new_slug)
        .await?
        .ok_or_else(|| game_not_found(&slug))?;

    tracing::info!(
        "Game {} updated by {} (slug {} -> {})",
        updated.game_id,
        admin.username,
        slug,
        updated.slug
    );

    if existing.poster != updated.poster {
        release_poster(&state, &existing.poster).await;
    }

    Ok(Json(updated))
}

pub async fn delete_game(
    AdminUser(admin): AdminUser,
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<StatusCode, AppError> {
    let game = find_game(&state, &slug).await?;

    if !db::queries::delete_game(&state.db, game.game_id).await? {
        return Err(game_not_found(&slug));
    }

    tracing::info!("Game '{}' deleted by {}", game.title, admin.username);
    release_poster(&state, &game.poster).await;

    Ok(StatusCode::NO_CONTENT)
}
