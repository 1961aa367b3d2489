pub mod auth;
pub mod categories;
pub mod games;
pub mod health;
pub mod posters;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", api_routes())
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::get_current_user))
        .route("/games", get(games::list_games).post(games::create_game))
        .route(
            "/games/{slug}",
            get(games::show_game)
                .put(games::update_game)
                .delete(games::delete_game),
        )
        .route("/admin/games", get(games::admin_list_games))
        .route("/admin/games/{slug}", get(games::admin_show_game))
        .route(
            "/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route("/posters", post(posters::upload_poster))
}
