mod auth;
mod catalog;
mod config;
mod db;
mod error;
mod models;
mod password;
mod routes;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{extract::DefaultBodyLimit, Router};
use catalog::GameRepository;
use config::Config;
use sqlx::PgPool;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Headroom on top of the poster size limit for multipart framing
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Application state shared across all handlers
pub struct AppState {
    pub config: Config,
    pub db: PgPool,
    /// Read side of the game catalog
    pub games: Arc<dyn GameRepository>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "neoretro=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting NeoRetro backend server...");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Connect to database
    let db = db::create_pool(config.database_url(), config.database.max_connections)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("./migrations").run(&db).await?;
    tracing::info!("Database migrations completed");

    if config.security.admin_usernames.is_empty() {
        tracing::warn!("ADMIN_USERNAMES is empty; no account can manage the catalog");
    }

    let state = Arc::new(AppState {
        config: config.clone(),
        games: Arc::new(db::PgGameRepository::new(db.clone())),
        db,
    });

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Serve uploaded posters and the front-end static files
    let uploads_service = ServeDir::new(&config.uploads.dir);
    let frontend_service = ServeDir::new(&config.server.static_dir);

    // Build router
    let app = Router::new()
        .merge(routes::create_routes())
        .nest_service("/uploads", uploads_service)
        .fallback_service(frontend_service)
        .layer(DefaultBodyLimit::max(
            config.uploads.max_bytes + MULTIPART_OVERHEAD_BYTES,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check: http://{}/health", addr);
    tracing::info!("Game catalog: http://{}/api/games", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
impl AppState {
    /// State backed by `games` and a pool that never connects unless queried
    pub fn for_tests(games: Arc<dyn GameRepository>) -> Arc<Self> {
        let config = Config::for_tests();
        let db = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .connect_lazy(config.database_url())
            .expect("test database URL should parse");

        Arc::new(AppState { config, db, games })
    }
}
