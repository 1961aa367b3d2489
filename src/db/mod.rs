use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool, Result};

pub mod game_repository;
pub mod queries;

pub use game_repository::PgGameRepository;

/// How long a request waits for a pooled connection before failing
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(database_url)
        .await
}

/// Round trip to the database, used by the health check
pub async fn ping(pool: &PgPool) -> Result<()> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
