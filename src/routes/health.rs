use std::{sync::Arc, time::Duration};

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::{db, AppState};

const DATABASE_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

/// Liveness plus a best-effort database check
///
/// Always answers 200 while the process is up; `database` turns to `"down"`
/// when Postgres cannot be reached in time.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    let database = match tokio::time::timeout(DATABASE_CHECK_TIMEOUT, db::ping(&state.db)).await {
        Ok(Ok(())) => "up",
        Ok(Err(e)) => {
            tracing::warn!("Health check could not reach the database: {}", e);
            "down"
        }
        Err(_) => {
            tracing::warn!("Health check timed out waiting for the database");
            "down"
        }
    };

    Json(json!({
        "status": "ok",
        "service": "neoretro",
        "version": env!("CARGO_PKG_VERSION"),
        "database": database,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::memory::InMemoryGameRepository;

    #[tokio::test]
    async fn test_health_check_reports_database_state() {
        // The test pool points at a database that is not expected to run
        let state = AppState::for_tests(Arc::new(InMemoryGameRepository::new(vec![])));

        let Json(body) = health_check(State(state)).await;

        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "neoretro");
        assert!(
            body["database"] == "up" || body["database"] == "down",
            "database field must always be reported"
        );
    }
}
