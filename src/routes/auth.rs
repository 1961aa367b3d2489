use std::sync::Arc;

use anyhow::Context;
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::{
    auth, catalog::FieldError, db, error::AppError, models::UserProfile, password, AppState,
};

const USERNAME_MAX: usize = 180;
const PASSWORD_MIN: usize = 6;
const PASSWORD_MAX: usize = 4096;
const FORBIDDEN_USERNAME_CHARS: [char; 9] = ['/', '(', ')', '"', '<', '>', '\\', '{', '}'];

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    /// JWT for backend API authentication
    pub access_token: String,
    pub user: UserProfile,
}

impl RegisterRequest {
    /// Returns the trimmed username when every rule holds
    pub fn validate(&self) -> Result<String, Vec<FieldError>> {
        let mut errors = Vec::new();

        let username = self.username.trim();
        if username.is_empty() {
            errors.push(FieldError::new("username", "Please enter a username"));
        } else if username.chars().count() > USERNAME_MAX {
            errors.push(FieldError::new(
                "username",
                format!("Username should not be longer than {} characters", USERNAME_MAX),
            ));
        } else if username.chars().any(|c| FORBIDDEN_USERNAME_CHARS.contains(&c)) {
            errors.push(FieldError::new(
                "username",
                format!("{} is not a valid username", username),
            ));
        }

        let password_length = self.password.chars().count();
        if password_length < PASSWORD_MIN {
            errors.push(FieldError::new(
                "password",
                format!("Your password should be at least {} characters", PASSWORD_MIN),
            ));
        } else if password_length > PASSWORD_MAX {
            errors.push(FieldError::new(
                "password",
                format!("Your password should not be longer than {} characters", PASSWORD_MAX),
            ));
        }

        if errors.is_empty() {
            Ok(username.to_string())
        } else {
            Err(errors)
        }
    }
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("invalid username or password".to_string())
}

fn issue_token(state: &AppState, profile: &UserProfile) -> Result<String, AppError> {
    auth::generate_token(
        profile.user_id,
        &profile.username,
        profile.is_admin,
        &state.config.security.jwt_secret,
    )
    .context("Failed to generate JWT token")
    .map_err(AppError::from)
}

/// Create an account and log it in
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let username = payload.validate()?;

    // Argon2 is CPU bound, keep it off the async workers
    let plain = payload.password;
    let password_hash = tokio::task::spawn_blocking(move || password::hash_password(&plain))
        .await
        .context("Password hashing task failed")?
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;

    let is_admin = state.config.is_admin_username(&username);
    let user = db::queries::create_user(&state.db, &username, &password_hash, is_admin)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => AppError::Conflict("username is already taken".to_string()),
            other => other,
        })?;

    tracing::info!(
        "Registered user: {} (ID: {}, admin: {})",
        user.username,
        user.user_id,
        user.is_admin
    );

    let profile = user.to_profile();
    let access_token = issue_token(&state, &profile)?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            access_token,
            user: profile,
        }),
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = db::queries::get_user_by_username(&state.db, payload.username.trim())
        .await?
        .ok_or_else(|| {
            tracing::debug!("Login attempt for unknown user: {}", payload.username);
            invalid_credentials()
        })?;

    let expected_hash = user.password_hash.clone();
    let candidate = payload.password;
    let verified =
        tokio::task::spawn_blocking(move || password::verify_password(&expected_hash, &candidate))
            .await
            .context("Password verification task failed")?;

    if !verified {
        tracing::warn!("Failed login for user: {} ({})", user.username, user.user_id);
        return Err(invalid_credentials());
    }

    tracing::info!("Successfully authenticated user: {} ({})", user.username, user.user_id);

    let profile = user.to_profile();
    let access_token = issue_token(&state, &profile)?;
    Ok(Json(AuthResponse {
        access_token,
        user: profile,
    }))
}

/// Get current user info from database
pub async fn get_current_user(
    user: auth::AuthenticatedUser,
    State(state): State<Arc<AppState>>,
) -> Result<Json<UserProfile>, AppError> {
    tracing::debug!(
        "Getting user info for authenticated user: {} ({})",
        user.username,
        user.user_id
    );

    let db_user = db::queries::get_user(&state.db, user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {}", user.user_id)))?;

    Ok(Json(db_user.to_profile()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tokio_test::{assert_err, assert_ok};
    use uuid::Uuid;

    fn request(username: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_valid_registration() {
        let username = assert_ok!(request("  player_one ", "secret-pass").validate());
        assert_eq!(username, "player_one");
    }

    #[test]
    fn test_blank_username_is_rejected() {
        let errors = assert_err!(request("   ", "secret-pass").validate());
        assert_eq!(errors[0].field, "username");
    }

    #[test]
    fn test_username_length_limit() {
        assert_ok!(request(&"a".repeat(USERNAME_MAX), "secret-pass").validate());
        assert_err!(request(&"a".repeat(USERNAME_MAX + 1), "secret-pass").validate());
    }

    #[test]
    fn test_username_limit_counts_code_points() {
        // 100 visible letters stored as 200 code points in VARCHAR(180)
        let name = "o\u{308}".repeat(100);
        let errors = assert_err!(request(&name, "secret-pass").validate());
        assert_eq!(errors[0].field, "username");
    }

    #[test]
    fn test_username_with_forbidden_characters_is_rejected() {
        for c in FORBIDDEN_USERNAME_CHARS {
            let name = format!("mario{}", c);
            assert_err!(request(&name, "secret-pass").validate());
        }
    }

    #[test]
    fn test_short_password_is_rejected() {
        let errors = assert_err!(request("mario", "12345").validate());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "password");
    }

    #[test]
    fn test_both_fields_reported() {
        let errors = assert_err!(request("", "").validate());
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["username", "password"]);
    }

    #[test]
    fn test_login_request_deserialization() {
        let json = r#"{"username": "mario", "password": "itsame"}"#;
        let request: LoginRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.username, "mario");
        assert_eq!(request.password, "itsame");
    }

    #[test]
    fn test_auth_response_serialization() {
        let response = AuthResponse {
            access_token: "jwt_token_here".to_string(),
            user: UserProfile {
                user_id: Uuid::nil(),
                username: "mario".to_string(),
                is_admin: true,
                created_at: Utc::now(),
            },
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("jwt_token_here"));
        assert!(json.contains("\"is_admin\":true"));
        assert!(!json.contains("password"));
    }
}
