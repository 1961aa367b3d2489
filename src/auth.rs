use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, StatusCode},
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::AppState;

/// Lifetime of issued tokens
const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,      // User ID
    pub username: String, // Username
    #[serde(default)]
    pub admin: bool,
    pub exp: usize, // Expiration time
}

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub username: String,
    pub is_admin: bool,
}

/// An authenticated user whose token carries the admin flag
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthenticatedUser);

/// Validate a token and turn its claims into a user
pub fn decode_token(token: &str, jwt_secret: &str) -> Option<AuthenticatedUser> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_ref()),
        &Validation::default(),
    )
    .ok()?;

    let user_id = token_data.claims.sub.parse::<Uuid>().ok()?;

    Some(AuthenticatedUser {
        user_id,
        username: token_data.claims.username,
        is_admin: token_data.claims.admin,
    })
}

/// Extractor for authenticated users from JWT tokens
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = StatusCode;

    fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let app_state = Arc::<AppState>::from_ref(state);

        // Try to extract token from Authorization header first
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "))
            .map(String::from)
            // If no Authorization header, try query parameter
            .or_else(|| {
                parts
                    .uri
                    .query()
                    .and_then(|q| {
                        serde_urlencoded::from_str::<Vec<(String, String)>>(q).ok()
                    })
                    .and_then(|params| {
                        params
                            .iter()
                            .find(|(k, _)| k == "token")
                            .map(|(_, v)| v.clone())
                    })
            });

        async move {
            let token = token.ok_or(StatusCode::UNAUTHORIZED)?;
            decode_token(&token, &app_state.config.security.jwt_secret)
                .ok_or(StatusCode::UNAUTHORIZED)
        }
    }
}

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            tracing::warn!(
                "Non-admin user {} ({}) attempted an admin operation",
                user.username,
                user.user_id
            );
            return Err(StatusCode::FORBIDDEN);
        }
        Ok(AdminUser(user))
    }
}

/// Generate a JWT token for a user
pub fn generate_token(
    user_id: Uuid,
    username: &str,
    is_admin: bool,
    jwt_secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let expiration = (chrono::Utc::now() + chrono::Duration::hours(TOKEN_TTL_HOURS)).timestamp();

    let claims = Claims {
        sub: user_id.to_string(),
        username: username.to_string(),
        admin: is_admin,
        exp: expiration as usize,
    };

    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(jwt_secret.as_ref()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::memory::InMemoryGameRepository;
    use axum::{body::Body, http::Request, routing::get, Router};
    use tower::ServiceExt;

    const SECRET: &str = "test-secret";

    async fn whoami(user: AuthenticatedUser) -> String {
        user.username
    }

    async fn admin_only(AdminUser(user): AdminUser) -> String {
        format!("admin:{}", user.username)
    }

    fn app() -> Router {
        let state = AppState::for_tests(Arc::new(InMemoryGameRepository::new(vec![])));
        Router::new()
            .route("/whoami", get(whoami))
            .route("/admin", get(admin_only))
            .with_state(state)
    }

    async fn status_of(uri: &str, token: Option<&str>) -> StatusCode {
        let mut request = Request::builder().uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        app()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[test]
    fn test_token_round_trip() {
        let id = Uuid::new_v4();
        let token = generate_token(id, "mario", true, SECRET).unwrap();

        let user = decode_token(&token, SECRET).unwrap();
        assert_eq!(user.user_id, id);
        assert_eq!(user.username, "mario");
        assert!(user.is_admin);
    }

    #[test]
    fn test_token_with_wrong_secret_is_rejected() {
        let token = generate_token(Uuid::new_v4(), "luigi", false, SECRET).unwrap();
        assert!(decode_token(&token, "another-secret").is_none());
    }

    #[test]
    fn test_claims_without_admin_flag_default_to_regular_user() {
        let json = r#"{"sub": "00000000-0000-0000-0000-000000000000", "username": "x", "exp": 1}"#;
        let claims: Claims = serde_json::from_str(json).unwrap();
        assert!(!claims.admin);
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        assert_eq!(status_of("/whoami", None).await, StatusCode::UNAUTHORIZED);
        assert_eq!(status_of("/admin", None).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_token_accepted_from_query_parameter() {
        let token = generate_token(Uuid::new_v4(), "peach", false, SECRET).unwrap();
        let uri = format!("/whoami?token={}", token);
        assert_eq!(status_of(&uri, None).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_admin_route_rejects_regular_users() {
        let token = generate_token(Uuid::new_v4(), "toad", false, SECRET).unwrap();
        assert_eq!(status_of("/whoami", Some(&token)).await, StatusCode::OK);
        assert_eq!(status_of("/admin", Some(&token)).await, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_admin_route_accepts_admins() {
        let token = generate_token(Uuid::new_v4(), "bowser", true, SECRET).unwrap();
        assert_eq!(status_of("/admin", Some(&token)).await, StatusCode::OK);
    }
}
