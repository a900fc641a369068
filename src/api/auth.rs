use axum::{
    Json,
    extract::{Request, State, rejection::JsonRejection},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::validation::validate_login_name;
use super::{ApiError, ApiResponse, AppState, UserDto};
use crate::services::AuthError;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    pub name: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserDto,
}

// ============================================================================
// Middleware
// ============================================================================

/// Token gate for protected routes.
///
/// Expects `Authorization: Bearer <jwt>`. The token is decoded, then the
/// subject is resolved to a stored user, which is handed to handlers as an
/// `Extension<User>`. Every failure answers with the same 401.
pub async fn require_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(&headers).ok_or(ApiError::Unauthorized)?;

    let user = state
        .auth_service()
        .authenticate_token(token)
        .await
        .map_err(|e| match e {
            AuthError::Unauthorized | AuthError::NotFound => ApiError::Unauthorized,
            other => ApiError::from(other),
        })?;

    tracing::Span::current().record("user_id", user.id);
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/login
/// Exchange name and password for a signed bearer token
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let Json(payload) = payload?;
    validate_login_name(&payload.name)?;

    let result = state
        .auth_service()
        .login(&payload.name, &payload.password)
        .await
        .map_err(|e| match e {
            AuthError::Unauthorized | AuthError::NotFound => ApiError::Unauthorized,
            other => ApiError::from(other),
        })?;

    tracing::info!(user_id = result.user.id, "Login succeeded");

    Ok(Json(ApiResponse::success(LoginResponse {
        token: result.token,
        token_type: "Bearer".to_string(),
        expires_at: result.expires_at,
        user: result.user.into(),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer(&headers_with("Bearer abc.def")), Some("abc.def"));
        assert_eq!(extract_bearer(&headers_with("bearer abc")), Some("abc"));
    }

    #[test]
    fn test_extract_bearer_rejects_other_schemes() {
        assert_eq!(extract_bearer(&headers_with("Basic dXNlcjpwYXNz")), None);
        assert_eq!(extract_bearer(&headers_with("Bearer")), None);
        assert_eq!(extract_bearer(&headers_with("Bearer    ")), None);
        assert_eq!(extract_bearer(&HeaderMap::new()), None);
    }
}
