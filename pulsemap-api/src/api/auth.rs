//! Session authentication: login/logout/status handlers and middleware
//!
//! Sessions are carried by an HTTP-only cookie. The middleware guards the
//! analytics routes; login, logout and status are public.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::db::{sessions, users};
use crate::AppState;
use pulsemap_common::credentials::verify_password;
use pulsemap_common::db::get_setting_i64;

/// Session cookie name
pub const SESSION_COOKIE: &str = "pulsemap_session";

const DEFAULT_SESSION_TTL_SECONDS: i64 = 604_800; // 7 days

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// POST /api/v1/login
///
/// Verifies credentials and establishes a session. Unknown usernames and
/// wrong passwords produce the identical 401 body.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Response, AuthError> {
    let user = users::find_by_username(&state.db, &request.username)
        .await
        .map_err(internal)?;

    let Some(user) = user else {
        return Err(AuthError::InvalidCredentials);
    };

    if !verify_password(&request.password, &user.password_salt, &user.password_hash) {
        return Err(AuthError::InvalidCredentials);
    }

    let ttl = get_setting_i64(&state.db, "session_timeout_seconds", DEFAULT_SESSION_TTL_SECONDS)
        .await
        .map_err(internal)?;

    let session = sessions::create_session(&state.db, &user.guid, ttl)
        .await
        .map_err(internal)?;

    info!(username = %user.username, "User logged in");

    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, session.token, ttl
    );

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(json!({"message": "Logged in successfully"})),
    )
        .into_response())
}

/// POST /api/v1/logout
///
/// Drops the session (if any) and clears the cookie. Always succeeds.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AuthError> {
    if let Some(token) = session_cookie(&headers) {
        sessions::delete_session(&state.db, &token)
            .await
            .map_err(internal)?;
    }

    let cookie = format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE);

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(json!({"message": "Logged out successfully"})),
    )
        .into_response())
}

/// GET /api/v1/status
///
/// Reports whether the caller holds a valid session.
pub async fn status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AuthError> {
    let logged_in = match session_cookie(&headers) {
        Some(token) => sessions::find_valid_session(&state.db, &token)
            .await
            .map_err(internal)?
            .is_some(),
        None => false,
    };

    Ok(Json(json!({"logged_in": logged_in})))
}

/// Authentication middleware for protected routes
///
/// Returns 401 when the session cookie is missing, unknown or expired.
pub async fn session_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = session_cookie(request.headers()).ok_or(AuthError::NotAuthenticated)?;

    let session = sessions::find_valid_session(&state.db, &token)
        .await
        .map_err(internal)?;

    if session.is_none() {
        return Err(AuthError::NotAuthenticated);
    }

    Ok(next.run(request).await)
}

/// Extract the session token from the Cookie header
fn session_cookie(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

fn internal(err: pulsemap_common::Error) -> AuthError {
    AuthError::Internal(err.to_string())
}

/// Authentication error types for HTTP responses
#[derive(Debug)]
pub enum AuthError {
    /// Login rejected (unknown user or wrong password)
    InvalidCredentials,
    /// Protected route reached without a valid session
    NotAuthenticated,
    /// Database failure during authentication
    Internal(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                Json(json!({"message": "Invalid username or password"})),
            )
                .into_response(),
            AuthError::NotAuthenticated => (
                StatusCode::UNAUTHORIZED,
                Json(json!({"message": "Authentication required"})),
            )
                .into_response(),
            AuthError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": format!("Authentication error: {}", msg)})),
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_cookie(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_session_cookie_extraction() {
        let headers = headers_with_cookie("pulsemap_session=abc-123");
        assert_eq!(session_cookie(&headers).as_deref(), Some("abc-123"));
    }

    #[test]
    fn test_session_cookie_among_others() {
        let headers = headers_with_cookie("theme=dark; pulsemap_session=tok; lang=en");
        assert_eq!(session_cookie(&headers).as_deref(), Some("tok"));
    }

    #[test]
    fn test_session_cookie_absent() {
        let headers = headers_with_cookie("theme=dark");
        assert!(session_cookie(&headers).is_none());
        assert!(session_cookie(&HeaderMap::new()).is_none());
    }
}
