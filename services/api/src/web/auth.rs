//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for user signup, login, logout and the current user.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use portfolio_core::domain::{AuthSession, AuthUser};
use portfolio_core::ports::AuthError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::state::AppState;

const SESSION_COOKIE: &str = "session";

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
}

impl From<AuthUser> for AuthResponse {
    fn from(user: AuthUser) -> Self {
        Self {
            user_id: user.uid,
            email: user.email,
            display_name: user.display_name,
        }
    }
}

//=========================================================================================
// Cookie Helpers
//=========================================================================================

/// Pulls the auth session token out of the `Cookie` header.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())?
        .split(';')
        .find_map(|c| c.trim().strip_prefix("session="))
        .filter(|token| !token.is_empty())
}

fn session_cookie(token: &str, max_age_secs: i64) -> String {
    format!(
        "{}={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE, token, max_age_secs
    )
}

fn cookie_max_age(state: &AppState, session: &AuthSession) -> i64 {
    let configured = state.config.auth_session_days * 24 * 60 * 60;
    let remaining = (session.expires_at - chrono::Utc::now()).num_seconds();
    remaining.clamp(0, configured)
}

/// Auth errors are shown to the user verbatim; only the status code varies.
fn auth_error_response(e: AuthError) -> (StatusCode, String) {
    let status = match &e {
        AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AuthError::WeakPassword | AuthError::InvalidEmail => StatusCode::BAD_REQUEST,
        AuthError::EmailInUse => StatusCode::CONFLICT,
        AuthError::Unexpected(_) => {
            error!("Auth provider failure: {:?}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, e.to_string())
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/signup - Create a new user account
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Invalid email or weak password"),
        (status = 409, description = "Email already in use"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session = state
        .auth
        .sign_up(&req.email, &req.password, req.display_name.as_deref())
        .await
        .map_err(auth_error_response)?;
    info!("New account {}", session.user.uid);

    let cookie = session_cookie(&session.token, cookie_max_age(&state, &session));
    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse::from(session.user)),
    ))
}

/// POST /auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session = state
        .auth
        .sign_in(&req.email, &req.password)
        .await
        .map_err(auth_error_response)?;

    let cookie = session_cookie(&session.token, cookie_max_age(&state, &session));
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse::from(session.user)),
    ))
}

/// POST /auth/logout - Logout and invalidate session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let token = session_token(&headers)
        .ok_or((StatusCode::UNAUTHORIZED, "No session found".to_string()))?;

    state
        .auth
        .sign_out(token)
        .await
        .map_err(auth_error_response)?;

    Ok((StatusCode::OK, [(header::SET_COOKIE, session_cookie("", 0))]))
}

/// GET /auth/me - The signed-in user
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current user", body = AuthResponse),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn me_handler(Extension(user): Extension<AuthUser>) -> Json<AuthResponse> {
    Json(AuthResponse::from(user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn session_token_is_read_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session=abc-123; other=1"),
        );
        assert_eq!(session_token(&headers), Some("abc-123"));
    }

    #[test]
    fn missing_or_empty_session_cookie_yields_none() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_token(&headers), None);
        headers.insert(header::COOKIE, HeaderValue::from_static("session="));
        assert_eq!(session_token(&headers), None);
    }

    #[test]
    fn auth_errors_keep_their_message() {
        let (status, message) = auth_error_response(AuthError::EmailInUse);
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(message, "Email already in use");
        let (status, _) = auth_error_response(AuthError::WeakPassword);
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
