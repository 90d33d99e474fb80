//! Session-token authentication module.
//!
//! Google credentials travel with each request as an encrypted token, either
//! as a bearer token or in the session cookie. Expired credentials are
//! refreshed before the handler runs.

mod session;

pub use session::SessionCipher;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use subtle::ConstantTimeEq;

use crate::errors::AppError;
use crate::google::{GoogleCredentials, GoogleOAuth};
use crate::AppState;

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "tu_session";

/// Response header carrying a re-issued token after a refresh.
pub const SESSION_TOKEN_HEADER: &str = "x-session-token";

const SESSION_COOKIE_MAX_AGE_SECS: i64 = 30 * 24 * 60 * 60;

/// Middleware for routes that act on the user's Google account.
///
/// Inserts the usable `GoogleCredentials` into the request extensions.
pub async fn require_credentials(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = session_token(request.headers()) else {
        return AppError::Unauthorized("Authentication required".to_string()).into_response();
    };

    let Some(credentials) = state.sessions.open(&token) else {
        tracing::debug!("Rejected undecryptable session token");
        return AppError::Unauthorized("Authentication required".to_string()).into_response();
    };

    let (credentials, refreshed) =
        match ensure_fresh(&state.oauth, credentials, Utc::now()).await {
            Ok(result) => result,
            Err(e) => return e.into_response(),
        };

    request.extensions_mut().insert(credentials.clone());
    let mut response = next.run(request).await;

    if refreshed {
        match state.sessions.seal(&credentials) {
            Ok(token) => attach_session(response.headers_mut(), &token),
            Err(e) => tracing::warn!("Failed to re-issue refreshed session token: {}", e),
        }
    }

    response
}

/// Refresh credentials that are expired or about to expire.
///
/// Returns the usable credentials and whether they were refreshed.
async fn ensure_fresh(
    oauth: &GoogleOAuth,
    credentials: GoogleCredentials,
    now: DateTime<Utc>,
) -> Result<(GoogleCredentials, bool), AppError> {
    if credentials.is_valid_at(now) {
        return Ok((credentials, false));
    }

    if credentials.refresh_token.is_none() {
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    match oauth.refresh(&credentials).await {
        Ok(refreshed) => {
            tracing::info!("Refreshed Google access token");
            Ok((refreshed, true))
        }
        Err(e) => {
            tracing::error!("Token refresh failed: {}", e);
            Err(AppError::Unauthorized("Token refresh failed".to_string()))
        }
    }
}

/// Extract the session token from the Authorization header or the session cookie.
fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    if bearer.is_some() {
        return bearer;
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|s| !s.is_empty())
}

/// Set the session cookie and token header on a response.
pub fn attach_session(headers: &mut HeaderMap, token: &str) {
    if let Ok(value) = HeaderValue::from_str(token) {
        headers.insert(SESSION_TOKEN_HEADER, value);
    }
    let cookie = format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={SESSION_COOKIE_MAX_AGE_SECS}"
    );
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        headers.append(header::SET_COOKIE, value);
    }
}

/// Cookie value that makes the browser drop the session.
pub fn expired_session_cookie() -> HeaderValue {
    HeaderValue::from_static("tu_session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    // Constant-time comparison
    a_bytes.ct_eq(b_bytes).into()
}
