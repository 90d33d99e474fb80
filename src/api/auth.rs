//! Google sign-in endpoints.

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Extension,
};
use serde::{Deserialize, Serialize};

use super::{error, success, ApiResponse, ApiResult, AppQuery};
use crate::auth::{attach_session, expired_session_cookie};
use crate::errors::AppError;
use crate::google::GoogleCredentials;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub authorization_url: String,
    pub state: String,
    pub message: &'static str,
}

/// Query parameters Google appends to the redirect URI.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CallbackResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub user_info: serde_json::Value,
    /// Encrypted credential to send back as a bearer token
    pub session_token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// GET /api/auth/login - Start the Google OAuth flow.
pub async fn login(State(state): State<AppState>) -> ApiResult<LoginResponse> {
    let oauth_state = match state.sessions.issue_state() {
        Ok(s) => s,
        Err(e) => return error(AppError::Internal(e.to_string())),
    };

    match state.oauth.authorization_url(&oauth_state) {
        Ok(authorization_url) => success(LoginResponse {
            authorization_url,
            state: oauth_state,
            message: "Visit the authorization URL to complete authentication",
        }),
        Err(e) => error(e.into()),
    }
}

/// GET /api/auth/google/callback - Finish the OAuth flow and issue a session token.
pub async fn oauth_callback(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<CallbackQuery>,
) -> Result<Response, AppError> {
    if let Some(reason) = params.error {
        return Err(AppError::ExternalService(format!(
            "Authorization was not granted: {reason}"
        )));
    }

    let valid_state = params
        .state
        .as_deref()
        .is_some_and(|s| state.sessions.verify_state(s));
    if !valid_state {
        tracing::warn!("Rejected OAuth callback with invalid state");
        return Err(AppError::BadRequest("Invalid OAuth state".to_string()));
    }

    let code = super::required(params.code, "code")?;
    let credentials = state.oauth.exchange_code(&code).await?;
    let user_info = state.oauth.user_info(&credentials).await?;
    let token = state
        .sessions
        .seal(&credentials)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    tracing::info!(
        "User authenticated: {}",
        user_info
            .get("email")
            .and_then(|v| v.as_str())
            .unwrap_or("<unknown>")
    );

    let mut response = ApiResponse::new(CallbackResponse {
        status: "success",
        message: "Authentication successful",
        user_info,
        session_token: token.clone(),
    })
    .into_response();
    attach_session(response.headers_mut(), &token);

    Ok(response)
}

/// GET /api/auth/user-info - Profile of the signed-in user.
pub async fn user_info(
    State(state): State<AppState>,
    Extension(credentials): Extension<GoogleCredentials>,
) -> ApiResult<serde_json::Value> {
    match state.oauth.user_info(&credentials).await {
        Ok(info) => success(info),
        Err(e) => error(e.into()),
    }
}

/// POST /api/auth/logout - Drop the session cookie.
pub async fn logout() -> Response {
    let mut response = ApiResponse::new(MessageResponse {
        message: "Logged out successfully",
    })
    .into_response();
    response
        .headers_mut()
        .insert(header::SET_COOKIE, expired_session_cookie());
    response
}
