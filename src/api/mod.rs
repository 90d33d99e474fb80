//! REST API module.
//!
//! Contains all API routes and handlers. Every body is wrapped in the
//! `{ success, data }` envelope; failures use `ErrorResponse`.

mod auth;
mod dashboard;
mod members;
mod renewals;
mod system;

pub use auth::*;
pub use dashboard::*;
pub use members::*;
pub use renewals::*;
pub use system::*;

use axum::{
    extract::{FromRequest, FromRequestParts},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::AppError;

/// Default page size for list endpoints.
pub const DEFAULT_PAGE_LIMIT: i64 = 100;

/// Largest page a client may request.
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Success response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// JSON body extractor whose rejections use the error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Query string extractor whose rejections use the error envelope.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(ApiResponse::new(data))
}

/// Create an error API response.
pub fn error<T: Serialize>(err: AppError) -> ApiResult<T> {
    Err(err)
}

fn default_limit() -> i64 {
    DEFAULT_PAGE_LIMIT
}

/// Clamp client paging parameters to sane bounds.
fn page(skip: i64, limit: i64) -> (i64, i64) {
    (skip.max(0), limit.clamp(0, MAX_PAGE_LIMIT))
}

/// Require a non-empty query parameter.
fn required(value: Option<String>, name: &str) -> Result<String, AppError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("{name} is required")))
}
