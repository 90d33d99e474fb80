//! Clients for the Google identity provider and the Sheets values API.

mod oauth;
mod sheets;

pub use oauth::*;
pub use sheets::*;

use thiserror::Error;

/// Failure talking to a Google endpoint.
#[derive(Debug, Error)]
pub enum GoogleError {
    #[error("Google OAuth2 credentials not configured")]
    NotConfigured,

    #[error("request to Google failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Google returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid Google endpoint URL: {0}")]
    InvalidUrl(String),
}

/// Turn a non-2xx response into `GoogleError::Status` carrying the provider's text.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GoogleError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(GoogleError::Status {
        status: status.as_u16(),
        body,
    })
}
