//! Google OAuth2 authorization-code flow.

use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use super::{check_status, GoogleError};
use crate::config::GoogleConfig;

/// Scopes requested at login: spreadsheet access plus basic profile.
pub const SCOPES: [&str; 3] = [
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/userinfo.profile",
    "https://www.googleapis.com/auth/userinfo.email",
];

/// Credentials are refreshed when they expire within this window.
const EXPIRY_SKEW_SECS: i64 = 60;

/// OAuth2 credential material carried in the session token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoogleCredentials {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl GoogleCredentials {
    /// Whether the access token is still usable at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(EXPIRY_SKEW_SECS) > now
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

impl TokenResponse {
    fn into_credentials(self, previous_refresh: Option<String>) -> GoogleCredentials {
        let expires_at = Utc::now() + Duration::seconds(self.expires_in.unwrap_or(3600));
        let scopes = self
            .scope
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_else(|| SCOPES.iter().map(|s| s.to_string()).collect());

        GoogleCredentials {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(previous_refresh),
            expires_at,
            scopes,
        }
    }
}

/// Client for the Google OAuth2 and userinfo endpoints.
#[derive(Debug, Clone)]
pub struct GoogleOAuth {
    http: Client,
    config: GoogleConfig,
}

impl GoogleOAuth {
    pub fn new(http: Client, config: GoogleConfig) -> Self {
        Self { http, config }
    }

    fn ensure_configured(&self) -> Result<(), GoogleError> {
        if self.config.is_configured() {
            Ok(())
        } else {
            Err(GoogleError::NotConfigured)
        }
    }

    /// Build the consent-screen URL for the given opaque state.
    pub fn authorization_url(&self, state: &str) -> Result<String, GoogleError> {
        self.ensure_configured()?;

        let scope = SCOPES.join(" ");
        let url = Url::parse_with_params(
            &self.config.auth_uri,
            &[
                ("response_type", "code"),
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("scope", scope.as_str()),
                ("state", state),
                ("access_type", "offline"),
                ("include_granted_scopes", "true"),
                ("prompt", "consent"),
            ],
        )
        .map_err(|e| GoogleError::InvalidUrl(format!("{}: {e}", self.config.auth_uri)))?;

        Ok(url.into())
    }

    /// Exchange an authorization code for credentials.
    pub async fn exchange_code(&self, code: &str) -> Result<GoogleCredentials, GoogleError> {
        self.ensure_configured()?;

        let response = self
            .http
            .post(&self.config.token_uri)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
            ])
            .send()
            .await?;

        let token: TokenResponse = check_status(response).await?.json().await?;
        Ok(token.into_credentials(None))
    }

    /// Obtain a fresh access token using the refresh token.
    pub async fn refresh(
        &self,
        credentials: &GoogleCredentials,
    ) -> Result<GoogleCredentials, GoogleError> {
        self.ensure_configured()?;

        let refresh_token = credentials.refresh_token.as_deref().unwrap_or_default();
        let response = self
            .http
            .post(&self.config.token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
            ])
            .send()
            .await?;

        let token: TokenResponse = check_status(response).await?.json().await?;
        Ok(token.into_credentials(credentials.refresh_token.clone()))
    }

    /// Fetch the authenticated user's profile.
    pub async fn user_info(
        &self,
        credentials: &GoogleCredentials,
    ) -> Result<serde_json::Value, GoogleError> {
        let response = self
            .http
            .get(&self.config.userinfo_uri)
            .bearer_auth(&credentials.access_token)
            .send()
            .await?;

        Ok(check_status(response).await?.json().await?)
    }
}
