//! Configuration module for the Trade Union backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_USERINFO_URI: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
pub const DEFAULT_SHEETS_BASE_URL: &str = "https://sheets.googleapis.com";

/// Google OAuth2 client registration and provider endpoints.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub auth_uri: String,
    pub token_uri: String,
    pub userinfo_uri: String,
    pub sheets_base_url: String,
}

impl GoogleConfig {
    /// Whether a client id and secret have been provided.
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    pub log_format: LogFormat,
    /// Key material for session tokens and OAuth state; `None` means a random per-process key
    pub secret_key: Option<String>,
    /// Allowed CORS origins; `["*"]` allows any origin without credentials
    pub cors_origins: Vec<String>,
    pub google: GoogleConfig,
    /// Reject import rows whose join date cannot be parsed instead of defaulting to today
    pub strict_join_dates: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, BoxError> {
        dotenvy::dotenv().ok();

        let db_path = env::var("TU_DB_PATH")
            .unwrap_or_else(|_| "./data/trade_union.sqlite".to_string())
            .into();

        let bind_addr = env::var("TU_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8001".to_string())
            .parse()
            .map_err(|e| format!("Invalid TU_BIND_ADDR format: {e}"))?;

        let log_level = env::var("TU_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_format = match env::var("TU_LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let secret_key = env::var("TU_SECRET_KEY").ok().filter(|s| !s.is_empty());

        let cors_origins = env::var("TU_CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let google = GoogleConfig {
            client_id: env::var("GOOGLE_CLIENT_ID").unwrap_or_default(),
            client_secret: env::var("GOOGLE_CLIENT_SECRET").unwrap_or_default(),
            redirect_uri: env::var("GOOGLE_REDIRECT_URI")
                .unwrap_or_else(|_| "http://localhost:8001/api/auth/google/callback".to_string()),
            auth_uri: env_or("GOOGLE_AUTH_URI", DEFAULT_AUTH_URI),
            token_uri: env_or("GOOGLE_TOKEN_URI", DEFAULT_TOKEN_URI),
            userinfo_uri: env_or("GOOGLE_USERINFO_URI", DEFAULT_USERINFO_URI),
            sheets_base_url: env_or("GOOGLE_SHEETS_BASE_URL", DEFAULT_SHEETS_BASE_URL),
        };

        let strict_join_dates = env::var("TU_IMPORT_STRICT_DATES")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            db_path,
            bind_addr,
            log_level,
            log_format,
            secret_key,
            cors_origins,
            google,
            strict_join_dates,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
