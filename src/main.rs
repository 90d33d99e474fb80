//! Trade Union Membership Backend
//!
//! REST backend for union member records and renewals, with Google Sheets
//! import/export and SQLite persistence.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod google;
mod mapping;
mod models;
mod stats;
mod sync;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{HeaderName, HeaderValue},
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{AllowHeaders, AllowMethods, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use auth::{SessionCipher, SESSION_TOKEN_HEADER};
use config::{Config, LogFormat};
use db::Repository;
use google::GoogleOAuth;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Arc<Config>,
    /// Shared HTTP client for Google calls
    pub http: reqwest::Client,
    pub oauth: GoogleOAuth,
    pub sessions: SessionCipher,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    tracing::info!("Starting Trade Union Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    let sessions = match &config.secret_key {
        Some(secret) => SessionCipher::from_secret(secret),
        None => {
            tracing::warn!(
                "No session secret configured (TU_SECRET_KEY). Sessions will not survive a restart!"
            );
            SessionCipher::random()
        }
    };

    if !config.google.is_configured() {
        tracing::warn!(
            "Google OAuth2 client not configured (GOOGLE_CLIENT_ID / GOOGLE_CLIENT_SECRET). Sign-in is disabled!"
        );
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool.clone()));

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;
    let oauth = GoogleOAuth::new(http.clone(), config.google.clone());

    // Create application state
    let state = AppState {
        repo,
        config: Arc::new(config.clone()),
        http,
        oauth,
        sessions,
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("Server stopped");

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    // Routes acting on the user's Google account
    let google_routes = Router::new()
        .route("/auth/user-info", get(api::user_info))
        .route("/members/import", post(api::import_members))
        .route("/renewals/export", post(api::export_renewals))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_credentials,
        ));

    let api_routes = Router::new()
        .route("/", get(api::service_info))
        .route("/health", get(api::health_check))
        // Auth
        .route("/auth/login", get(api::login))
        .route("/auth/google/callback", get(api::oauth_callback))
        .route("/auth/logout", post(api::logout))
        // Members
        .route("/members", get(api::list_members))
        .route(
            "/members/{id}",
            get(api::get_member).put(api::replace_member),
        )
        // Renewals
        .route(
            "/renewals",
            get(api::list_renewals).post(api::create_renewal),
        )
        // Dashboard
        .route("/dashboard/stats", get(api::dashboard_stats))
        .merge(google_routes);

    Router::new()
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// CORS: any origin for `*`, otherwise the listed origins with credentials.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let exposed = [HeaderName::from_static(SESSION_TOKEN_HEADER)];

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers(exposed);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .expose_headers(exposed)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests;
