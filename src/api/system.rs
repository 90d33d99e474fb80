//! Banner and liveness endpoints.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{success, ApiResult};

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub message: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// GET /api - Service banner.
pub async fn service_info() -> ApiResult<ServiceInfo> {
    success(ServiceInfo {
        message: "Trade Union MIS API",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /api/health - Liveness check.
pub async fn health_check() -> ApiResult<HealthStatus> {
    success(HealthStatus {
        status: "healthy",
        timestamp: Utc::now(),
    })
}
