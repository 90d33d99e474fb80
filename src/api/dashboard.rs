//! Dashboard API endpoint.

use axum::extract::State;
use chrono::Utc;

use super::{error, success, ApiResult};
use crate::models::DashboardStats;
use crate::stats;
use crate::AppState;

/// GET /api/dashboard/stats - Aggregate membership statistics.
pub async fn dashboard_stats(State(state): State<AppState>) -> ApiResult<DashboardStats> {
    match stats::compute_dashboard(&state.repo, Utc::now()).await {
        Ok(stats) => success(stats),
        Err(e) => error(e),
    }
}
