//! Renewal API endpoints.

use axum::{extract::State, Extension};
use chrono::Utc;
use serde::Deserialize;

use super::{default_limit, error, page, required, success, ApiResult, AppJson, AppQuery};
use crate::db::RenewalFilter;
use crate::google::{GoogleCredentials, GoogleSheetsClient};
use crate::models::{CreateRenewalRequest, Renewal};
use crate::sync::{self, ExportSummary};
use crate::AppState;

/// Query parameters for `GET /api/renewals`.
#[derive(Debug, Deserialize)]
pub struct RenewalListQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub trade_union_number: Option<String>,
    pub coordinator: Option<String>,
}

/// Query parameters for `POST /api/renewals/export`.
#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub spreadsheet_id: Option<String>,
    #[serde(default = "default_export_range")]
    pub range_name: String,
}

fn default_export_range() -> String {
    "Renewals!A:D".to_string()
}

/// POST /api/renewals - Record a renewal.
pub async fn create_renewal(
    State(state): State<AppState>,
    AppJson(request): AppJson<CreateRenewalRequest>,
) -> ApiResult<Renewal> {
    if let Err(e) = request.validate() {
        return error(e);
    }

    let renewal = request.into_renewal(Utc::now());
    match state.repo.create_renewal(&renewal).await {
        Ok(()) => {
            tracing::info!(
                "Recorded renewal {} for {}",
                renewal.receipt_number,
                renewal.trade_union_number
            );
            success(renewal)
        }
        Err(e) => error(e),
    }
}

/// GET /api/renewals - List renewals, newest first.
pub async fn list_renewals(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<RenewalListQuery>,
) -> ApiResult<Vec<Renewal>> {
    let (skip, limit) = page(params.skip, params.limit);
    let filter = RenewalFilter {
        skip,
        limit,
        trade_union_number: params.trade_union_number,
        coordinator: params.coordinator,
    };

    match state.repo.list_renewals(&filter).await {
        Ok(renewals) => success(renewals),
        Err(e) => error(e),
    }
}

/// POST /api/renewals/export - Write renewals to a Google Sheet.
pub async fn export_renewals(
    State(state): State<AppState>,
    Extension(credentials): Extension<GoogleCredentials>,
    AppQuery(params): AppQuery<ExportQuery>,
) -> ApiResult<ExportSummary> {
    let spreadsheet_id = match required(params.spreadsheet_id, "spreadsheet_id") {
        Ok(id) => id,
        Err(e) => return error(e),
    };

    let sheets = GoogleSheetsClient::new(
        state.http.clone(),
        state.config.google.sheets_base_url.as_str(),
        credentials.access_token.as_str(),
    );

    match sync::export_renewals(&state.repo, &sheets, &spreadsheet_id, &params.range_name).await {
        Ok(summary) => success(summary),
        Err(e) => error(e),
    }
}
