//! Member API endpoints.

use axum::{
    extract::{Path, State},
    Extension,
};
use chrono::Utc;
use serde::Deserialize;

use super::{default_limit, error, page, required, success, ApiResult, AppJson, AppQuery};
use crate::db::MemberFilter;
use crate::errors::AppError;
use crate::google::{GoogleCredentials, GoogleSheetsClient};
use crate::mapping::JoinDatePolicy;
use crate::models::{Member, ReplaceMemberRequest};
use crate::sync::{self, ImportSummary};
use crate::AppState;

/// Query parameters for `GET /api/members`.
#[derive(Debug, Deserialize)]
pub struct MemberListQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub search: Option<String>,
    pub state: Option<String>,
    #[serde(default = "default_active_only")]
    pub active_only: bool,
}

fn default_active_only() -> bool {
    true
}

/// Query parameters for `POST /api/members/import`.
#[derive(Debug, Deserialize)]
pub struct ImportQuery {
    pub spreadsheet_id: Option<String>,
    #[serde(default = "default_import_range")]
    pub range_name: String,
}

fn default_import_range() -> String {
    "Sheet1".to_string()
}

/// POST /api/members/import - Upsert members from a Google Sheet.
pub async fn import_members(
    State(state): State<AppState>,
    Extension(credentials): Extension<GoogleCredentials>,
    AppQuery(params): AppQuery<ImportQuery>,
) -> ApiResult<ImportSummary> {
    let spreadsheet_id = match required(params.spreadsheet_id, "spreadsheet_id") {
        Ok(id) => id,
        Err(e) => return error(e),
    };

    let sheets = GoogleSheetsClient::new(
        state.http.clone(),
        state.config.google.sheets_base_url.as_str(),
        credentials.access_token.as_str(),
    );
    let policy = if state.config.strict_join_dates {
        JoinDatePolicy::RejectRow
    } else {
        JoinDatePolicy::DefaultToToday
    };

    match sync::import_members(
        &state.repo,
        &sheets,
        &spreadsheet_id,
        &params.range_name,
        policy,
        Utc::now(),
    )
    .await
    {
        Ok(summary) => success(summary),
        Err(e) => error(e),
    }
}

/// GET /api/members - List members with paging and filters.
pub async fn list_members(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<MemberListQuery>,
) -> ApiResult<Vec<Member>> {
    let (skip, limit) = page(params.skip, params.limit);
    let filter = MemberFilter {
        skip,
        limit,
        search: params.search,
        state: params.state,
        active_only: params.active_only,
    };

    match state.repo.list_members(&filter).await {
        Ok(members) => success(members),
        Err(e) => error(e),
    }
}

/// GET /api/members/{id} - Get a single member.
pub async fn get_member(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Member> {
    match state.repo.get_member(&id).await {
        Ok(Some(member)) => success(member),
        Ok(None) => error(AppError::NotFound("Member not found".to_string())),
        Err(e) => error(e),
    }
}

/// PUT /api/members/{id} - Replace a member record.
pub async fn replace_member(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(request): AppJson<ReplaceMemberRequest>,
) -> ApiResult<Member> {
    match state.repo.replace_member(&id, request, Utc::now()).await {
        Ok(member) => {
            tracing::info!("Replaced member {}", member.id);
            success(member)
        }
        Err(e) => error(e),
    }
}
