//! Spreadsheet import of members and export of renewals.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::db::Repository;
use crate::errors::AppError;
use crate::google::SpreadsheetClient;
use crate::mapping::{map_rows, JoinDatePolicy};
use crate::models::{next_renewal_due, Member, MemberDraft, RENEWAL_SHEET_HEADER};

/// Most renewals written by one export.
pub const EXPORT_LIMIT: i64 = 1000;

/// Result of `POST /members/import`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportSummary {
    pub message: String,
    /// Members created or updated
    pub imported_count: usize,
    /// Mapped rows the store refused
    pub failed_count: usize,
    /// Rows dropped by the mapper
    pub rejected_rows: usize,
    /// Mapped rows found in the sheet
    pub total_found: usize,
}

/// Result of `POST /renewals/export`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportSummary {
    pub message: String,
    pub exported_count: usize,
    pub updated_cells: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Upsert {
    Created,
    Updated,
}

/// Read a sheet and upsert every mapped row by trade union number.
///
/// Only the sheet read is fatal. Rows that fail validation or storage are
/// logged and counted in `failed_count`.
pub async fn import_members(
    repo: &Repository,
    sheets: &dyn SpreadsheetClient,
    spreadsheet_id: &str,
    range: &str,
    policy: JoinDatePolicy,
    now: DateTime<Utc>,
) -> Result<ImportSummary, AppError> {
    let rows = sheets.read_values(spreadsheet_id, range).await?;
    let today = now.date_naive();
    let outcome = map_rows(&rows, today, policy);

    for (row, reason) in &outcome.rejected {
        tracing::warn!("Skipping sheet row {}: {:?}", row, reason);
    }

    let mut created = 0;
    let mut updated = 0;
    let mut failed = 0;
    for draft in &outcome.drafts {
        match upsert_member(repo, draft, today, now).await {
            Ok(Upsert::Created) => created += 1,
            Ok(Upsert::Updated) => updated += 1,
            Err(e) => {
                failed += 1;
                tracing::warn!(
                    "Failed to import member {:?}: {}",
                    draft.trade_union_number(),
                    e
                );
            }
        }
    }

    let imported = created + updated;
    tracing::info!(
        "Imported {} of {} members from spreadsheet {} ({} new, {} updated, {} failed, {} rows rejected)",
        imported,
        outcome.drafts.len(),
        spreadsheet_id,
        created,
        updated,
        failed,
        outcome.rejected.len()
    );

    Ok(ImportSummary {
        message: format!("Successfully imported {imported} members"),
        imported_count: imported,
        failed_count: failed,
        rejected_rows: outcome.rejected.len(),
        total_found: outcome.drafts.len(),
    })
}

async fn upsert_member(
    repo: &Repository,
    draft: &MemberDraft,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<Upsert, AppError> {
    let number = draft.trade_union_number().ok_or_else(|| {
        AppError::validation("trade_union_number", "Trade union number is required")
    })?;

    if let Some(existing) = repo.find_member_by_union_number(number).await? {
        merge_member(repo, existing, draft, now).await?;
        return Ok(Upsert::Updated);
    }

    let profile = draft.to_profile(today);
    profile.validate()?;
    match repo.insert_member(&Member::new(profile, now)).await {
        Ok(()) => Ok(Upsert::Created),
        // Another import created the member since the lookup.
        Err(AppError::Conflict(_)) => {
            let existing = repo
                .find_member_by_union_number(number)
                .await?
                .ok_or_else(|| {
                    AppError::Internal(format!("Member {number} vanished during import"))
                })?;
            merge_member(repo, existing, draft, now).await?;
            Ok(Upsert::Updated)
        }
        Err(e) => Err(e),
    }
}

async fn merge_member(
    repo: &Repository,
    mut member: Member,
    draft: &MemberDraft,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    draft.merge_into(&mut member.profile);
    member.profile.validate()?;
    member.next_renewal_due = next_renewal_due(member.last_renewal, member.profile.date_joining);
    member.updated_at = now;
    if !repo.update_member(&member).await? {
        return Err(AppError::NotFound(format!(
            "Member {} was removed during import",
            member.profile.trade_union_number
        )));
    }
    Ok(())
}

/// Overwrite a sheet range with a header row and one row per renewal.
pub async fn export_renewals(
    repo: &Repository,
    sheets: &dyn SpreadsheetClient,
    spreadsheet_id: &str,
    range: &str,
) -> Result<ExportSummary, AppError> {
    let renewals = repo.renewals_in_creation_order(EXPORT_LIMIT).await?;

    let mut values = Vec::with_capacity(renewals.len() + 1);
    values.push(RENEWAL_SHEET_HEADER.iter().map(|h| h.to_string()).collect());
    values.extend(renewals.iter().map(|r| r.to_sheet_row()));

    let updated_cells = sheets.write_values(spreadsheet_id, range, values).await?;

    tracing::info!(
        "Exported {} renewals to spreadsheet {} ({} cells)",
        renewals.len(),
        spreadsheet_id,
        updated_cells
    );

    Ok(ExportSummary {
        message: format!("Successfully exported {} renewals", renewals.len()),
        exported_count: renewals.len(),
        updated_cells,
    })
}
