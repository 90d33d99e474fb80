//! Membership renewal model.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// A membership renewal receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Renewal {
    pub id: String,
    pub trade_union_number: String,
    pub renewal_date: NaiveDate,
    pub receipt_number: String,
    pub coordinator_name: String,
    pub amount: Option<f64>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Renewal {
    /// Export row: trade union number, renewal date, receipt number, coordinator.
    pub fn to_sheet_row(&self) -> Vec<String> {
        vec![
            self.trade_union_number.clone(),
            self.renewal_date.format("%Y-%m-%d").to_string(),
            self.receipt_number.clone(),
            self.coordinator_name.clone(),
        ]
    }
}

/// Header row written above exported renewals.
pub const RENEWAL_SHEET_HEADER: [&str; 4] = [
    "Trade Union Number",
    "Renewal Date",
    "Receipt Number",
    "Coordinator Name",
];

/// Request body for creating a renewal.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRenewalRequest {
    pub trade_union_number: String,
    pub renewal_date: NaiveDate,
    pub receipt_number: String,
    pub coordinator_name: String,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CreateRenewalRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.trade_union_number.trim().is_empty() {
            return Err(AppError::validation(
                "trade_union_number",
                "Trade union number is required",
            ));
        }
        if self.receipt_number.trim().is_empty() {
            return Err(AppError::validation(
                "receipt_number",
                "Receipt number is required",
            ));
        }
        if self.coordinator_name.trim().is_empty() {
            return Err(AppError::validation(
                "coordinator_name",
                "Coordinator name is required",
            ));
        }
        if let Some(amount) = self.amount {
            if !(amount >= 0.0) {
                return Err(AppError::validation("amount", "Amount must not be negative"));
            }
        }
        Ok(())
    }

    pub fn into_renewal(self, now: DateTime<Utc>) -> Renewal {
        Renewal {
            id: uuid::Uuid::new_v4().to_string(),
            trade_union_number: self.trade_union_number.trim().to_string(),
            renewal_date: self.renewal_date,
            receipt_number: self.receipt_number,
            coordinator_name: self.coordinator_name,
            amount: self.amount,
            payment_method: self.payment_method,
            notes: self.notes,
            created_at: now,
            updated_at: now,
        }
    }
}
