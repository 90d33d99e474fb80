//! Union member model and the partial draft produced by spreadsheet import.

use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Minimum and maximum accepted member age.
pub const MIN_AGE: i64 = 18;
pub const MAX_AGE: i64 = 100;

/// Renewals fall due twelve calendar months after the last one.
const RENEWAL_PERIOD: Months = Months::new(12);

/// Registration data collected on the membership form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberProfile {
    /// Form submission timestamp as written by the sheet
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub town_name: String,
    pub member_name: String,
    pub trade_union_number: String,
    pub age: i64,
    #[serde(default)]
    pub father_husband_name: String,
    #[serde(default)]
    pub caste: String,
    #[serde(default)]
    pub permanent_address: String,
    #[serde(default)]
    pub temporary_address: Option<String>,
    #[serde(default)]
    pub contact_no: String,
    #[serde(default)]
    pub monthly_salary: f64,
    #[serde(default)]
    pub type_of_work: String,
    #[serde(default)]
    pub housing_situation: String,
    #[serde(default)]
    pub weekly_off: String,
    #[serde(default)]
    pub children_studying: i64,
    #[serde(default)]
    pub children_domestic_work: i64,
    #[serde(default)]
    pub children_other_work: i64,
    #[serde(default)]
    pub any_disability: Option<String>,
    #[serde(default)]
    pub employer_names: String,
    #[serde(default)]
    pub employer_address: String,
    #[serde(default)]
    pub employer_contact: String,
    #[serde(default)]
    pub years_domestic_work: f64,
    #[serde(default)]
    pub hours_work: f64,
    #[serde(default)]
    pub aadhaar_number: String,
    #[serde(default)]
    pub id_proof_upload: Option<String>,
    #[serde(default)]
    pub nominee: String,
    pub date_joining: NaiveDate,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub coordinator_name: String,
    #[serde(default)]
    pub receipt_number: String,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub number_of_houses: i64,
    #[serde(default)]
    pub nominee_contact: String,
    #[serde(default)]
    pub joining_month: String,
}

impl MemberProfile {
    /// Strip surrounding whitespace from the name and the trade union number.
    pub fn trim_identity(&mut self) {
        for field in [&mut self.member_name, &mut self.trade_union_number] {
            *field = field.trim().to_string();
        }
    }

    /// Check field constraints, reporting the first violated field.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.member_name.trim().is_empty() {
            return Err(AppError::validation("member_name", "Member name is required"));
        }
        if self.trade_union_number.trim().is_empty() {
            return Err(AppError::validation(
                "trade_union_number",
                "Trade union number is required",
            ));
        }
        if !(MIN_AGE..=MAX_AGE).contains(&self.age) {
            return Err(AppError::validation(
                "age",
                format!("Age must be between {MIN_AGE} and {MAX_AGE}, got {}", self.age),
            ));
        }
        if !(self.monthly_salary >= 0.0) {
            return Err(AppError::validation(
                "monthly_salary",
                "Monthly salary must not be negative",
            ));
        }
        if !(self.years_domestic_work >= 0.0) {
            return Err(AppError::validation(
                "years_domestic_work",
                "Years in domestic work must not be negative",
            ));
        }
        if !(0.0..=24.0).contains(&self.hours_work) {
            return Err(AppError::validation(
                "hours_work",
                "Hours of work must be between 0 and 24",
            ));
        }
        for (field, value) in [
            ("children_studying", self.children_studying),
            ("children_domestic_work", self.children_domestic_work),
            ("children_other_work", self.children_other_work),
            ("number_of_houses", self.number_of_houses),
        ] {
            if value < 0 {
                return Err(AppError::validation(
                    field,
                    format!("{field} must not be negative"),
                ));
            }
        }
        Ok(())
    }
}

/// A stored union member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    #[serde(flatten)]
    pub profile: MemberProfile,
    pub is_active: bool,
    pub last_renewal: Option<NaiveDate>,
    pub next_renewal_due: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Member {
    /// Build a new active member from a validated profile.
    pub fn new(profile: MemberProfile, now: DateTime<Utc>) -> Self {
        let next_renewal_due = next_renewal_due(None, profile.date_joining);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            profile,
            is_active: true,
            last_renewal: None,
            next_renewal_due,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Next renewal date: a year after the last renewal, or after joining when never renewed.
pub fn next_renewal_due(
    last_renewal: Option<NaiveDate>,
    date_joining: NaiveDate,
) -> Option<NaiveDate> {
    last_renewal
        .unwrap_or(date_joining)
        .checked_add_months(RENEWAL_PERIOD)
}

/// Request body for `PUT /members/{id}`: a full replacement of the member record.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplaceMemberRequest {
    #[serde(flatten)]
    pub profile: MemberProfile,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub last_renewal: Option<NaiveDate>,
}

fn default_active() -> bool {
    true
}

/// Partially-typed member fields mapped from one spreadsheet row.
///
/// `None` means the column was not present in the sheet (or the row was too
/// short to reach it), so an upsert leaves the stored value untouched. An
/// empty or unparseable join date is also `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemberDraft {
    pub timestamp: Option<String>,
    pub town_name: Option<String>,
    pub member_name: Option<String>,
    pub trade_union_number: Option<String>,
    pub age: Option<i64>,
    pub father_husband_name: Option<String>,
    pub caste: Option<String>,
    pub permanent_address: Option<String>,
    pub temporary_address: Option<Option<String>>,
    pub contact_no: Option<String>,
    pub monthly_salary: Option<f64>,
    pub type_of_work: Option<String>,
    pub housing_situation: Option<String>,
    pub weekly_off: Option<String>,
    pub children_studying: Option<i64>,
    pub children_domestic_work: Option<i64>,
    pub children_other_work: Option<i64>,
    pub any_disability: Option<Option<String>>,
    pub employer_names: Option<String>,
    pub employer_address: Option<String>,
    pub employer_contact: Option<String>,
    pub years_domestic_work: Option<f64>,
    pub hours_work: Option<f64>,
    pub aadhaar_number: Option<String>,
    pub id_proof_upload: Option<Option<String>>,
    pub nominee: Option<String>,
    pub date_joining: Option<NaiveDate>,
    pub state: Option<String>,
    pub coordinator_name: Option<String>,
    pub receipt_number: Option<String>,
    pub photo: Option<Option<String>>,
    pub number_of_houses: Option<i64>,
    pub nominee_contact: Option<String>,
    pub joining_month: Option<String>,
}

impl MemberDraft {
    /// The business key, when present and non-empty.
    pub fn trade_union_number(&self) -> Option<&str> {
        self.trade_union_number.as_deref().filter(|s| !s.is_empty())
    }

    /// Whether the row carries the fields a member cannot exist without.
    pub fn has_identity(&self) -> bool {
        self.member_name.as_deref().is_some_and(|s| !s.is_empty())
            && self.trade_union_number().is_some()
    }

    /// Materialize a full profile, filling absent fields with their defaults.
    pub fn to_profile(&self, today: NaiveDate) -> MemberProfile {
        let mut profile = MemberProfile {
            timestamp: None,
            town_name: String::new(),
            member_name: String::new(),
            trade_union_number: String::new(),
            age: 0,
            father_husband_name: String::new(),
            caste: String::new(),
            permanent_address: String::new(),
            temporary_address: None,
            contact_no: String::new(),
            monthly_salary: 0.0,
            type_of_work: String::new(),
            housing_situation: String::new(),
            weekly_off: String::new(),
            children_studying: 0,
            children_domestic_work: 0,
            children_other_work: 0,
            any_disability: None,
            employer_names: String::new(),
            employer_address: String::new(),
            employer_contact: String::new(),
            years_domestic_work: 0.0,
            hours_work: 0.0,
            aadhaar_number: String::new(),
            id_proof_upload: None,
            nominee: String::new(),
            date_joining: today,
            state: String::new(),
            coordinator_name: String::new(),
            receipt_number: String::new(),
            photo: None,
            number_of_houses: 0,
            nominee_contact: String::new(),
            joining_month: String::new(),
        };
        self.merge_into(&mut profile);
        profile
    }

    /// Overwrite every field of `profile` that this draft carries.
    pub fn merge_into(&self, profile: &mut MemberProfile) {
        macro_rules! merge {
            ($draft:ident => $profile:ident; $($field:ident),* $(,)?) => {
                $(
                    if let Some(value) = &$draft.$field {
                        $profile.$field = value.clone();
                    }
                )*
            };
        }

        let draft = self;
        if let Some(timestamp) = &draft.timestamp {
            profile.timestamp = Some(timestamp.clone());
        }
        merge!(
            draft => profile;
            town_name,
            member_name,
            trade_union_number,
            age,
            father_husband_name,
            caste,
            permanent_address,
            temporary_address,
            contact_no,
            monthly_salary,
            type_of_work,
            housing_situation,
            weekly_off,
            children_studying,
            children_domestic_work,
            children_other_work,
            any_disability,
            employer_names,
            employer_address,
            employer_contact,
            years_domestic_work,
            hours_work,
            aadhaar_number,
            id_proof_upload,
            nominee,
            date_joining,
            state,
            coordinator_name,
            receipt_number,
            photo,
            number_of_houses,
            nominee_contact,
            joining_month,
        );
    }
}
