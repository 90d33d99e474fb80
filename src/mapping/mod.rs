//! Spreadsheet row to member field mapping.
//!
//! The membership form's column headers form a closed set. Each header maps to
//! exactly one member field and each field has one coercion class; both are
//! exhaustive matches, so adding a header or field without wiring it up fails
//! to compile.

use chrono::NaiveDate;

use crate::models::MemberDraft;

/// Column headers written by the membership registration form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetHeader {
    Timestamp,
    TownName,
    MemberName,
    TradeUnionNumber,
    Age,
    FatherHusbandName,
    Caste,
    PermanentAddress,
    TemporaryAddress,
    ContactNo,
    MonthlySalary,
    TypeOfWork,
    HousingSituation,
    WeeklyOff,
    ChildrenStudying,
    ChildrenDomesticWork,
    ChildrenOtherWork,
    AnyDisability,
    EmployerNames,
    EmployerAddress,
    EmployerContact,
    YearsDomesticWork,
    HoursWork,
    AadhaarNumber,
    IdProofUpload,
    Nominee,
    DateJoining,
    State,
    CoordinatorName,
    ReceiptNumber,
    Photo,
    NumberOfHouses,
    NomineeContact,
    JoiningMonth,
}

impl SheetHeader {
    pub const ALL: [SheetHeader; 34] = [
        SheetHeader::Timestamp,
        SheetHeader::TownName,
        SheetHeader::MemberName,
        SheetHeader::TradeUnionNumber,
        SheetHeader::Age,
        SheetHeader::FatherHusbandName,
        SheetHeader::Caste,
        SheetHeader::PermanentAddress,
        SheetHeader::TemporaryAddress,
        SheetHeader::ContactNo,
        SheetHeader::MonthlySalary,
        SheetHeader::TypeOfWork,
        SheetHeader::HousingSituation,
        SheetHeader::WeeklyOff,
        SheetHeader::ChildrenStudying,
        SheetHeader::ChildrenDomesticWork,
        SheetHeader::ChildrenOtherWork,
        SheetHeader::AnyDisability,
        SheetHeader::EmployerNames,
        SheetHeader::EmployerAddress,
        SheetHeader::EmployerContact,
        SheetHeader::YearsDomesticWork,
        SheetHeader::HoursWork,
        SheetHeader::AadhaarNumber,
        SheetHeader::IdProofUpload,
        SheetHeader::Nominee,
        SheetHeader::DateJoining,
        SheetHeader::State,
        SheetHeader::CoordinatorName,
        SheetHeader::ReceiptNumber,
        SheetHeader::Photo,
        SheetHeader::NumberOfHouses,
        SheetHeader::NomineeContact,
        SheetHeader::JoiningMonth,
    ];

    /// The header text as it appears in the sheet.
    pub fn label(self) -> &'static str {
        match self {
            SheetHeader::Timestamp => "Timestamp",
            SheetHeader::TownName => "Name of the town",
            SheetHeader::MemberName => "Name of the Member",
            SheetHeader::TradeUnionNumber => "Trade Union Number",
            SheetHeader::Age => "Age",
            SheetHeader::FatherHusbandName => "Father / Husband Name",
            SheetHeader::Caste => "Caste",
            SheetHeader::PermanentAddress => "Permanent Address",
            SheetHeader::TemporaryAddress => "Temporary Address",
            SheetHeader::ContactNo => "Contact No.",
            SheetHeader::MonthlySalary => "Monthly Salary",
            SheetHeader::TypeOfWork => "Type of Work",
            SheetHeader::HousingSituation => "What is your current housing situation?",
            SheetHeader::WeeklyOff => "Weekly Off",
            SheetHeader::ChildrenStudying => "Number of Children studying",
            SheetHeader::ChildrenDomesticWork => "Number of Children Working Domestic Work",
            SheetHeader::ChildrenOtherWork => "Number of Children Working other than Domestic Work",
            SheetHeader::AnyDisability => "Any Disability",
            SheetHeader::EmployerNames => "Names of Employers",
            SheetHeader::EmployerAddress => "Address of Employers",
            SheetHeader::EmployerContact => "Contact Numbers of Employers",
            SheetHeader::YearsDomesticWork => "Number of Years in Domestic Work",
            SheetHeader::HoursWork => "Number of Hours Work",
            SheetHeader::AadhaarNumber => "ID Proof Aadhaar Number",
            SheetHeader::IdProofUpload => "Upload Self attested ID Proof (with signature)",
            SheetHeader::Nominee => "Nominee",
            SheetHeader::DateJoining => "Date of Joining the Trade Union",
            SheetHeader::State => "State",
            SheetHeader::CoordinatorName => "Name of Coordinator",
            SheetHeader::ReceiptNumber => "Receipt Number",
            SheetHeader::Photo => "Photo",
            SheetHeader::NumberOfHouses => "Number of Houses",
            SheetHeader::NomineeContact => "Nominee contact number",
            SheetHeader::JoiningMonth => "Joining Month",
        }
    }

    /// Recognise a header cell. Unknown headers return `None` and are ignored.
    pub fn parse(cell: &str) -> Option<Self> {
        let cell = cell.trim();
        Self::ALL.into_iter().find(|h| h.label() == cell)
    }

    /// The member field this column fills.
    pub fn field(self) -> MemberField {
        match self {
            SheetHeader::Timestamp => MemberField::Timestamp,
            SheetHeader::TownName => MemberField::TownName,
            SheetHeader::MemberName => MemberField::MemberName,
            SheetHeader::TradeUnionNumber => MemberField::TradeUnionNumber,
            SheetHeader::Age => MemberField::Age,
            SheetHeader::FatherHusbandName => MemberField::FatherHusbandName,
            SheetHeader::Caste => MemberField::Caste,
            SheetHeader::PermanentAddress => MemberField::PermanentAddress,
            SheetHeader::TemporaryAddress => MemberField::TemporaryAddress,
            SheetHeader::ContactNo => MemberField::ContactNo,
            SheetHeader::MonthlySalary => MemberField::MonthlySalary,
            SheetHeader::TypeOfWork => MemberField::TypeOfWork,
            SheetHeader::HousingSituation => MemberField::HousingSituation,
            SheetHeader::WeeklyOff => MemberField::WeeklyOff,
            SheetHeader::ChildrenStudying => MemberField::ChildrenStudying,
            SheetHeader::ChildrenDomesticWork => MemberField::ChildrenDomesticWork,
            SheetHeader::ChildrenOtherWork => MemberField::ChildrenOtherWork,
            SheetHeader::AnyDisability => MemberField::AnyDisability,
            SheetHeader::EmployerNames => MemberField::EmployerNames,
            SheetHeader::EmployerAddress => MemberField::EmployerAddress,
            SheetHeader::EmployerContact => MemberField::EmployerContact,
            SheetHeader::YearsDomesticWork => MemberField::YearsDomesticWork,
            SheetHeader::HoursWork => MemberField::HoursWork,
            SheetHeader::AadhaarNumber => MemberField::AadhaarNumber,
            SheetHeader::IdProofUpload => MemberField::IdProofUpload,
            SheetHeader::Nominee => MemberField::Nominee,
            SheetHeader::DateJoining => MemberField::DateJoining,
            SheetHeader::State => MemberField::State,
            SheetHeader::CoordinatorName => MemberField::CoordinatorName,
            SheetHeader::ReceiptNumber => MemberField::ReceiptNumber,
            SheetHeader::Photo => MemberField::Photo,
            SheetHeader::NumberOfHouses => MemberField::NumberOfHouses,
            SheetHeader::NomineeContact => MemberField::NomineeContact,
            SheetHeader::JoiningMonth => MemberField::JoiningMonth,
        }
    }
}

/// Member fields that can be filled from a sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberField {
    Timestamp,
    TownName,
    MemberName,
    TradeUnionNumber,
    Age,
    FatherHusbandName,
    Caste,
    PermanentAddress,
    TemporaryAddress,
    ContactNo,
    MonthlySalary,
    TypeOfWork,
    HousingSituation,
    WeeklyOff,
    ChildrenStudying,
    ChildrenDomesticWork,
    ChildrenOtherWork,
    AnyDisability,
    EmployerNames,
    EmployerAddress,
    EmployerContact,
    YearsDomesticWork,
    HoursWork,
    AadhaarNumber,
    IdProofUpload,
    Nominee,
    DateJoining,
    State,
    CoordinatorName,
    ReceiptNumber,
    Photo,
    NumberOfHouses,
    NomineeContact,
    JoiningMonth,
}

/// How a raw cell is coerced for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Whole number, 0 on empty or unparseable
    Integer,
    /// Floating point, 0.0 on empty or unparseable
    Decimal,
    /// Strict `YYYY-MM-DD`
    Date,
    /// Trimmed string
    Text,
    /// Trimmed string, absent when empty
    OptionalText,
}

impl MemberField {
    pub fn kind(self) -> FieldKind {
        match self {
            MemberField::Age
            | MemberField::ChildrenStudying
            | MemberField::ChildrenDomesticWork
            | MemberField::ChildrenOtherWork
            | MemberField::NumberOfHouses => FieldKind::Integer,
            MemberField::MonthlySalary
            | MemberField::YearsDomesticWork
            | MemberField::HoursWork => FieldKind::Decimal,
            MemberField::DateJoining => FieldKind::Date,
            MemberField::TemporaryAddress
            | MemberField::AnyDisability
            | MemberField::IdProofUpload
            | MemberField::Photo => FieldKind::OptionalText,
            MemberField::Timestamp
            | MemberField::TownName
            | MemberField::MemberName
            | MemberField::TradeUnionNumber
            | MemberField::FatherHusbandName
            | MemberField::Caste
            | MemberField::PermanentAddress
            | MemberField::ContactNo
            | MemberField::TypeOfWork
            | MemberField::HousingSituation
            | MemberField::WeeklyOff
            | MemberField::EmployerNames
            | MemberField::EmployerAddress
            | MemberField::EmployerContact
            | MemberField::AadhaarNumber
            | MemberField::Nominee
            | MemberField::State
            | MemberField::CoordinatorName
            | MemberField::ReceiptNumber
            | MemberField::NomineeContact
            | MemberField::JoiningMonth => FieldKind::Text,
        }
    }

    /// Store a coerced value in the draft. The value's variant matches `self.kind()`.
    fn assign(self, draft: &mut MemberDraft, value: CellValue) {
        match self {
            MemberField::Timestamp => draft.timestamp = value.text(),
            MemberField::TownName => draft.town_name = value.text(),
            MemberField::MemberName => draft.member_name = value.text(),
            MemberField::TradeUnionNumber => draft.trade_union_number = value.text(),
            MemberField::Age => draft.age = value.integer(),
            MemberField::FatherHusbandName => draft.father_husband_name = value.text(),
            MemberField::Caste => draft.caste = value.text(),
            MemberField::PermanentAddress => draft.permanent_address = value.text(),
            MemberField::TemporaryAddress => draft.temporary_address = value.optional_text(),
            MemberField::ContactNo => draft.contact_no = value.text(),
            MemberField::MonthlySalary => draft.monthly_salary = value.decimal(),
            MemberField::TypeOfWork => draft.type_of_work = value.text(),
            MemberField::HousingSituation => draft.housing_situation = value.text(),
            MemberField::WeeklyOff => draft.weekly_off = value.text(),
            MemberField::ChildrenStudying => draft.children_studying = value.integer(),
            MemberField::ChildrenDomesticWork => draft.children_domestic_work = value.integer(),
            MemberField::ChildrenOtherWork => draft.children_other_work = value.integer(),
            MemberField::AnyDisability => draft.any_disability = value.optional_text(),
            MemberField::EmployerNames => draft.employer_names = value.text(),
            MemberField::EmployerAddress => draft.employer_address = value.text(),
            MemberField::EmployerContact => draft.employer_contact = value.text(),
            MemberField::YearsDomesticWork => draft.years_domestic_work = value.decimal(),
            MemberField::HoursWork => draft.hours_work = value.decimal(),
            MemberField::AadhaarNumber => draft.aadhaar_number = value.text(),
            MemberField::IdProofUpload => draft.id_proof_upload = value.optional_text(),
            MemberField::Nominee => draft.nominee = value.text(),
            MemberField::DateJoining => draft.date_joining = value.date(),
            MemberField::State => draft.state = value.text(),
            MemberField::CoordinatorName => draft.coordinator_name = value.text(),
            MemberField::ReceiptNumber => draft.receipt_number = value.text(),
            MemberField::Photo => draft.photo = value.optional_text(),
            MemberField::NumberOfHouses => draft.number_of_houses = value.integer(),
            MemberField::NomineeContact => draft.nominee_contact = value.text(),
            MemberField::JoiningMonth => draft.joining_month = value.text(),
        }
    }
}

/// A cell after coercion.
#[derive(Debug, Clone, PartialEq)]
enum CellValue {
    Integer(i64),
    Decimal(f64),
    /// `None` when the cell was empty or unparseable
    Date(Option<NaiveDate>),
    Text(String),
    OptionalText(Option<String>),
}

impl CellValue {
    fn integer(self) -> Option<i64> {
        match self {
            CellValue::Integer(v) => Some(v),
            _ => None,
        }
    }

    fn decimal(self) -> Option<f64> {
        match self {
            CellValue::Decimal(v) => Some(v),
            _ => None,
        }
    }

    fn date(self) -> Option<NaiveDate> {
        match self {
            CellValue::Date(v) => v,
            _ => None,
        }
    }

    fn text(self) -> Option<String> {
        match self {
            CellValue::Text(v) => Some(v),
            _ => None,
        }
    }

    fn optional_text(self) -> Option<Option<String>> {
        match self {
            CellValue::OptionalText(v) => Some(v),
            _ => None,
        }
    }
}

/// What to do with a join date that is present but not `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinDatePolicy {
    /// Substitute the import date
    #[default]
    DefaultToToday,
    /// Drop the row
    RejectRow,
}

/// Why a data row was not turned into a draft.
#[derive(Debug, Clone, PartialEq)]
pub enum RowRejection {
    /// Member name or trade union number is empty
    MissingIdentity,
    /// Join date could not be parsed under `JoinDatePolicy::RejectRow`
    InvalidJoinDate(String),
}

/// Drafts built from a sheet plus the rows that were dropped.
#[derive(Debug, Clone, Default)]
pub struct MappingOutcome {
    pub drafts: Vec<MemberDraft>,
    /// 1-based sheet row number (header is row 1) and the reason
    pub rejected: Vec<(usize, RowRejection)>,
}

/// Map a sheet's rows (header row first) into member drafts.
pub fn map_rows(rows: &[Vec<String>], today: NaiveDate, policy: JoinDatePolicy) -> MappingOutcome {
    let mut outcome = MappingOutcome::default();

    let Some((header_row, data_rows)) = rows.split_first() else {
        return outcome;
    };

    // Later duplicates of a header win.
    let mut columns: Vec<(MemberField, usize)> = Vec::new();
    for (index, cell) in header_row.iter().enumerate() {
        if let Some(header) = SheetHeader::parse(cell) {
            let field = header.field();
            columns.retain(|(f, _)| *f != field);
            columns.push((field, index));
        }
    }

    for (offset, row) in data_rows.iter().enumerate() {
        let sheet_row = offset + 2;
        match map_row(row, &columns, today, policy) {
            Ok(draft) if draft.has_identity() => outcome.drafts.push(draft),
            Ok(_) => outcome.rejected.push((sheet_row, RowRejection::MissingIdentity)),
            Err(rejection) => outcome.rejected.push((sheet_row, rejection)),
        }
    }

    outcome
}

fn map_row(
    row: &[String],
    columns: &[(MemberField, usize)],
    today: NaiveDate,
    policy: JoinDatePolicy,
) -> Result<MemberDraft, RowRejection> {
    let mut draft = MemberDraft::default();

    for &(field, index) in columns {
        let Some(raw) = row.get(index) else {
            continue;
        };
        let value = coerce(field.kind(), raw.trim(), today, policy)?;
        field.assign(&mut draft, value);
    }

    Ok(draft)
}

fn coerce(
    kind: FieldKind,
    value: &str,
    today: NaiveDate,
    policy: JoinDatePolicy,
) -> Result<CellValue, RowRejection> {
    Ok(match kind {
        FieldKind::Integer => CellValue::Integer(value.parse().unwrap_or(0)),
        FieldKind::Decimal => CellValue::Decimal(
            value
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .unwrap_or(0.0),
        ),
        // A missing date stays absent so a merge keeps the stored one; new
        // members get the import date from `MemberDraft::to_profile`.
        FieldKind::Date => {
            if value.is_empty() {
                CellValue::Date(None)
            } else {
                match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
                    Ok(date) => CellValue::Date(Some(date)),
                    Err(_) if policy == JoinDatePolicy::RejectRow => {
                        return Err(RowRejection::InvalidJoinDate(value.to_string()));
                    }
                    Err(_) => {
                        tracing::warn!(
                            "Unparseable join date {:?}, new members join on {}",
                            value,
                            today
                        );
                        CellValue::Date(None)
                    }
                }
            }
        }
        FieldKind::Text => CellValue::Text(value.to_string()),
        FieldKind::OptionalText => {
            CellValue::OptionalText(Some(value.to_string()).filter(|s| !s.is_empty()))
        }
    })
}
