//! Database repository for members and renewals.
//!
//! Uses prepared statements and transactions for data integrity.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::errors::AppError;
use crate::models::{
    next_renewal_due, GroupCounts, Member, MemberProfile, ReplaceMemberRequest, Renewal,
};

/// Column list shared by every member statement, in bind order.
macro_rules! member_columns {
    () => {
        "id, timestamp, town_name, member_name, trade_union_number, age, \
         father_husband_name, caste, permanent_address, temporary_address, contact_no, \
         monthly_salary, type_of_work, housing_situation, weekly_off, children_studying, \
         children_domestic_work, children_other_work, any_disability, employer_names, \
         employer_address, employer_contact, years_domestic_work, hours_work, aadhaar_number, \
         id_proof_upload, nominee, date_joining, state, coordinator_name, receipt_number, \
         photo, number_of_houses, nominee_contact, joining_month, search_text, is_active, \
         last_renewal, next_renewal_due, created_at, updated_at"
    };
}

const SELECT_MEMBERS: &str = concat!("SELECT ", member_columns!(), " FROM members");

const INSERT_MEMBER: &str = concat!(
    "INSERT INTO members (",
    member_columns!(),
    ") VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, \
     ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
);

const UPDATE_MEMBER: &str = r#"UPDATE members SET
    timestamp = ?, town_name = ?, member_name = ?, trade_union_number = ?, age = ?,
    father_husband_name = ?, caste = ?, permanent_address = ?, temporary_address = ?,
    contact_no = ?, monthly_salary = ?, type_of_work = ?, housing_situation = ?,
    weekly_off = ?, children_studying = ?, children_domestic_work = ?,
    children_other_work = ?, any_disability = ?, employer_names = ?, employer_address = ?,
    employer_contact = ?, years_domestic_work = ?, hours_work = ?, aadhaar_number = ?,
    id_proof_upload = ?, nominee = ?, date_joining = ?, state = ?, coordinator_name = ?,
    receipt_number = ?, photo = ?, number_of_houses = ?, nominee_contact = ?,
    joining_month = ?, search_text = ?, is_active = ?, last_renewal = ?,
    next_renewal_due = ?, updated_at = ?
WHERE id = ?"#;

const SELECT_RENEWALS: &str = "SELECT id, trade_union_number, renewal_date, receipt_number, \
     coordinator_name, amount, payment_method, notes, created_at, updated_at FROM renewals";

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// Filters for `GET /members`.
#[derive(Debug, Clone)]
pub struct MemberFilter {
    pub skip: i64,
    pub limit: i64,
    pub search: Option<String>,
    pub state: Option<String>,
    pub active_only: bool,
}

/// Filters for `GET /renewals`.
#[derive(Debug, Clone)]
pub struct RenewalFilter {
    pub skip: i64,
    pub limit: i64,
    pub trade_union_number: Option<String>,
    pub coordinator: Option<String>,
}

/// Member attribute the dashboard groups by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberGroup {
    State,
    TypeOfWork,
}

impl MemberGroup {
    fn column(self) -> &'static str {
        match self {
            MemberGroup::State => "state",
            MemberGroup::TypeOfWork => "type_of_work",
        }
    }
}

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== MEMBER OPERATIONS ====================

    /// List members matching a filter, ordered by name.
    pub async fn list_members(&self, filter: &MemberFilter) -> Result<Vec<Member>, AppError> {
        let mut query = QueryBuilder::<Sqlite>::new(SELECT_MEMBERS);
        query.push(" WHERE 1 = 1");

        if filter.active_only {
            query.push(" AND is_active = ").push_bind(true);
        }
        if let Some(state) = filter.state.as_deref().filter(|s| !s.is_empty()) {
            query.push(" AND state = ").push_bind(state.to_string());
        }
        // SQLite's LIKE only folds ASCII, so match against the pre-folded column.
        if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", escape_like(&search.to_lowercase()));
            query
                .push(" AND search_text LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\'");
        }

        query
            .push(" ORDER BY member_name COLLATE NOCASE, trade_union_number LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.skip);

        let rows = query.build().fetch_all(&self.pool).await?;
        Ok(rows
            .iter()
            .map(member_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    /// Get a member by ID.
    pub async fn get_member(&self, id: &str) -> Result<Option<Member>, AppError> {
        let row = sqlx::query(concat!("SELECT ", member_columns!(), " FROM members WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(member_from_row).transpose()?)
    }

    /// Get a member by its trade union number.
    pub async fn find_member_by_union_number(
        &self,
        trade_union_number: &str,
    ) -> Result<Option<Member>, AppError> {
        let row = sqlx::query(concat!(
            "SELECT ",
            member_columns!(),
            " FROM members WHERE trade_union_number = ?"
        ))
        .bind(trade_union_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(member_from_row).transpose()?)
    }

    /// Insert a new member.
    pub async fn insert_member(&self, member: &Member) -> Result<(), AppError> {
        let query = sqlx::query(INSERT_MEMBER).bind(&member.id);
        bind_profile(query, &member.profile)
            .bind(member.is_active)
            .bind(member.last_renewal)
            .bind(member.next_renewal_due)
            .bind(member.created_at)
            .bind(member.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Write every mutable column of a member. Returns false when the row is gone.
    pub async fn update_member(&self, member: &Member) -> Result<bool, AppError> {
        let result = bind_profile(sqlx::query(UPDATE_MEMBER), &member.profile)
            .bind(member.is_active)
            .bind(member.last_renewal)
            .bind(member.next_renewal_due)
            .bind(member.updated_at)
            .bind(&member.id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Replace a member's record.
    ///
    /// `last_renewal` is kept when the request leaves it out, since renewals
    /// own that field.
    pub async fn replace_member(
        &self,
        id: &str,
        mut request: ReplaceMemberRequest,
        now: DateTime<Utc>,
    ) -> Result<Member, AppError> {
        request.profile.trim_identity();
        request.profile.validate()?;

        let existing = self
            .get_member(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;

        let last_renewal = request.last_renewal.or(existing.last_renewal);
        let member = Member {
            id: existing.id,
            next_renewal_due: next_renewal_due(last_renewal, request.profile.date_joining),
            profile: request.profile,
            is_active: request.is_active,
            last_renewal,
            created_at: existing.created_at,
            updated_at: now,
        };

        if !self.update_member(&member).await? {
            return Err(AppError::NotFound("Member not found".to_string()));
        }
        Ok(member)
    }

    // ==================== RENEWAL OPERATIONS ====================

    /// Record a renewal and touch the renewed member, atomically.
    ///
    /// Fails with `NotFound` and writes nothing when no member carries the
    /// renewal's trade union number.
    pub async fn create_renewal(&self, renewal: &Renewal) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT id, date_joining FROM members WHERE trade_union_number = ?")
            .bind(&renewal.trade_union_number)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            return Err(AppError::NotFound(
                "Member not found with this trade union number".to_string(),
            ));
        };
        let member_id: String = row.try_get("id")?;
        let date_joining: NaiveDate = row.try_get("date_joining")?;

        sqlx::query(
            r#"INSERT INTO renewals (id, trade_union_number, renewal_date, receipt_number,
                   coordinator_name, amount, payment_method, notes, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&renewal.id)
        .bind(&renewal.trade_union_number)
        .bind(renewal.renewal_date)
        .bind(&renewal.receipt_number)
        .bind(&renewal.coordinator_name)
        .bind(renewal.amount)
        .bind(&renewal.payment_method)
        .bind(&renewal.notes)
        .bind(renewal.created_at)
        .bind(renewal.updated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE members SET last_renewal = ?, next_renewal_due = ?, updated_at = ? WHERE id = ?",
        )
        .bind(renewal.renewal_date)
        .bind(next_renewal_due(Some(renewal.renewal_date), date_joining))
        .bind(renewal.created_at)
        .bind(&member_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// List renewals matching a filter, newest renewal date first.
    pub async fn list_renewals(&self, filter: &RenewalFilter) -> Result<Vec<Renewal>, AppError> {
        let mut query = QueryBuilder::<Sqlite>::new(SELECT_RENEWALS);
        query.push(" WHERE 1 = 1");

        if let Some(number) = filter.trade_union_number.as_deref().filter(|s| !s.is_empty()) {
            query.push(" AND trade_union_number = ").push_bind(number.to_string());
        }
        if let Some(coordinator) = filter.coordinator.as_deref().filter(|s| !s.is_empty()) {
            query
                .push(" AND coordinator_name LIKE ")
                .push_bind(format!("%{}%", escape_like(coordinator)))
                .push(" ESCAPE '\\'");
        }

        query
            .push(" ORDER BY renewal_date DESC, created_at DESC LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.skip);

        let rows = query.build().fetch_all(&self.pool).await?;
        Ok(rows
            .iter()
            .map(renewal_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    /// Renewals in creation order, for export.
    pub async fn renewals_in_creation_order(&self, limit: i64) -> Result<Vec<Renewal>, AppError> {
        let rows = sqlx::query(concat!(
            "SELECT id, trade_union_number, renewal_date, receipt_number, coordinator_name, ",
            "amount, payment_method, notes, created_at, updated_at FROM renewals ",
            "ORDER BY rowid LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(renewal_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    // ==================== AGGREGATES ====================

    /// Count members, optionally restricted to one activity state.
    pub async fn count_members(&self, active: Option<bool>) -> Result<i64, AppError> {
        let count = match active {
            Some(active) => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM members WHERE is_active = ?")
                    .bind(active)
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM members")
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        Ok(count)
    }

    /// Active members never renewed, or last renewed before `cutoff`.
    pub async fn count_pending_renewals(&self, cutoff: NaiveDate) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM members \
             WHERE is_active = ? AND (last_renewal IS NULL OR last_renewal < ?)",
        )
        .bind(true)
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Renewals dated in `[start, end)`.
    pub async fn count_renewals_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM renewals WHERE renewal_date >= ? AND renewal_date < ?",
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Sum of recorded renewal amounts; 0.0 when there are none.
    pub async fn total_revenue(&self) -> Result<f64, AppError> {
        let total = sqlx::query_scalar::<_, Option<f64>>(
            "SELECT SUM(amount) FROM renewals WHERE amount IS NOT NULL",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(total.unwrap_or(0.0))
    }

    /// Mean of positive monthly salaries; 0.0 when there are none.
    pub async fn average_positive_salary(&self) -> Result<f64, AppError> {
        let average = sqlx::query_scalar::<_, Option<f64>>(
            "SELECT AVG(monthly_salary) FROM members WHERE monthly_salary > 0",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(average.unwrap_or(0.0))
    }

    /// Member counts per group, largest first, at most `limit` groups.
    pub async fn member_counts_by(
        &self,
        group: MemberGroup,
        limit: i64,
    ) -> Result<GroupCounts, AppError> {
        let column = group.column();
        let sql = format!(
            "SELECT {column} AS name, COUNT(*) AS count FROM members \
             GROUP BY {column} ORDER BY count DESC LIMIT ?"
        );
        let rows = sqlx::query(&sql).bind(limit).fetch_all(&self.pool).await?;

        let counts = rows
            .iter()
            .map(|row| -> Result<(String, i64), sqlx::Error> {
                Ok((row.try_get("name")?, row.try_get("count")?))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(GroupCounts(counts))
    }
}

/// Escape `LIKE` wildcards so user input matches literally.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn bind_profile<'q>(query: SqliteQuery<'q>, profile: &'q MemberProfile) -> SqliteQuery<'q> {
    query
        .bind(&profile.timestamp)
        .bind(&profile.town_name)
        .bind(&profile.member_name)
        .bind(&profile.trade_union_number)
        .bind(profile.age)
        .bind(&profile.father_husband_name)
        .bind(&profile.caste)
        .bind(&profile.permanent_address)
        .bind(&profile.temporary_address)
        .bind(&profile.contact_no)
        .bind(profile.monthly_salary)
        .bind(&profile.type_of_work)
        .bind(&profile.housing_situation)
        .bind(&profile.weekly_off)
        .bind(profile.children_studying)
        .bind(profile.children_domestic_work)
        .bind(profile.children_other_work)
        .bind(&profile.any_disability)
        .bind(&profile.employer_names)
        .bind(&profile.employer_address)
        .bind(&profile.employer_contact)
        .bind(profile.years_domestic_work)
        .bind(profile.hours_work)
        .bind(&profile.aadhaar_number)
        .bind(&profile.id_proof_upload)
        .bind(&profile.nominee)
        .bind(profile.date_joining)
        .bind(&profile.state)
        .bind(&profile.coordinator_name)
        .bind(&profile.receipt_number)
        .bind(&profile.photo)
        .bind(profile.number_of_houses)
        .bind(&profile.nominee_contact)
        .bind(&profile.joining_month)
        .bind(search_text(profile))
}

/// Lowercased name, number and contact, one per line.
fn search_text(profile: &MemberProfile) -> String {
    format!(
        "{}\n{}\n{}",
        profile.member_name, profile.trade_union_number, profile.contact_no
    )
    .to_lowercase()
}

// Helper functions for row conversion

fn member_from_row(row: &SqliteRow) -> Result<Member, sqlx::Error> {
    Ok(Member {
        id: row.try_get("id")?,
        profile: MemberProfile {
            timestamp: row.try_get("timestamp")?,
            town_name: row.try_get("town_name")?,
            member_name: row.try_get("member_name")?,
            trade_union_number: row.try_get("trade_union_number")?,
            age: row.try_get("age")?,
            father_husband_name: row.try_get("father_husband_name")?,
            caste: row.try_get("caste")?,
            permanent_address: row.try_get("permanent_address")?,
            temporary_address: row.try_get("temporary_address")?,
            contact_no: row.try_get("contact_no")?,
            monthly_salary: row.try_get("monthly_salary")?,
            type_of_work: row.try_get("type_of_work")?,
            housing_situation: row.try_get("housing_situation")?,
            weekly_off: row.try_get("weekly_off")?,
            children_studying: row.try_get("children_studying")?,
            children_domestic_work: row.try_get("children_domestic_work")?,
            children_other_work: row.try_get("children_other_work")?,
            any_disability: row.try_get("any_disability")?,
            employer_names: row.try_get("employer_names")?,
            employer_address: row.try_get("employer_address")?,
            employer_contact: row.try_get("employer_contact")?,
            years_domestic_work: row.try_get("years_domestic_work")?,
            hours_work: row.try_get("hours_work")?,
            aadhaar_number: row.try_get("aadhaar_number")?,
            id_proof_upload: row.try_get("id_proof_upload")?,
            nominee: row.try_get("nominee")?,
            date_joining: row.try_get("date_joining")?,
            state: row.try_get("state")?,
            coordinator_name: row.try_get("coordinator_name")?,
            receipt_number: row.try_get("receipt_number")?,
            photo: row.try_get("photo")?,
            number_of_houses: row.try_get("number_of_houses")?,
            nominee_contact: row.try_get("nominee_contact")?,
            joining_month: row.try_get("joining_month")?,
        },
        is_active: row.try_get("is_active")?,
        last_renewal: row.try_get("last_renewal")?,
        next_renewal_due: row.try_get("next_renewal_due")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn renewal_from_row(row: &SqliteRow) -> Result<Renewal, sqlx::Error> {
    Ok(Renewal {
        id: row.try_get("id")?,
        trade_union_number: row.try_get("trade_union_number")?,
        renewal_date: row.try_get("renewal_date")?,
        receipt_number: row.try_get("receipt_number")?,
        coordinator_name: row.try_get("coordinator_name")?,
        amount: row.try_get("amount")?,
        payment_method: row.try_get("payment_method")?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
