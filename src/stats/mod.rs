//! Dashboard aggregation over members and renewals.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc};

use crate::db::{MemberGroup, Repository};
use crate::errors::AppError;
use crate::models::{DashboardStats, RenewalTrend};

/// Most groups reported per breakdown.
pub const GROUP_LIMIT: i64 = 20;

/// Number of months in the renewal trend, current month included.
pub const TREND_MONTHS: u32 = 6;

/// A member is pending when not renewed within this many days.
const PENDING_WINDOW: Days = Days::new(365);

/// Compute the dashboard as of `now`.
pub async fn compute_dashboard(
    repo: &Repository,
    now: DateTime<Utc>,
) -> Result<DashboardStats, AppError> {
    let today = now.date_naive();

    let active_members = repo.count_members(Some(true)).await?;
    let inactive_members = repo.count_members(Some(false)).await?;

    let this_month = month_start(today);
    let renewals_this_month = repo
        .count_renewals_between(this_month, next_month_start(this_month))
        .await?;

    let cutoff = today.checked_sub_days(PENDING_WINDOW).unwrap_or(NaiveDate::MIN);
    let renewals_pending = repo.count_pending_renewals(cutoff).await?;

    let total_revenue = repo.total_revenue().await?;
    let avg_monthly_salary = repo.average_positive_salary().await?;

    let members_by_state = repo.member_counts_by(MemberGroup::State, GROUP_LIMIT).await?;
    let members_by_work_type = repo
        .member_counts_by(MemberGroup::TypeOfWork, GROUP_LIMIT)
        .await?;

    let mut renewal_trends = Vec::with_capacity(TREND_MONTHS as usize);
    for start in trailing_month_starts(today, TREND_MONTHS) {
        let count = repo
            .count_renewals_between(start, next_month_start(start))
            .await?;
        renewal_trends.push(RenewalTrend {
            month: start.format("%Y-%m").to_string(),
            count,
        });
    }

    Ok(DashboardStats {
        total_members: active_members + inactive_members,
        active_members,
        inactive_members,
        renewals_this_month,
        renewals_pending,
        total_revenue,
        avg_monthly_salary,
        members_by_state,
        members_by_work_type,
        renewal_trends,
    })
}

/// First day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn next_month_start(start: NaiveDate) -> NaiveDate {
    start.checked_add_months(Months::new(1)).unwrap_or(NaiveDate::MAX)
}

/// First days of the `count` months ending with the month of `today`, oldest first.
pub fn trailing_month_starts(today: NaiveDate, count: u32) -> Vec<NaiveDate> {
    let current = month_start(today);
    (0..count)
        .rev()
        .filter_map(|back| current.checked_sub_months(Months::new(back)))
        .collect()
}
