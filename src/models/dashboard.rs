//! Dashboard statistics returned by `GET /dashboard/stats`.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Group counts, ordered by descending count.
///
/// Serializes as a JSON object whose key order follows the count order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupCounts(pub Vec<(String, i64)>);

#[cfg(test)]
impl GroupCounts {
    pub fn get(&self, key: &str) -> Option<i64> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, c)| *c)
    }
}

impl Serialize for GroupCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, count) in &self.0 {
            map.serialize_entry(key, count)?;
        }
        map.end()
    }
}

/// Renewal count for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenewalTrend {
    /// `YYYY-MM`
    pub month: String,
    pub count: i64,
}

/// Aggregate statistics over members and renewals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total_members: i64,
    pub active_members: i64,
    pub inactive_members: i64,
    pub renewals_this_month: i64,
    pub renewals_pending: i64,
    pub total_revenue: f64,
    pub avg_monthly_salary: f64,
    pub members_by_state: GroupCounts,
    pub members_by_work_type: GroupCounts,
    pub renewal_trends: Vec<RenewalTrend>,
}
