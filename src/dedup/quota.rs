//! Per-user daily quota accounting
//!
//! Usage is derived from the file records on every call: the sum of
//! `content_length` over a user's records created since local midnight.
//! There is no cached counter to drift out of sync.

use chrono::{DateTime, Local, LocalResult, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use std::sync::Arc;

use super::store::RecordStore;
use super::types::DedupError;

/// Snapshot of a user's quota for the current day
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaStatus {
    pub user_id: String,
    pub used_bytes: i64,
    pub remaining_bytes: i64,
    pub daily_limit_bytes: i64,
}

/// Tracks bytes registered per user against a fixed daily ceiling
#[derive(Clone)]
pub struct QuotaAccountant {
    store: Arc<dyn RecordStore>,
    daily_limit: i64,
}

impl QuotaAccountant {
    pub fn new(store: Arc<dyn RecordStore>, daily_limit: i64) -> Self {
        Self { store, daily_limit }
    }

    pub fn daily_limit(&self) -> i64 {
        self.daily_limit
    }

    /// Bytes registered by `user_id` between local midnight and `now`
    pub async fn usage_at(&self, user_id: &str, now: DateTime<Local>) -> Result<i64, DedupError> {
        let since = start_of_local_day(now);
        self.store
            .sum_content_length_between(user_id, since, now.with_timezone(&Utc))
            .await
    }

    pub async fn usage(&self, user_id: &str) -> Result<i64, DedupError> {
        self.usage_at(user_id, Local::now()).await
    }

    /// Whether adding `incoming_bytes` would push today's usage over the limit
    pub async fn is_exceeded(&self, user_id: &str, incoming_bytes: i64) -> Result<bool, DedupError> {
        let used = self.usage(user_id).await?;
        Ok(used.saturating_add(incoming_bytes) > self.daily_limit)
    }

    /// Bytes still available today, never negative
    pub async fn remaining(&self, user_id: &str) -> Result<i64, DedupError> {
        let used = self.usage(user_id).await?;
        Ok(self.remaining_after(used))
    }

    pub async fn status(&self, user_id: &str) -> Result<QuotaStatus, DedupError> {
        let used = self.usage(user_id).await?;
        Ok(QuotaStatus {
            user_id: user_id.to_string(),
            used_bytes: used,
            remaining_bytes: self.remaining_after(used),
            daily_limit_bytes: self.daily_limit,
        })
    }

    fn remaining_after(&self, used: i64) -> i64 {
        self.daily_limit.saturating_sub(used).max(0)
    }
}

/// Local midnight of the day containing `now`, as UTC.
///
/// When midnight does not exist locally (DST gap) the first valid instant
/// after it is used.
pub fn start_of_local_day(now: DateTime<Local>) -> DateTime<Utc> {
    let midnight = now.date_naive().and_time(NaiveTime::default());
    match Local.from_local_datetime(&midnight) {
        LocalResult::Single(start) => start.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => {
            // Skip forward to the end of the gap.
            (1..=24 * 60)
                .map(|minutes| midnight + chrono::Duration::minutes(minutes))
                .find_map(|candidate| Local.from_local_datetime(&candidate).earliest())
                .unwrap_or(now)
                .with_timezone(&Utc)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
