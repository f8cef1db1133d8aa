//! Selection of expired rows for the retention sweep.

use chrono::{DateTime, Days, FixedOffset};

use super::order::StoredOrder;
use super::query::start_of_day;

pub const DEFAULT_RETENTION_DAYS: u32 = 7;

/// Outcome of one sweep. A failed sweep reports what it got through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub examined: usize,
    pub expired: usize,
    pub deleted: usize,
    /// Expired rows another writer moved or removed before this sweep reached them.
    pub skipped: usize,
}

/// Midnight `days` days before `now`. Orders strictly older than this expire.
pub fn horizon(now: &DateTime<FixedOffset>, days: u32) -> DateTime<FixedOffset> {
    start_of_day(now.date_naive() - Days::new(u64::from(days)), *now.offset())
}

/// Positions of rows with a valid order time strictly before `horizon`.
pub fn select_expired(orders: &[StoredOrder], horizon: &DateTime<FixedOffset>) -> Vec<usize> {
    orders
        .iter()
        .filter(|o| o.order_time.is_some_and(|ts| ts < *horizon))
        .map(|o| o.position)
        .collect()
}

/// Largest position first, so each delete leaves the remaining targets in place.
pub fn deletion_order(mut positions: Vec<usize>) -> Vec<usize> {
    positions.sort_unstable_by(|a, b| b.cmp(a));
    positions.dedup();
    positions
}
