//! Time-window filtering, ordering and pagination over a sheet snapshot.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate, NaiveTime};

use super::codec::localize;
use super::errors::DomainError;
use super::order::{Page, StoredOrder};

pub const DEFAULT_PAGE_LIMIT: usize = 10;

/// Days covered by the admin listing unless configured otherwise.
pub const DEFAULT_LISTING_DAYS: u32 = 3;

/// Inclusive time interval. A missing bound is unbounded on that side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Window {
    pub start: Option<DateTime<FixedOffset>>,
    pub end: Option<DateTime<FixedOffset>>,
}

impl Window {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn contains(&self, ts: &DateTime<FixedOffset>) -> bool {
        self.start.is_none_or(|start| start <= *ts) && self.end.is_none_or(|end| *ts <= end)
    }
}

/// Which orders the admin listing shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingWindow {
    /// From midnight `n` days ago until now.
    RecentDays(u32),
    /// From the first day of the current month until now.
    CurrentMonth,
    /// Every order with a valid time.
    All,
}

impl Default for ListingWindow {
    fn default() -> Self {
        ListingWindow::RecentDays(DEFAULT_LISTING_DAYS)
    }
}

impl ListingWindow {
    pub fn window(&self, now: &DateTime<FixedOffset>) -> Window {
        match self {
            ListingWindow::RecentDays(days) => recent_window(now, *days),
            ListingWindow::CurrentMonth => {
                let first = now.date_naive() - Days::new(u64::from(now.day0()));
                Window {
                    start: Some(start_of_day(first, *now.offset())),
                    end: Some(*now),
                }
            }
            ListingWindow::All => Window::unbounded(),
        }
    }
}

impl FromStr for ListingWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "month" => Ok(ListingWindow::CurrentMonth),
            "all" => Ok(ListingWindow::All),
            other => other
                .strip_prefix("days:")
                .and_then(|n| n.parse().ok())
                .map(ListingWindow::RecentDays)
                .ok_or_else(|| format!("expected `days:N`, `month` or `all`, got `{other}`")),
        }
    }
}

impl fmt::Display for ListingWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListingWindow::RecentDays(days) => write!(f, "days:{days}"),
            ListingWindow::CurrentMonth => f.write_str("month"),
            ListingWindow::All => f.write_str("all"),
        }
    }
}

/// Page number (1-based) and page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub limit: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl PageRequest {
    pub fn new(page: usize, limit: usize) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    /// Reads raw query values. Missing, non-numeric or non-positive values
    /// fall back to the defaults.
    pub fn parse(page: Option<&str>, limit: Option<&str>) -> Self {
        let positive = |raw: Option<&str>| {
            raw.and_then(|s| s.trim().parse::<usize>().ok())
                .filter(|n| *n >= 1)
        };
        Self::new(
            positive(page).unwrap_or(1),
            positive(limit).unwrap_or(DEFAULT_PAGE_LIMIT),
        )
    }

    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// Keeps orders with a parseable time inside `window`.
pub fn filter_by_window(orders: Vec<StoredOrder>, window: &Window) -> Vec<StoredOrder> {
    orders
        .into_iter()
        .filter(|o| o.order_time.is_some_and(|ts| window.contains(&ts)))
        .collect()
}

/// Most recent first. The sort is stable, so ties keep scan order.
pub fn sort_descending(orders: &mut [StoredOrder]) {
    orders.sort_by(|a, b| b.order_time.cmp(&a.order_time));
}

pub fn paginate<T>(items: Vec<T>, request: PageRequest) -> Page<T> {
    let total_count = items.len();
    let offset = request.offset();
    Page {
        items: items.into_iter().skip(offset).take(request.limit).collect(),
        total_count,
        current_page: request.page,
        total_pages: total_count.div_ceil(request.limit),
        has_more: offset.saturating_add(request.limit) < total_count,
    }
}

/// `[midnight of (now - days), now]`.
pub fn recent_window(now: &DateTime<FixedOffset>, days: u32) -> Window {
    let first = now.date_naive() - Days::new(u64::from(days));
    Window {
        start: Some(start_of_day(first, *now.offset())),
        end: Some(*now),
    }
}

/// `[start 00:00:00, end 23:59:59.999999999]`, rejecting inverted ranges.
pub fn range_window(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    offset: FixedOffset,
) -> Result<Window, DomainError> {
    if let (Some(s), Some(e)) = (start, end) {
        if s > e {
            return Err(DomainError::invalid("시작일이 종료일보다 늦을 수 없습니다."));
        }
    }
    Ok(Window {
        start: start.map(|d| start_of_day(d, offset)),
        end: end.map(|d| end_of_day(d, offset)),
    })
}

pub fn start_of_day(date: NaiveDate, offset: FixedOffset) -> DateTime<FixedOffset> {
    localize(date.and_time(NaiveTime::MIN), offset)
}

fn end_of_day(date: NaiveDate, offset: FixedOffset) -> DateTime<FixedOffset> {
    let last = NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).unwrap_or(NaiveTime::MIN);
    localize(date.and_time(last), offset)
}
