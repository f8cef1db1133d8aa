use chrono::{DateTime, FixedOffset};

use super::ports::Row;

/// Header row written to every orders sheet.
pub const HEADER: [&str; 7] = [
    "주문번호",
    "입금자명",
    "연락처",
    "구매제품",
    "주소",
    "상세주소",
    "주문시간",
];

pub const ORDER_TIME_COLUMN: usize = 6;

/// Position of the first data row; row 1 is the header.
pub const FIRST_DATA_ROW: usize = 2;

/// Submitted order fields, already trimmed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderInput {
    pub depositor_name: String,
    pub contact: String,
    pub product: String,
    pub address: String,
    pub address_detail: String,
}

impl OrderInput {
    /// Display names of the empty required fields, in form order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            (&self.depositor_name, HEADER[1]),
            (&self.contact, HEADER[2]),
            (&self.product, HEADER[3]),
            (&self.address, HEADER[4]),
        ]
        .into_iter()
        .filter(|(value, _)| value.is_empty())
        .map(|(_, name)| name)
        .collect()
    }
}

/// An order as handed back to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub order_number: String,
    pub depositor_name: String,
    pub contact: String,
    pub product: String,
    pub address: String,
    pub address_detail: String,
    pub order_time: String,
}

/// A data row read from the store, with its position and parsed order time.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredOrder {
    pub position: usize,
    pub cells: Row,
    /// `None` when the time cell is missing or unparseable.
    pub order_time: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub order_number: String,
    pub order_time: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: usize,
    pub current_page: usize,
    pub total_pages: usize,
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            current_page: self.current_page,
            total_pages: self.total_pages,
            has_more: self.has_more,
        }
    }
}
