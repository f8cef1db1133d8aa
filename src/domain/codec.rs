//! Conversion between wire payloads, stored rows and [`Order`]s.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat};
use serde_json::Value;

use super::errors::DomainError;
use super::order::{Order, OrderInput, StoredOrder, ORDER_TIME_COLUMN};
use super::ports::Row;

const NAIVE_TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];

/// Extracts the submitted fields from an arbitrary JSON payload.
///
/// Never fails: absent or non-object input yields empty strings, which the
/// required-field check rejects later.
pub fn decode(payload: &Value) -> OrderInput {
    let field = |name: &str| {
        payload
            .get(name)
            .map(|v| cell_to_string(v).trim().to_string())
            .unwrap_or_default()
    };
    OrderInput {
        depositor_name: field("depositorName"),
        contact: field("contact"),
        product: field("product"),
        address: field("address"),
        address_detail: field("addressDetail"),
    }
}

/// Builds the stored row for a new order.
pub fn to_row(order_number: &str, input: &OrderInput, order_time: &DateTime<FixedOffset>) -> Row {
    vec![
        Value::String(order_number.to_string()),
        Value::String(input.depositor_name.clone()),
        Value::String(input.contact.clone()),
        Value::String(input.product.clone()),
        Value::String(input.address.clone()),
        Value::String(input.address_detail.clone()),
        Value::String(format_timestamp(order_time)),
    ]
}

/// Pairs a raw row with its position and parsed order time.
pub fn read_stored(position: usize, cells: Row, offset: FixedOffset) -> StoredOrder {
    let order_time = cells
        .get(ORDER_TIME_COLUMN)
        .and_then(|cell| parse_timestamp(cell, offset));
    StoredOrder {
        position,
        cells,
        order_time,
    }
}

pub fn encode(stored: &StoredOrder) -> Order {
    let cell = |i: usize| stored.cells.get(i).map(cell_to_string).unwrap_or_default();
    Order {
        order_number: cell(0),
        depositor_name: cell(1),
        contact: cell(2),
        product: cell(3),
        address: cell(4),
        address_detail: cell(5),
        order_time: stored
            .order_time
            .as_ref()
            .map(format_timestamp)
            .unwrap_or_else(|| cell(ORDER_TIME_COLUMN)),
    }
}

pub fn format_timestamp(ts: &DateTime<FixedOffset>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, false)
}

/// Parses a stored time cell. Naive timestamps are read in `offset`.
pub fn parse_timestamp(cell: &Value, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    let raw = cell.as_str()?.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&offset));
    }
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| localize(naive, offset))
}

/// Parses a caller-supplied date bound. Blank input means "no bound";
/// anything else that is not a recognisable date is rejected.
pub fn parse_date_bound(
    raw: Option<&str>,
    offset: FixedOffset,
) -> Result<Option<NaiveDate>, DomainError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(ts.with_timezone(&offset).date_naive()));
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .map(Some)
        .ok_or_else(|| DomainError::invalid(format!("날짜 형식이 올바르지 않습니다: {raw}")))
}

pub fn localize(naive: NaiveDateTime, offset: FixedOffset) -> DateTime<FixedOffset> {
    DateTime::from_naive_utc_and_offset(naive - offset, offset)
}

fn cell_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
