use std::env;
use std::time::Duration;

use chrono::FixedOffset;
use thiserror::Error;

use crate::domain::query::ListingWindow;
use crate::domain::retention::DEFAULT_RETENTION_DAYS;

pub const DEFAULT_ORDERS_SHEET: &str = "주문목록";
const DEFAULT_UTC_OFFSET_HOURS: i32 = 9;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value `{value}`: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Settings the order service needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSettings {
    /// Sheet used when a request does not name one.
    pub orders_sheet: String,
    pub listing_window: ListingWindow,
    pub retention_days: u32,
}

impl Default for OrderSettings {
    fn default() -> Self {
        Self {
            orders_sheet: DEFAULT_ORDERS_SHEET.to_string(),
            listing_window: ListingWindow::default(),
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub utc_offset: FixedOffset,
    pub orders: OrderSettings,
    pub sweep_enabled: bool,
    pub sweep_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or(&lookup, "PORT", 8080u16)?;

        let offset_hours = parse_or(&lookup, "UTC_OFFSET_HOURS", DEFAULT_UTC_OFFSET_HOURS)?;
        let utc_offset = offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| ConfigError::Invalid {
                key: "UTC_OFFSET_HOURS",
                value: offset_hours.to_string(),
                reason: "out of range".to_string(),
            })?;

        let orders = OrderSettings {
            orders_sheet: lookup("ORDERS_SHEET")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_ORDERS_SHEET.to_string()),
            listing_window: parse_or(&lookup, "LISTING_WINDOW", ListingWindow::default())?,
            retention_days: parse_or(&lookup, "RETENTION_DAYS", DEFAULT_RETENTION_DAYS)?,
        };

        let sweep_enabled = parse_or(&lookup, "SWEEP_ENABLED", true)?;
        let interval_secs = parse_or(&lookup, "SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS)?;
        if interval_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "SWEEP_INTERVAL_SECS",
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }

        Ok(Self {
            database_url,
            host,
            port,
            utc_offset,
            orders,
            sweep_enabled,
            sweep_interval: Duration::from_secs(interval_secs),
        })
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => {
            let parsed = value.trim().parse::<T>();
            parsed.map_err(|e| ConfigError::Invalid {
                key,
                reason: e.to_string(),
                value,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let config = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://db")]))
            .expect("valid config");
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.utc_offset.local_minus_utc(), 9 * 3600);
        assert_eq!(config.orders, OrderSettings::default());
        assert!(config.sweep_enabled);
        assert_eq!(config.sweep_interval, Duration::from_secs(86_400));
    }

    #[test]
    fn database_url_is_required() {
        let err = Config::from_lookup(lookup(&[])).expect_err("missing url");
        assert_eq!(err, ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db"),
            ("PORT", "9000"),
            ("ORDERS_SHEET", "Orders2"),
            ("LISTING_WINDOW", "month"),
            ("RETENTION_DAYS", "30"),
            ("UTC_OFFSET_HOURS", "0"),
            ("SWEEP_ENABLED", "false"),
        ]))
        .expect("valid config");
        assert_eq!(config.port, 9000);
        assert_eq!(config.orders.orders_sheet, "Orders2");
        assert_eq!(config.orders.listing_window, ListingWindow::CurrentMonth);
        assert_eq!(config.orders.retention_days, 30);
        assert_eq!(config.utc_offset.local_minus_utc(), 0);
        assert!(!config.sweep_enabled);
    }

    #[test]
    fn invalid_values_are_reported_with_their_key() {
        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db"),
            ("LISTING_WINDOW", "weekly"),
        ]))
        .expect_err("invalid window");
        assert!(matches!(err, ConfigError::Invalid { key: "LISTING_WINDOW", .. }));

        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db"),
            ("UTC_OFFSET_HOURS", "30"),
        ]))
        .expect_err("offset out of range");
        assert!(matches!(err, ConfigError::Invalid { key: "UTC_OFFSET_HOURS", .. }));
    }
}
