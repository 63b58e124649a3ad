//! Application configuration loaded from environment variables.

use std::time::Duration;

use chrono::NaiveTime;
use scheduling::{BusinessHours, hhmm};

/// Log output format selected by `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    /// Reads `LOG_FORMAT`. Anything other than `json` is plain text.
    pub fn from_env() -> Self {
        Self::parse(std::env::var("LOG_FORMAT").ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` bind address (default: `"0.0.0.0"`)
/// - `PORT` listen port (default: `3000`)
/// - `RUST_LOG` tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT` `text` or `json` (default: `text`)
/// - `DATABASE_URL` PostgreSQL connection string; unset keeps everything in memory
/// - `BUSINESS_OPEN` / `BUSINESS_CLOSE` opening hours as `HH:MM` (default: 08:00 to 19:00)
/// - `SLOT_STEP_MINUTES` distance between slot starts (default: `30`)
/// - `MIN_ADVANCE_DAYS` whole days of notice (default: `1`)
/// - `RESERVATION_SWEEP_SECS` seconds between sweeps for orphaned reservations (default: `300`)
/// - `RESERVATION_GRACE_SECS` age a reservation needs before a sweep may release it (default: `300`)
///
/// Invalid values fall back to their default with a warning.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub business_hours: BusinessHours,
    pub sweep_interval: Duration,
    pub reservation_grace: Duration,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let hours = defaults.business_hours;

        let open = parsed(&lookup, "BUSINESS_OPEN", hours.open, parse_time);
        let close = parsed(&lookup, "BUSINESS_CLOSE", hours.close, parse_time);
        let step = parsed(&lookup, "SLOT_STEP_MINUTES", hours.step_minutes, |v| {
            v.parse().ok()
        });
        let advance = parsed(&lookup, "MIN_ADVANCE_DAYS", hours.min_advance_days, |v| {
            v.parse().ok()
        });

        let business_hours = BusinessHours::new(open, close, step, advance).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Invalid business hours, using defaults");
            hours
        });

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parsed(&lookup, "PORT", defaults.port, |v| v.parse().ok()),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: LogFormat::parse(lookup("LOG_FORMAT").as_deref()),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            business_hours,
            sweep_interval: parsed(
                &lookup,
                "RESERVATION_SWEEP_SECS",
                defaults.sweep_interval,
                positive_secs,
            ),
            reservation_grace: parsed(
                &lookup,
                "RESERVATION_GRACE_SECS",
                defaults.reservation_grace,
                |v| v.parse().ok().map(Duration::from_secs),
            ),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            business_hours: BusinessHours::default(),
            sweep_interval: Duration::from_secs(300),
            reservation_grace: Duration::from_secs(300),
        }
    }
}

fn parse_time(value: &str) -> Option<NaiveTime> {
    hhmm::parse(value).ok()
}

fn positive_secs(value: &str) -> Option<Duration> {
    value
        .parse::<u64>()
        .ok()
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

fn parsed<T: Copy>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
    parse: impl Fn(&str) -> Option<T>,
) -> T {
    match lookup(key) {
        None => default,
        Some(raw) => parse(raw.trim()).unwrap_or_else(|| {
            tracing::warn!(key, value = %raw, "Invalid configuration value, using default");
            default
        }),
    }
}
