use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::{LedgerError, Result};

/// A half-open interval `[start, end)` of local wall-clock time on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

impl TimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self> {
        if start >= end {
            return Err(LedgerError::InvalidWindow(format!(
                "start {} must be before end {}",
                start.format(hhmm::FORMAT),
                end.format(hhmm::FORMAT)
            )));
        }
        Ok(Self { start, end })
    }

    /// Window of `minutes` starting at `start`, or `None` if it would run past
    /// midnight or is empty.
    pub fn starting_at(start: NaiveTime, minutes: u32) -> Option<Self> {
        if minutes == 0 {
            return None;
        }
        let (end, wrapped) = start.overflowing_add_signed(Duration::minutes(i64::from(minutes)));
        (wrapped == 0 && end > start).then_some(Self { start, end })
    }

    /// Two windows overlap when each starts before the other ends.
    /// Touching windows (one ends exactly when the next starts) do not.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}-{}",
            self.start.format(hhmm::FORMAT),
            self.end.format(hhmm::FORMAT)
        )
    }
}

/// Serde adapter for 24-hour `HH:MM` times.
///
/// Deserialization also accepts `HH:MM:SS` since some clients send seconds.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub const FORMAT: &str = "%H:%M";

    pub fn parse(value: &str) -> Result<NaiveTime, chrono::ParseError> {
        NaiveTime::parse_from_str(value, FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
    }

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(|e| de::Error::custom(format!("invalid time '{raw}': {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn overlap_is_strict() {
        let booked = TimeWindow::new(t(14, 0), t(15, 0)).unwrap();

        assert!(booked.overlaps(&TimeWindow::new(t(13, 30), t(14, 30)).unwrap()));
        assert!(booked.overlaps(&TimeWindow::new(t(14, 0), t(15, 0)).unwrap()));
        assert!(booked.overlaps(&TimeWindow::new(t(14, 15), t(14, 45)).unwrap()));
        assert!(!booked.overlaps(&TimeWindow::new(t(13, 0), t(14, 0)).unwrap()));
        assert!(!booked.overlaps(&TimeWindow::new(t(15, 0), t(16, 0)).unwrap()));
    }

    #[test]
    fn empty_or_inverted_windows_are_rejected() {
        assert!(TimeWindow::new(t(10, 0), t(10, 0)).is_err());
        assert!(TimeWindow::new(t(11, 0), t(10, 0)).is_err());
    }

    #[test]
    fn starting_at_refuses_midnight_wrap() {
        assert_eq!(
            TimeWindow::starting_at(t(9, 0), 90),
            Some(TimeWindow::new(t(9, 0), t(10, 30)).unwrap())
        );
        assert_eq!(TimeWindow::starting_at(t(23, 30), 60), None);
        assert_eq!(TimeWindow::starting_at(t(9, 0), 0), None);
    }

    #[test]
    fn wire_format_is_hh_mm() {
        let window = TimeWindow::new(t(8, 0), t(9, 30)).unwrap();
        let json = serde_json::to_value(window).unwrap();
        assert_eq!(json, serde_json::json!({"start": "08:00", "end": "09:30"}));

        let parsed: TimeWindow =
            serde_json::from_value(serde_json::json!({"start": "08:00:00", "end": "09:30"}))
                .unwrap();
        assert_eq!(parsed, window);
        assert_eq!(window.to_string(), "08:00-09:30");
    }

    #[test]
    fn malformed_time_fails_to_parse() {
        assert!(hhmm::parse("25:00").is_err());
        assert!(hhmm::parse("noon").is_err());
    }
}
