use chrono::{Days, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::{LedgerError, Result, time::hhmm};

/// Opening hours and booking lead time for the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessHours {
    #[serde(with = "hhmm")]
    pub open: NaiveTime,
    /// Exclusive: no appointment may run past this time.
    #[serde(with = "hhmm")]
    pub close: NaiveTime,
    /// Distance between candidate start times.
    pub step_minutes: u32,
    /// Whole days of notice required. 1 means the earliest bookable day is tomorrow.
    pub min_advance_days: u32,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default(),
            close: NaiveTime::from_hms_opt(19, 0, 0).unwrap_or_default(),
            step_minutes: 30,
            min_advance_days: 1,
        }
    }
}

impl BusinessHours {
    pub fn new(
        open: NaiveTime,
        close: NaiveTime,
        step_minutes: u32,
        min_advance_days: u32,
    ) -> Result<Self> {
        if open >= close {
            return Err(LedgerError::InvalidWindow(format!(
                "opening time {} must be before closing time {}",
                open.format(hhmm::FORMAT),
                close.format(hhmm::FORMAT)
            )));
        }
        if step_minutes == 0 {
            return Err(LedgerError::InvalidWindow(
                "slot step must be at least one minute".to_string(),
            ));
        }
        Ok(Self {
            open,
            close,
            step_minutes,
            min_advance_days,
        })
    }

    /// Earliest local instant at which an appointment may start, given `now`.
    ///
    /// With no advance notice this is `now` itself; otherwise it is midnight
    /// `min_advance_days` days after today.
    pub fn earliest_bookable(&self, now: NaiveDateTime) -> NaiveDateTime {
        if self.min_advance_days == 0 {
            return now;
        }
        now.date()
            .checked_add_days(Days::new(u64::from(self.min_advance_days)))
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or(NaiveDateTime::MAX)
    }
}
