//! The authoritative record of committed windows.

mod memory;
mod postgres;

pub use memory::InMemoryLedger;
pub use postgres::PostgresLedger;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use common::{BookingId, RecordId};
use serde::{Deserialize, Serialize};

use crate::{Result, TimeWindow, time::hhmm};

/// Lifecycle of an availability record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    /// Holds the window. Only active records occupy capacity.
    Active,
    /// Given back after a cancellation or no-show.
    Released,
    /// The appointment took place; kept for audit.
    Fulfilled,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Active => "active",
            RecordStatus::Released => "released",
            RecordStatus::Fulfilled => "fulfilled",
        }
    }

    pub fn occupies(&self) -> bool {
        matches!(self, RecordStatus::Active)
    }
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RecordStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" => Ok(RecordStatus::Active),
            "released" => Ok(RecordStatus::Released),
            "fulfilled" => Ok(RecordStatus::Fulfilled),
            other => Err(format!("unknown record status: {other}")),
        }
    }
}

/// One window committed to one booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityRecord {
    pub id: RecordId,
    pub booking_id: BookingId,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
    pub status: RecordStatus,
    pub reserved_at: DateTime<Utc>,
    /// When the record stopped occupying capacity.
    pub closed_at: Option<DateTime<Utc>>,
}

impl AvailabilityRecord {
    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start: self.start,
            end: self.end,
        }
    }
}

/// Committed windows, one shared calendar.
///
/// `reserve` must check and commit in a single critical section scoped to the
/// date: of any set of concurrent calls with overlapping windows on one date,
/// at most one succeeds.
#[async_trait]
pub trait AvailabilityLedger: Send + Sync {
    /// Commits `window` on `date` to a booking, or fails with
    /// [`LedgerError::SlotUnavailable`](crate::LedgerError::SlotUnavailable)
    /// if it overlaps an active record.
    async fn reserve(
        &self,
        booking_id: BookingId,
        date: NaiveDate,
        window: TimeWindow,
    ) -> Result<AvailabilityRecord>;

    /// Returns the window to the pool. Releasing a record that is not active,
    /// or does not exist, does nothing.
    async fn release(&self, record_id: RecordId) -> Result<()>;

    /// Marks an active record fulfilled. Idempotent like `release`.
    async fn settle(&self, record_id: RecordId) -> Result<()>;

    /// Windows that currently occupy capacity on `date`, ordered by start.
    async fn query(&self, date: NaiveDate) -> Result<Vec<TimeWindow>>;

    /// Every record ever made for `date`, ordered by start then reservation time.
    async fn records(&self, date: NaiveDate) -> Result<Vec<AvailabilityRecord>>;

    /// Active records reserved before `cutoff`, oldest first, across all dates.
    async fn active_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<AvailabilityRecord>>;

    /// Whether `window` is free right now. Advisory only; `reserve` decides.
    async fn is_free(&self, date: NaiveDate, window: TimeWindow) -> Result<bool> {
        Ok(!self
            .query(date)
            .await?
            .iter()
            .any(|committed| committed.overlaps(&window)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_active_records_occupy() {
        assert!(RecordStatus::Active.occupies());
        assert!(!RecordStatus::Released.occupies());
        assert!(!RecordStatus::Fulfilled.occupies());
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            RecordStatus::Active,
            RecordStatus::Released,
            RecordStatus::Fulfilled,
        ] {
            assert_eq!(status.as_str().parse::<RecordStatus>(), Ok(status));
        }
        assert!("pending".parse::<RecordStatus>().is_err());
    }
}
