//! Projection and read model traits, and how far a projection has read.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::BookingEvent;
use journal::{EntryId, JournalEntry};

use crate::{ProjectionError, Result};

/// How much of the journal a projection has consumed.
///
/// The last entry is kept so a stalled view can be traced back to the entry
/// it stopped after.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectionPosition {
    pub entries_processed: u64,
    pub last_entry: Option<EntryId>,
    pub last_recorded_at: Option<DateTime<Utc>>,
}

impl ProjectionPosition {
    pub fn zero() -> Self {
        Self::default()
    }

    /// The position after consuming `entry`.
    pub fn advance(&self, entry: &JournalEntry) -> Self {
        Self {
            entries_processed: self.entries_processed + 1,
            last_entry: Some(entry.entry_id),
            last_recorded_at: Some(entry.recorded_at),
        }
    }
}

impl std::fmt::Display for ProjectionPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.last_recorded_at {
            Some(at) => write!(f, "{} entries, last recorded {at}", self.entries_processed),
            None => f.write_str("0 entries"),
        }
    }
}

/// Folds journal entries into a read model.
///
/// `handle` advances the position once per delivered entry, including
/// entries the projection ignores. The processor decides what to deliver;
/// the position is for reporting.
#[async_trait]
pub trait Projection: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(&self, entry: &JournalEntry) -> Result<()>;

    async fn position(&self) -> ProjectionPosition;

    /// Clears the read model and rewinds to position zero.
    async fn reset(&self) -> Result<()>;
}

/// Query-side metadata shared by the booking views.
pub trait ReadModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Number of bookings the model currently holds. Reads 0 while a writer
    /// holds the model.
    fn count(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

/// Decodes the booking event carried by a journal entry.
pub fn decode(entry: &JournalEntry) -> Result<BookingEvent> {
    serde_json::from_value(entry.payload.clone()).map_err(|source| ProjectionError::Payload {
        entry_id: entry.entry_id,
        event_type: entry.event_type.clone(),
        source,
    })
}
