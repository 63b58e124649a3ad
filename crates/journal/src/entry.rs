use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::BookingId;

/// Unique identifier for a journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(Uuid);

impl EntryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of a booking stream, used for optimistic concurrency control.
///
/// A stream with no entries is at version 0; the first entry is version 1
/// and each subsequent entry increments by one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Version of a stream that has never been written.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Version carried by the first entry of a stream.
    pub fn first() -> Self {
        Self(1)
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// One recorded fact about a booking.
///
/// The payload is the serialized domain event; `event_type` names it so
/// readers can filter without deserializing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub entry_id: EntryId,

    /// The booking stream this entry belongs to.
    pub booking_id: BookingId,

    /// Event name, e.g. "BookingRequested".
    pub event_type: String,

    /// Stream version after this entry.
    pub version: Version,

    pub recorded_at: DateTime<Utc>,

    /// Who caused the entry ("staff:<id>", "customer:<id>", "guest").
    pub actor: Option<String>,

    pub payload: serde_json::Value,
}

impl JournalEntry {
    /// Creates an entry from an already-serialized payload.
    pub fn new(
        booking_id: BookingId,
        version: Version,
        event_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            entry_id: EntryId::new(),
            booking_id,
            event_type: event_type.into(),
            version,
            recorded_at: Utc::now(),
            actor: None,
            payload,
        }
    }

    /// Serializes `event` as the payload of a new entry.
    pub fn from_event<T: Serialize>(
        booking_id: BookingId,
        version: Version,
        event_type: impl Into<String>,
        event: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(
            booking_id,
            version,
            event_type,
            serde_json::to_value(event)?,
        ))
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn recorded_at(mut self, at: DateTime<Utc>) -> Self {
        self.recorded_at = at;
        self
    }
}
