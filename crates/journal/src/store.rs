use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::{BookingId, JournalEntry, JournalError, Result, Version};

/// Precondition on the stream version when appending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpectedVersion {
    /// No check. Only for seeding and tests.
    #[default]
    Any,
    /// The stream must currently be at exactly this version.
    Exactly(Version),
}

impl ExpectedVersion {
    /// The stream must not exist yet.
    pub fn new_stream() -> Self {
        Self::Exactly(Version::initial())
    }
}

/// Entries in global recording order.
pub type EntryStream = Pin<Box<dyn Stream<Item = Result<JournalEntry>> + Send>>;

/// Storage for booking streams.
///
/// Implementations must make `append` atomic: either every entry is
/// recorded or none is, and the version precondition is checked in the same
/// critical section as the write.
#[async_trait]
pub trait Journal: Send + Sync {
    /// Appends entries to one booking stream, returning the new version.
    async fn append(&self, entries: Vec<JournalEntry>, expected: ExpectedVersion)
    -> Result<Version>;

    /// Loads a booking stream in version order. Empty if unknown.
    async fn load(&self, booking_id: BookingId) -> Result<Vec<JournalEntry>>;

    /// Streams every entry of every booking in recording order.
    async fn stream_all(&self) -> Result<EntryStream>;

    /// Current version of a stream, or `None` if it has no entries.
    async fn version(&self, booking_id: BookingId) -> Result<Option<Version>>;

    /// Claims a booking code for a booking.
    ///
    /// Fails with [`JournalError::CodeTaken`] if the code was ever issued
    /// before, even to a booking that no longer exists.
    async fn claim_code(&self, code: &str, booking_id: BookingId) -> Result<()>;

    /// Looks up the booking a code was issued to.
    async fn resolve_code(&self, code: &str) -> Result<Option<BookingId>>;
}

#[async_trait]
pub trait JournalExt: Journal {
    async fn append_one(&self, entry: JournalEntry, expected: ExpectedVersion) -> Result<Version> {
        self.append(vec![entry], expected).await
    }

    async fn exists(&self, booking_id: BookingId) -> Result<bool> {
        Ok(self.version(booking_id).await?.is_some())
    }
}

impl<T: Journal + ?Sized> JournalExt for T {}

/// Checks that entries target a single stream with consecutive versions.
pub fn validate_append(entries: &[JournalEntry]) -> Result<()> {
    let Some(first) = entries.first() else {
        return Err(JournalError::InvalidAppend(
            "cannot append an empty batch".to_string(),
        ));
    };

    let mut expected = first.version;
    for entry in entries.iter().skip(1) {
        if entry.booking_id != first.booking_id {
            return Err(JournalError::InvalidAppend(
                "all entries must belong to the same booking".to_string(),
            ));
        }
        expected = expected.next();
        if entry.version != expected {
            return Err(JournalError::InvalidAppend(format!(
                "versions must be consecutive: expected {expected}, got {}",
                entry.version
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(booking_id: BookingId, version: i64) -> JournalEntry {
        JournalEntry::new(
            booking_id,
            Version::new(version),
            "Test",
            serde_json::json!({}),
        )
    }

    #[test]
    fn empty_batch_is_rejected() {
        assert!(matches!(
            validate_append(&[]),
            Err(JournalError::InvalidAppend(_))
        ));
    }

    #[test]
    fn mixed_bookings_are_rejected() {
        let batch = [entry(BookingId::new(), 1), entry(BookingId::new(), 2)];
        assert!(validate_append(&batch).is_err());
    }

    #[test]
    fn gaps_are_rejected() {
        let id = BookingId::new();
        let batch = [entry(id, 1), entry(id, 3)];
        assert!(validate_append(&batch).is_err());
    }

    #[test]
    fn consecutive_batch_is_accepted() {
        let id = BookingId::new();
        let batch = [entry(id, 4), entry(id, 5), entry(id, 6)];
        assert!(validate_append(&batch).is_ok());
    }
}
