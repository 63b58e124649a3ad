use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    BookingId, JournalEntry, JournalError, Result, Version,
    store::{EntryStream, ExpectedVersion, Journal, validate_append},
};

/// In-memory journal used by tests and by the server when no database is
/// configured.
#[derive(Clone, Default)]
pub struct InMemoryJournal {
    entries: Arc<RwLock<Vec<JournalEntry>>>,
    codes: Arc<RwLock<HashMap<String, BookingId>>>,
}

impl InMemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of entries across all streams.
    pub async fn entry_count(&self) -> usize {
        self.entries.read().await.len()
    }

    fn current_version(entries: &[JournalEntry], booking_id: BookingId) -> Version {
        entries
            .iter()
            .filter(|e| e.booking_id == booking_id)
            .map(|e| e.version)
            .max()
            .unwrap_or_default()
    }
}

#[async_trait]
impl Journal for InMemoryJournal {
    async fn append(
        &self,
        entries: Vec<JournalEntry>,
        expected: ExpectedVersion,
    ) -> Result<Version> {
        validate_append(&entries)?;

        let booking_id = entries[0].booking_id;
        let first_version = entries[0].version;

        let mut store = self.entries.write().await;
        let current = Self::current_version(&store, booking_id);

        if let ExpectedVersion::Exactly(expected) = expected
            && current != expected
        {
            return Err(JournalError::ConcurrencyConflict {
                booking_id,
                expected,
                actual: current,
            });
        }

        // Mirrors the (booking_id, version) uniqueness of the database table.
        if first_version != current.next() {
            return Err(JournalError::ConcurrencyConflict {
                booking_id,
                expected: first_version,
                actual: current,
            });
        }

        let last_version = entries.last().map(|e| e.version).unwrap_or(current);
        store.extend(entries);

        Ok(last_version)
    }

    async fn load(&self, booking_id: BookingId) -> Result<Vec<JournalEntry>> {
        let store = self.entries.read().await;
        let mut stream: Vec<_> = store
            .iter()
            .filter(|e| e.booking_id == booking_id)
            .cloned()
            .collect();
        stream.sort_by_key(|e| e.version);
        Ok(stream)
    }

    async fn stream_all(&self) -> Result<EntryStream> {
        use futures_util::stream;

        let snapshot = self.entries.read().await.clone();
        Ok(Box::pin(stream::iter(snapshot.into_iter().map(Ok))))
    }

    async fn version(&self, booking_id: BookingId) -> Result<Option<Version>> {
        let store = self.entries.read().await;
        Ok(store
            .iter()
            .filter(|e| e.booking_id == booking_id)
            .map(|e| e.version)
            .max())
    }

    async fn claim_code(&self, code: &str, booking_id: BookingId) -> Result<()> {
        let mut codes = self.codes.write().await;
        if codes.contains_key(code) {
            return Err(JournalError::CodeTaken(code.to_string()));
        }
        codes.insert(code.to_string(), booking_id);
        Ok(())
    }

    async fn resolve_code(&self, code: &str) -> Result<Option<BookingId>> {
        Ok(self.codes.read().await.get(code).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JournalExt;

    fn entry(booking_id: BookingId, version: i64, event_type: &str) -> JournalEntry {
        JournalEntry::new(
            booking_id,
            Version::new(version),
            event_type,
            serde_json::json!({"test": true}),
        )
    }

    #[tokio::test]
    async fn append_and_load_stream() {
        let journal = InMemoryJournal::new();
        let id = BookingId::new();

        let version = journal
            .append(
                vec![entry(id, 1, "BookingRequested"), entry(id, 2, "BookingConfirmed")],
                ExpectedVersion::new_stream(),
            )
            .await
            .unwrap();
        assert_eq!(version, Version::new(2));

        let stream = journal.load(id).await.unwrap();
        assert_eq!(stream.len(), 2);
        assert_eq!(stream[0].event_type, "BookingRequested");
        assert_eq!(stream[1].event_type, "BookingConfirmed");
    }

    #[tokio::test]
    async fn stale_expected_version_conflicts() {
        let journal = InMemoryJournal::new();
        let id = BookingId::new();
        journal
            .append_one(entry(id, 1, "BookingRequested"), ExpectedVersion::new_stream())
            .await
            .unwrap();

        let result = journal
            .append_one(entry(id, 2, "BookingConfirmed"), ExpectedVersion::new_stream())
            .await;

        assert!(matches!(
            result,
            Err(JournalError::ConcurrencyConflict { .. })
        ));
        assert_eq!(journal.entry_count().await, 1);
    }

    #[tokio::test]
    async fn duplicate_version_conflicts_without_precondition() {
        let journal = InMemoryJournal::new();
        let id = BookingId::new();
        journal
            .append_one(entry(id, 1, "BookingRequested"), ExpectedVersion::Any)
            .await
            .unwrap();

        let result = journal
            .append_one(entry(id, 1, "BookingRequested"), ExpectedVersion::Any)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn version_and_exists() {
        let journal = InMemoryJournal::new();
        let id = BookingId::new();
        assert_eq!(journal.version(id).await.unwrap(), None);
        assert!(!journal.exists(id).await.unwrap());

        journal
            .append_one(entry(id, 1, "BookingRequested"), ExpectedVersion::new_stream())
            .await
            .unwrap();
        assert_eq!(journal.version(id).await.unwrap(), Some(Version::first()));
        assert!(journal.exists(id).await.unwrap());
    }

    #[tokio::test]
    async fn stream_all_preserves_recording_order() {
        use futures_util::StreamExt;

        let journal = InMemoryJournal::new();
        let a = BookingId::new();
        let b = BookingId::new();
        journal
            .append_one(entry(a, 1, "First"), ExpectedVersion::Any)
            .await
            .unwrap();
        journal
            .append_one(entry(b, 1, "Second"), ExpectedVersion::Any)
            .await
            .unwrap();
        journal
            .append_one(entry(a, 2, "Third"), ExpectedVersion::Any)
            .await
            .unwrap();

        let types: Vec<String> = journal
            .stream_all()
            .await
            .unwrap()
            .map(|e| e.unwrap().event_type)
            .collect()
            .await;
        assert_eq!(types, vec!["First", "Second", "Third"]);
    }

    #[tokio::test]
    async fn codes_are_never_reissued() {
        let journal = InMemoryJournal::new();
        let first = BookingId::new();

        journal.claim_code("BK-AAAA0000", first).await.unwrap();
        let again = journal.claim_code("BK-AAAA0000", BookingId::new()).await;

        assert!(matches!(again, Err(JournalError::CodeTaken(_))));
        assert_eq!(
            journal.resolve_code("BK-AAAA0000").await.unwrap(),
            Some(first)
        );
        assert_eq!(journal.resolve_code("BK-ZZZZ9999").await.unwrap(), None);
    }
}
