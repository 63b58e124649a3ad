//! Feeds journal entries to projections.

use std::collections::HashMap;

use common::BookingId;
use futures_util::StreamExt;
use journal::{Journal, JournalEntry, Version};
use tokio::sync::Mutex;

use crate::Result;
use crate::projection::Projection;

/// Highest version of each booking stream a projection has been given.
type Checkpoints = HashMap<BookingId, Version>;

/// Delivers journal entries to registered projections.
///
/// - Catch-up: replays the journal, skipping entries each projection has seen
/// - Single entry delivery
/// - Rebuild: resets every projection and replays from scratch
///
/// Progress is tracked per booking stream, not as a count over the global
/// order. A stream's versions become visible in order, but entries of
/// different streams may become visible out of recording order, so an entry
/// that appears late is still delivered on the next catch-up.
///
/// Deliveries are serialized so concurrent readers never hand a projection
/// the same entry twice.
pub struct ProjectionProcessor<J: Journal> {
    journal: J,
    projections: Vec<Box<dyn Projection>>,
    checkpoints: Mutex<Vec<Checkpoints>>,
}

impl<J: Journal> ProjectionProcessor<J> {
    pub fn new(journal: J) -> Self {
        Self {
            journal,
            projections: Vec::new(),
            checkpoints: Mutex::new(Vec::new()),
        }
    }

    pub fn register(&mut self, projection: Box<dyn Projection>) {
        self.projections.push(projection);
        self.checkpoints.get_mut().push(Checkpoints::new());
    }

    pub fn projection_count(&self) -> usize {
        self.projections.len()
    }

    /// Streams the whole journal and delivers each entry to every projection
    /// that has not yet seen that version of its booking.
    #[tracing::instrument(skip(self))]
    pub async fn run_catch_up(&self) -> Result<()> {
        let mut checkpoints = self.checkpoints.lock().await;

        let mut stream = self.journal.stream_all().await?;
        let mut scanned: u64 = 0;
        let mut delivered: u64 = 0;

        while let Some(entry) = stream.next().await {
            let entry = entry?;
            scanned += 1;
            delivered += self.deliver(&mut checkpoints, &entry).await?;
        }

        tracing::debug!(scanned, delivered, "Catch-up complete");
        Ok(())
    }

    /// Delivers one entry to every projection that has not seen it.
    #[tracing::instrument(skip(self, entry), fields(event_type = %entry.event_type))]
    pub async fn process_entry(&self, entry: &JournalEntry) -> Result<()> {
        let mut checkpoints = self.checkpoints.lock().await;
        self.deliver(&mut checkpoints, entry).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn rebuild_all(&self) -> Result<()> {
        {
            let mut checkpoints = self.checkpoints.lock().await;
            for (projection, seen) in self.projections.iter().zip(checkpoints.iter_mut()) {
                tracing::info!(projection = projection.name(), "Rebuilding projection");
                projection.reset().await?;
                seen.clear();
            }
        }
        self.run_catch_up().await
    }

    async fn deliver(&self, checkpoints: &mut [Checkpoints], entry: &JournalEntry) -> Result<u64> {
        let mut delivered = 0;
        for (projection, seen) in self.projections.iter().zip(checkpoints.iter_mut()) {
            let last = seen
                .get(&entry.booking_id)
                .copied()
                .unwrap_or_else(Version::initial);
            if entry.version <= last {
                continue;
            }
            projection.handle(entry).await?;
            seen.insert(entry.booking_id, entry.version);
            metrics::counter!("projections_events_processed").increment(1);
            delivered += 1;
        }
        Ok(delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::ProjectionPosition;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use common::BookingId;
    use domain::{BookingEvent, BookingStatus};
    use journal::{EntryId, EntryStream, ExpectedVersion, InMemoryJournal};
    use std::collections::HashSet;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    use crate::views::BookingBoardView;
    use crate::views::summary::fixtures::{entry, guest, requested};

    struct CountingProjection {
        count: Arc<RwLock<u64>>,
        position: Arc<RwLock<ProjectionPosition>>,
    }

    impl CountingProjection {
        fn new() -> Self {
            Self {
                count: Arc::new(RwLock::new(0)),
                position: Arc::new(RwLock::new(ProjectionPosition::zero())),
            }
        }
    }

    #[async_trait]
    impl Projection for CountingProjection {
        fn name(&self) -> &'static str {
            "CountingProjection"
        }

        async fn handle(&self, entry: &JournalEntry) -> Result<()> {
            *self.count.write().await += 1;
            let mut pos = self.position.write().await;
            *pos = pos.advance(entry);
            Ok(())
        }

        async fn position(&self) -> ProjectionPosition {
            *self.position.read().await
        }

        async fn reset(&self) -> Result<()> {
            *self.count.write().await = 0;
            *self.position.write().await = ProjectionPosition::zero();
            Ok(())
        }
    }

    async fn journal_with(entries: i64) -> InMemoryJournal {
        let journal = InMemoryJournal::new();
        let id = BookingId::new();
        let batch = (1..=entries)
            .map(|v| {
                JournalEntry::new(id, Version::new(v), "Test", serde_json::json!({"n": v}))
            })
            .collect::<Vec<_>>();
        if !batch.is_empty() {
            journal.append(batch, ExpectedVersion::Any).await.unwrap();
        }
        journal
    }

    #[tokio::test]
    async fn catch_up_delivers_every_entry() {
        let projection = CountingProjection::new();
        let count = Arc::clone(&projection.count);
        let mut processor = ProjectionProcessor::new(journal_with(3).await);
        processor.register(Box::new(projection));

        processor.run_catch_up().await.unwrap();

        assert_eq!(*count.read().await, 3);
    }

    #[tokio::test]
    async fn second_catch_up_skips_seen_entries() {
        let projection = CountingProjection::new();
        let count = Arc::clone(&projection.count);
        let mut processor = ProjectionProcessor::new(journal_with(3).await);
        processor.register(Box::new(projection));

        processor.run_catch_up().await.unwrap();
        processor.run_catch_up().await.unwrap();

        assert_eq!(*count.read().await, 3);
    }

    #[tokio::test]
    async fn concurrent_catch_ups_do_not_double_deliver() {
        let projection = CountingProjection::new();
        let count = Arc::clone(&projection.count);
        let mut processor = ProjectionProcessor::new(journal_with(20).await);
        processor.register(Box::new(projection));
        let processor = Arc::new(processor);

        let a = tokio::spawn({
            let p = processor.clone();
            async move { p.run_catch_up().await }
        });
        let b = tokio::spawn({
            let p = processor.clone();
            async move { p.run_catch_up().await }
        });
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        assert_eq!(*count.read().await, 20);
    }

    #[tokio::test]
    async fn rebuild_resets_and_replays() {
        let projection = CountingProjection::new();
        let count = Arc::clone(&projection.count);
        let position = Arc::clone(&projection.position);
        let mut processor = ProjectionProcessor::new(journal_with(2).await);
        processor.register(Box::new(projection));

        processor.run_catch_up().await.unwrap();
        processor.rebuild_all().await.unwrap();

        assert_eq!(*count.read().await, 2);
        assert_eq!(position.read().await.entries_processed, 2);
    }

    #[tokio::test]
    async fn single_entry_reaches_all_projections() {
        let first = CountingProjection::new();
        let second = CountingProjection::new();
        let c1 = Arc::clone(&first.count);
        let c2 = Arc::clone(&second.count);
        let mut processor = ProjectionProcessor::new(journal_with(0).await);
        processor.register(Box::new(first));
        processor.register(Box::new(second));

        let entry = JournalEntry::new(
            BookingId::new(),
            Version::first(),
            "Test",
            serde_json::json!({}),
        );
        processor.process_entry(&entry).await.unwrap();

        assert_eq!(processor.projection_count(), 2);
        assert_eq!(*c1.read().await, 1);
        assert_eq!(*c2.read().await, 1);
    }

    #[tokio::test]
    async fn delivered_entries_are_not_redelivered_by_catch_up() {
        let projection = CountingProjection::new();
        let count = Arc::clone(&projection.count);
        let journal = journal_with(2).await;
        let mut processor = ProjectionProcessor::new(journal.clone());
        processor.register(Box::new(projection));

        let mut stream = journal.stream_all().await.unwrap();
        let first = futures_util::StreamExt::next(&mut stream).await.unwrap().unwrap();
        processor.process_entry(&first).await.unwrap();
        processor.run_catch_up().await.unwrap();

        assert_eq!(*count.read().await, 2);
    }

    /// A journal whose global stream hides some entries, as a database does
    /// while the transaction that wrote them is still in flight.
    #[derive(Clone, Default)]
    struct InFlightJournal {
        inner: InMemoryJournal,
        in_flight: Arc<RwLock<HashSet<EntryId>>>,
    }

    #[async_trait]
    impl Journal for InFlightJournal {
        async fn append(
            &self,
            entries: Vec<JournalEntry>,
            expected: ExpectedVersion,
        ) -> journal::Result<Version> {
            self.inner.append(entries, expected).await
        }

        async fn load(&self, booking_id: BookingId) -> journal::Result<Vec<JournalEntry>> {
            self.inner.load(booking_id).await
        }

        async fn stream_all(&self) -> journal::Result<EntryStream> {
            let hidden = self.in_flight.read().await.clone();
            let visible: Vec<_> = futures_util::StreamExt::collect::<Vec<_>>(
                self.inner.stream_all().await?,
            )
            .await
            .into_iter()
            .filter(|e| !e.as_ref().is_ok_and(|e| hidden.contains(&e.entry_id)))
            .collect();
            Ok(Box::pin(futures_util::stream::iter(visible)))
        }

        async fn version(&self, booking_id: BookingId) -> journal::Result<Option<Version>> {
            self.inner.version(booking_id).await
        }

        async fn claim_code(&self, code: &str, booking_id: BookingId) -> journal::Result<()> {
            self.inner.claim_code(code, booking_id).await
        }

        async fn resolve_code(&self, code: &str) -> journal::Result<Option<BookingId>> {
            self.inner.resolve_code(code).await
        }
    }

    #[tokio::test]
    async fn entry_that_becomes_visible_late_still_reaches_the_board() {
        let journal = InFlightJournal::default();
        let day = NaiveDate::from_ymd_opt(2030, 5, 10).unwrap();
        let (a, b) = (BookingId::new(), BookingId::new());
        for (id, hour) in [(a, 9), (b, 11)] {
            journal
                .append(
                    vec![entry(id, 1, &requested(id, guest(), day, hour))],
                    ExpectedVersion::new_stream(),
                )
                .await
                .unwrap();
        }

        // a's confirmation is recorded before b's but is not yet visible
        let late = entry(a, 2, &BookingEvent::confirmed("staff:desk"));
        journal.in_flight.write().await.insert(late.entry_id);
        journal
            .append(vec![late.clone()], ExpectedVersion::Exactly(Version::first()))
            .await
            .unwrap();
        journal
            .append(
                vec![entry(b, 2, &BookingEvent::confirmed("staff:desk"))],
                ExpectedVersion::Exactly(Version::first()),
            )
            .await
            .unwrap();

        let board = BookingBoardView::new();
        let mut processor = ProjectionProcessor::new(journal.clone());
        processor.register(Box::new(board.clone()));

        processor.run_catch_up().await.unwrap();
        assert_eq!(board.get(a).await.unwrap().status, BookingStatus::Pending);
        assert_eq!(board.get(b).await.unwrap().status, BookingStatus::Confirmed);

        journal.in_flight.write().await.clear();
        processor.run_catch_up().await.unwrap();

        assert_eq!(board.get(a).await.unwrap().status, BookingStatus::Confirmed);
        assert_eq!(board.get(b).await.unwrap().status, BookingStatus::Confirmed);
        assert_eq!(board.position().await.entries_processed, 4);
    }
}
