//! Command handling infrastructure.

use std::marker::PhantomData;

use common::BookingId;
use journal::{ExpectedVersion, Journal, JournalEntry, Version};

use crate::aggregate::{Aggregate, DomainEvent};
use crate::error::DomainError;

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// The aggregate after applying the new events.
    pub aggregate: A,

    /// The events that were generated and persisted.
    pub events: Vec<A::Event>,

    pub new_version: Version,
}

/// An intention to change one aggregate. It may be rejected if the
/// aggregate's current state does not allow it.
pub trait Command: Send + Sync {
    type Aggregate: Aggregate;

    fn booking_id(&self) -> BookingId;

    /// Who issued the command, as recorded on the journal entries it writes.
    fn actor(&self) -> String;
}

/// Executes commands against aggregates stored in a journal.
///
/// 1. Replays the aggregate's stream
/// 2. Runs the command to decide new events
/// 3. Appends them with the loaded version as precondition
/// 4. Applies them to the in-memory aggregate
pub struct CommandHandler<J, A>
where
    J: Journal,
    A: Aggregate,
{
    journal: J,
    _phantom: PhantomData<A>,
}

impl<J, A> CommandHandler<J, A>
where
    J: Journal,
    A: Aggregate,
{
    pub fn new(journal: J) -> Self {
        Self {
            journal,
            _phantom: PhantomData,
        }
    }

    pub fn journal(&self) -> &J {
        &self.journal
    }

    /// Replays an aggregate. Unknown ids give a default instance.
    pub async fn load(&self, booking_id: BookingId) -> Result<A, DomainError> {
        let entries = self.journal.load(booking_id).await?;

        let mut aggregate = A::default();
        for entry in entries {
            let event: A::Event = serde_json::from_value(entry.payload)?;
            aggregate.apply(event);
            aggregate.set_version(entry.version);
        }
        tracing::trace!(
            aggregate = A::aggregate_type(),
            %booking_id,
            version = %aggregate.version(),
            "Replayed stream"
        );

        Ok(aggregate)
    }

    /// Replays an aggregate, returning `None` if it was never created.
    pub async fn load_existing(&self, booking_id: BookingId) -> Result<Option<A>, DomainError> {
        let aggregate = self.load(booking_id).await?;
        Ok(aggregate.id().is_some().then_some(aggregate))
    }

    /// Executes a command and appends the resulting events.
    ///
    /// `actor` is recorded on every journal entry. If another writer appended
    /// to the stream since it was loaded, nothing is written and the journal's
    /// concurrency conflict is returned.
    pub async fn execute<F>(
        &self,
        booking_id: BookingId,
        actor: &str,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let mut aggregate = self.load(booking_id).await?;
        let current_version = aggregate.version();

        let events = command_fn(&aggregate)?;

        if events.is_empty() {
            return Ok(CommandResult {
                aggregate,
                events: vec![],
                new_version: current_version,
            });
        }

        let entries = self.build_entries(booking_id, current_version, actor, &events)?;
        let new_version = self
            .journal
            .append(entries, ExpectedVersion::Exactly(current_version))
            .await?;

        for event in &events {
            aggregate.apply(event.clone());
        }
        aggregate.set_version(new_version);

        Ok(CommandResult {
            aggregate,
            events,
            new_version,
        })
    }

    /// Executes `decide` against the aggregate the command targets, recording
    /// the command's actor.
    pub async fn dispatch<C, F>(&self, cmd: &C, decide: F) -> Result<CommandResult<A>, DomainError>
    where
        C: Command<Aggregate = A>,
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        self.execute(cmd.booking_id(), &cmd.actor(), decide).await
    }

    fn build_entries(
        &self,
        booking_id: BookingId,
        current_version: Version,
        actor: &str,
        events: &[A::Event],
    ) -> Result<Vec<JournalEntry>, DomainError> {
        let mut entries = Vec::with_capacity(events.len());
        let mut version = current_version;

        for event in events {
            version = version.next();
            let entry = JournalEntry::from_event(booking_id, version, event.event_type(), event)?
                .with_actor(actor);
            entries.push(entry);
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use journal::{InMemoryJournal, JournalError};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    enum TestEvent {
        Opened { id: BookingId, name: String },
        Updated { value: i32 },
    }

    impl DomainEvent for TestEvent {
        fn event_type(&self) -> &'static str {
            match self {
                TestEvent::Opened { .. } => "TestOpened",
                TestEvent::Updated { .. } => "TestUpdated",
            }
        }
    }

    #[derive(Debug, Default)]
    struct TestAggregate {
        id: Option<BookingId>,
        name: String,
        value: i32,
        version: Version,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("invalid value: {0}")]
    struct InvalidValue(i32);

    impl From<InvalidValue> for DomainError {
        fn from(e: InvalidValue) -> Self {
            DomainError::NotFound(e.to_string())
        }
    }

    impl Aggregate for TestAggregate {
        type Event = TestEvent;
        type Error = InvalidValue;

        fn aggregate_type() -> &'static str {
            "TestAggregate"
        }

        fn id(&self) -> Option<BookingId> {
            self.id
        }

        fn version(&self) -> Version {
            self.version
        }

        fn set_version(&mut self, version: Version) {
            self.version = version;
        }

        fn apply(&mut self, event: Self::Event) {
            match event {
                TestEvent::Opened { id, name } => {
                    self.id = Some(id);
                    self.name = name;
                }
                TestEvent::Updated { value } => self.value = value,
            }
        }
    }

    struct SetValue {
        id: BookingId,
        value: i32,
    }

    impl Command for SetValue {
        type Aggregate = TestAggregate;

        fn booking_id(&self) -> BookingId {
            self.id
        }

        fn actor(&self) -> String {
            "staff:tester".to_string()
        }
    }

    fn opened(id: BookingId) -> TestEvent {
        TestEvent::Opened {
            id,
            name: "Test".to_string(),
        }
    }

    #[tokio::test]
    async fn execute_creates_aggregate() {
        let handler: CommandHandler<_, TestAggregate> = CommandHandler::new(InMemoryJournal::new());
        let id = BookingId::new();

        let result = handler
            .execute(id, "guest", |_| Ok(vec![opened(id)]))
            .await
            .unwrap();

        assert_eq!(result.events.len(), 1);
        assert_eq!(result.new_version, Version::first());
        assert_eq!(result.aggregate.id(), Some(id));
        assert_eq!(result.aggregate.name, "Test");
    }

    #[tokio::test]
    async fn execute_records_actor_and_version() {
        let journal = InMemoryJournal::new();
        let handler: CommandHandler<_, TestAggregate> = CommandHandler::new(journal.clone());
        let id = BookingId::new();

        handler
            .execute(id, "guest", |_| Ok(vec![opened(id)]))
            .await
            .unwrap();
        let result = handler
            .execute(id, "staff:front-desk", |_| {
                Ok(vec![TestEvent::Updated { value: 42 }])
            })
            .await
            .unwrap();

        assert_eq!(result.new_version, Version::new(2));
        assert_eq!(result.aggregate.value, 42);

        let entries = journal.load(id).await.unwrap();
        assert_eq!(entries[1].event_type, "TestUpdated");
        assert_eq!(entries[1].actor.as_deref(), Some("staff:front-desk"));
    }

    #[tokio::test]
    async fn dispatch_targets_the_command_stream_and_records_its_actor() {
        let journal = InMemoryJournal::new();
        let handler: CommandHandler<_, TestAggregate> = CommandHandler::new(journal.clone());
        let id = BookingId::new();
        handler
            .execute(id, "guest", |_| Ok(vec![opened(id)]))
            .await
            .unwrap();

        let cmd = SetValue { id, value: 7 };
        let result = handler
            .dispatch(&cmd, |agg| {
                if agg.id.is_none() {
                    return Err(InvalidValue(cmd.value));
                }
                Ok(vec![TestEvent::Updated { value: cmd.value }])
            })
            .await
            .unwrap();

        assert_eq!(result.aggregate.value, 7);
        let entries = journal.load(id).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].actor.as_deref(), Some("staff:tester"));
    }

    #[tokio::test]
    async fn rejected_command_writes_nothing() {
        let journal = InMemoryJournal::new();
        let handler: CommandHandler<_, TestAggregate> = CommandHandler::new(journal.clone());

        let result = handler
            .execute(BookingId::new(), "guest", |_| Err(InvalidValue(-1)))
            .await;

        assert!(result.is_err());
        assert_eq!(journal.entry_count().await, 0);
    }

    #[tokio::test]
    async fn load_existing_distinguishes_unknown_ids() {
        let handler: CommandHandler<_, TestAggregate> = CommandHandler::new(InMemoryJournal::new());
        let id = BookingId::new();

        assert!(handler.load_existing(id).await.unwrap().is_none());

        handler
            .execute(id, "guest", |_| Ok(vec![opened(id)]))
            .await
            .unwrap();
        assert_eq!(handler.load_existing(id).await.unwrap().unwrap().name, "Test");
    }

    #[tokio::test]
    async fn second_create_on_same_stream_conflicts() {
        let journal = InMemoryJournal::new();
        let id = BookingId::new();
        let first: CommandHandler<_, TestAggregate> = CommandHandler::new(journal.clone());
        first
            .execute(id, "guest", |_| Ok(vec![opened(id)]))
            .await
            .unwrap();

        // A writer that appends as if the stream were still new loses
        let stale = journal
            .append(
                vec![JournalEntry::new(id, Version::first(), "TestOpened", serde_json::json!({}))],
                ExpectedVersion::new_stream(),
            )
            .await;
        assert!(matches!(
            stale,
            Err(JournalError::ConcurrencyConflict { .. })
        ));
    }

    #[tokio::test]
    async fn empty_events_return_without_persisting() {
        let journal = InMemoryJournal::new();
        let handler: CommandHandler<_, TestAggregate> = CommandHandler::new(journal.clone());

        let result = handler
            .execute(BookingId::new(), "guest", |_| Ok(vec![]))
            .await
            .unwrap();

        assert!(result.events.is_empty());
        assert_eq!(result.new_version, Version::initial());
        assert_eq!(journal.entry_count().await, 0);
    }
}
