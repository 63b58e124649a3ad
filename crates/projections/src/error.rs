//! Projection error types.

use journal::EntryId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("Journal error: {0}")]
    Journal(#[from] journal::JournalError),

    /// An entry's payload is not a booking event this build understands.
    #[error("Cannot decode {event_type} entry {entry_id}: {source}")]
    Payload {
        entry_id: EntryId,
        event_type: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, ProjectionError>;
