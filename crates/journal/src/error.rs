use thiserror::Error;

use crate::{BookingId, Version};

/// Errors raised by journal backends.
#[derive(Debug, Error)]
pub enum JournalError {
    /// Another writer appended to the stream first.
    #[error(
        "Concurrency conflict for booking {booking_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        booking_id: BookingId,
        expected: Version,
        actual: Version,
    },

    /// The booking code has already been issued.
    #[error("Booking code already issued: {0}")]
    CodeTaken(String),

    /// The entries handed to `append` do not form a contiguous run on one stream.
    #[error("Invalid append: {0}")]
    InvalidAppend(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, JournalError>;
