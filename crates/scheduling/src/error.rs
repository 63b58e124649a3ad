use chrono::NaiveDate;
use thiserror::Error;

use crate::TimeWindow;

/// Errors raised by the ledger and by schedule configuration.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The window overlaps a commitment that still occupies capacity.
    #[error("Slot unavailable: {date} {window}")]
    SlotUnavailable { date: NaiveDate, window: TimeWindow },

    #[error("Invalid window: {0}")]
    InvalidWindow(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
