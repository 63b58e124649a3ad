//! Domain error types.

use journal::JournalError;
use scheduling::LedgerError;
use thiserror::Error;

use crate::booking::BookingError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Journal error: {0}")]
    Journal(#[from] JournalError),

    /// Ledger failures other than an unavailable slot.
    #[error("Ledger error: {0}")]
    Ledger(LedgerError),

    #[error(transparent)]
    Booking(#[from] BookingError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<LedgerError> for DomainError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::SlotUnavailable { date, window } => {
                DomainError::Booking(BookingError::SlotUnavailable { date, window })
            }
            other => DomainError::Ledger(other),
        }
    }
}

impl DomainError {
    /// True when another writer changed the booking first; retrying may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            DomainError::Journal(JournalError::ConcurrencyConflict { .. })
        )
    }
}
