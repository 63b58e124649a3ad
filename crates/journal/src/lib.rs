//! Booking journal: every booking is an ordered stream of recorded events.
//!
//! Streams are versioned for optimistic concurrency, and booking codes are
//! claimed here so a code is issued at most once.

pub mod entry;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::BookingId;
pub use entry::{EntryId, JournalEntry, Version};
pub use error::{JournalError, Result};
pub use memory::InMemoryJournal;
pub use postgres::PostgresJournal;
pub use store::{EntryStream, ExpectedVersion, Journal, JournalExt};
