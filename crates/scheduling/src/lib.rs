//! Scheduling for the appointment calendar.
//!
//! - [`SlotCalendar`] enumerates the windows a service can be offered in on a date
//! - [`AvailabilityLedger`] is the authoritative record of committed windows and
//!   reserves them atomically
//! - [`Clock`] supplies "now" so lead-time rules are testable

pub mod calendar;
pub mod clock;
pub mod error;
pub mod hours;
pub mod ledger;
pub mod time;

pub use calendar::{Candidates, Slot, SlotAvailability, SlotCalendar};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{LedgerError, Result};
pub use hours::BusinessHours;
pub use ledger::{
    AvailabilityLedger, AvailabilityRecord, InMemoryLedger, PostgresLedger, RecordStatus,
};
pub use time::{TimeWindow, hhmm};
