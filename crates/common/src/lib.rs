//! Identifiers shared by every crate in the appointment workspace.

mod types;

pub use types::{BookingId, CustomerId, PetId, RecordId, ServiceId, StaffId};
