//! Booking aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod identity;
mod request;
mod service;
mod status;
mod value_objects;

pub use aggregate::Booking;
pub use commands::*;
pub use events::{
    BookingCancelledData, BookingCompletedData, BookingEvent, BookingRequestedData, PetSnapshot,
    StaffAssignedData, TransitionData,
};
pub use identity::{Actor, CustomerIdentity, GuestContact, GuestPet, PetSelection};
pub use request::{BookingRequest, PetInfo, ResolvedRequest};
pub use service::BookingService;
pub use status::{BookingStatus, Role, Transition, next_status};
pub use value_objects::{BookingCode, InvalidBookingCode, Money};

use chrono::NaiveDate;
use scheduling::TimeWindow;
use thiserror::Error;

/// Errors that can occur during booking operations.
#[derive(Debug, Error)]
pub enum BookingError {
    /// Malformed or incomplete request.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The window was not free at commit time.
    #[error("Slot unavailable: {window} on {date}")]
    SlotUnavailable { date: NaiveDate, window: TimeWindow },

    /// The booking's current status does not allow the operation.
    #[error("Invalid transition: cannot {transition} a {status} booking")]
    InvalidTransition {
        status: BookingStatus,
        transition: Transition,
    },

    /// The actor may never perform the operation on this booking.
    #[error("{actor} is not permitted to {action} this booking")]
    NotPermitted { actor: String, action: &'static str },

    #[error("Booking already created")]
    AlreadyCreated,
}

impl BookingError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        BookingError::Validation(message.into())
    }

    /// Short label used for the `reason` metric dimension.
    pub fn reason(&self) -> &'static str {
        match self {
            BookingError::Validation(_) => "validation",
            BookingError::SlotUnavailable { .. } => "slot_unavailable",
            BookingError::InvalidTransition { .. } => "invalid_transition",
            BookingError::NotPermitted { .. } => "not_permitted",
            BookingError::AlreadyCreated => "already_created",
        }
    }
}
