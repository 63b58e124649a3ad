//! Booking commands.

use common::{BookingId, StaffId};

use crate::command::Command;

use super::{Actor, Booking, BookingRequest};

/// Command to request a new booking.
#[derive(Debug, Clone)]
pub struct RequestBooking {
    pub booking_id: BookingId,
    pub actor: Actor,
    pub request: BookingRequest,
}

impl RequestBooking {
    /// Creates the command with a fresh booking id.
    pub fn new(actor: Actor, request: BookingRequest) -> Self {
        Self {
            booking_id: BookingId::new(),
            actor,
            request,
        }
    }
}

impl Command for RequestBooking {
    type Aggregate = Booking;

    fn booking_id(&self) -> BookingId {
        self.booking_id
    }

    fn actor(&self) -> String {
        self.actor.label()
    }
}

/// Declares a command that carries only the booking and the acting party.
macro_rules! transition_command {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            pub booking_id: BookingId,
            pub actor: Actor,
        }

        impl $name {
            pub fn new(booking_id: BookingId, actor: Actor) -> Self {
                Self { booking_id, actor }
            }
        }

        impl Command for $name {
            type Aggregate = Booking;

            fn booking_id(&self) -> BookingId {
                self.booking_id
            }

            fn actor(&self) -> String {
                self.actor.label()
            }
        }
    };
}

transition_command!(
    /// Staff accept a pending booking.
    ConfirmBooking
);
transition_command!(
    /// The groomer begins the appointment.
    StartService
);
transition_command!(
    /// The customer did not show up.
    MarkNoShow
);

/// Command to finish an appointment.
#[derive(Debug, Clone)]
pub struct CompleteBooking {
    pub booking_id: BookingId,
    pub actor: Actor,
    pub staff_note: Option<String>,
}

impl CompleteBooking {
    pub fn new(booking_id: BookingId, actor: Actor) -> Self {
        Self {
            booking_id,
            actor,
            staff_note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.staff_note = Some(note.into());
        self
    }
}

impl Command for CompleteBooking {
    type Aggregate = Booking;

    fn booking_id(&self) -> BookingId {
        self.booking_id
    }

    fn actor(&self) -> String {
        self.actor.label()
    }
}

/// Command to cancel a booking.
#[derive(Debug, Clone)]
pub struct CancelBooking {
    pub booking_id: BookingId,
    pub actor: Actor,
    pub reason: String,
}

impl CancelBooking {
    pub fn new(booking_id: BookingId, actor: Actor, reason: impl Into<String>) -> Self {
        Self {
            booking_id,
            actor,
            reason: reason.into(),
        }
    }
}

impl Command for CancelBooking {
    type Aggregate = Booking;

    fn booking_id(&self) -> BookingId {
        self.booking_id
    }

    fn actor(&self) -> String {
        self.actor.label()
    }
}

/// Command to put a groomer on a booking.
#[derive(Debug, Clone)]
pub struct AssignStaff {
    pub booking_id: BookingId,
    pub actor: Actor,
    pub staff_id: StaffId,
}

impl AssignStaff {
    pub fn new(booking_id: BookingId, actor: Actor, staff_id: StaffId) -> Self {
        Self {
            booking_id,
            actor,
            staff_id,
        }
    }
}

impl Command for AssignStaff {
    type Aggregate = Booking;

    fn booking_id(&self) -> BookingId {
        self.booking_id
    }

    fn actor(&self) -> String {
        self.actor.label()
    }
}
