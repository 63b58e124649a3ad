//! Domain layer for grooming appointments.
//!
//! This crate provides:
//! - Aggregate and DomainEvent traits for event-sourced entities
//! - Command trait and CommandHandler for command processing
//! - The Booking aggregate with its table-driven lifecycle
//! - Service catalog and pet directory collaborators
//! - The notification hook and `BookingService`

pub mod aggregate;
pub mod booking;
pub mod catalog;
pub mod command;
pub mod error;
pub mod notify;
pub mod pets;

pub use aggregate::{Aggregate, DomainEvent};
pub use booking::{
    Actor, AssignStaff, Booking, BookingCode, BookingError, BookingEvent, BookingRequest,
    BookingRequestedData, BookingService, BookingStatus, CancelBooking, CompleteBooking,
    ConfirmBooking, CustomerIdentity, GuestContact, GuestPet, MarkNoShow, Money, PetInfo,
    PetSnapshot, RequestBooking, StartService, Transition,
};
pub use catalog::{InMemoryCatalog, PricingTier, Service, ServiceCatalog};
pub use command::{Command, CommandHandler, CommandResult};
pub use error::DomainError;
pub use notify::{BookingNotification, DeliveryPolicy, LogNotifier, NotificationHook, NotifyError};
pub use pets::{InMemoryPetDirectory, Pet, PetDirectory, PetType};
