//! Read models for the booking query side.
//!
//! - [`Projection`] folds journal entries into a read model
//! - [`ReadModel`] reports what a view holds
//! - [`ProjectionProcessor`] feeds entries from the journal to projections
//! - Two views: the staff booking board and per-customer bookings

pub mod error;
pub mod processor;
pub mod projection;
pub mod views;

pub use error::{ProjectionError, Result};
pub use processor::ProjectionProcessor;
pub use projection::{Projection, ProjectionPosition, ReadModel, decode};
pub use views::{
    BoardFilter, BookingBoardView, BookingSummary, CustomerBookingsView, Page, PageRequest,
};
