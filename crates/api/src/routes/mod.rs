//! HTTP route handlers.

pub mod bookings;
pub mod calendar;
pub mod ops;
