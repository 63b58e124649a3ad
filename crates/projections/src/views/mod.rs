//! Read model views over the booking journal.

pub mod booking_board;
pub mod customer_bookings;
pub mod page;
pub mod summary;

pub use booking_board::{BoardFilter, BookingBoardView};
pub use customer_bookings::CustomerBookingsView;
pub use page::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, Page, PageRequest};
pub use summary::BookingSummary;
