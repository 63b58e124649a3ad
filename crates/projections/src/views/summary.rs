//! Denormalized booking row shared by the list views.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use common::{BookingId, ServiceId, StaffId};
use domain::{
    BookingCode, BookingEvent, BookingRequestedData, BookingStatus, CustomerIdentity, Money,
    PetSnapshot,
};
use scheduling::TimeWindow;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingSummary {
    pub booking_id: BookingId,
    pub code: BookingCode,
    pub status: BookingStatus,
    pub service_id: ServiceId,
    pub service_name: String,
    pub customer: CustomerIdentity,
    pub pet: PetSnapshot,
    pub date: NaiveDate,
    pub window: TimeWindow,
    pub price: Money,
    pub staff_id: Option<StaffId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookingSummary {
    pub(crate) fn requested(data: BookingRequestedData) -> Self {
        Self {
            booking_id: data.booking_id,
            code: data.code,
            status: BookingStatus::Pending,
            service_id: data.service_id,
            service_name: data.service_name,
            customer: data.customer,
            pet: data.pet,
            date: data.date,
            window: data.window,
            price: data.price,
            staff_id: None,
            created_at: data.requested_at,
            updated_at: data.requested_at,
        }
    }

    /// Folds a lifecycle event into the row. `BookingRequested` is ignored
    /// here; rows are created with [`BookingSummary::requested`].
    pub(crate) fn apply(&mut self, event: BookingEvent) {
        match event {
            BookingEvent::BookingRequested(_) => {}
            BookingEvent::BookingConfirmed(data) => {
                self.status = BookingStatus::Confirmed;
                self.updated_at = data.at;
            }
            BookingEvent::ServiceStarted(data) => {
                self.status = BookingStatus::InProgress;
                self.updated_at = data.at;
            }
            BookingEvent::BookingCompleted(data) => {
                self.status = BookingStatus::Completed;
                self.updated_at = data.at;
            }
            BookingEvent::BookingCancelled(data) => {
                self.status = BookingStatus::Cancelled;
                self.updated_at = data.at;
            }
            BookingEvent::BookingMarkedNoShow(data) => {
                self.status = BookingStatus::NoShow;
                self.updated_at = data.at;
            }
            BookingEvent::StaffAssigned(data) => {
                self.staff_id = Some(data.staff_id);
                self.updated_at = data.at;
            }
        }
    }

    /// Calendar order: date, then start time.
    pub(crate) fn chronological(a: &Self, b: &Self) -> std::cmp::Ordering {
        (a.date, a.window.start).cmp(&(b.date, b.window.start))
    }
}

/// Applies `event` to `rows`, inserting on request and updating otherwise.
pub(crate) fn fold(
    rows: &mut HashMap<BookingId, BookingSummary>,
    booking_id: BookingId,
    event: BookingEvent,
) {
    match event {
        BookingEvent::BookingRequested(data) => {
            rows.insert(booking_id, BookingSummary::requested(data));
        }
        other => {
            if let Some(row) = rows.get_mut(&booking_id) {
                row.apply(other);
            }
        }
    }
}
