//! Booking domain events.

use chrono::{DateTime, NaiveDate, Utc};
use common::{BookingId, PetId, RecordId, ServiceId, StaffId};
use scheduling::TimeWindow;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::pets::PetType;

use super::{BookingCode, CustomerIdentity, Money};

/// Events that can occur on a booking aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum BookingEvent {
    /// Booking was requested and its window reserved.
    BookingRequested(BookingRequestedData),

    BookingConfirmed(TransitionData),

    /// The groomer started working on the pet.
    ServiceStarted(TransitionData),

    BookingCompleted(BookingCompletedData),

    BookingCancelled(BookingCancelledData),

    /// The customer did not turn up for a confirmed appointment.
    BookingMarkedNoShow(TransitionData),

    StaffAssigned(StaffAssignedData),
}

impl DomainEvent for BookingEvent {
    fn event_type(&self) -> &'static str {
        match self {
            BookingEvent::BookingRequested(_) => "BookingRequested",
            BookingEvent::BookingConfirmed(_) => "BookingConfirmed",
            BookingEvent::ServiceStarted(_) => "ServiceStarted",
            BookingEvent::BookingCompleted(_) => "BookingCompleted",
            BookingEvent::BookingCancelled(_) => "BookingCancelled",
            BookingEvent::BookingMarkedNoShow(_) => "BookingMarkedNoShow",
            BookingEvent::StaffAssigned(_) => "StaffAssigned",
        }
    }
}

/// The pet as it was when booked. Weight is frozen for pricing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetSnapshot {
    /// Set when the pet is saved on a customer profile.
    pub pet_id: Option<PetId>,
    pub name: String,
    pub pet_type: PetType,
    pub breed: Option<String>,
    pub weight: Option<f64>,
}

/// Data for BookingRequested event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequestedData {
    pub booking_id: BookingId,
    pub code: BookingCode,
    pub service_id: ServiceId,
    pub service_name: String,
    pub duration_minutes: u32,
    pub customer: CustomerIdentity,
    pub pet: PetSnapshot,
    pub date: NaiveDate,
    pub window: TimeWindow,
    /// Resolved once from the pricing tiers and never recomputed.
    pub price: Money,
    pub customer_note: Option<String>,
    /// The ledger record holding the window.
    pub record_id: RecordId,
    pub requested_at: DateTime<Utc>,
}

/// Data for transitions that carry nothing but who and when.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionData {
    pub by: String,
    pub at: DateTime<Utc>,
}

/// Data for BookingCompleted event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingCompletedData {
    pub staff_note: Option<String>,
    pub by: String,
    pub at: DateTime<Utc>,
}

/// Data for BookingCancelled event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingCancelledData {
    pub reason: String,
    pub by: String,
    pub at: DateTime<Utc>,
}

/// Data for StaffAssigned event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffAssignedData {
    pub staff_id: StaffId,
    pub by: String,
    pub at: DateTime<Utc>,
}

// Convenience constructors
impl BookingEvent {
    pub fn requested(data: BookingRequestedData) -> Self {
        BookingEvent::BookingRequested(data)
    }

    pub fn confirmed(by: impl Into<String>) -> Self {
        BookingEvent::BookingConfirmed(TransitionData::now(by))
    }

    pub fn started(by: impl Into<String>) -> Self {
        BookingEvent::ServiceStarted(TransitionData::now(by))
    }

    pub fn completed(staff_note: Option<String>, by: impl Into<String>) -> Self {
        BookingEvent::BookingCompleted(BookingCompletedData {
            staff_note,
            by: by.into(),
            at: Utc::now(),
        })
    }

    pub fn cancelled(reason: impl Into<String>, by: impl Into<String>) -> Self {
        BookingEvent::BookingCancelled(BookingCancelledData {
            reason: reason.into(),
            by: by.into(),
            at: Utc::now(),
        })
    }

    pub fn marked_no_show(by: impl Into<String>) -> Self {
        BookingEvent::BookingMarkedNoShow(TransitionData::now(by))
    }

    pub fn staff_assigned(staff_id: StaffId, by: impl Into<String>) -> Self {
        BookingEvent::StaffAssigned(StaffAssignedData {
            staff_id,
            by: by.into(),
            at: Utc::now(),
        })
    }

    /// When the event happened.
    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            BookingEvent::BookingRequested(d) => d.requested_at,
            BookingEvent::BookingConfirmed(d)
            | BookingEvent::ServiceStarted(d)
            | BookingEvent::BookingMarkedNoShow(d) => d.at,
            BookingEvent::BookingCompleted(d) => d.at,
            BookingEvent::BookingCancelled(d) => d.at,
            BookingEvent::StaffAssigned(d) => d.at,
        }
    }
}

impl TransitionData {
    fn now(by: impl Into<String>) -> Self {
        Self {
            by: by.into(),
            at: Utc::now(),
        }
    }
}
