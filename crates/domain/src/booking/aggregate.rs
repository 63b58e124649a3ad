//! Booking aggregate implementation.

use chrono::{DateTime, NaiveDate, Utc};
use common::{BookingId, RecordId, ServiceId, StaffId};
use journal::Version;
use scheduling::TimeWindow;
use serde::Serialize;

use crate::aggregate::Aggregate;

use super::{
    Actor, BookingCode, BookingError, BookingEvent, BookingRequestedData, BookingStatus,
    CustomerIdentity, Money, PetSnapshot, Role, Transition, next_status,
};

/// Booking aggregate root.
///
/// A booking is created by a customer or guest in `Pending` and moved through
/// its lifecycle by staff. Everything fixed at creation (slot, pet, price)
/// lives in the requesting event; the rest is lifecycle state.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    id: Option<BookingId>,

    #[serde(skip)]
    version: Version,

    #[serde(flatten)]
    details: Option<BookingRequestedData>,

    status: BookingStatus,
    staff_id: Option<StaffId>,
    staff_note: Option<String>,
    cancel_reason: Option<String>,
    cancelled_by: Option<String>,

    confirmed_at: Option<DateTime<Utc>>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    no_show_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl Aggregate for Booking {
    type Event = BookingEvent;
    type Error = BookingError;

    fn aggregate_type() -> &'static str {
        "Booking"
    }

    fn id(&self) -> Option<BookingId> {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        self.updated_at = Some(event.occurred_at());
        match event {
            BookingEvent::BookingRequested(data) => {
                self.id = Some(data.booking_id);
                self.status = BookingStatus::Pending;
                self.details = Some(data);
            }
            BookingEvent::BookingConfirmed(data) => {
                self.status = BookingStatus::Confirmed;
                self.confirmed_at = Some(data.at);
            }
            BookingEvent::ServiceStarted(data) => {
                self.status = BookingStatus::InProgress;
                self.started_at = Some(data.at);
            }
            BookingEvent::BookingCompleted(data) => {
                self.status = BookingStatus::Completed;
                self.staff_note = data.staff_note;
                self.completed_at = Some(data.at);
            }
            BookingEvent::BookingCancelled(data) => {
                self.status = BookingStatus::Cancelled;
                self.cancel_reason = Some(data.reason);
                self.cancelled_by = Some(data.by);
                self.cancelled_at = Some(data.at);
            }
            BookingEvent::BookingMarkedNoShow(data) => {
                self.status = BookingStatus::NoShow;
                self.no_show_at = Some(data.at);
            }
            BookingEvent::StaffAssigned(data) => {
                self.staff_id = Some(data.staff_id);
            }
        }
    }
}

// Query methods
impl Booking {
    /// Everything fixed when the booking was requested.
    pub fn details(&self) -> Option<&BookingRequestedData> {
        self.details.as_ref()
    }

    pub fn status(&self) -> BookingStatus {
        self.status
    }

    pub fn code(&self) -> Option<&BookingCode> {
        self.details.as_ref().map(|d| &d.code)
    }

    pub fn service_id(&self) -> Option<ServiceId> {
        self.details.as_ref().map(|d| d.service_id)
    }

    pub fn customer(&self) -> Option<&CustomerIdentity> {
        self.details.as_ref().map(|d| &d.customer)
    }

    pub fn pet(&self) -> Option<&PetSnapshot> {
        self.details.as_ref().map(|d| &d.pet)
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.details.as_ref().map(|d| d.date)
    }

    pub fn window(&self) -> Option<TimeWindow> {
        self.details.as_ref().map(|d| d.window)
    }

    pub fn price(&self) -> Money {
        self.details
            .as_ref()
            .map(|d| d.price)
            .unwrap_or_default()
    }

    pub fn record_id(&self) -> Option<RecordId> {
        self.details.as_ref().map(|d| d.record_id)
    }

    pub fn staff_id(&self) -> Option<StaffId> {
        self.staff_id
    }

    pub fn staff_note(&self) -> Option<&str> {
        self.staff_note.as_deref()
    }

    pub fn cancel_reason(&self) -> Option<&str> {
        self.cancel_reason.as_deref()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.details.as_ref().map(|d| d.requested_at)
    }

    pub fn confirmed_at(&self) -> Option<DateTime<Utc>> {
        self.confirmed_at
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    pub fn no_show_at(&self) -> Option<DateTime<Utc>> {
        self.no_show_at
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// How `actor` relates to this booking, if at all.
    pub fn role_of(&self, actor: &Actor) -> Option<Role> {
        match actor {
            Actor::Staff(_) => Some(Role::Staff),
            Actor::Customer(id) => self
                .customer()
                .and_then(CustomerIdentity::customer_id)
                .filter(|owner| owner == id)
                .map(|_| Role::Owner),
            Actor::CodeHolder(code) => self
                .code()
                .filter(|own| *own == code)
                .map(|_| Role::Owner),
            Actor::Guest => None,
        }
    }

    /// Staff and the booking's owner may read it.
    pub fn visible_to(&self, actor: &Actor) -> bool {
        self.role_of(actor).is_some()
    }
}

// Command methods (return events)
impl Booking {
    /// Records a new booking. The window must already be reserved.
    pub fn request(&self, data: BookingRequestedData) -> Result<Vec<BookingEvent>, BookingError> {
        if self.id.is_some() {
            return Err(BookingError::AlreadyCreated);
        }

        Ok(vec![BookingEvent::requested(data)])
    }

    fn guard(&self, transition: Transition, actor: &Actor) -> Result<BookingStatus, BookingError> {
        next_status(self.status, transition, self.role_of(actor), &actor.label())
    }

    pub fn confirm(&self, actor: &Actor) -> Result<Vec<BookingEvent>, BookingError> {
        self.guard(Transition::Confirm, actor)?;
        Ok(vec![BookingEvent::confirmed(actor.label())])
    }

    pub fn start(&self, actor: &Actor) -> Result<Vec<BookingEvent>, BookingError> {
        self.guard(Transition::Start, actor)?;
        Ok(vec![BookingEvent::started(actor.label())])
    }

    pub fn complete(
        &self,
        actor: &Actor,
        staff_note: Option<String>,
    ) -> Result<Vec<BookingEvent>, BookingError> {
        self.guard(Transition::Complete, actor)?;
        let staff_note = staff_note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        Ok(vec![BookingEvent::completed(staff_note, actor.label())])
    }

    /// Cancels the booking. A non-empty reason is required.
    pub fn cancel(&self, actor: &Actor, reason: &str) -> Result<Vec<BookingEvent>, BookingError> {
        self.guard(Transition::Cancel, actor)?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(BookingError::validation("a cancellation reason is required"));
        }
        Ok(vec![BookingEvent::cancelled(reason, actor.label())])
    }

    pub fn mark_no_show(&self, actor: &Actor) -> Result<Vec<BookingEvent>, BookingError> {
        self.guard(Transition::MarkNoShow, actor)?;
        Ok(vec![BookingEvent::marked_no_show(actor.label())])
    }

    /// Assigns a groomer. Staff only, on any booking that is not finished.
    pub fn assign_staff(
        &self,
        actor: &Actor,
        staff_id: StaffId,
    ) -> Result<Vec<BookingEvent>, BookingError> {
        if !actor.is_staff() {
            return Err(BookingError::NotPermitted {
                actor: actor.label(),
                action: Transition::AssignStaff.as_str(),
            });
        }
        if self.status.is_terminal() {
            return Err(BookingError::InvalidTransition {
                status: self.status,
                transition: Transition::AssignStaff,
            });
        }
        if self.staff_id == Some(staff_id) {
            return Ok(vec![]);
        }
        Ok(vec![BookingEvent::staff_assigned(staff_id, actor.label())])
    }
}
