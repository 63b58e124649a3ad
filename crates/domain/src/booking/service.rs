//! Booking service providing the application API for bookings.

use std::sync::Arc;
use std::time::Instant;

use chrono::{Duration, NaiveDate, Utc};
use common::{BookingId, RecordId, ServiceId};
use journal::{Journal, JournalEntry, JournalError};
use scheduling::{
    AvailabilityLedger, BusinessHours, Clock, SlotAvailability, SlotCalendar, SystemClock,
    TimeWindow,
};

use crate::catalog::{Service, ServiceCatalog};
use crate::command::{Command, CommandHandler, CommandResult};
use crate::error::DomainError;
use crate::notify::{self, BookingNotification, DeliveryPolicy, LogNotifier, NotificationHook};
use crate::pets::PetDirectory;

use super::{
    Actor, AssignStaff, Booking, BookingCode, BookingError, BookingEvent, BookingRequestedData,
    CancelBooking, CompleteBooking, ConfirmBooking, MarkNoShow, Money, PetSelection, PetSnapshot,
    RequestBooking, ResolvedRequest, StartService, Transition,
};
use crate::aggregate::{Aggregate, DomainEvent};

/// Fresh codes tried before giving up on a booking.
const CODE_ATTEMPTS: usize = 5;

/// Service for managing bookings.
///
/// Coordinates the journal (booking streams), the availability ledger
/// (committed windows) and the collaborators that price and describe a
/// booking. Ledger reservations and journal appends are kept consistent by
/// compensation: a reservation whose booking fails to commit is released.
/// Reservations stranded by a crash between the two are left to
/// [`release_orphaned_reservations`](Self::release_orphaned_reservations).
pub struct BookingService<J: Journal, L: AvailabilityLedger> {
    handler: CommandHandler<J, Booking>,
    ledger: L,
    catalog: Arc<dyn ServiceCatalog>,
    pets: Arc<dyn PetDirectory>,
    calendar: SlotCalendar,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn NotificationHook>,
    delivery: DeliveryPolicy,
}

impl<J: Journal, L: AvailabilityLedger> BookingService<J, L> {
    /// Creates a service with default business hours, the system clock and
    /// log-only notifications.
    pub fn new(
        journal: J,
        ledger: L,
        catalog: Arc<dyn ServiceCatalog>,
        pets: Arc<dyn PetDirectory>,
    ) -> Self {
        Self {
            handler: CommandHandler::new(journal),
            ledger,
            catalog,
            pets,
            calendar: SlotCalendar::new(BusinessHours::default()),
            clock: Arc::new(SystemClock),
            notifier: Arc::new(LogNotifier),
            delivery: DeliveryPolicy::default(),
        }
    }

    pub fn with_calendar(mut self, calendar: SlotCalendar) -> Self {
        self.calendar = calendar;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationHook>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_delivery_policy(mut self, policy: DeliveryPolicy) -> Self {
        self.delivery = policy;
        self
    }

    pub fn journal(&self) -> &J {
        self.handler.journal()
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn calendar(&self) -> &SlotCalendar {
        &self.calendar
    }

    // Catalog and calendar reads

    /// Active services in display order.
    pub async fn services(&self) -> Vec<Service> {
        self.catalog.services().await
    }

    pub async fn service(&self, service_id: ServiceId) -> Result<Service, DomainError> {
        self.catalog
            .service(service_id)
            .await
            .ok_or_else(|| DomainError::NotFound(format!("service {service_id}")))
    }

    /// Candidate windows for a service on a date, flagged with availability.
    #[tracing::instrument(skip(self))]
    pub async fn slots(
        &self,
        service_id: ServiceId,
        date: NaiveDate,
    ) -> Result<Vec<SlotAvailability>, DomainError> {
        let service = self.service(service_id).await?;
        let slots = self
            .calendar
            .offerings(&self.ledger, date, service.duration_minutes, self.clock.now())
            .await?;
        Ok(slots)
    }

    /// Whether an arbitrary window is free of commitments.
    pub async fn availability(
        &self,
        date: NaiveDate,
        window: TimeWindow,
    ) -> Result<bool, DomainError> {
        Ok(self.ledger.is_free(date, window).await?)
    }

    /// Windows committed on a date, in start order.
    pub async fn ledger_day(&self, date: NaiveDate) -> Result<Vec<TimeWindow>, DomainError> {
        Ok(self.ledger.query(date).await?)
    }

    // Creation

    /// Requests a booking and reserves its window.
    ///
    /// On success the booking is `Pending`, its window is held in the ledger
    /// and its code is claimed. On failure neither a booking nor a held window
    /// is left behind.
    #[tracing::instrument(skip(self, cmd), fields(booking_id = %cmd.booking_id, actor = %cmd.actor))]
    pub async fn create(&self, cmd: RequestBooking) -> Result<CommandResult<Booking>, DomainError> {
        let started = Instant::now();
        let result = self.create_inner(cmd).await;

        match &result {
            Ok(created) => {
                metrics::counter!("bookings_created_total").increment(1);
                metrics::histogram!("booking_create_duration_seconds")
                    .record(started.elapsed().as_secs_f64());
                tracing::info!(
                    code = %created.aggregate.code().map(BookingCode::as_str).unwrap_or_default(),
                    price = %created.aggregate.price(),
                    "Booking requested"
                );
                self.notify(&created.aggregate, &created.events);
            }
            Err(e) => {
                let reason = match e {
                    DomainError::Booking(b) => b.reason(),
                    DomainError::NotFound(_) => "not_found",
                    _ => "error",
                };
                metrics::counter!("bookings_rejected_total", "reason" => reason).increment(1);
                tracing::info!(reason, error = %e, "Booking rejected");
            }
        }

        result
    }

    async fn create_inner(&self, cmd: RequestBooking) -> Result<CommandResult<Booking>, DomainError> {
        let RequestBooking {
            booking_id,
            actor,
            request,
        } = cmd;
        let resolved = request.resolve(&actor)?;

        let service = self.bookable_service(resolved.service_id).await?;
        let pet = self.pet_snapshot(&resolved).await?;
        let price = self.price(&service, &pet)?;

        let window = TimeWindow::starting_at(resolved.start, service.duration_minutes)
            .ok_or_else(|| BookingError::validation("the appointment would run past midnight"))?;
        if !self.calendar.admits(
            resolved.date,
            resolved.start,
            service.duration_minutes,
            self.clock.now(),
        ) {
            return Err(BookingError::SlotUnavailable {
                date: resolved.date,
                window,
            }
            .into());
        }

        let record = self.ledger.reserve(booking_id, resolved.date, window).await?;

        let committed = self
            .commit_request(booking_id, &actor, resolved, service, pet, price, window, record.id)
            .await;
        if committed.is_err() {
            self.compensate(record.id).await;
        }
        committed
    }

    #[allow(clippy::too_many_arguments)]
    async fn commit_request(
        &self,
        booking_id: BookingId,
        actor: &Actor,
        resolved: ResolvedRequest,
        service: Service,
        pet: PetSnapshot,
        price: Money,
        window: TimeWindow,
        record_id: RecordId,
    ) -> Result<CommandResult<Booking>, DomainError> {
        let code = self.claim_code(booking_id).await?;

        let data = BookingRequestedData {
            booking_id,
            code,
            service_id: service.id,
            service_name: service.name,
            duration_minutes: service.duration_minutes,
            customer: resolved.customer,
            pet,
            date: resolved.date,
            window,
            price,
            customer_note: resolved.customer_note,
            record_id,
            requested_at: Utc::now(),
        };

        self.handler
            .execute(booking_id, &actor.label(), move |booking| booking.request(data))
            .await
    }

    async fn bookable_service(&self, service_id: ServiceId) -> Result<Service, DomainError> {
        let service = self
            .catalog
            .service(service_id)
            .await
            .ok_or_else(|| BookingError::validation(format!("unknown service {service_id}")))?;
        if !service.active {
            return Err(BookingError::validation(format!(
                "service {} is not currently offered",
                service.name
            ))
            .into());
        }
        Ok(service)
    }

    async fn pet_snapshot(&self, resolved: &ResolvedRequest) -> Result<PetSnapshot, DomainError> {
        match &resolved.pet {
            PetSelection::Saved(pet_id) => {
                let pet = self
                    .pets
                    .pet(*pet_id)
                    .await
                    .filter(|pet| Some(pet.owner) == resolved.customer.customer_id())
                    .ok_or_else(|| {
                        BookingError::validation(format!(
                            "pet {pet_id} is not saved on this customer's profile"
                        ))
                    })?;
                Ok(PetSnapshot {
                    pet_id: Some(pet.id),
                    name: pet.name,
                    pet_type: pet.pet_type,
                    breed: pet.breed,
                    weight: pet.weight,
                })
            }
            PetSelection::Described(pet) => Ok(PetSnapshot {
                pet_id: None,
                name: pet.name.clone(),
                pet_type: pet.pet_type,
                breed: pet.breed.clone(),
                weight: Some(pet.weight),
            }),
        }
    }

    /// Resolves the price from the service's tiers. A saved pet with no
    /// recorded weight is priced at the lightest tier.
    fn price(&self, service: &Service, pet: &PetSnapshot) -> Result<Money, BookingError> {
        if !service.accepts(pet.pet_type) {
            return Err(BookingError::validation(format!(
                "{} is not offered for {} pets",
                service.name, pet.pet_type
            )));
        }
        service
            .tier_for(pet.pet_type, pet.weight.unwrap_or(0.0))
            .map(|tier| tier.price)
            .ok_or_else(|| {
                BookingError::validation(format!(
                    "{} has no price for {} pets",
                    service.name, pet.pet_type
                ))
            })
    }

    async fn claim_code(&self, booking_id: BookingId) -> Result<BookingCode, DomainError> {
        for _ in 0..CODE_ATTEMPTS {
            let code = BookingCode::generate();
            match self.journal().claim_code(code.as_str(), booking_id).await {
                Ok(()) => return Ok(code),
                Err(JournalError::CodeTaken(taken)) => {
                    tracing::debug!(code = %taken, "Booking code collision, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(JournalError::InvalidAppend(format!(
            "no free booking code after {CODE_ATTEMPTS} attempts"
        ))
        .into())
    }

    async fn compensate(&self, record_id: RecordId) {
        if let Err(e) = self.ledger.release(record_id).await {
            tracing::error!(%record_id, error = %e, "Failed to release window of a failed booking");
        } else {
            tracing::info!(%record_id, "Released window of a failed booking");
        }
    }

    /// Releases active windows whose booking never reached the journal.
    ///
    /// Only reservations older than `grace` are considered, so requests still
    /// between reserving and appending are left alone. Returns how many
    /// windows were released.
    #[tracing::instrument(skip(self))]
    pub async fn release_orphaned_reservations(
        &self,
        grace: Duration,
    ) -> Result<usize, DomainError> {
        let Some(cutoff) = Utc::now().checked_sub_signed(grace) else {
            return Ok(0);
        };
        let mut released = 0;
        for record in self.ledger.active_before(cutoff).await? {
            if self.journal().version(record.booking_id).await?.is_some() {
                continue;
            }
            self.ledger.release(record.id).await?;
            released += 1;
            tracing::info!(
                record_id = %record.id,
                booking_id = %record.booking_id,
                date = %record.date,
                window = %record.window(),
                "Released orphaned reservation"
            );
        }
        if released > 0 {
            metrics::counter!("ledger_orphans_released_total").increment(released as u64);
        }
        Ok(released)
    }

    // Transitions

    #[tracing::instrument(skip(self))]
    pub async fn confirm(&self, cmd: ConfirmBooking) -> Result<CommandResult<Booking>, DomainError> {
        self.transition(&cmd, Transition::Confirm, |b| b.confirm(&cmd.actor))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn start(&self, cmd: StartService) -> Result<CommandResult<Booking>, DomainError> {
        self.transition(&cmd, Transition::Start, |b| b.start(&cmd.actor))
            .await
    }

    /// Completes an appointment; its window is settled in the ledger.
    #[tracing::instrument(skip(self))]
    pub async fn complete(
        &self,
        cmd: CompleteBooking,
    ) -> Result<CommandResult<Booking>, DomainError> {
        self.transition(&cmd, Transition::Complete, |b| {
            b.complete(&cmd.actor, cmd.staff_note.clone())
        })
        .await
    }

    /// Cancels a booking and releases its window.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, cmd: CancelBooking) -> Result<CommandResult<Booking>, DomainError> {
        self.transition(&cmd, Transition::Cancel, |b| b.cancel(&cmd.actor, &cmd.reason))
            .await
    }

    /// Cancels the booking a guest holds the code for.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_by_code(
        &self,
        code: &str,
        reason: &str,
    ) -> Result<CommandResult<Booking>, DomainError> {
        let (code, booking_id) = self.resolve_code(code).await?;
        self.cancel(CancelBooking::new(booking_id, Actor::CodeHolder(code), reason))
            .await
    }

    /// Marks a confirmed booking as a no-show and releases its window.
    #[tracing::instrument(skip(self))]
    pub async fn mark_no_show(&self, cmd: MarkNoShow) -> Result<CommandResult<Booking>, DomainError> {
        self.transition(&cmd, Transition::MarkNoShow, |b| b.mark_no_show(&cmd.actor))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn assign_staff(
        &self,
        cmd: AssignStaff,
    ) -> Result<CommandResult<Booking>, DomainError> {
        self.transition(&cmd, Transition::AssignStaff, |b| {
            b.assign_staff(&cmd.actor, cmd.staff_id)
        })
        .await
    }

    async fn transition<C, F>(
        &self,
        cmd: &C,
        transition: Transition,
        decide: F,
    ) -> Result<CommandResult<Booking>, DomainError>
    where
        C: Command<Aggregate = Booking>,
        F: FnOnce(&Booking) -> Result<Vec<BookingEvent>, BookingError>,
    {
        let booking_id = cmd.booking_id();
        if self.journal().version(booking_id).await?.is_none() {
            return Err(DomainError::NotFound(format!("booking {booking_id}")));
        }

        let result = self.handler.dispatch(cmd, decide).await?;
        if result.events.is_empty() {
            return Ok(result);
        }

        metrics::counter!("booking_transitions_total", "transition" => transition.as_str())
            .increment(1);
        tracing::info!(
            %booking_id,
            status = %result.aggregate.status(),
            version = %result.new_version,
            "Booking {}", transition
        );

        self.follow_up_ledger(&result.aggregate, transition).await;
        self.notify(&result.aggregate, &result.events);
        Ok(result)
    }

    /// Keeps the ledger in step with a committed transition. The booking is
    /// already durable, so failures here are logged and not returned.
    async fn follow_up_ledger(&self, booking: &Booking, transition: Transition) {
        let Some(record_id) = booking.record_id() else {
            return;
        };
        let outcome = match transition {
            Transition::Cancel | Transition::MarkNoShow => self.ledger.release(record_id).await,
            Transition::Complete => self.ledger.settle(record_id).await,
            _ => return,
        };
        if let Err(e) = outcome {
            tracing::error!(%record_id, %transition, error = %e, "Ledger update failed after transition");
        }
    }

    fn notify(&self, booking: &Booking, events: &[BookingEvent]) {
        let (Some(booking_id), Some(last)) = (booking.id(), events.last()) else {
            return;
        };
        let notification = BookingNotification::for_booking(booking_id, booking, last.event_type());
        notify::dispatch(self.notifier.clone(), self.delivery, notification);
    }

    // Reads

    /// Loads a booking the actor is allowed to see.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, booking_id: BookingId, actor: &Actor) -> Result<Booking, DomainError> {
        let booking = self.load(booking_id).await?;
        if !booking.visible_to(actor) {
            return Err(BookingError::NotPermitted {
                actor: actor.label(),
                action: "view",
            }
            .into());
        }
        Ok(booking)
    }

    /// Looks a booking up by its code. Holding the code is enough to read it.
    #[tracing::instrument(skip(self))]
    pub async fn find_by_code(&self, code: &str) -> Result<Booking, DomainError> {
        let (_, booking_id) = self.resolve_code(code).await?;
        self.load(booking_id).await
    }

    /// The booking's journal entries, oldest first.
    pub async fn history(
        &self,
        booking_id: BookingId,
        actor: &Actor,
    ) -> Result<Vec<JournalEntry>, DomainError> {
        self.get(booking_id, actor).await?;
        Ok(self.journal().load(booking_id).await?)
    }

    async fn load(&self, booking_id: BookingId) -> Result<Booking, DomainError> {
        self.handler
            .load_existing(booking_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("booking {booking_id}")))
    }

    async fn resolve_code(&self, raw: &str) -> Result<(BookingCode, BookingId), DomainError> {
        let not_found = || DomainError::NotFound(format!("booking code {raw}"));
        let code = BookingCode::parse(raw).map_err(|_| not_found())?;
        let booking_id = self
            .journal()
            .resolve_code(code.as_str())
            .await?
            .ok_or_else(not_found)?;
        Ok((code, booking_id))
    }
}
