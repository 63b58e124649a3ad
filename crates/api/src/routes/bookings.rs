//! Booking creation, lookup, lifecycle transitions and listings.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, NaiveDate, Utc};
use common::{BookingId, ServiceId, StaffId};
use domain::{
    Actor, Aggregate, AssignStaff, Booking, BookingCode, BookingRequest, BookingService,
    BookingStatus, CancelBooking, CompleteBooking, ConfirmBooking, CustomerIdentity, MarkNoShow,
    PetSnapshot, RequestBooking, StartService,
};
use journal::{Journal, JournalEntry};
use projections::{
    BoardFilter, BookingBoardView, BookingSummary, CustomerBookingsView, Page, PageRequest,
    ProjectionProcessor,
};
use scheduling::{AvailabilityLedger, TimeWindow};
use serde::{Deserialize, Serialize};

use crate::actor::RequestActor;
use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<J: Journal, L: AvailabilityLedger> {
    pub bookings: BookingService<J, L>,
    pub board: BookingBoardView,
    pub customer_bookings: CustomerBookingsView,
    pub projection_processor: Arc<ProjectionProcessor<J>>,
}

// -- Request types --

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRequest {
    #[serde(default)]
    pub staff_note: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct CancelRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    pub staff_id: StaffId,
}

/// Zero-based `page` and `size` shared by the listings.
#[derive(Debug, Deserialize, Default)]
pub struct PageQuery {
    pub page: Option<usize>,
    pub size: Option<usize>,
}

impl PageQuery {
    fn request(&self) -> PageRequest {
        PageRequest::from_query(self.page, self.size)
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub date: Option<NaiveDate>,
    pub page: Option<usize>,
    pub size: Option<usize>,
}

// -- Response types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub id: Option<BookingId>,
    pub code: Option<BookingCode>,
    pub status: BookingStatus,
    pub service_id: Option<ServiceId>,
    pub service_name: Option<String>,
    pub date: Option<NaiveDate>,
    #[serde(flatten)]
    pub window: Option<TimeWindow>,
    pub price_cents: i64,
    pub price: String,
    pub customer: Option<CustomerIdentity>,
    pub pet: Option<PetSnapshot>,
    pub customer_note: Option<String>,
    pub staff_id: Option<StaffId>,
    pub staff_note: Option<String>,
    pub cancel_reason: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub no_show_at: Option<DateTime<Utc>>,
}

impl From<&Booking> for BookingResponse {
    fn from(booking: &Booking) -> Self {
        let details = booking.details();
        Self {
            id: booking.id(),
            code: booking.code().cloned(),
            status: booking.status(),
            service_id: booking.service_id(),
            service_name: details.map(|d| d.service_name.clone()),
            date: booking.date(),
            window: booking.window(),
            price_cents: booking.price().cents(),
            price: booking.price().to_string(),
            customer: booking.customer().cloned(),
            pet: booking.pet().cloned(),
            customer_note: details.and_then(|d| d.customer_note.clone()),
            staff_id: booking.staff_id(),
            staff_note: booking.staff_note().map(String::from),
            cancel_reason: booking.cancel_reason().map(String::from),
            created_at: booking.created_at(),
            confirmed_at: booking.confirmed_at(),
            started_at: booking.started_at(),
            completed_at: booking.completed_at(),
            cancelled_at: booking.cancelled_at(),
            no_show_at: booking.no_show_at(),
        }
    }
}

/// Row in a booking listing, built from a read model.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingListItem {
    pub id: BookingId,
    pub code: BookingCode,
    pub status: BookingStatus,
    pub service_id: ServiceId,
    pub service_name: String,
    pub date: NaiveDate,
    #[serde(flatten)]
    pub window: TimeWindow,
    pub price_cents: i64,
    pub pet_name: String,
    pub customer_name: String,
    pub staff_id: Option<StaffId>,
    pub updated_at: DateTime<Utc>,
}

impl From<BookingSummary> for BookingListItem {
    fn from(row: BookingSummary) -> Self {
        Self {
            id: row.booking_id,
            code: row.code,
            status: row.status,
            service_id: row.service_id,
            service_name: row.service_name,
            date: row.date,
            window: row.window,
            price_cents: row.price.cents(),
            pet_name: row.pet.name,
            customer_name: row.customer.display_name(),
            staff_id: row.staff_id,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntryResponse {
    pub entry_id: String,
    pub event_type: String,
    pub version: i64,
    pub recorded_at: DateTime<Utc>,
    pub actor: Option<String>,
    pub payload: serde_json::Value,
}

impl From<JournalEntry> for HistoryEntryResponse {
    fn from(entry: JournalEntry) -> Self {
        Self {
            entry_id: entry.entry_id.as_uuid().to_string(),
            event_type: entry.event_type,
            version: entry.version.as_i64(),
            recorded_at: entry.recorded_at,
            actor: entry.actor,
            payload: entry.payload,
        }
    }
}

type Reply = Result<Json<BookingResponse>, ApiError>;

// -- Handlers --

/// POST /bookings: request a booking for a window.
#[tracing::instrument(skip(state, payload))]
pub async fn create<J, L>(
    State(state): State<Arc<AppState<J, L>>>,
    RequestActor(actor): RequestActor,
    payload: Result<Json<BookingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BookingResponse>), ApiError>
where
    J: Journal + Clone + 'static,
    L: AvailabilityLedger + 'static,
{
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let created = state
        .bookings
        .create(RequestBooking::new(actor, request))
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(BookingResponse::from(&created.aggregate)),
    ))
}

/// GET /bookings/{id}
#[tracing::instrument(skip(state))]
pub async fn get<J, L>(
    State(state): State<Arc<AppState<J, L>>>,
    RequestActor(actor): RequestActor,
    Path(id): Path<String>,
) -> Reply
where
    J: Journal + Clone + 'static,
    L: AvailabilityLedger + 'static,
{
    let booking = state.bookings.get(parse_booking_id(&id)?, &actor).await?;
    Ok(Json(BookingResponse::from(&booking)))
}

/// GET /bookings/code/{code}: guest lookup; the code is the credential.
#[tracing::instrument(skip(state))]
pub async fn get_by_code<J, L>(
    State(state): State<Arc<AppState<J, L>>>,
    Path(code): Path<String>,
) -> Reply
where
    J: Journal + Clone + 'static,
    L: AvailabilityLedger + 'static,
{
    let booking = state.bookings.find_by_code(&code).await?;
    Ok(Json(BookingResponse::from(&booking)))
}

/// GET /bookings/{id}/history: the booking's journal entries.
#[tracing::instrument(skip(state))]
pub async fn history<J, L>(
    State(state): State<Arc<AppState<J, L>>>,
    RequestActor(actor): RequestActor,
    Path(id): Path<String>,
) -> Result<Json<Vec<HistoryEntryResponse>>, ApiError>
where
    J: Journal + Clone + 'static,
    L: AvailabilityLedger + 'static,
{
    let entries = state
        .bookings
        .history(parse_booking_id(&id)?, &actor)
        .await?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

/// POST /bookings/{id}/confirm
#[tracing::instrument(skip(state))]
pub async fn confirm<J, L>(
    State(state): State<Arc<AppState<J, L>>>,
    RequestActor(actor): RequestActor,
    Path(id): Path<String>,
) -> Reply
where
    J: Journal + Clone + 'static,
    L: AvailabilityLedger + 'static,
{
    let cmd = ConfirmBooking::new(parse_booking_id(&id)?, actor);
    let result = state.bookings.confirm(cmd).await?;
    Ok(Json(BookingResponse::from(&result.aggregate)))
}

/// POST /bookings/{id}/start
#[tracing::instrument(skip(state))]
pub async fn start<J, L>(
    State(state): State<Arc<AppState<J, L>>>,
    RequestActor(actor): RequestActor,
    Path(id): Path<String>,
) -> Reply
where
    J: Journal + Clone + 'static,
    L: AvailabilityLedger + 'static,
{
    let cmd = StartService::new(parse_booking_id(&id)?, actor);
    let result = state.bookings.start(cmd).await?;
    Ok(Json(BookingResponse::from(&result.aggregate)))
}

/// POST /bookings/{id}/complete: body `{staffNote}` is optional.
#[tracing::instrument(skip(state, body))]
pub async fn complete<J, L>(
    State(state): State<Arc<AppState<J, L>>>,
    RequestActor(actor): RequestActor,
    Path(id): Path<String>,
    body: Option<Json<CompleteRequest>>,
) -> Reply
where
    J: Journal + Clone + 'static,
    L: AvailabilityLedger + 'static,
{
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let mut cmd = CompleteBooking::new(parse_booking_id(&id)?, actor);
    if let Some(note) = body.staff_note {
        cmd = cmd.with_note(note);
    }
    let result = state.bookings.complete(cmd).await?;
    Ok(Json(BookingResponse::from(&result.aggregate)))
}

/// POST /bookings/{id}/cancel: body `{reason}` is required.
#[tracing::instrument(skip(state, body))]
pub async fn cancel<J, L>(
    State(state): State<Arc<AppState<J, L>>>,
    RequestActor(actor): RequestActor,
    Path(id): Path<String>,
    body: Option<Json<CancelRequest>>,
) -> Reply
where
    J: Journal + Clone + 'static,
    L: AvailabilityLedger + 'static,
{
    let reason = body.and_then(|Json(b)| b.reason).unwrap_or_default();
    let cmd = CancelBooking::new(parse_booking_id(&id)?, actor, reason);
    let result = state.bookings.cancel(cmd).await?;
    Ok(Json(BookingResponse::from(&result.aggregate)))
}

/// POST /bookings/code/{code}/cancel: guest cancellation while pending.
#[tracing::instrument(skip(state, body))]
pub async fn cancel_by_code<J, L>(
    State(state): State<Arc<AppState<J, L>>>,
    Path(code): Path<String>,
    body: Option<Json<CancelRequest>>,
) -> Reply
where
    J: Journal + Clone + 'static,
    L: AvailabilityLedger + 'static,
{
    let reason = body.and_then(|Json(b)| b.reason).unwrap_or_default();
    let result = state.bookings.cancel_by_code(&code, &reason).await?;
    Ok(Json(BookingResponse::from(&result.aggregate)))
}

/// POST /bookings/{id}/no-show
#[tracing::instrument(skip(state))]
pub async fn no_show<J, L>(
    State(state): State<Arc<AppState<J, L>>>,
    RequestActor(actor): RequestActor,
    Path(id): Path<String>,
) -> Reply
where
    J: Journal + Clone + 'static,
    L: AvailabilityLedger + 'static,
{
    let cmd = MarkNoShow::new(parse_booking_id(&id)?, actor);
    let result = state.bookings.mark_no_show(cmd).await?;
    Ok(Json(BookingResponse::from(&result.aggregate)))
}

/// POST /bookings/{id}/assign: body `{staffId}`.
#[tracing::instrument(skip(state, payload))]
pub async fn assign<J, L>(
    State(state): State<Arc<AppState<J, L>>>,
    RequestActor(actor): RequestActor,
    Path(id): Path<String>,
    payload: Result<Json<AssignRequest>, JsonRejection>,
) -> Reply
where
    J: Journal + Clone + 'static,
    L: AvailabilityLedger + 'static,
{
    let Json(body) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let cmd = AssignStaff::new(parse_booking_id(&id)?, actor, body.staff_id);
    let result = state.bookings.assign_staff(cmd).await?;
    Ok(Json(BookingResponse::from(&result.aggregate)))
}

/// GET /bookings?status=&date=&page=&size=: staff board from the read model.
#[tracing::instrument(skip(state, query))]
pub async fn list<J, L>(
    State(state): State<Arc<AppState<J, L>>>,
    RequestActor(actor): RequestActor,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Page<BookingListItem>>, ApiError>
where
    J: Journal + Clone + 'static,
    L: AvailabilityLedger + 'static,
{
    if !actor.is_staff() {
        return Err(ApiError::Forbidden(format!(
            "{} may not list bookings",
            actor.label()
        )));
    }
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let status = query
        .status
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.parse::<BookingStatus>())
        .transpose()
        .map_err(ApiError::BadRequest)?;

    // Run catch-up to ensure the read model includes latest entries
    state.projection_processor.run_catch_up().await?;

    let page = state
        .board
        .list_page(
            BoardFilter {
                status,
                date: query.date,
            },
            PageRequest::from_query(query.page, query.size),
        )
        .await;
    Ok(Json(page.map(Into::into)))
}

/// GET /bookings/mine?page=&size=: the calling customer's bookings, newest first.
#[tracing::instrument(skip(state, query))]
pub async fn mine<J, L>(
    State(state): State<Arc<AppState<J, L>>>,
    RequestActor(actor): RequestActor,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<Page<BookingListItem>>, ApiError>
where
    J: Journal + Clone + 'static,
    L: AvailabilityLedger + 'static,
{
    let Actor::Customer(customer_id) = actor else {
        return Err(ApiError::Forbidden(format!(
            "{} has no customer bookings",
            actor.label()
        )));
    };

    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    state.projection_processor.run_catch_up().await?;

    let page = state
        .customer_bookings
        .bookings_page(customer_id, query.request())
        .await;
    Ok(Json(page.map(Into::into)))
}

fn parse_booking_id(id: &str) -> Result<BookingId, ApiError> {
    id.parse::<BookingId>()
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))
}
