//! Catalog and calendar reads: services, slots, availability and the ledger.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use chrono::{NaiveDate, NaiveTime};
use common::ServiceId;
use domain::Service;
use journal::Journal;
use scheduling::{AvailabilityLedger, SlotAvailability, TimeWindow, hhmm};
use serde::{Deserialize, Serialize};

use super::bookings::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotsQuery {
    pub service_id: ServiceId,
    pub date: NaiveDate,
}

#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

#[derive(Serialize)]
pub struct AvailabilityResponse {
    pub available: bool,
}

#[derive(Serialize)]
pub struct LedgerDayResponse {
    pub date: NaiveDate,
    pub committed: Vec<TimeWindow>,
}

/// GET /services: active services in display order.
#[tracing::instrument(skip(state))]
pub async fn services<J, L>(State(state): State<Arc<AppState<J, L>>>) -> Json<Vec<Service>>
where
    J: Journal + Clone + 'static,
    L: AvailabilityLedger + 'static,
{
    Json(state.bookings.services().await)
}

/// GET /slots?serviceId&date: candidate windows with availability flags.
#[tracing::instrument(skip(state, query))]
pub async fn slots<J, L>(
    State(state): State<Arc<AppState<J, L>>>,
    query: Result<Query<SlotsQuery>, QueryRejection>,
) -> Result<Json<Vec<SlotAvailability>>, ApiError>
where
    J: Journal + Clone + 'static,
    L: AvailabilityLedger + 'static,
{
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let slots = state.bookings.slots(query.service_id, query.date).await?;
    Ok(Json(slots))
}

/// GET /availability?date&start&end: whether an arbitrary window is free.
#[tracing::instrument(skip(state, query))]
pub async fn availability<J, L>(
    State(state): State<Arc<AppState<J, L>>>,
    query: Result<Query<AvailabilityQuery>, QueryRejection>,
) -> Result<Json<AvailabilityResponse>, ApiError>
where
    J: Journal + Clone + 'static,
    L: AvailabilityLedger + 'static,
{
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let window = TimeWindow::new(query.start, query.end)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let available = state.bookings.availability(query.date, window).await?;
    Ok(Json(AvailabilityResponse { available }))
}

/// GET /ledger/{date}: windows committed on a date.
#[tracing::instrument(skip(state))]
pub async fn ledger_day<J, L>(
    State(state): State<Arc<AppState<J, L>>>,
    Path(date): Path<String>,
) -> Result<Json<LedgerDayResponse>, ApiError>
where
    J: Journal + Clone + 'static,
    L: AvailabilityLedger + 'static,
{
    let date = date
        .parse::<NaiveDate>()
        .map_err(|e| ApiError::BadRequest(format!("Invalid date '{date}': {e}")))?;
    let committed = state.bookings.ledger_day(date).await?;
    Ok(Json(LedgerDayResponse { date, committed }))
}
