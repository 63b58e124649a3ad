//! HTTP API server for grooming appointments.
//!
//! Provides REST endpoints for slots, bookings and their lifecycle, with
//! structured logging (tracing) and Prometheus metrics.

pub mod actor;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use domain::{BookingService, InMemoryCatalog, InMemoryPetDirectory};
use journal::Journal;
use metrics_exporter_prometheus::PrometheusHandle;
use projections::{BookingBoardView, CustomerBookingsView, Projection, ProjectionProcessor};
use scheduling::{AvailabilityLedger, BusinessHours, SlotCalendar};
use tower_http::cors::{Any, CorsLayer};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tower_http::trace::TraceLayer;

use routes::bookings::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<J, L>(state: Arc<AppState<J, L>>, metrics_handle: PrometheusHandle) -> Router
where
    J: Journal + Clone + 'static,
    L: AvailabilityLedger + 'static,
{
    use routes::{bookings, calendar};

    let metrics_router = Router::new()
        .route("/metrics", get(routes::ops::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::ops::health))
        .route("/services", get(calendar::services::<J, L>))
        .route("/slots", get(calendar::slots::<J, L>))
        .route("/availability", get(calendar::availability::<J, L>))
        .route("/ledger/{date}", get(calendar::ledger_day::<J, L>))
        .route(
            "/bookings",
            post(bookings::create::<J, L>).get(bookings::list::<J, L>),
        )
        .route("/bookings/mine", get(bookings::mine::<J, L>))
        .route("/bookings/code/{code}", get(bookings::get_by_code::<J, L>))
        .route(
            "/bookings/code/{code}/cancel",
            post(bookings::cancel_by_code::<J, L>),
        )
        .route("/bookings/{id}", get(bookings::get::<J, L>))
        .route("/bookings/{id}/history", get(bookings::history::<J, L>))
        .route("/bookings/{id}/confirm", post(bookings::confirm::<J, L>))
        .route("/bookings/{id}/start", post(bookings::start::<J, L>))
        .route("/bookings/{id}/complete", post(bookings::complete::<J, L>))
        .route("/bookings/{id}/cancel", post(bookings::cancel::<J, L>))
        .route("/bookings/{id}/no-show", post(bookings::no_show::<J, L>))
        .route("/bookings/{id}/assign", post(bookings::assign::<J, L>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires read models to a booking service.
///
/// The processor replays the service's journal into the booking board and
/// customer views.
pub fn create_state<J, L>(bookings: BookingService<J, L>) -> Arc<AppState<J, L>>
where
    J: Journal + Clone + 'static,
    L: AvailabilityLedger + 'static,
{
    let board = BookingBoardView::new();
    let customer_bookings = CustomerBookingsView::new();

    let mut processor = ProjectionProcessor::new(bookings.journal().clone());
    processor.register(Box::new(board.clone()) as Box<dyn Projection>);
    processor.register(Box::new(customer_bookings.clone()) as Box<dyn Projection>);

    Arc::new(AppState {
        bookings,
        board,
        customer_bookings,
        projection_processor: Arc::new(processor),
    })
}

/// Creates the default application state: the standard service menu, an
/// empty pet directory and log-only notifications.
pub async fn create_default_state<J, L>(
    journal: J,
    ledger: L,
    hours: BusinessHours,
) -> Arc<AppState<J, L>>
where
    J: Journal + Clone + 'static,
    L: AvailabilityLedger + 'static,
{
    let bookings = BookingService::new(
        journal,
        ledger,
        Arc::new(InMemoryCatalog::seeded().await),
        Arc::new(InMemoryPetDirectory::new()),
    )
    .with_calendar(SlotCalendar::new(hours));

    create_state(bookings)
}

/// Releases ledger reservations whose booking never reached the journal,
/// once immediately and then every `every`.
///
/// Only reservations older than `grace` are touched.
pub fn spawn_reservation_sweeper<J, L>(
    state: Arc<AppState<J, L>>,
    every: Duration,
    grace: Duration,
) -> JoinHandle<()>
where
    J: Journal + Clone + 'static,
    L: AvailabilityLedger + 'static,
{
    let grace = chrono::Duration::from_std(grace).unwrap_or(chrono::Duration::MAX);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match state.bookings.release_orphaned_reservations(grace).await {
                Ok(0) => tracing::debug!("No orphaned reservations"),
                Ok(released) => tracing::info!(released, "Orphaned reservations released"),
                Err(e) => tracing::error!(error = %e, "Reservation sweep failed"),
            }
        }
    })
}
