//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{BookingError, DomainError};
use journal::JournalError;
use projections::ProjectionError;
use thiserror::Error;

/// API-level error type that maps to HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    /// Malformed request: bad JSON, query string or header.
    #[error("{0}")]
    BadRequest(String),

    /// The caller may not use this endpoint at all.
    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Read model unavailable: {0}")]
    Projection(#[from] ProjectionError),
}

impl ApiError {
    fn status_and_reason(&self) -> (StatusCode, Option<&'static str>) {
        match self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, Some("not_found")),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, Some("bad_request")),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, Some("not_permitted")),
            ApiError::Domain(err) => domain_status(err),
            ApiError::Projection(_) => (StatusCode::INTERNAL_SERVER_ERROR, None),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, reason) = self.status_and_reason();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(error = %message, "internal server error");
        }

        let body = match reason {
            Some(reason) => serde_json::json!({ "error": message, "reason": reason }),
            None => serde_json::json!({ "error": message }),
        };
        (status, axum::Json(body)).into_response()
    }
}

fn domain_status(err: &DomainError) -> (StatusCode, Option<&'static str>) {
    match err {
        DomainError::Booking(booking_err) => {
            let status = match booking_err {
                BookingError::Validation(_) => StatusCode::BAD_REQUEST,
                BookingError::NotPermitted { .. } => StatusCode::FORBIDDEN,
                BookingError::SlotUnavailable { .. }
                | BookingError::InvalidTransition { .. }
                | BookingError::AlreadyCreated => StatusCode::CONFLICT,
            };
            (status, Some(booking_err.reason()))
        }
        DomainError::NotFound(_) => (StatusCode::NOT_FOUND, Some("not_found")),
        DomainError::Journal(JournalError::ConcurrencyConflict { .. }) => {
            (StatusCode::CONFLICT, Some("concurrency_conflict"))
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, None),
    }
}
