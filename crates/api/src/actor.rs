//! Who is calling, taken from request headers.
//!
//! Authentication happens upstream; the gateway forwards the caller as one of
//! `x-staff-id`, `x-customer-id` or `x-booking-code`. No header means a guest.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use common::{CustomerId, StaffId};
use domain::{Actor, BookingCode};

use crate::error::ApiError;

pub const STAFF_HEADER: &str = "x-staff-id";
pub const CUSTOMER_HEADER: &str = "x-customer-id";
pub const CODE_HEADER: &str = "x-booking-code";

/// Extractor for the calling [`Actor`].
#[derive(Debug, Clone)]
pub struct RequestActor(pub Actor);

impl<S: Send + Sync> FromRequestParts<S> for RequestActor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        actor_from_headers(&parts.headers).map(RequestActor)
    }
}

/// Staff wins over customer, customer over code holder.
pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, ApiError> {
    if let Some(raw) = header(headers, STAFF_HEADER)? {
        let id = raw
            .parse::<StaffId>()
            .map_err(|e| ApiError::BadRequest(format!("Invalid {STAFF_HEADER}: {e}")))?;
        return Ok(Actor::Staff(id));
    }
    if let Some(raw) = header(headers, CUSTOMER_HEADER)? {
        let id = raw
            .parse::<CustomerId>()
            .map_err(|e| ApiError::BadRequest(format!("Invalid {CUSTOMER_HEADER}: {e}")))?;
        return Ok(Actor::Customer(id));
    }
    if let Some(raw) = header(headers, CODE_HEADER)? {
        let code = BookingCode::parse(raw)
            .map_err(|e| ApiError::BadRequest(format!("Invalid {CODE_HEADER}: {e}")))?;
        return Ok(Actor::CodeHolder(code));
    }
    Ok(Actor::Guest)
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>, ApiError> {
    match headers.get(name) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .map(|v| Some(v.trim()).filter(|v| !v.is_empty()))
            .map_err(|_| ApiError::BadRequest(format!("{name} must be ASCII"))),
    }
}
