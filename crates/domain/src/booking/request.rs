//! Incoming booking requests and their resolution into a single identity form.

use chrono::{NaiveDate, NaiveTime};
use common::{PetId, ServiceId};
use scheduling::hhmm;
use serde::{Deserialize, Serialize};

use super::{Actor, BookingError, CustomerIdentity, GuestContact, GuestPet, PetSelection};
use crate::pets::PetType;

/// Pet description as submitted by a client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub pet_type: Option<String>,
    #[serde(default)]
    pub breed: Option<String>,
    #[serde(default)]
    pub weight: Option<f64>,
}

/// A request to book a service, in wire form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub service_id: ServiceId,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(default)]
    pub pet_id: Option<PetId>,
    #[serde(default)]
    pub pet_info: Option<PetInfo>,
    #[serde(default)]
    pub customer_note: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
}

/// A request with its identity and pet forms decided.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRequest {
    pub service_id: ServiceId,
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub customer: CustomerIdentity,
    pub pet: PetSelection,
    pub customer_note: Option<String>,
}

impl BookingRequest {
    fn has_guest_fields(&self) -> bool {
        [
            &self.customer_name,
            &self.customer_phone,
            &self.customer_email,
        ]
        .iter()
        .any(|field| field.as_deref().is_some_and(|v| !v.trim().is_empty()))
    }

    /// Decides who the booking is for and which pet it covers.
    ///
    /// Registered customers book as themselves and must not also send guest
    /// contact fields. Anonymous callers must send a valid guest contact and
    /// describe the pet; saved pets belong to registered customers only.
    pub fn resolve(&self, actor: &Actor) -> Result<ResolvedRequest, BookingError> {
        let customer = match actor {
            Actor::Customer(customer_id) => {
                if self.has_guest_fields() {
                    return Err(BookingError::validation(
                        "a booking has exactly one customer: send either a session or guest contact fields",
                    ));
                }
                CustomerIdentity::Registered {
                    customer_id: *customer_id,
                }
            }
            Actor::Guest => CustomerIdentity::Guest(GuestContact::new(
                self.customer_name.as_deref(),
                self.customer_phone.as_deref(),
                self.customer_email.as_deref(),
            )?),
            Actor::Staff(_) | Actor::CodeHolder(_) => {
                return Err(BookingError::NotPermitted {
                    actor: actor.label(),
                    action: "create",
                });
            }
        };

        let pet = match (&self.pet_id, &self.pet_info) {
            (Some(_), Some(_)) => {
                return Err(BookingError::validation(
                    "send either petId or petInfo, not both",
                ));
            }
            (Some(pet_id), None) => {
                if customer.customer_id().is_none() {
                    return Err(BookingError::validation(
                        "saved pets can only be booked by their registered owner",
                    ));
                }
                PetSelection::Saved(*pet_id)
            }
            (None, Some(info)) => PetSelection::Described(describe(info)?),
            (None, None) => {
                return Err(BookingError::validation(
                    "a booking needs a petId or a petInfo with weight",
                ));
            }
        };

        Ok(ResolvedRequest {
            service_id: self.service_id,
            date: self.date,
            start: self.start,
            customer,
            pet,
            customer_note: self
                .customer_note
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
        })
    }
}

fn describe(info: &PetInfo) -> Result<GuestPet, BookingError> {
    let weight = info
        .weight
        .ok_or_else(|| BookingError::validation("petInfo.weight is required"))?;
    if !weight.is_finite() || weight <= 0.0 {
        return Err(BookingError::validation(format!(
            "petInfo.weight must be a positive number of kilograms, got {weight}"
        )));
    }
    let name = info
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| BookingError::validation("petInfo.name is required"))?;

    Ok(GuestPet {
        name: name.to_string(),
        pet_type: info
            .pet_type
            .as_deref()
            .map(PetType::parse)
            .unwrap_or_default(),
        breed: info
            .breed
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .map(str::to_string),
        weight,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{CustomerId, StaffId};

    fn base() -> BookingRequest {
        BookingRequest {
            service_id: ServiceId::new(),
            date: NaiveDate::from_ymd_opt(2030, 5, 10).unwrap(),
            start: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
            pet_id: None,
            pet_info: None,
            customer_note: None,
            customer_name: None,
            customer_phone: None,
            customer_email: None,
        }
    }

    fn guest_request() -> BookingRequest {
        BookingRequest {
            customer_name: Some("Ana".into()),
            customer_phone: Some("555-0100".into()),
            pet_info: Some(PetInfo {
                name: Some("Biscuit".into()),
                pet_type: Some("dog".into()),
                breed: None,
                weight: Some(8.5),
            }),
            ..base()
        }
    }

    #[test]
    fn guest_request_resolves_to_guest_identity() {
        let resolved = guest_request().resolve(&Actor::Guest).unwrap();
        assert!(matches!(resolved.customer, CustomerIdentity::Guest(ref c) if c.name == "Ana"));
        match resolved.pet {
            PetSelection::Described(pet) => {
                assert_eq!(pet.pet_type, PetType::Dog);
                assert_eq!(pet.weight, 8.5);
            }
            other => panic!("expected described pet, got {other:?}"),
        }
    }

    #[test]
    fn missing_pet_and_weight_is_a_validation_error() {
        let mut request = guest_request();
        request.pet_info = Some(PetInfo {
            name: Some("Biscuit".into()),
            ..PetInfo::default()
        });
        assert!(matches!(
            request.resolve(&Actor::Guest),
            Err(BookingError::Validation(_))
        ));

        request.pet_info = None;
        assert!(matches!(
            request.resolve(&Actor::Guest),
            Err(BookingError::Validation(_))
        ));
    }

    #[test]
    fn customer_with_guest_fields_is_rejected() {
        let customer = Actor::Customer(CustomerId::new());
        assert!(matches!(
            guest_request().resolve(&customer),
            Err(BookingError::Validation(_))
        ));
    }

    #[test]
    fn customer_may_book_a_saved_pet() {
        let customer_id = CustomerId::new();
        let pet_id = PetId::new();
        let request = BookingRequest {
            pet_id: Some(pet_id),
            ..base()
        };

        let resolved = request.resolve(&Actor::Customer(customer_id)).unwrap();
        assert_eq!(resolved.customer.customer_id(), Some(customer_id));
        assert_eq!(resolved.pet, PetSelection::Saved(pet_id));
    }

    #[test]
    fn guests_cannot_book_saved_pets() {
        let request = BookingRequest {
            pet_id: Some(PetId::new()),
            pet_info: None,
            ..guest_request()
        };
        assert!(matches!(
            request.resolve(&Actor::Guest),
            Err(BookingError::Validation(_))
        ));
    }

    #[test]
    fn staff_do_not_create_bookings() {
        assert!(matches!(
            guest_request().resolve(&Actor::Staff(StaffId::new())),
            Err(BookingError::NotPermitted { .. })
        ));
    }

    #[test]
    fn wire_form_uses_camel_case_and_hhmm() {
        let json = serde_json::json!({
            "serviceId": ServiceId::new(),
            "date": "2030-05-10",
            "start": "09:30",
            "petInfo": { "name": "Tom", "type": "CAT", "weight": 4.2 },
            "customerName": "Ana",
            "customerPhone": "555-0100"
        });
        let request: BookingRequest = serde_json::from_value(json).unwrap();
        assert_eq!(request.start, NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert_eq!(request.pet_info.unwrap().pet_type.as_deref(), Some("CAT"));
    }
}
