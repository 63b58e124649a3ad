//! Who a booking is for, and who is acting on it.

use common::{CustomerId, PetId, StaffId};
use serde::{Deserialize, Serialize};

use super::{BookingCode, BookingError};
use crate::pets::PetType;

/// Contact details embedded in a guest booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestContact {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
}

impl GuestContact {
    /// Validates and trims guest contact fields.
    ///
    /// Name and phone are required; email is optional but must look like an
    /// address when given.
    pub fn new(
        name: Option<&str>,
        phone: Option<&str>,
        email: Option<&str>,
    ) -> Result<Self, BookingError> {
        let name = non_blank(name)
            .ok_or_else(|| BookingError::validation("guest bookings require customerName"))?;
        let phone = non_blank(phone)
            .ok_or_else(|| BookingError::validation("guest bookings require customerPhone"))?;
        let email = non_blank(email);
        if let Some(email) = &email
            && !email.contains('@')
        {
            return Err(BookingError::validation(format!(
                "customerEmail is not an email address: {email}"
            )));
        }

        Ok(Self { name, phone, email })
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Exactly one of a registered customer or an embedded guest contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CustomerIdentity {
    Registered {
        #[serde(rename = "customerId")]
        customer_id: CustomerId,
    },
    Guest(GuestContact),
}

impl CustomerIdentity {
    pub fn customer_id(&self) -> Option<CustomerId> {
        match self {
            CustomerIdentity::Registered { customer_id } => Some(*customer_id),
            CustomerIdentity::Guest(_) => None,
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            CustomerIdentity::Registered { customer_id } => format!("customer {customer_id}"),
            CustomerIdentity::Guest(contact) => contact.name.clone(),
        }
    }
}

/// Pet description supplied with a booking instead of a saved pet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestPet {
    pub name: String,
    pub pet_type: PetType,
    pub breed: Option<String>,
    /// Kilograms.
    pub weight: f64,
}

/// The pet a booking is for.
#[derive(Debug, Clone, PartialEq)]
pub enum PetSelection {
    /// A pet saved on the requesting customer's profile.
    Saved(PetId),
    Described(GuestPet),
}

/// The party performing an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Staff(StaffId),
    Customer(CustomerId),
    /// Anonymous caller without a booking code.
    Guest,
    /// Anonymous caller presenting a booking code.
    CodeHolder(BookingCode),
}

impl Actor {
    /// Label recorded on journal entries.
    pub fn label(&self) -> String {
        match self {
            Actor::Staff(id) => format!("staff:{id}"),
            Actor::Customer(id) => format!("customer:{id}"),
            Actor::Guest => "guest".to_string(),
            Actor::CodeHolder(code) => format!("code:{code}"),
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self, Actor::Staff(_))
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}
