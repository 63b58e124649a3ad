//! Value objects for bookings.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Money amount represented in cents to avoid floating point issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Money {
    /// Amount in cents (e.g., 1000 = $10.00)
    cents: i64,
}

impl Money {
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    pub fn from_dollars(dollars: i64) -> Self {
        Self {
            cents: dollars * 100,
        }
    }

    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Whole-dollar part.
    pub fn dollars(&self) -> i64 {
        self.cents / 100
    }

    pub fn cents_part(&self) -> i64 {
        self.cents.abs() % 100
    }

    pub fn is_positive(&self) -> bool {
        self.cents > 0
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.cents < 0 {
            write!(f, "-${}.{:02}", self.dollars().abs(), self.cents_part())
        } else {
            write!(f, "${}.{:02}", self.dollars(), self.cents_part())
        }
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents + rhs.cents,
        }
    }
}

/// Crockford base-32: no I, L, O or U, so codes read back unambiguously.
const CROCKFORD: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";
const CODE_PREFIX: &str = "BK-";
const CODE_LEN: usize = 8;

/// Short human-readable booking reference, e.g. `BK-7QX2M9KD`.
///
/// Codes are generated from fresh random entropy; uniqueness is enforced
/// when the code is claimed in the journal, not here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BookingCode(String);

impl BookingCode {
    pub fn generate() -> Self {
        let mut bits = Uuid::new_v4().as_u128();
        let mut body = String::with_capacity(CODE_LEN);
        for _ in 0..CODE_LEN {
            body.push(char::from(CROCKFORD[(bits & 0x1f) as usize]));
            bits >>= 5;
        }
        Self(format!("{CODE_PREFIX}{body}"))
    }

    /// Parses a code as a person might type it: case-insensitive, with the
    /// look-alike letters I, L and O read as 1, 1 and 0.
    pub fn parse(value: &str) -> Result<Self, InvalidBookingCode> {
        let upper = value.trim().to_ascii_uppercase();
        let body = upper
            .strip_prefix(CODE_PREFIX)
            .ok_or_else(|| InvalidBookingCode(value.to_string()))?;

        if body.len() != CODE_LEN {
            return Err(InvalidBookingCode(value.to_string()));
        }

        let normalized: Option<String> = body
            .chars()
            .map(|c| match c {
                'I' | 'L' => Some('1'),
                'O' => Some('0'),
                c if c.is_ascii() && CROCKFORD.contains(&(c as u8)) => Some(c),
                _ => None,
            })
            .collect();

        normalized
            .map(|body| Self(format!("{CODE_PREFIX}{body}")))
            .ok_or_else(|| InvalidBookingCode(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BookingCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for BookingCode {
    type Err = InvalidBookingCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for BookingCode {
    type Error = InvalidBookingCode;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<BookingCode> for String {
    fn from(code: BookingCode) -> Self {
        code.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid booking code: {0}")]
pub struct InvalidBookingCode(pub String);
