//! Booking state machine.

use serde::{Deserialize, Serialize};

use super::BookingError;

/// The status of a booking in its lifecycle.
///
/// ```text
/// Pending ──► Confirmed ──► InProgress ──► Completed
///    │            │
///    │            ├──► NoShow
///    └────────────┴──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl BookingStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Completed | BookingStatus::Cancelled | BookingStatus::NoShow
        )
    }

    /// Whether a booking in this status holds its window in the ledger.
    pub fn occupies_calendar(&self) -> bool {
        matches!(
            self,
            BookingStatus::Pending | BookingStatus::Confirmed | BookingStatus::InProgress
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::InProgress => "IN_PROGRESS",
            BookingStatus::Completed => "COMPLETED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::NoShow => "NO_SHOW",
        }
    }

    pub const ALL: [BookingStatus; 6] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::InProgress,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
        BookingStatus::NoShow,
    ];
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = String;

    /// Case-insensitive; accepts `-` in place of `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase().replace('-', "_");
        BookingStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| format!("unknown booking status: {s}"))
    }
}

/// A guarded status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Transition {
    Confirm,
    Start,
    Complete,
    Cancel,
    MarkNoShow,
    /// Not a status change; only ever performed by staff on a live booking.
    AssignStaff,
}

impl Transition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transition::Confirm => "confirm",
            Transition::Start => "start",
            Transition::Complete => "complete",
            Transition::Cancel => "cancel",
            Transition::MarkNoShow => "no-show",
            Transition::AssignStaff => "assign-staff",
        }
    }
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an actor relates to a particular booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Staff,
    /// The registered customer on the booking, or whoever holds its code.
    Owner,
}

struct Rule {
    from: BookingStatus,
    transition: Transition,
    to: BookingStatus,
    roles: &'static [Role],
}

const STAFF: &[Role] = &[Role::Staff];
const STAFF_OR_OWNER: &[Role] = &[Role::Staff, Role::Owner];

const RULES: &[Rule] = &[
    Rule {
        from: BookingStatus::Pending,
        transition: Transition::Confirm,
        to: BookingStatus::Confirmed,
        roles: STAFF,
    },
    Rule {
        from: BookingStatus::Pending,
        transition: Transition::Cancel,
        to: BookingStatus::Cancelled,
        roles: STAFF_OR_OWNER,
    },
    Rule {
        from: BookingStatus::Confirmed,
        transition: Transition::Start,
        to: BookingStatus::InProgress,
        roles: STAFF,
    },
    Rule {
        from: BookingStatus::Confirmed,
        transition: Transition::Cancel,
        to: BookingStatus::Cancelled,
        roles: STAFF,
    },
    Rule {
        from: BookingStatus::Confirmed,
        transition: Transition::MarkNoShow,
        to: BookingStatus::NoShow,
        roles: STAFF,
    },
    Rule {
        from: BookingStatus::InProgress,
        transition: Transition::Complete,
        to: BookingStatus::Completed,
        roles: STAFF,
    },
];

/// Decides the outcome of `transition` from `from` for an actor in `role`.
///
/// An actor whose role appears in no rule for the transition is never allowed
/// to perform it: `NotPermitted`. Otherwise the transition must be listed from
/// the current status for that role, or it is an `InvalidTransition`.
pub fn next_status(
    from: BookingStatus,
    transition: Transition,
    role: Option<Role>,
    actor: &str,
) -> Result<BookingStatus, BookingError> {
    let ever_allowed = role.is_some_and(|role| {
        RULES
            .iter()
            .any(|r| r.transition == transition && r.roles.contains(&role))
    });
    if !ever_allowed {
        return Err(BookingError::NotPermitted {
            actor: actor.to_string(),
            action: transition.as_str(),
        });
    }

    RULES
        .iter()
        .find(|r| {
            r.from == from
                && r.transition == transition
                && role.is_some_and(|role| r.roles.contains(&role))
        })
        .map(|r| r.to)
        .ok_or(BookingError::InvalidTransition {
            status: from,
            transition,
        })
}
