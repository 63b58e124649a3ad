use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::{AvailabilityLedger, BusinessHours, Result, TimeWindow, time::hhmm};

/// A candidate window for a service on a date. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

impl Slot {
    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start: self.start,
            end: self.end,
        }
    }
}

/// A slot annotated with whether it can be booked right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotAvailability {
    #[serde(flatten)]
    pub slot: Slot,
    pub available: bool,
}

/// Lazy, finite sequence of candidate slots for one date and duration.
///
/// Cloning yields an independent iterator from the same position, so a
/// fresh `candidates()` call or a clone restarts the walk.
#[derive(Debug, Clone)]
pub struct Candidates {
    date: NaiveDate,
    next_start: Option<NaiveTime>,
    duration_minutes: u32,
    step: Duration,
    close: NaiveTime,
}

impl Iterator for Candidates {
    type Item = Slot;

    fn next(&mut self) -> Option<Slot> {
        let start = self.next_start?;
        let Some(window) = TimeWindow::starting_at(start, self.duration_minutes)
            .filter(|w| w.end <= self.close)
        else {
            self.next_start = None;
            return None;
        };

        let (following, wrapped) = start.overflowing_add_signed(self.step);
        self.next_start = (wrapped == 0 && following < self.close).then_some(following);

        Some(Slot {
            date: self.date,
            start: window.start,
            end: window.end,
        })
    }
}

/// Computes offerable slots from business hours and ledger commitments.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlotCalendar {
    hours: BusinessHours,
}

impl SlotCalendar {
    pub fn new(hours: BusinessHours) -> Self {
        Self { hours }
    }

    pub fn hours(&self) -> &BusinessHours {
        &self.hours
    }

    /// Every window of `duration_minutes` starting on the step grid from
    /// opening time that ends no later than closing time, ascending.
    pub fn candidates(&self, date: NaiveDate, duration_minutes: u32) -> Candidates {
        Candidates {
            date,
            next_start: (duration_minutes > 0).then_some(self.hours.open),
            duration_minutes,
            step: Duration::minutes(i64::from(self.hours.step_minutes)),
            close: self.hours.close,
        }
    }

    /// Annotates candidates against the committed windows of that date.
    ///
    /// A slot is unavailable if it overlaps any commitment or starts before
    /// the earliest bookable instant. Dates already in the past yield nothing.
    pub fn offer(
        &self,
        date: NaiveDate,
        duration_minutes: u32,
        committed: &[TimeWindow],
        now: NaiveDateTime,
    ) -> Vec<SlotAvailability> {
        if date < now.date() {
            return Vec::new();
        }
        let earliest = self.hours.earliest_bookable(now);

        self.candidates(date, duration_minutes)
            .map(|slot| {
                let window = slot.window();
                let available = date.and_time(slot.start) >= earliest
                    && !committed.iter().any(|c| c.overlaps(&window));
                SlotAvailability { slot, available }
            })
            .collect()
    }

    /// [`offer`](Self::offer) using the ledger's current commitments.
    pub async fn offerings<L>(
        &self,
        ledger: &L,
        date: NaiveDate,
        duration_minutes: u32,
        now: NaiveDateTime,
    ) -> Result<Vec<SlotAvailability>>
    where
        L: AvailabilityLedger + ?Sized,
    {
        if date < now.date() {
            return Ok(Vec::new());
        }
        let committed = ledger.query(date).await?;
        Ok(self.offer(date, duration_minutes, &committed, now))
    }

    /// Whether a booking may be requested at `start` on `date`: the start is
    /// on the grid, the appointment fits in business hours, and the lead time
    /// is respected. Says nothing about ledger occupancy.
    pub fn admits(
        &self,
        date: NaiveDate,
        start: NaiveTime,
        duration_minutes: u32,
        now: NaiveDateTime,
    ) -> bool {
        date.and_time(start) >= self.hours.earliest_bookable(now)
            && self
                .candidates(date, duration_minutes)
                .any(|slot| slot.start == start)
    }
}
