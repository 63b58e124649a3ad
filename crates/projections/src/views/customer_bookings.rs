//! Bookings per registered customer.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{BookingId, CustomerId};
use domain::BookingEvent;
use journal::JournalEntry;
use tokio::sync::RwLock;

use super::page::{Page, PageRequest};
use super::summary::{BookingSummary, fold};
use crate::Result;
use crate::projection::{Projection, ProjectionPosition, ReadModel, decode};

#[derive(Default)]
struct State {
    bookings: HashMap<BookingId, BookingSummary>,
    by_customer: HashMap<CustomerId, Vec<BookingId>>,
}

/// A registered customer's bookings. Guest bookings are not indexed here;
/// guests reach theirs by booking code.
#[derive(Clone, Default)]
pub struct CustomerBookingsView {
    state: Arc<RwLock<State>>,
    position: Arc<RwLock<ProjectionPosition>>,
}

impl CustomerBookingsView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Newest appointment first.
    pub async fn bookings(&self, customer_id: CustomerId) -> Vec<BookingSummary> {
        let state = self.state.read().await;
        let mut rows: Vec<_> = state
            .by_customer
            .get(&customer_id)
            .into_iter()
            .flatten()
            .filter_map(|id| state.bookings.get(id).cloned())
            .collect();
        rows.sort_by(|a, b| BookingSummary::chronological(b, a));
        rows
    }

    pub async fn bookings_page(
        &self,
        customer_id: CustomerId,
        page: PageRequest,
    ) -> Page<BookingSummary> {
        Page::slice(self.bookings(customer_id).await, page)
    }
}

#[async_trait]
impl Projection for CustomerBookingsView {
    fn name(&self) -> &'static str {
        "CustomerBookingsView"
    }

    async fn handle(&self, entry: &JournalEntry) -> Result<()> {
        let event = decode(entry)?;
        let mut state = self.state.write().await;

        let customer = match &event {
            BookingEvent::BookingRequested(data) => data.customer.customer_id(),
            _ => None,
        };
        let tracked = customer.is_some() || state.bookings.contains_key(&entry.booking_id);

        if tracked {
            fold(&mut state.bookings, entry.booking_id, event);
        }
        if let Some(customer_id) = customer {
            state
                .by_customer
                .entry(customer_id)
                .or_default()
                .push(entry.booking_id);
        }
        drop(state);

        let mut pos = self.position.write().await;
        *pos = pos.advance(entry);
        Ok(())
    }

    async fn position(&self) -> ProjectionPosition {
        *self.position.read().await
    }

    async fn reset(&self) -> Result<()> {
        *self.state.write().await = State::default();
        *self.position.write().await = ProjectionPosition::zero();
        Ok(())
    }
}

impl ReadModel for CustomerBookingsView {
    fn name(&self) -> &'static str {
        "CustomerBookingsView"
    }

    fn count(&self) -> usize {
        self.state.try_read().map(|s| s.bookings.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::summary::fixtures::{entry, guest, requested};
    use chrono::NaiveDate;
    use domain::{BookingStatus, CustomerIdentity};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 5, d).unwrap()
    }

    fn registered(customer_id: CustomerId) -> CustomerIdentity {
        CustomerIdentity::Registered { customer_id }
    }

    #[tokio::test]
    async fn bookings_are_grouped_by_customer() {
        let view = CustomerBookingsView::new();
        let alice = CustomerId::new();
        let bob = CustomerId::new();

        for (customer, hour) in [(alice, 9), (bob, 10), (alice, 11)] {
            let id = BookingId::new();
            view.handle(&entry(id, 1, &requested(id, registered(customer), day(10), hour)))
                .await
                .unwrap();
        }

        assert_eq!(view.bookings(alice).await.len(), 2);
        assert_eq!(view.bookings(bob).await.len(), 1);
        assert!(view.bookings(CustomerId::new()).await.is_empty());
    }

    #[tokio::test]
    async fn newest_appointment_first() {
        let view = CustomerBookingsView::new();
        let alice = CustomerId::new();
        for (d, hour) in [(10, 9), (12, 9), (10, 15)] {
            let id = BookingId::new();
            view.handle(&entry(id, 1, &requested(id, registered(alice), day(d), hour)))
                .await
                .unwrap();
        }

        let dates: Vec<_> = view
            .bookings(alice)
            .await
            .into_iter()
            .map(|r| (r.date, r.window.start))
            .collect();
        let mut expected = dates.clone();
        expected.sort();
        expected.reverse();
        assert_eq!(dates, expected);
        assert_eq!(dates[0].0, day(12));
    }

    #[tokio::test]
    async fn bookings_page_counts_only_the_customer() {
        let view = CustomerBookingsView::new();
        let alice = CustomerId::new();
        let bob = CustomerId::new();
        for (customer, d) in [(alice, 10), (alice, 11), (alice, 12), (bob, 13)] {
            let id = BookingId::new();
            view.handle(&entry(id, 1, &requested(id, registered(customer), day(d), 9)))
                .await
                .unwrap();
        }

        let first = view.bookings_page(alice, PageRequest::new(0, 2)).await;

        assert_eq!(first.total_items, 3);
        assert_eq!(first.total_pages, 2);
        let dates: Vec<_> = first.items.iter().map(|r| r.date).collect();
        assert_eq!(dates, [day(12), day(11)]);
    }

    #[tokio::test]
    async fn guest_bookings_are_not_indexed() {
        let view = CustomerBookingsView::new();
        let id = BookingId::new();
        view.handle(&entry(id, 1, &requested(id, guest(), day(10), 10)))
            .await
            .unwrap();
        view.handle(&entry(id, 2, &BookingEvent::confirmed("staff:x")))
            .await
            .unwrap();

        assert_eq!(ReadModel::count(&view), 0);
        assert_eq!(view.position().await.entries_processed, 2);
    }

    #[tokio::test]
    async fn status_follows_lifecycle() {
        let view = CustomerBookingsView::new();
        let alice = CustomerId::new();
        let id = BookingId::new();
        view.handle(&entry(id, 1, &requested(id, registered(alice), day(10), 10)))
            .await
            .unwrap();
        view.handle(&entry(id, 2, &BookingEvent::confirmed("staff:x")))
            .await
            .unwrap();
        view.handle(&entry(id, 3, &BookingEvent::marked_no_show("staff:x")))
            .await
            .unwrap();

        let rows = view.bookings(alice).await;
        assert_eq!(rows[0].status, BookingStatus::NoShow);
    }
}
