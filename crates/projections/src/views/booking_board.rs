//! Staff board: every booking, filterable by status and date.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use common::BookingId;
use domain::BookingStatus;
use journal::JournalEntry;
use tokio::sync::RwLock;

use super::page::{Page, PageRequest};
use super::summary::{BookingSummary, fold};
use crate::Result;
use crate::projection::{Projection, ProjectionPosition, ReadModel, decode};

/// Optional filters for [`BookingBoardView::list`]. Empty matches everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoardFilter {
    pub status: Option<BookingStatus>,
    pub date: Option<NaiveDate>,
}

impl BoardFilter {
    fn matches(&self, row: &BookingSummary) -> bool {
        self.status.is_none_or(|s| row.status == s) && self.date.is_none_or(|d| row.date == d)
    }
}

/// Read model over all bookings, terminal ones included.
#[derive(Clone, Default)]
pub struct BookingBoardView {
    bookings: Arc<RwLock<HashMap<BookingId, BookingSummary>>>,
    position: Arc<RwLock<ProjectionPosition>>,
}

impl BookingBoardView {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, booking_id: BookingId) -> Option<BookingSummary> {
        self.bookings.read().await.get(&booking_id).cloned()
    }

    /// Matching bookings ordered by date, then start time.
    pub async fn list(&self, filter: BoardFilter) -> Vec<BookingSummary> {
        let mut rows: Vec<_> = self
            .bookings
            .read()
            .await
            .values()
            .filter(|row| filter.matches(row))
            .cloned()
            .collect();
        rows.sort_by(BookingSummary::chronological);
        rows
    }

    /// One page of [`list`](Self::list).
    pub async fn list_page(
        &self,
        filter: BoardFilter,
        page: PageRequest,
    ) -> Page<BookingSummary> {
        Page::slice(self.list(filter).await, page)
    }
}

#[async_trait]
impl Projection for BookingBoardView {
    fn name(&self) -> &'static str {
        "BookingBoardView"
    }

    async fn handle(&self, entry: &JournalEntry) -> Result<()> {
        let event = decode(entry)?;
        fold(&mut *self.bookings.write().await, entry.booking_id, event);

        let mut pos = self.position.write().await;
        *pos = pos.advance(entry);
        Ok(())
    }

    async fn position(&self) -> ProjectionPosition {
        *self.position.read().await
    }

    async fn reset(&self) -> Result<()> {
        self.bookings.write().await.clear();
        *self.position.write().await = ProjectionPosition::zero();
        Ok(())
    }
}

impl ReadModel for BookingBoardView {
    fn name(&self) -> &'static str {
        "BookingBoardView"
    }

    fn count(&self) -> usize {
        self.bookings.try_read().map(|b| b.len()).unwrap_or(0)
    }
}
