use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use common::{BookingId, RecordId};
use tokio::sync::{Mutex, RwLock};

use super::{AvailabilityLedger, AvailabilityRecord, RecordStatus};
use crate::{LedgerError, Result, TimeWindow};

type DaySheet = Arc<Mutex<Vec<AvailabilityRecord>>>;

/// In-memory ledger.
///
/// Each date has its own sheet behind a mutex, so reservations on different
/// dates never contend and reservations on one date are serialized.
#[derive(Clone, Default)]
pub struct InMemoryLedger {
    days: Arc<RwLock<HashMap<NaiveDate, DaySheet>>>,
    index: Arc<RwLock<HashMap<RecordId, NaiveDate>>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    async fn sheet(&self, date: NaiveDate) -> DaySheet {
        if let Some(sheet) = self.days.read().await.get(&date) {
            return sheet.clone();
        }
        self.days.write().await.entry(date).or_default().clone()
    }

    async fn existing_sheet(&self, record_id: RecordId) -> Option<DaySheet> {
        let date = *self.index.read().await.get(&record_id)?;
        self.days.read().await.get(&date).cloned()
    }

    /// Moves an active record to `to`. Returns whether anything changed.
    async fn close(&self, record_id: RecordId, to: RecordStatus) -> bool {
        let Some(sheet) = self.existing_sheet(record_id).await else {
            return false;
        };
        let mut records = sheet.lock().await;
        match records
            .iter_mut()
            .find(|r| r.id == record_id && r.status.occupies())
        {
            Some(record) => {
                record.status = to;
                record.closed_at = Some(Utc::now());
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl AvailabilityLedger for InMemoryLedger {
    async fn reserve(
        &self,
        booking_id: BookingId,
        date: NaiveDate,
        window: TimeWindow,
    ) -> Result<AvailabilityRecord> {
        let sheet = self.sheet(date).await;
        let mut records = sheet.lock().await;

        if records
            .iter()
            .any(|r| r.status.occupies() && r.window().overlaps(&window))
        {
            metrics::counter!("ledger_conflicts_total").increment(1);
            return Err(LedgerError::SlotUnavailable { date, window });
        }

        let record = AvailabilityRecord {
            id: RecordId::new(),
            booking_id,
            date,
            start: window.start,
            end: window.end,
            status: RecordStatus::Active,
            reserved_at: Utc::now(),
            closed_at: None,
        };
        records.push(record.clone());
        self.index.write().await.insert(record.id, date);

        metrics::counter!("ledger_reservations_total").increment(1);
        tracing::debug!(%date, %window, record_id = %record.id, "Window reserved");
        Ok(record)
    }

    async fn release(&self, record_id: RecordId) -> Result<()> {
        if self.close(record_id, RecordStatus::Released).await {
            metrics::counter!("ledger_releases_total").increment(1);
            tracing::debug!(%record_id, "Window released");
        }
        Ok(())
    }

    async fn settle(&self, record_id: RecordId) -> Result<()> {
        if self.close(record_id, RecordStatus::Fulfilled).await {
            tracing::debug!(%record_id, "Window settled");
        }
        Ok(())
    }

    async fn query(&self, date: NaiveDate) -> Result<Vec<TimeWindow>> {
        let Some(sheet) = self.days.read().await.get(&date).cloned() else {
            return Ok(Vec::new());
        };
        let records = sheet.lock().await;
        let mut windows: Vec<TimeWindow> = records
            .iter()
            .filter(|r| r.status.occupies())
            .map(AvailabilityRecord::window)
            .collect();
        windows.sort();
        Ok(windows)
    }

    async fn records(&self, date: NaiveDate) -> Result<Vec<AvailabilityRecord>> {
        let Some(sheet) = self.days.read().await.get(&date).cloned() else {
            return Ok(Vec::new());
        };
        let mut records = sheet.lock().await.clone();
        records.sort_by_key(|r| (r.start, r.reserved_at));
        Ok(records)
    }

    async fn active_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<AvailabilityRecord>> {
        let sheets: Vec<DaySheet> = self.days.read().await.values().cloned().collect();
        let mut stale = Vec::new();
        for sheet in sheets {
            stale.extend(
                sheet
                    .lock()
                    .await
                    .iter()
                    .filter(|r| r.status.occupies() && r.reserved_at < cutoff)
                    .cloned(),
            );
        }
        stale.sort_by_key(|r| r.reserved_at);
        Ok(stale)
    }
}
