use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use common::{BookingId, RecordId};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use super::{AvailabilityLedger, AvailabilityRecord, RecordStatus};
use crate::{LedgerError, Result, TimeWindow};

/// First key of the two-key advisory lock; the second is the date.
const LOCK_NAMESPACE: i32 = 0x5107;
const UNIQUE_ACTIVE_START: &str = "unique_active_start";

/// PostgreSQL-backed ledger.
///
/// `reserve` takes a transaction-scoped advisory lock on the date, so the
/// overlap check and the insert form one critical section across every
/// server process sharing the database.
#[derive(Clone)]
pub struct PostgresLedger {
    pool: PgPool,
}

impl PostgresLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_record(row: PgRow) -> Result<AvailabilityRecord> {
        let status: String = row.try_get("status")?;
        let status = status
            .parse::<RecordStatus>()
            .map_err(|e| LedgerError::Database(sqlx::Error::Decode(e.into())))?;

        Ok(AvailabilityRecord {
            id: RecordId::from_uuid(row.try_get::<Uuid, _>("id")?),
            booking_id: BookingId::from_uuid(row.try_get::<Uuid, _>("booking_id")?),
            date: row.try_get("service_date")?,
            start: row.try_get("start_time")?,
            end: row.try_get("end_time")?,
            status,
            reserved_at: row.try_get("reserved_at")?,
            closed_at: row.try_get("closed_at")?,
        })
    }

    async fn close(&self, record_id: RecordId, to: RecordStatus) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE availability_records
            SET status = $2, closed_at = NOW()
            WHERE id = $1 AND status = 'active'
            "#,
        )
        .bind(record_id.as_uuid())
        .bind(to.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl AvailabilityLedger for PostgresLedger {
    #[tracing::instrument(skip(self, window), fields(window = %window))]
    async fn reserve(
        &self,
        booking_id: BookingId,
        date: NaiveDate,
        window: TimeWindow,
    ) -> Result<AvailabilityRecord> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1, $2)")
            .bind(LOCK_NAMESPACE)
            .bind(date.num_days_from_ce())
            .execute(&mut *tx)
            .await?;

        let clash: Option<(NaiveTime, NaiveTime)> = sqlx::query_as(
            r#"
            SELECT start_time, end_time
            FROM availability_records
            WHERE service_date = $1 AND status = 'active'
              AND start_time < $3 AND $2 < end_time
            LIMIT 1
            "#,
        )
        .bind(date)
        .bind(window.start)
        .bind(window.end)
        .fetch_optional(&mut *tx)
        .await?;

        if clash.is_some() {
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

        sqlx::query(
            r#"
            INSERT INTO availability_records (id, booking_id, service_date, start_time, end_time, status, reserved_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.booking_id.as_uuid())
        .bind(record.date)
        .bind(record.start)
        .bind(record.end)
        .bind(record.status.as_str())
        .bind(record.reserved_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some(UNIQUE_ACTIVE_START)
            {
                return LedgerError::SlotUnavailable { date, window };
            }
            LedgerError::Database(e)
        })?;

        tx.commit().await?;

        metrics::counter!("ledger_reservations_total").increment(1);
        tracing::debug!(record_id = %record.id, "Window reserved");
        Ok(record)
    }

    async fn release(&self, record_id: RecordId) -> Result<()> {
        if self.close(record_id, RecordStatus::Released).await? {
            metrics::counter!("ledger_releases_total").increment(1);
            tracing::debug!(%record_id, "Window released");
        }
        Ok(())
    }

    async fn settle(&self, record_id: RecordId) -> Result<()> {
        if self.close(record_id, RecordStatus::Fulfilled).await? {
            tracing::debug!(%record_id, "Window settled");
        }
        Ok(())
    }

    async fn query(&self, date: NaiveDate) -> Result<Vec<TimeWindow>> {
        let rows: Vec<(NaiveTime, NaiveTime)> = sqlx::query_as(
            r#"
            SELECT start_time, end_time
            FROM availability_records
            WHERE service_date = $1 AND status = 'active'
            ORDER BY start_time ASC
            "#,
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(start, end)| TimeWindow { start, end })
            .collect())
    }

    async fn records(&self, date: NaiveDate) -> Result<Vec<AvailabilityRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, booking_id, service_date, start_time, end_time, status, reserved_at, closed_at
            FROM availability_records
            WHERE service_date = $1
            ORDER BY start_time ASC, reserved_at ASC
            "#,
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_record).collect()
    }

    async fn active_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<AvailabilityRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, booking_id, service_date, start_time, end_time, status, reserved_at, closed_at
            FROM availability_records
            WHERE status = 'active' AND reserved_at < $1
            ORDER BY reserved_at ASC
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_record).collect()
    }
}
