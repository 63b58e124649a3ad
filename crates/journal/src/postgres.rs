use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    BookingId, EntryId, JournalEntry, JournalError, Result, Version,
    store::{EntryStream, ExpectedVersion, Journal, validate_append},
};

const UNIQUE_BOOKING_VERSION: &str = "unique_booking_version";
const BOOKING_CODES_PKEY: &str = "booking_codes_pkey";

/// PostgreSQL-backed journal.
#[derive(Clone)]
pub struct PostgresJournal {
    pool: PgPool,
}

impl PostgresJournal {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the workspace migrations, including the ledger tables.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_entry(row: PgRow) -> Result<JournalEntry> {
        Ok(JournalEntry {
            entry_id: EntryId::from_uuid(row.try_get::<Uuid, _>("id")?),
            booking_id: BookingId::from_uuid(row.try_get::<Uuid, _>("booking_id")?),
            event_type: row.try_get("event_type")?,
            version: Version::new(row.try_get("version")?),
            recorded_at: row.try_get("recorded_at")?,
            actor: row.try_get("actor")?,
            payload: row.try_get("payload")?,
        })
    }
}

#[async_trait]
impl Journal for PostgresJournal {
    #[tracing::instrument(skip(self, entries), fields(count = entries.len()))]
    async fn append(
        &self,
        entries: Vec<JournalEntry>,
        expected: ExpectedVersion,
    ) -> Result<Version> {
        validate_append(&entries)?;

        let booking_id = entries[0].booking_id;
        let mut tx = self.pool.begin().await?;

        if let ExpectedVersion::Exactly(expected) = expected {
            let current: Option<i64> =
                sqlx::query_scalar("SELECT MAX(version) FROM booking_journal WHERE booking_id = $1")
                    .bind(booking_id.as_uuid())
                    .fetch_one(&mut *tx)
                    .await?;

            let actual = Version::new(current.unwrap_or(0));
            if actual != expected {
                return Err(JournalError::ConcurrencyConflict {
                    booking_id,
                    expected,
                    actual,
                });
            }
        }

        let mut last_version = Version::initial();
        for entry in &entries {
            sqlx::query(
                r#"
                INSERT INTO booking_journal (id, booking_id, event_type, version, recorded_at, actor, payload)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(entry.entry_id.as_uuid())
            .bind(entry.booking_id.as_uuid())
            .bind(&entry.event_type)
            .bind(entry.version.as_i64())
            .bind(entry.recorded_at)
            .bind(&entry.actor)
            .bind(&entry.payload)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                // A racing writer committed the same version between our check and insert.
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.constraint() == Some(UNIQUE_BOOKING_VERSION)
                {
                    return JournalError::ConcurrencyConflict {
                        booking_id,
                        expected: match expected {
                            ExpectedVersion::Exactly(v) => v,
                            ExpectedVersion::Any => Version::initial(),
                        },
                        actual: entry.version,
                    };
                }
                JournalError::Database(e)
            })?;

            last_version = entry.version;
        }

        tx.commit().await?;
        Ok(last_version)
    }

    async fn load(&self, booking_id: BookingId) -> Result<Vec<JournalEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, booking_id, event_type, version, recorded_at, actor, payload
            FROM booking_journal
            WHERE booking_id = $1
            ORDER BY version ASC
            "#,
        )
        .bind(booking_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_entry).collect()
    }

    async fn stream_all(&self) -> Result<EntryStream> {
        use futures_util::StreamExt;

        let stream = sqlx::query(
            r#"
            SELECT id, booking_id, event_type, version, recorded_at, actor, payload
            FROM booking_journal
            ORDER BY seq ASC
            "#,
        )
        .fetch(&self.pool)
        .map(|result| match result {
            Ok(row) => Self::row_to_entry(row),
            Err(e) => Err(JournalError::Database(e)),
        });

        Ok(Box::pin(stream))
    }

    async fn version(&self, booking_id: BookingId) -> Result<Option<Version>> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM booking_journal WHERE booking_id = $1")
                .bind(booking_id.as_uuid())
                .fetch_one(&self.pool)
                .await?;

        Ok(version.map(Version::new))
    }

    async fn claim_code(&self, code: &str, booking_id: BookingId) -> Result<()> {
        sqlx::query("INSERT INTO booking_codes (code, booking_id) VALUES ($1, $2)")
            .bind(code)
            .bind(booking_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.constraint() == Some(BOOKING_CODES_PKEY)
                {
                    return JournalError::CodeTaken(code.to_string());
                }
                JournalError::Database(e)
            })?;

        Ok(())
    }

    async fn resolve_code(&self, code: &str) -> Result<Option<BookingId>> {
        let id: Option<Uuid> =
            sqlx::query_scalar("SELECT booking_id FROM booking_codes WHERE code = $1")
                .bind(code)
                .fetch_optional(&self.pool)
                .await?;

        Ok(id.map(BookingId::from_uuid))
    }
}
