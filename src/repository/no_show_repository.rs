use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{NoShow, Registration},
    error::Result,
    repository::{parse_uuid, to_utc},
};

#[async_trait]
pub trait NoShowRepository: Send + Sync {
    /// Records a no-show for each registration. Registrations that already
    /// have one are skipped; returns the number of rows written.
    async fn record(&self, registrations: &[Registration]) -> Result<u64>;
    async fn list(&self, email: Option<&str>) -> Result<Vec<NoShow>>;
}

#[derive(FromRow)]
struct NoShowRow {
    id: String,
    event_id: String,
    registration_id: String,
    email: String,
    first_name: String,
    last_name: String,
    created_at: NaiveDateTime,
}

pub struct SqliteNoShowRepository {
    pool: SqlitePool,
}

impl SqliteNoShowRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_no_show(row: NoShowRow) -> Result<NoShow> {
        Ok(NoShow {
            id: parse_uuid(&row.id)?,
            event_id: parse_uuid(&row.event_id)?,
            registration_id: parse_uuid(&row.registration_id)?,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            created_at: to_utc(row.created_at),
        })
    }
}

#[async_trait]
impl NoShowRepository for SqliteNoShowRepository {
    async fn record(&self, registrations: &[Registration]) -> Result<u64> {
        let now = Utc::now().naive_utc();
        let mut tx = self.pool.begin().await?;
        let mut written = 0;

        for registration in registrations {
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO no_shows (
                    id, event_id, registration_id, email, first_name, last_name, created_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?)
                "#
            )
            .bind(Uuid::new_v4().to_string())
            .bind(registration.event_id.to_string())
            .bind(registration.id.to_string())
            .bind(&registration.email)
            .bind(&registration.first_name)
            .bind(&registration.last_name)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            written += result.rows_affected();
        }

        tx.commit().await?;

        Ok(written)
    }

    async fn list(&self, email: Option<&str>) -> Result<Vec<NoShow>> {
        let rows = sqlx::query_as::<_, NoShowRow>(
            r#"
            SELECT id, event_id, registration_id, email, first_name, last_name, created_at
            FROM no_shows
            WHERE ? IS NULL OR email = ?
            ORDER BY created_at DESC
            "#
        )
        .bind(email)
        .bind(email)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(Self::row_to_no_show)
            .collect()
    }
}
