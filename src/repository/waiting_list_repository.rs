use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{Attendee, Event, PaymentType, Promotion, Registration, WaitingListEntry},
    error::{AppError, Result},
    repository::{
        parse_uuid, payment_repository, registration_repository, to_utc, WaitingListRepository,
    },
};

#[derive(FromRow)]
struct WaitingListRow {
    id: String,
    event_id: String,
    first_name: String,
    last_name: String,
    email: String,
    phone: Option<String>,
    payment_type: String,
    created_at: NaiveDateTime,
}

const ENTRY_COLUMNS: &str = r#"
    id, event_id, first_name, last_name, email, phone, payment_type, created_at
"#;

pub struct SqliteWaitingListRepository {
    pool: SqlitePool,
}

impl SqliteWaitingListRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_entry(row: WaitingListRow) -> Result<WaitingListEntry> {
        Ok(WaitingListEntry {
            id: parse_uuid(&row.id)?,
            event_id: parse_uuid(&row.event_id)?,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            payment_type: PaymentType::parse(&row.payment_type)?,
            created_at: to_utc(row.created_at),
        })
    }

    /// Removes the entry and writes its registration (plus payment for
    /// paid events). The entry delete must hit exactly one row, so an
    /// entry can never be promoted twice.
    async fn move_to_registrations(
        conn: &mut SqliteConnection,
        event: &Event,
        entry: &WaitingListEntry,
    ) -> Result<Option<Promotion>> {
        let deleted = sqlx::query("DELETE FROM waiting_list WHERE id = ? AND event_id = ?")
            .bind(entry.id.to_string())
            .bind(event.id.to_string())
            .execute(&mut *conn)
            .await?;

        if deleted.rows_affected() != 1 {
            return Ok(None);
        }

        let registration = Registration {
            id: Uuid::new_v4(),
            event_id: event.id,
            first_name: entry.first_name.clone(),
            last_name: entry.last_name.clone(),
            email: entry.email.clone(),
            phone: entry.phone.clone(),
            payment_type: entry.payment_type,
            created_at: Utc::now(),
            attended: false,
            deleted: false,
        };

        registration_repository::insert_registration(&mut *conn, &registration, None).await?;

        let payment = if event.requires_payment() {
            Some(payment_repository::insert_payment(&mut *conn, registration.id, event.price).await?)
        } else {
            None
        };

        Ok(Some(Promotion {
            waiting_list_id: entry.id,
            registration,
            payment,
        }))
    }

    /// Takes the database write lock as the transaction's first statement.
    /// Concurrent promotions then wait on the busy timeout instead of
    /// failing to upgrade a read lock.
    async fn lock_event(conn: &mut SqliteConnection, event_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE events SET updated_at = updated_at WHERE id = ?")
            .bind(event_id.to_string())
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    async fn active_count(conn: &mut SqliteConnection, event_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM registrations WHERE event_id = ? AND deleted = 0"
        )
        .bind(event_id.to_string())
        .fetch_one(&mut *conn)
        .await?;

        Ok(count)
    }
}

#[async_trait]
impl WaitingListRepository for SqliteWaitingListRepository {
    async fn create(&self, event_id: Uuid, attendee: &Attendee) -> Result<WaitingListEntry> {
        let entry = WaitingListEntry {
            id: Uuid::new_v4(),
            event_id,
            first_name: attendee.first_name.clone(),
            last_name: attendee.last_name.clone(),
            email: attendee.email.clone(),
            phone: attendee.phone.clone(),
            payment_type: attendee.payment_type,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO waiting_list (
                id, event_id, first_name, last_name, email, phone, payment_type, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(entry.id.to_string())
        .bind(event_id.to_string())
        .bind(&entry.first_name)
        .bind(&entry.last_name)
        .bind(&entry.email)
        .bind(&entry.phone)
        .bind(entry.payment_type.as_str())
        .bind(entry.created_at.naive_utc())
        .execute(&self.pool)
        .await?;

        Ok(entry)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<WaitingListEntry>> {
        let row = sqlx::query_as::<_, WaitingListRow>(
            &format!("SELECT {} FROM waiting_list WHERE id = ?", ENTRY_COLUMNS)
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_entry).transpose()
    }

    async fn find_by_email(&self, event_id: Uuid, email: &str) -> Result<Option<WaitingListEntry>> {
        let row = sqlx::query_as::<_, WaitingListRow>(
            &format!(
                "SELECT {} FROM waiting_list WHERE event_id = ? AND email = ?",
                ENTRY_COLUMNS
            )
        )
        .bind(event_id.to_string())
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_entry).transpose()
    }

    async fn list_by_event(&self, event_id: Uuid) -> Result<Vec<WaitingListEntry>> {
        let rows = sqlx::query_as::<_, WaitingListRow>(
            &format!(
                r#"
                SELECT {} FROM waiting_list
                WHERE event_id = ?
                ORDER BY created_at ASC, rowid ASC
                "#,
                ENTRY_COLUMNS
            )
        )
        .bind(event_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(Self::row_to_entry)
            .collect()
    }

    async fn count(&self, event_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM waiting_list WHERE event_id = ?")
            .bind(event_id.to_string())
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM waiting_list WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn promote_oldest(&self, event: &Event) -> Result<Vec<Promotion>> {
        let mut tx = self.pool.begin().await?;
        Self::lock_event(&mut *tx, event.id).await?;

        let available = event.capacity - Self::active_count(&mut *tx, event.id).await?;
        if available <= 0 {
            tx.rollback().await?;
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, WaitingListRow>(
            &format!(
                r#"
                SELECT {} FROM waiting_list
                WHERE event_id = ?
                ORDER BY created_at ASC, rowid ASC
                LIMIT ?
                "#,
                ENTRY_COLUMNS
            )
        )
        .bind(event.id.to_string())
        .bind(available)
        .fetch_all(&mut *tx)
        .await?;

        let mut promotions = Vec::with_capacity(rows.len());
        for row in rows {
            let entry = Self::row_to_entry(row)?;
            if let Some(promotion) = Self::move_to_registrations(&mut *tx, event, &entry).await? {
                promotions.push(promotion);
            }
        }

        tx.commit().await?;

        Ok(promotions)
    }

    async fn promote_entry(&self, event: &Event, entry_id: Uuid, force: bool) -> Result<Promotion> {
        let mut tx = self.pool.begin().await?;
        Self::lock_event(&mut *tx, event.id).await?;

        let row = sqlx::query_as::<_, WaitingListRow>(
            &format!(
                "SELECT {} FROM waiting_list WHERE id = ? AND event_id = ?",
                ENTRY_COLUMNS
            )
        )
        .bind(entry_id.to_string())
        .bind(event.id.to_string())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Waiting list entry not found".to_string()))?;

        let entry = Self::row_to_entry(row)?;

        if !force && Self::active_count(&mut *tx, event.id).await? >= event.capacity {
            tx.rollback().await?;
            return Err(AppError::Conflict("Event is full".to_string()));
        }

        let promotion = Self::move_to_registrations(&mut *tx, event, &entry)
            .await?
            .ok_or_else(|| AppError::Conflict("Waiting list entry was already promoted".to_string()))?;

        tx.commit().await?;

        Ok(promotion)
    }
}
