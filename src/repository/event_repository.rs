use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use sqlx::{SqlitePool, FromRow};
use uuid::Uuid;

use crate::{
    domain::Event,
    error::{AppError, Result},
    repository::{parse_uuid, to_utc, EventRepository},
};

#[derive(FromRow)]
struct EventRow {
    id: String,
    title: String,
    description: String,
    price: i64,
    place: String,
    capacity: i64,
    from_time: NaiveDateTime,
    to_time: NaiveDateTime,
    visible: bool,
    auto_promote: bool,
    bank_account: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

const EVENT_COLUMNS: &str = r#"
    id, title, description, price, place, capacity, from_time, to_time,
    visible, auto_promote, bank_account, created_at, updated_at
"#;

pub struct SqliteEventRepository {
    pool: SqlitePool,
}

impl SqliteEventRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_event(row: EventRow) -> Result<Event> {
        Ok(Event {
            id: parse_uuid(&row.id)?,
            title: row.title,
            description: row.description,
            price: row.price,
            place: row.place,
            capacity: row.capacity,
            from_time: to_utc(row.from_time),
            to_time: to_utc(row.to_time),
            visible: row.visible,
            auto_promote: row.auto_promote,
            bank_account: row.bank_account,
            created_at: to_utc(row.created_at),
            updated_at: to_utc(row.updated_at),
        })
    }
}

#[async_trait]
impl EventRepository for SqliteEventRepository {
    async fn create(&self, event: Event) -> Result<Event> {
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO events (
                id, title, description, price, place, capacity, from_time, to_time,
                visible, auto_promote, bank_account, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(event.id.to_string())
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.price)
        .bind(&event.place)
        .bind(event.capacity)
        .bind(event.from_time.naive_utc())
        .bind(event.to_time.naive_utc())
        .bind(event.visible)
        .bind(event.auto_promote)
        .bind(&event.bank_account)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.find_by_id(event.id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created event".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Event>> {
        let row = sqlx::query_as::<_, EventRow>(
            &format!("SELECT {} FROM events WHERE id = ?", EVENT_COLUMNS)
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_event).transpose()
    }

    async fn list(&self, include_hidden: bool) -> Result<Vec<Event>> {
        let rows = sqlx::query_as::<_, EventRow>(
            &format!(
                "SELECT {} FROM events WHERE visible = 1 OR ? ORDER BY from_time ASC",
                EVENT_COLUMNS
            )
        )
        .bind(include_hidden)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(Self::row_to_event)
            .collect()
    }

    async fn list_upcoming(&self, limit: i64) -> Result<Vec<Event>> {
        let now = Utc::now().naive_utc();

        let rows = sqlx::query_as::<_, EventRow>(
            &format!(
                r#"
                SELECT {} FROM events
                WHERE visible = 1 AND to_time > ?
                ORDER BY from_time ASC
                LIMIT ?
                "#,
                EVENT_COLUMNS
            )
        )
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(Self::row_to_event)
            .collect()
    }

    async fn update(&self, event: Event) -> Result<Event> {
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            r#"
            UPDATE events
            SET title = ?, description = ?, price = ?, place = ?, capacity = ?,
                from_time = ?, to_time = ?, visible = ?, auto_promote = ?,
                bank_account = ?, updated_at = ?
            WHERE id = ?
            "#
        )
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.price)
        .bind(&event.place)
        .bind(event.capacity)
        .bind(event.from_time.naive_utc())
        .bind(event.to_time.naive_utc())
        .bind(event.visible)
        .bind(event.auto_promote)
        .bind(&event.bank_account)
        .bind(now)
        .bind(event.id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Event not found".to_string()));
        }

        self.find_by_id(event.id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve updated event".to_string())
        })
    }

    async fn delete_cascade(&self, id: Uuid) -> Result<bool> {
        let id_str = id.to_string();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            DELETE FROM payments
            WHERE registration_id IN (SELECT id FROM registrations WHERE event_id = ?)
            "#
        )
        .bind(&id_str)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM registrations WHERE event_id = ?")
            .bind(&id_str)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM waiting_list WHERE event_id = ?")
            .bind(&id_str)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM events WHERE id = ?")
            .bind(&id_str)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }
}
