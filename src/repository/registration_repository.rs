use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{Attendee, Event, Payment, PaymentType, Registration},
    error::{AppError, Result},
    repository::{parse_uuid, payment_repository, to_utc, RegistrationRepository},
};

#[derive(FromRow)]
struct RegistrationRow {
    id: String,
    event_id: String,
    first_name: String,
    last_name: String,
    email: String,
    phone: Option<String>,
    payment_type: String,
    created_at: NaiveDateTime,
    attended: bool,
    deleted: bool,
}

const REGISTRATION_COLUMNS: &str = r#"
    id, event_id, first_name, last_name, email, phone, payment_type,
    created_at, attended, deleted
"#;

pub struct SqliteRegistrationRepository {
    pool: SqlitePool,
}

impl SqliteRegistrationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_registration(row: RegistrationRow) -> Result<Registration> {
        Ok(Registration {
            id: parse_uuid(&row.id)?,
            event_id: parse_uuid(&row.event_id)?,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            payment_type: PaymentType::parse(&row.payment_type)?,
            created_at: to_utc(row.created_at),
            attended: row.attended,
            deleted: row.deleted,
        })
    }
}

/// Writes a registration row on an open connection or transaction.
///
/// With `capacity` set, the row is only inserted while fewer than
/// `capacity` active registrations exist for the event; the return value
/// tells whether a row was written.
pub(crate) async fn insert_registration(
    conn: &mut SqliteConnection,
    registration: &Registration,
    capacity: Option<i64>,
) -> Result<bool> {
    let event_id = registration.event_id.to_string();

    let result = sqlx::query(
        r#"
        INSERT INTO registrations (
            id, event_id, first_name, last_name, email, phone, payment_type,
            created_at, attended, deleted
        )
        SELECT ?, ?, ?, ?, ?, ?, ?, ?, 0, 0
        WHERE ? IS NULL
           OR (SELECT COUNT(*) FROM registrations WHERE event_id = ? AND deleted = 0) < ?
        "#
    )
    .bind(registration.id.to_string())
    .bind(&event_id)
    .bind(&registration.first_name)
    .bind(&registration.last_name)
    .bind(&registration.email)
    .bind(&registration.phone)
    .bind(registration.payment_type.as_str())
    .bind(registration.created_at.naive_utc())
    .bind(capacity)
    .bind(&event_id)
    .bind(capacity)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub(crate) fn new_registration(event_id: Uuid, attendee: &Attendee) -> Registration {
    Registration {
        id: Uuid::new_v4(),
        event_id,
        first_name: attendee.first_name.clone(),
        last_name: attendee.last_name.clone(),
        email: attendee.email.clone(),
        phone: attendee.phone.clone(),
        payment_type: attendee.payment_type,
        created_at: Utc::now(),
        attended: false,
        deleted: false,
    }
}

#[async_trait]
impl RegistrationRepository for SqliteRegistrationRepository {
    async fn create_if_capacity(
        &self,
        event: &Event,
        attendee: &Attendee,
    ) -> Result<Option<(Registration, Option<Payment>)>> {
        let registration = new_registration(event.id, attendee);
        let mut tx = self.pool.begin().await?;

        if !insert_registration(&mut *tx, &registration, Some(event.capacity)).await? {
            tx.rollback().await?;
            return Ok(None);
        }

        let payment = if event.requires_payment() {
            Some(payment_repository::insert_payment(&mut *tx, registration.id, event.price).await?)
        } else {
            None
        };

        tx.commit().await?;

        Ok(Some((registration, payment)))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Registration>> {
        let row = sqlx::query_as::<_, RegistrationRow>(
            &format!("SELECT {} FROM registrations WHERE id = ?", REGISTRATION_COLUMNS)
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_registration).transpose()
    }

    async fn find_active_by_email(&self, event_id: Uuid, email: &str) -> Result<Option<Registration>> {
        let row = sqlx::query_as::<_, RegistrationRow>(
            &format!(
                r#"
                SELECT {} FROM registrations
                WHERE event_id = ? AND email = ? AND deleted = 0
                "#,
                REGISTRATION_COLUMNS
            )
        )
        .bind(event_id.to_string())
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_registration).transpose()
    }

    async fn list_by_event(&self, event_id: Uuid) -> Result<Vec<Registration>> {
        let rows = sqlx::query_as::<_, RegistrationRow>(
            &format!(
                r#"
                SELECT {} FROM registrations
                WHERE event_id = ? AND deleted = 0
                ORDER BY created_at ASC, rowid ASC
                "#,
                REGISTRATION_COLUMNS
            )
        )
        .bind(event_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(Self::row_to_registration)
            .collect()
    }

    async fn list_by_email(&self, email: &str) -> Result<Vec<Registration>> {
        let rows = sqlx::query_as::<_, RegistrationRow>(
            &format!(
                r#"
                SELECT {} FROM registrations
                WHERE email = ? AND deleted = 0
                ORDER BY created_at DESC
                "#,
                REGISTRATION_COLUMNS
            )
        )
        .bind(email)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(Self::row_to_registration)
            .collect()
    }

    async fn count_active(&self, event_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM registrations WHERE event_id = ? AND deleted = 0"
        )
        .bind(event_id.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn cancel(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE registrations SET deleted = 1 WHERE id = ? AND deleted = 0"
        )
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_with_payment(&self, id: Uuid) -> Result<Option<Registration>> {
        let Some(registration) = self.find_by_id(id).await? else {
            return Ok(None);
        };

        let id_str = id.to_string();
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM payments WHERE registration_id = ?")
            .bind(&id_str)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM registrations WHERE id = ?")
            .bind(&id_str)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        tx.commit().await?;

        Ok(Some(registration))
    }

    async fn set_attended(&self, id: Uuid, attended: bool) -> Result<Registration> {
        let result = sqlx::query("UPDATE registrations SET attended = ? WHERE id = ?")
            .bind(attended)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Registration not found".to_string()));
        }

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve updated registration".to_string())
        })
    }
}
