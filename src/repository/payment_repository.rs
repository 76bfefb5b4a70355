use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use rand::Rng;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::Payment,
    error::{AppError, Result},
    repository::{parse_uuid, to_utc, PaymentRepository},
};

#[derive(FromRow)]
struct PaymentRow {
    id: String,
    registration_id: String,
    amount: i64,
    paid: bool,
    paid_at: Option<NaiveDateTime>,
    variable_symbol: String,
    created_at: NaiveDateTime,
}

pub struct SqlitePaymentRepository {
    pool: SqlitePool,
}

impl SqlitePaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_payment(row: PaymentRow) -> Result<Payment> {
        Ok(Payment {
            id: parse_uuid(&row.id)?,
            registration_id: parse_uuid(&row.registration_id)?,
            amount: row.amount,
            paid: row.paid,
            paid_at: row.paid_at.map(to_utc),
            variable_symbol: row.variable_symbol,
            created_at: to_utc(row.created_at),
        })
    }
}

/// Ten digits, never starting with zero so banks don't strip a prefix.
pub(crate) fn generate_variable_symbol() -> String {
    rand::thread_rng()
        .gen_range(1_000_000_000u64..10_000_000_000u64)
        .to_string()
}

/// Creates the unpaid payment that accompanies a new registration.
pub(crate) async fn insert_payment(
    conn: &mut SqliteConnection,
    registration_id: Uuid,
    amount: i64,
) -> Result<Payment> {
    let payment = Payment {
        id: Uuid::new_v4(),
        registration_id,
        amount,
        paid: false,
        paid_at: None,
        variable_symbol: generate_variable_symbol(),
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO payments (id, registration_id, amount, paid, paid_at, variable_symbol, created_at)
        VALUES (?, ?, ?, 0, NULL, ?, ?)
        "#
    )
    .bind(payment.id.to_string())
    .bind(registration_id.to_string())
    .bind(amount)
    .bind(&payment.variable_symbol)
    .bind(payment.created_at.naive_utc())
    .execute(&mut *conn)
    .await?;

    Ok(payment)
}

#[async_trait]
impl PaymentRepository for SqlitePaymentRepository {
    async fn find_by_registration(&self, registration_id: Uuid) -> Result<Option<Payment>> {
        let row = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT id, registration_id, amount, paid, paid_at, variable_symbol, created_at
            FROM payments
            WHERE registration_id = ?
            "#
        )
        .bind(registration_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_payment).transpose()
    }

    async fn set_paid(&self, registration_id: Uuid, paid: bool) -> Result<Payment> {
        let paid_at = paid.then(|| Utc::now().naive_utc());

        let result = sqlx::query(
            "UPDATE payments SET paid = ?, paid_at = ? WHERE registration_id = ?"
        )
        .bind(paid)
        .bind(paid_at)
        .bind(registration_id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Payment not found".to_string()));
        }

        self.find_by_registration(registration_id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve updated payment".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variable_symbol_has_ten_digits() {
        for _ in 0..100 {
            let symbol = generate_variable_symbol();
            assert_eq!(symbol.len(), 10);
            assert!(symbol.chars().all(|c| c.is_ascii_digit()));
            assert!(!symbol.starts_with('0'));
        }
    }
}
