use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    pub id: Uuid,
    pub registration_id: Uuid,
    pub amount: i64,
    pub paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    /// Numeric reference the attendee puts on a bank transfer.
    pub variable_symbol: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarkPaidRequest {
    pub paid: bool,
}
