use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Payment, PaymentType, Registration};

/// Someone queued for a full event. Entries are served oldest first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WaitingListEntry {
    pub id: Uuid,
    pub event_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub payment_type: PaymentType,
    pub created_at: DateTime<Utc>,
}

/// A waiting-list entry that was turned into a registration.
#[derive(Debug, Clone, Serialize)]
pub struct Promotion {
    pub waiting_list_id: Uuid,
    pub registration: Registration,
    pub payment: Option<Payment>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PromoteEntryRequest {
    /// Promote even when the event is already full.
    #[serde(default)]
    pub force: bool,
}
