use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, Result};
use super::{Payment, WaitingListEntry};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentType {
    Cash,
    BankTransfer,
    Card,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Cash => "Cash",
            PaymentType::BankTransfer => "BankTransfer",
            PaymentType::Card => "Card",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "Cash" => Ok(PaymentType::Cash),
            "BankTransfer" => Ok(PaymentType::BankTransfer),
            "Card" => Ok(PaymentType::Card),
            _ => Err(AppError::Database(format!("Invalid payment type: {}", s))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Registration {
    pub id: Uuid,
    pub event_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub payment_type: PaymentType,
    pub created_at: DateTime<Utc>,
    pub attended: bool,
    /// Set when the attendee cancels; the row is kept for the record.
    pub deleted: bool,
}

/// Personal details submitted when signing up for an event.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Attendee {
    #[validate(length(min = 1, max = 100, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "Last name is required"))]
    pub last_name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(max = 32, message = "Phone number is too long"))]
    pub phone: Option<String>,
    pub payment_type: PaymentType,
}

impl Attendee {
    /// Trims every field and lowercases the email so duplicate checks are
    /// case-insensitive. Run before validation so blank names are caught.
    pub fn normalized(self) -> Self {
        Self {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: normalize_email(&self.email),
            phone: self
                .phone
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
            payment_type: self.payment_type,
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationDetail {
    #[serde(flatten)]
    pub registration: Registration,
    pub payment: Option<Payment>,
}

/// Result of a sign-up: either a seat, or a place in the queue.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status")]
pub enum RegistrationOutcome {
    Registered {
        registration: Registration,
        payment: Option<Payment>,
    },
    Waitlisted {
        entry: WaitingListEntry,
        /// 1-based position in the queue.
        position: i64,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct CancelRegistrationRequest {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetAttendedRequest {
    pub attended: bool,
}
