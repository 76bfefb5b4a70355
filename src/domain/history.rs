use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum HistoryAction {
    Registered,
    Unregistered,
    Cancelled,
    Waitlisted,
    RemovedFromWaitlist,
    MovedFromWaitlist,
    EventCreated,
    EventUpdated,
    EventDeleted,
    AttendanceChanged,
    PaymentConfirmed,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryAction::Registered => "Registered",
            HistoryAction::Unregistered => "Unregistered",
            HistoryAction::Cancelled => "Cancelled",
            HistoryAction::Waitlisted => "Waitlisted",
            HistoryAction::RemovedFromWaitlist => "RemovedFromWaitlist",
            HistoryAction::MovedFromWaitlist => "MovedFromWaitlist",
            HistoryAction::EventCreated => "EventCreated",
            HistoryAction::EventUpdated => "EventUpdated",
            HistoryAction::EventDeleted => "EventDeleted",
            HistoryAction::AttendanceChanged => "AttendanceChanged",
            HistoryAction::PaymentConfirmed => "PaymentConfirmed",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "Registered" => Ok(HistoryAction::Registered),
            "Unregistered" => Ok(HistoryAction::Unregistered),
            "Cancelled" => Ok(HistoryAction::Cancelled),
            "Waitlisted" => Ok(HistoryAction::Waitlisted),
            "RemovedFromWaitlist" => Ok(HistoryAction::RemovedFromWaitlist),
            "MovedFromWaitlist" => Ok(HistoryAction::MovedFromWaitlist),
            "EventCreated" => Ok(HistoryAction::EventCreated),
            "EventUpdated" => Ok(HistoryAction::EventUpdated),
            "EventDeleted" => Ok(HistoryAction::EventDeleted),
            "AttendanceChanged" => Ok(HistoryAction::AttendanceChanged),
            "PaymentConfirmed" => Ok(HistoryAction::PaymentConfirmed),
            _ => Err(AppError::Database(format!("Invalid history action: {}", s))),
        }
    }
}

/// One line of the append-only registration audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub event_id: Uuid,
    pub registration_id: Option<Uuid>,
    pub waiting_list_id: Option<Uuid>,
    pub action: HistoryAction,
    pub email: Option<String>,
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(event_id: Uuid, action: HistoryAction) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id,
            registration_id: None,
            waiting_list_id: None,
            action,
            email: None,
            detail: None,
            created_at: Utc::now(),
        }
    }

    pub fn registration(mut self, id: Uuid) -> Self {
        self.registration_id = Some(id);
        self
    }

    pub fn waiting_list(mut self, id: Uuid) -> Self {
        self.waiting_list_id = Some(id);
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
