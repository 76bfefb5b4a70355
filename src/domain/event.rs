use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    /// Price in minor currency units. Zero means the event is free and no
    /// payment is tracked for its registrations.
    pub price: i64,
    pub place: String,
    /// Upper bound on active (not cancelled) registrations.
    pub capacity: i64,
    pub from_time: DateTime<Utc>,
    pub to_time: DateTime<Utc>,
    pub visible: bool,
    pub auto_promote: bool,
    pub bank_account: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        self.to_time < now
    }

    pub fn requires_payment(&self) -> bool {
        self.price > 0
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateEventRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub price: i64,
    #[serde(default)]
    pub place: String,
    #[validate(range(min = 0, message = "Capacity cannot be negative"))]
    pub capacity: i64,
    pub from_time: DateTime<Utc>,
    pub to_time: DateTime<Utc>,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub auto_promote: bool,
    pub bank_account: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, Validate)]
pub struct UpdateEventRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub price: Option<i64>,
    pub place: Option<String>,
    #[validate(range(min = 0, message = "Capacity cannot be negative"))]
    pub capacity: Option<i64>,
    pub from_time: Option<DateTime<Utc>>,
    pub to_time: Option<DateTime<Utc>>,
    pub visible: Option<bool>,
    pub auto_promote: Option<bool>,
    pub bank_account: Option<String>,
}

impl CreateEventRequest {
    pub fn normalized(mut self) -> Self {
        self.title = self.title.trim().to_string();
        self
    }
}

impl UpdateEventRequest {
    pub fn normalized(mut self) -> Self {
        self.title = self.title.map(|t| t.trim().to_string());
        self
    }

    /// Applies the patch to `event` and reports whether the fields that
    /// drive waiting-list promotion (capacity, auto-promote) changed.
    pub fn apply(self, event: &mut Event) -> bool {
        let before = (event.capacity, event.auto_promote);

        if let Some(title) = self.title {
            event.title = title;
        }
        if let Some(description) = self.description {
            event.description = description;
        }
        if let Some(price) = self.price {
            event.price = price;
        }
        if let Some(place) = self.place {
            event.place = place;
        }
        if let Some(capacity) = self.capacity {
            event.capacity = capacity;
        }
        if let Some(from_time) = self.from_time {
            event.from_time = from_time;
        }
        if let Some(to_time) = self.to_time {
            event.to_time = to_time;
        }
        if let Some(visible) = self.visible {
            event.visible = visible;
        }
        if let Some(auto_promote) = self.auto_promote {
            event.auto_promote = auto_promote;
        }
        if self.bank_account.is_some() {
            event.bank_account = self.bank_account;
        }

        before != (event.capacity, event.auto_promote)
    }
}

/// Occupancy snapshot of an event.
#[derive(Debug, Clone, Serialize)]
pub struct EventSummary {
    #[serde(flatten)]
    pub event: Event,
    pub registered: i64,
    pub waiting: i64,
    pub free_spots: i64,
}

impl EventSummary {
    pub fn new(event: Event, registered: i64, waiting: i64) -> Self {
        let free_spots = (event.capacity - registered).max(0);
        Self { event, registered, waiting, free_spots }
    }
}
