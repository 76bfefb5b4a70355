use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use uuid::Uuid;
use crate::domain::*;
use crate::error::{AppError, Result};

pub mod event_repository;
pub mod registration_repository;
pub mod waiting_list_repository;
pub mod payment_repository;
pub mod no_show_repository;

pub use event_repository::SqliteEventRepository;
pub use registration_repository::SqliteRegistrationRepository;
pub use waiting_list_repository::SqliteWaitingListRepository;
pub use payment_repository::SqlitePaymentRepository;
pub use no_show_repository::{NoShowRepository, SqliteNoShowRepository};

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn create(&self, event: Event) -> Result<Event>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Event>>;
    async fn list(&self, include_hidden: bool) -> Result<Vec<Event>>;
    async fn list_upcoming(&self, limit: i64) -> Result<Vec<Event>>;
    async fn update(&self, event: Event) -> Result<Event>;
    /// Removes the event together with its registrations, payments and
    /// waiting list. Returns false when the event did not exist.
    async fn delete_cascade(&self, id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait RegistrationRepository: Send + Sync {
    /// Inserts a registration only while the event has a free spot. The
    /// capacity check and the insert are a single statement. Returns
    /// `None` when the event is full.
    async fn create_if_capacity(
        &self,
        event: &Event,
        attendee: &Attendee,
    ) -> Result<Option<(Registration, Option<Payment>)>>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Registration>>;
    async fn find_active_by_email(&self, event_id: Uuid, email: &str) -> Result<Option<Registration>>;
    async fn list_by_event(&self, event_id: Uuid) -> Result<Vec<Registration>>;
    async fn list_by_email(&self, email: &str) -> Result<Vec<Registration>>;
    async fn count_active(&self, event_id: Uuid) -> Result<i64>;
    /// Soft cancellation. Returns false if the registration was already
    /// cancelled or does not exist.
    async fn cancel(&self, id: Uuid) -> Result<bool>;
    /// Hard delete of the registration and its payment in one transaction.
    async fn delete_with_payment(&self, id: Uuid) -> Result<Option<Registration>>;
    async fn set_attended(&self, id: Uuid, attended: bool) -> Result<Registration>;
}

#[async_trait]
pub trait WaitingListRepository: Send + Sync {
    async fn create(&self, event_id: Uuid, attendee: &Attendee) -> Result<WaitingListEntry>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<WaitingListEntry>>;
    async fn find_by_email(&self, event_id: Uuid, email: &str) -> Result<Option<WaitingListEntry>>;
    /// Entries in service order, oldest first.
    async fn list_by_event(&self, event_id: Uuid) -> Result<Vec<WaitingListEntry>>;
    async fn count(&self, event_id: Uuid) -> Result<i64>;
    async fn delete(&self, id: Uuid) -> Result<bool>;
    /// Moves as many of the oldest entries into registrations as the
    /// event has free spots, in one transaction.
    async fn promote_oldest(&self, event: &Event) -> Result<Vec<Promotion>>;
    /// Moves a single entry into a registration. Unless `force` is set the
    /// event must have a free spot.
    async fn promote_entry(&self, event: &Event, entry_id: Uuid, force: bool) -> Result<Promotion>;
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn find_by_registration(&self, registration_id: Uuid) -> Result<Option<Payment>>;
    async fn set_paid(&self, registration_id: Uuid, paid: bool) -> Result<Payment>;
}

pub(crate) fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| AppError::Database(e.to_string()))
}

pub(crate) fn parse_optional_uuid(s: Option<&str>) -> Result<Option<Uuid>> {
    s.map(parse_uuid).transpose()
}

pub(crate) fn to_utc(dt: NaiveDateTime) -> DateTime<Utc> {
    DateTime::from_naive_utc_and_offset(dt, Utc)
}
