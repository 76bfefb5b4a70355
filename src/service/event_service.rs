use std::sync::Arc;
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    domain::*,
    error::{AppError, Result},
    repository::{EventRepository, RegistrationRepository, WaitingListRepository},
    service::{history_service::HistoryService, waiting_list_service::WaitingListService},
};

pub struct EventService {
    event_repo: Arc<dyn EventRepository>,
    registration_repo: Arc<dyn RegistrationRepository>,
    waiting_list_repo: Arc<dyn WaitingListRepository>,
    history: Arc<HistoryService>,
    waiting_list: Arc<WaitingListService>,
}

impl EventService {
    pub fn new(
        event_repo: Arc<dyn EventRepository>,
        registration_repo: Arc<dyn RegistrationRepository>,
        waiting_list_repo: Arc<dyn WaitingListRepository>,
        history: Arc<HistoryService>,
        waiting_list: Arc<WaitingListService>,
    ) -> Self {
        Self {
            event_repo,
            registration_repo,
            waiting_list_repo,
            history,
            waiting_list,
        }
    }

    fn check_time_range(event: &Event) -> Result<()> {
        if event.to_time < event.from_time {
            return Err(AppError::Validation("Event cannot end before it starts".to_string()));
        }
        Ok(())
    }

    pub async fn create(&self, request: CreateEventRequest) -> Result<Event> {
        let request = request.normalized();
        request.validate()?;

        let now = Utc::now();
        let event = Event {
            id: Uuid::new_v4(),
            title: request.title,
            description: request.description,
            price: request.price,
            place: request.place,
            capacity: request.capacity,
            from_time: request.from_time,
            to_time: request.to_time,
            visible: request.visible,
            auto_promote: request.auto_promote,
            bank_account: request.bank_account,
            created_at: now,
            updated_at: now,
        };
        Self::check_time_range(&event)?;

        let event = self.event_repo.create(event).await?;
        tracing::info!("Created event {} ({})", event.id, event.title);

        self.history
            .record(HistoryEntry::new(event.id, HistoryAction::EventCreated).detail(event.title.clone()))
            .await;

        Ok(event)
    }

    pub async fn get(&self, id: Uuid) -> Result<Event> {
        self.event_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))
    }

    pub async fn list(&self, include_hidden: bool) -> Result<Vec<Event>> {
        self.event_repo.list(include_hidden).await
    }

    pub async fn list_upcoming(&self, limit: i64) -> Result<Vec<Event>> {
        self.event_repo.list_upcoming(limit).await
    }

    pub async fn summary(&self, id: Uuid) -> Result<EventSummary> {
        let event = self.get(id).await?;
        let registered = self.registration_repo.count_active(id).await?;
        let waiting = self.waiting_list_repo.count(id).await?;
        Ok(EventSummary::new(event, registered, waiting))
    }

    /// Applies a partial update. Raising capacity or switching auto-promote
    /// on pulls people off the waiting list straight away. Lowering
    /// capacity below the current head count keeps existing registrations.
    pub async fn update(&self, id: Uuid, request: UpdateEventRequest) -> Result<Event> {
        let request = request.normalized();
        request.validate()?;

        let mut event = self.get(id).await?;
        let promotion_fields_changed = request.apply(&mut event);
        Self::check_time_range(&event)?;

        let event = self.event_repo.update(event).await?;

        self.history
            .record(HistoryEntry::new(event.id, HistoryAction::EventUpdated).detail(format!(
                "capacity {}, auto-promote {}",
                event.capacity, event.auto_promote
            )))
            .await;

        if promotion_fields_changed {
            self.waiting_list.promote_if_enabled(&event).await?;
        }

        Ok(event)
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let event = self.get(id).await?;

        if !self.event_repo.delete_cascade(id).await? {
            return Err(AppError::NotFound("Event not found".to_string()));
        }

        tracing::info!("Deleted event {} ({})", id, event.title);

        self.history
            .record(HistoryEntry::new(id, HistoryAction::EventDeleted).detail(event.title))
            .await;

        Ok(())
    }
}
