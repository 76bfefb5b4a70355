use std::sync::Arc;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    domain::{Attendee, Event, HistoryAction, HistoryEntry, Promotion, WaitingListEntry},
    error::{AppError, Result},
    integrations::{IntegrationEvent, IntegrationManager},
    repository::{EventRepository, WaitingListRepository},
    service::history_service::HistoryService,
};

pub struct WaitingListService {
    event_repo: Arc<dyn EventRepository>,
    waiting_list_repo: Arc<dyn WaitingListRepository>,
    history: Arc<HistoryService>,
    integration_manager: Arc<IntegrationManager>,
}

impl WaitingListService {
    pub fn new(
        event_repo: Arc<dyn EventRepository>,
        waiting_list_repo: Arc<dyn WaitingListRepository>,
        history: Arc<HistoryService>,
        integration_manager: Arc<IntegrationManager>,
    ) -> Self {
        Self {
            event_repo,
            waiting_list_repo,
            history,
            integration_manager,
        }
    }

    async fn load_event(&self, event_id: Uuid) -> Result<Event> {
        self.event_repo
            .find_by_id(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))
    }

    /// Entries for an event in the order they will be served.
    pub async fn list(&self, event_id: Uuid) -> Result<Vec<WaitingListEntry>> {
        self.load_event(event_id).await?;
        self.waiting_list_repo.list_by_event(event_id).await
    }

    /// 1-based position of an entry in its event's queue.
    pub async fn position(&self, entry: &WaitingListEntry) -> Result<i64> {
        let entries = self.waiting_list_repo.list_by_event(entry.event_id).await?;
        entries
            .iter()
            .position(|e| e.id == entry.id)
            .map(|idx| idx as i64 + 1)
            .ok_or_else(|| AppError::NotFound("Waiting list entry not found".to_string()))
    }

    /// Queues an attendee for a full event. Duplicate checks are the
    /// caller's job.
    pub async fn join(&self, event: &Event, attendee: &Attendee) -> Result<(WaitingListEntry, i64)> {
        let entry = self.waiting_list_repo.create(event.id, attendee).await?;
        let position = self.position(&entry).await?;

        tracing::info!(
            "Added {} to waiting list of event {} at position {}",
            entry.email, event.id, position
        );

        self.history
            .record(
                HistoryEntry::new(event.id, HistoryAction::Waitlisted)
                    .waiting_list(entry.id)
                    .email(entry.email.clone())
                    .detail(format!("position {}", position)),
            )
            .await;

        self.integration_manager
            .handle_event(IntegrationEvent::Waitlisted {
                event: event.clone(),
                entry: entry.clone(),
                position,
            })
            .await;

        Ok((entry, position))
    }

    pub async fn remove(&self, entry_id: Uuid) -> Result<WaitingListEntry> {
        let entry = self.waiting_list_repo
            .find_by_id(entry_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Waiting list entry not found".to_string()))?;

        if !self.waiting_list_repo.delete(entry_id).await? {
            return Err(AppError::NotFound("Waiting list entry not found".to_string()));
        }

        self.history
            .record(
                HistoryEntry::new(entry.event_id, HistoryAction::RemovedFromWaitlist)
                    .waiting_list(entry.id)
                    .email(entry.email.clone()),
            )
            .await;

        Ok(entry)
    }

    /// Fills every free spot of the event from the front of the queue.
    pub async fn promote_available(&self, event_id: Uuid) -> Result<Vec<Promotion>> {
        let event = self.load_event(event_id).await?;
        self.promote(&event, "manual promotion").await
    }

    /// Runs promotion only for events that opted into auto-promote and
    /// have not finished yet.
    pub async fn promote_if_enabled(&self, event: &Event) -> Result<Vec<Promotion>> {
        if !event.auto_promote || event.has_ended(Utc::now()) {
            return Ok(Vec::new());
        }
        self.promote(event, "automatic promotion").await
    }

    /// Promotes one specific entry. `force` lets an admin exceed capacity.
    pub async fn promote_entry(&self, entry_id: Uuid, force: bool) -> Result<Promotion> {
        let entry = self.waiting_list_repo
            .find_by_id(entry_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Waiting list entry not found".to_string()))?;
        let event = self.load_event(entry.event_id).await?;

        let promotion = self.waiting_list_repo
            .promote_entry(&event, entry_id, force)
            .await?;

        let detail = if force { "manual promotion of entry, capacity override" } else { "manual promotion of entry" };
        self.after_promotion(&event, &promotion, detail).await;

        Ok(promotion)
    }

    async fn promote(&self, event: &Event, detail: &str) -> Result<Vec<Promotion>> {
        let promotions = self.waiting_list_repo.promote_oldest(event).await?;

        if !promotions.is_empty() {
            tracing::info!(
                "Promoted {} waiting list entries for event {}",
                promotions.len(),
                event.id
            );
        }

        for promotion in &promotions {
            self.after_promotion(event, promotion, detail).await;
        }

        Ok(promotions)
    }

    async fn after_promotion(&self, event: &Event, promotion: &Promotion, detail: &str) {
        self.history
            .record(
                HistoryEntry::new(event.id, HistoryAction::MovedFromWaitlist)
                    .registration(promotion.registration.id)
                    .waiting_list(promotion.waiting_list_id)
                    .email(promotion.registration.email.clone())
                    .detail(detail),
            )
            .await;

        self.integration_manager
            .handle_event(IntegrationEvent::PromotedFromWaitingList {
                event: event.clone(),
                registration: promotion.registration.clone(),
                payment: promotion.payment.clone(),
            })
            .await;
    }
}
