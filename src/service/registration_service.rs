use std::sync::Arc;
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    domain::*,
    error::{AppError, Result},
    integrations::{IntegrationEvent, IntegrationManager},
    repository::{
        EventRepository, NoShowRepository, PaymentRepository, RegistrationRepository,
        WaitingListRepository,
    },
    service::{history_service::HistoryService, waiting_list_service::WaitingListService},
};

pub struct RegistrationService {
    event_repo: Arc<dyn EventRepository>,
    registration_repo: Arc<dyn RegistrationRepository>,
    waiting_list_repo: Arc<dyn WaitingListRepository>,
    payment_repo: Arc<dyn PaymentRepository>,
    no_show_repo: Arc<dyn NoShowRepository>,
    history: Arc<HistoryService>,
    waiting_list: Arc<WaitingListService>,
    integration_manager: Arc<IntegrationManager>,
}

impl RegistrationService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        event_repo: Arc<dyn EventRepository>,
        registration_repo: Arc<dyn RegistrationRepository>,
        waiting_list_repo: Arc<dyn WaitingListRepository>,
        payment_repo: Arc<dyn PaymentRepository>,
        no_show_repo: Arc<dyn NoShowRepository>,
        history: Arc<HistoryService>,
        waiting_list: Arc<WaitingListService>,
        integration_manager: Arc<IntegrationManager>,
    ) -> Self {
        Self {
            event_repo,
            registration_repo,
            waiting_list_repo,
            payment_repo,
            no_show_repo,
            history,
            waiting_list,
            integration_manager,
        }
    }

    async fn load_event(&self, event_id: Uuid) -> Result<Event> {
        self.event_repo
            .find_by_id(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))
    }

    async fn load_registration(&self, id: Uuid) -> Result<Registration> {
        self.registration_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Registration not found".to_string()))
    }

    /// The seat is already freed when this runs, so a failed promotion is
    /// logged and left for the next trigger.
    async fn promote_freed_seat(&self, event: &Event) {
        if let Err(e) = self.waiting_list.promote_if_enabled(event).await {
            tracing::error!("Waiting list promotion failed for event {}: {}", event.id, e);
        }
    }

    async fn with_payment(&self, registration: Registration) -> Result<RegistrationDetail> {
        let payment = self.payment_repo.find_by_registration(registration.id).await?;
        Ok(RegistrationDetail { registration, payment })
    }

    /// Signs an attendee up. Takes a seat when one is free, otherwise
    /// queues the attendee on the waiting list. Hidden events only accept
    /// sign-ups made by an admin.
    pub async fn register(
        &self,
        event_id: Uuid,
        attendee: Attendee,
        as_admin: bool,
    ) -> Result<RegistrationOutcome> {
        let attendee = attendee.normalized();
        attendee.validate()?;

        let event = self.load_event(event_id).await?;
        if !event.visible && !as_admin {
            return Err(AppError::NotFound("Event not found".to_string()));
        }
        if event.has_ended(Utc::now()) {
            return Err(AppError::BadRequest("Event has already ended".to_string()));
        }

        if self.registration_repo
            .find_active_by_email(event.id, &attendee.email)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("This email is already registered for the event".to_string()));
        }
        if self.waiting_list_repo
            .find_by_email(event.id, &attendee.email)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("This email is already on the waiting list".to_string()));
        }

        match self.registration_repo.create_if_capacity(&event, &attendee).await? {
            Some((registration, payment)) => {
                tracing::info!("Registered {} for event {}", registration.email, event.id);

                self.history
                    .record(
                        HistoryEntry::new(event.id, HistoryAction::Registered)
                            .registration(registration.id)
                            .email(registration.email.clone()),
                    )
                    .await;

                self.integration_manager
                    .handle_event(IntegrationEvent::Registered {
                        event: event.clone(),
                        registration: registration.clone(),
                        payment: payment.clone(),
                    })
                    .await;

                Ok(RegistrationOutcome::Registered { registration, payment })
            }
            None => {
                let (entry, position) = self.waiting_list.join(&event, &attendee).await?;
                Ok(RegistrationOutcome::Waitlisted { entry, position })
            }
        }
    }

    /// Attendee-initiated cancellation. The row is kept, flagged deleted,
    /// and the freed seat goes to the waiting list when auto-promote is on.
    pub async fn cancel(&self, id: Uuid, email: &str) -> Result<Registration> {
        let registration = self.load_registration(id).await?;

        if registration.email != normalize_email(email) {
            return Err(AppError::Forbidden);
        }
        if !self.registration_repo.cancel(id).await? {
            return Err(AppError::Conflict("Registration is already cancelled".to_string()));
        }

        let registration = Registration { deleted: true, ..registration };
        let event = self.load_event(registration.event_id).await?;

        self.history
            .record(
                HistoryEntry::new(event.id, HistoryAction::Cancelled)
                    .registration(registration.id)
                    .email(registration.email.clone()),
            )
            .await;

        self.integration_manager
            .handle_event(IntegrationEvent::RegistrationCancelled {
                event: event.clone(),
                registration: registration.clone(),
            })
            .await;

        self.promote_freed_seat(&event).await;

        Ok(registration)
    }

    /// Admin removal: deletes the registration and its payment, then lets
    /// the waiting list take the seat when auto-promote is on.
    pub async fn delete(&self, id: Uuid) -> Result<Registration> {
        let registration = self.registration_repo
            .delete_with_payment(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Registration not found".to_string()))?;

        tracing::info!("Deleted registration {} of event {}", id, registration.event_id);

        self.history
            .record(
                HistoryEntry::new(registration.event_id, HistoryAction::Unregistered)
                    .registration(registration.id)
                    .email(registration.email.clone()),
            )
            .await;

        match self.event_repo.find_by_id(registration.event_id).await {
            Ok(Some(event)) => self.promote_freed_seat(&event).await,
            Ok(None) => {}
            Err(e) => tracing::error!(
                "Failed to load event {} for promotion: {}",
                registration.event_id, e
            ),
        }

        Ok(registration)
    }

    pub async fn get(&self, id: Uuid) -> Result<RegistrationDetail> {
        let registration = self.load_registration(id).await?;
        self.with_payment(registration).await
    }

    pub async fn list_for_event(&self, event_id: Uuid) -> Result<Vec<RegistrationDetail>> {
        self.load_event(event_id).await?;

        let registrations = self.registration_repo.list_by_event(event_id).await?;
        let mut details = Vec::with_capacity(registrations.len());
        for registration in registrations {
            details.push(self.with_payment(registration).await?);
        }
        Ok(details)
    }

    pub async fn list_for_email(&self, email: &str) -> Result<Vec<RegistrationDetail>> {
        let registrations = self.registration_repo
            .list_by_email(&normalize_email(email))
            .await?;

        let mut details = Vec::with_capacity(registrations.len());
        for registration in registrations {
            details.push(self.with_payment(registration).await?);
        }
        Ok(details)
    }

    pub async fn set_attended(&self, id: Uuid, attended: bool) -> Result<Registration> {
        let registration = self.registration_repo.set_attended(id, attended).await?;

        self.history
            .record(
                HistoryEntry::new(registration.event_id, HistoryAction::AttendanceChanged)
                    .registration(registration.id)
                    .email(registration.email.clone())
                    .detail(if attended { "attended" } else { "absent" }),
            )
            .await;

        Ok(registration)
    }

    pub async fn mark_paid(&self, id: Uuid, paid: bool) -> Result<Payment> {
        let registration = self.load_registration(id).await?;
        let payment = self.payment_repo.set_paid(id, paid).await?;

        if paid {
            self.history
                .record(
                    HistoryEntry::new(registration.event_id, HistoryAction::PaymentConfirmed)
                        .registration(registration.id)
                        .email(registration.email.clone())
                        .detail(format!("variable symbol {}", payment.variable_symbol)),
                )
                .await;
        }

        Ok(payment)
    }

    /// Closes attendance for a finished event: every active registration
    /// not marked as attended becomes a no-show. Safe to call repeatedly.
    pub async fn record_no_shows(&self, event_id: Uuid) -> Result<u64> {
        let event = self.load_event(event_id).await?;
        if !event.has_ended(Utc::now()) {
            return Err(AppError::BadRequest("Event has not ended yet".to_string()));
        }

        let absent: Vec<Registration> = self.registration_repo
            .list_by_event(event_id)
            .await?
            .into_iter()
            .filter(|r| !r.attended)
            .collect();

        let written = self.no_show_repo.record(&absent).await?;
        tracing::info!("Recorded {} no-shows for event {}", written, event_id);

        Ok(written)
    }

    pub async fn list_no_shows(&self, email: Option<&str>) -> Result<Vec<NoShow>> {
        let email = email.map(normalize_email);
        self.no_show_repo.list(email.as_deref()).await
    }
}
