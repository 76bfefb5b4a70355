pub mod history_service;
pub mod event_service;
pub mod registration_service;
pub mod waiting_list_service;

use std::sync::Arc;
use sqlx::SqlitePool;
use crate::repository::*;
use crate::integrations::IntegrationManager;
use history_service::HistoryService;
use event_service::EventService;
use registration_service::RegistrationService;
use waiting_list_service::WaitingListService;

pub struct ServiceContext {
    pub event_repo: Arc<dyn EventRepository>,
    pub registration_repo: Arc<dyn RegistrationRepository>,
    pub waiting_list_repo: Arc<dyn WaitingListRepository>,
    pub payment_repo: Arc<dyn PaymentRepository>,
    pub integration_manager: Arc<IntegrationManager>,
    pub history_service: Arc<HistoryService>,
    pub event_service: Arc<EventService>,
    pub registration_service: Arc<RegistrationService>,
    pub waiting_list_service: Arc<WaitingListService>,
}

impl ServiceContext {
    pub fn new(
        event_repo: Arc<dyn EventRepository>,
        registration_repo: Arc<dyn RegistrationRepository>,
        waiting_list_repo: Arc<dyn WaitingListRepository>,
        payment_repo: Arc<dyn PaymentRepository>,
        integration_manager: Arc<IntegrationManager>,
        db_pool: SqlitePool,
    ) -> Self {
        let no_show_repo = Arc::new(SqliteNoShowRepository::new(db_pool.clone()));
        let history_service = Arc::new(HistoryService::new(db_pool));

        let waiting_list_service = Arc::new(WaitingListService::new(
            event_repo.clone(),
            waiting_list_repo.clone(),
            history_service.clone(),
            integration_manager.clone(),
        ));

        let event_service = Arc::new(EventService::new(
            event_repo.clone(),
            registration_repo.clone(),
            waiting_list_repo.clone(),
            history_service.clone(),
            waiting_list_service.clone(),
        ));

        let registration_service = Arc::new(RegistrationService::new(
            event_repo.clone(),
            registration_repo.clone(),
            waiting_list_repo.clone(),
            payment_repo.clone(),
            no_show_repo,
            history_service.clone(),
            waiting_list_service.clone(),
            integration_manager.clone(),
        ));

        Self {
            event_repo,
            registration_repo,
            waiting_list_repo,
            payment_repo,
            integration_manager,
            history_service,
            event_service,
            registration_service,
            waiting_list_service,
        }
    }

    /// Wires the SQLite repositories over a single pool.
    pub fn from_pool(db_pool: SqlitePool, integration_manager: Arc<IntegrationManager>) -> Self {
        Self::new(
            Arc::new(SqliteEventRepository::new(db_pool.clone())),
            Arc::new(SqliteRegistrationRepository::new(db_pool.clone())),
            Arc::new(SqliteWaitingListRepository::new(db_pool.clone())),
            Arc::new(SqlitePaymentRepository::new(db_pool.clone())),
            integration_manager,
            db_pool,
        )
    }
}
