#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

use roster::{
    domain::{Attendee, CreateEventRequest, Event, PaymentType},
    error::{AppError, Result},
    integrations::{Integration, IntegrationEvent, IntegrationManager},
    service::ServiceContext,
};

/// Single-connection in-memory database, kept alive for the whole test.
pub async fn setup_pool() -> anyhow::Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await?;

    Ok(pool)
}

#[derive(Default)]
pub struct RecordingIntegration {
    events: Mutex<Vec<IntegrationEvent>>,
}

impl RecordingIntegration {
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(|e| e.kind()).collect()
    }

    pub fn promoted_emails(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                IntegrationEvent::PromotedFromWaitingList { registration, .. } => {
                    Some(registration.email.clone())
                }
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Integration for RecordingIntegration {
    fn name(&self) -> &str {
        "Recording"
    }

    fn is_enabled(&self) -> bool {
        true
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    async fn handle_event(&self, event: &IntegrationEvent) -> Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Stands in for an unreachable SMTP server.
pub struct FailingIntegration;

#[async_trait]
impl Integration for FailingIntegration {
    fn name(&self) -> &str {
        "Failing"
    }

    fn is_enabled(&self) -> bool {
        true
    }

    async fn health_check(&self) -> Result<()> {
        Err(AppError::Integration("down".to_string()))
    }

    async fn handle_event(&self, _event: &IntegrationEvent) -> Result<()> {
        Err(AppError::Integration("SMTP send failed: connection refused".to_string()))
    }
}

pub struct TestContext {
    pub pool: SqlitePool,
    pub services: Arc<ServiceContext>,
    pub recorder: Arc<RecordingIntegration>,
}

pub async fn setup() -> anyhow::Result<TestContext> {
    let pool = setup_pool().await?;

    let recorder = Arc::new(RecordingIntegration::default());
    let manager = Arc::new(IntegrationManager::new());
    manager.register(recorder.clone()).await;

    let services = Arc::new(ServiceContext::from_pool(pool.clone(), manager));

    Ok(TestContext { pool, services, recorder })
}

pub fn event_request(capacity: i64, auto_promote: bool, price: i64) -> CreateEventRequest {
    let start = Utc::now() + Duration::days(3);
    CreateEventRequest {
        title: "Wednesday volleyball".to_string(),
        description: "Mixed teams".to_string(),
        price,
        place: "Sports hall A".to_string(),
        capacity,
        from_time: start,
        to_time: start + Duration::hours(2),
        visible: true,
        auto_promote,
        bank_account: Some("2900000000/2010".to_string()),
    }
}

pub async fn create_event(
    ctx: &TestContext,
    capacity: i64,
    auto_promote: bool,
    price: i64,
) -> anyhow::Result<Event> {
    Ok(ctx.services.event_service
        .create(event_request(capacity, auto_promote, price))
        .await?)
}

pub fn attendee(n: usize) -> Attendee {
    Attendee {
        first_name: format!("Player{}", n),
        last_name: "Test".to_string(),
        email: format!("player{}@example.com", n),
        phone: None,
        payment_type: PaymentType::Cash,
    }
}
