use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use crate::domain::{Event, Payment, Registration, WaitingListEntry};
use crate::error::Result;

pub mod email;

#[derive(Debug, Clone)]
pub enum IntegrationEvent {
    Registered {
        event: Event,
        registration: Registration,
        payment: Option<Payment>,
    },
    Waitlisted {
        event: Event,
        entry: WaitingListEntry,
        position: i64,
    },
    PromotedFromWaitingList {
        event: Event,
        registration: Registration,
        payment: Option<Payment>,
    },
    RegistrationCancelled {
        event: Event,
        registration: Registration,
    },
}

impl IntegrationEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            IntegrationEvent::Registered { .. } => "registered",
            IntegrationEvent::Waitlisted { .. } => "waitlisted",
            IntegrationEvent::PromotedFromWaitingList { .. } => "promoted",
            IntegrationEvent::RegistrationCancelled { .. } => "cancelled",
        }
    }
}

#[async_trait]
pub trait Integration: Send + Sync {
    fn name(&self) -> &str;
    fn is_enabled(&self) -> bool;
    async fn health_check(&self) -> Result<()>;
    async fn handle_event(&self, event: &IntegrationEvent) -> Result<()>;
}

/// Fans registration events out to every enabled integration. Delivery is
/// best-effort: a failing integration is logged and skipped, and nothing
/// is retried.
pub struct IntegrationManager {
    integrations: RwLock<Vec<Arc<dyn Integration>>>,
}

impl IntegrationManager {
    pub fn new() -> Self {
        Self {
            integrations: RwLock::new(Vec::new()),
        }
    }

    pub async fn register(&self, integration: Arc<dyn Integration>) {
        if integration.is_enabled() {
            tracing::info!("Registered integration: {}", integration.name());
            self.integrations.write().await.push(integration);
        }
    }

    pub async fn handle_event(&self, event: IntegrationEvent) {
        let integrations = self.integrations.read().await;

        for integration in integrations.iter() {
            if !integration.is_enabled() {
                continue;
            }

            match integration.handle_event(&event).await {
                Ok(_) => {
                    tracing::debug!(
                        "Integration {} handled {} event",
                        integration.name(),
                        event.kind()
                    );
                }
                Err(e) => {
                    tracing::error!(
                        "Integration {} failed to handle {} event: {:?}",
                        integration.name(),
                        event.kind(),
                        e
                    );
                }
            }
        }
    }

    pub async fn health_check_all(&self) -> Vec<(String, Result<()>)> {
        let integrations = self.integrations.read().await;
        let mut results = Vec::new();

        for integration in integrations.iter() {
            let name = integration.name().to_string();
            let result = integration.health_check().await;
            results.push((name, result));
        }

        results
    }
}

impl Default for IntegrationManager {
    fn default() -> Self {
        Self::new()
    }
}
