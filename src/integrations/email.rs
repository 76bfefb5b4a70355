use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::{
    config::EmailConfig,
    domain::{Event, Payment},
    error::{AppError, Result},
    integrations::{Integration, IntegrationEvent},
};

/// Plain-text notification ready to hand to a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub body: String,
}

pub struct EmailIntegration {
    config: EmailConfig,
    from: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailIntegration {
    /// Returns `None` when email is disabled in configuration.
    pub fn new(config: EmailConfig) -> Result<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }

        let from: Mailbox = format!("{} <{}>", config.from_name, config.from_address)
            .parse()
            .map_err(|e| AppError::Integration(format!("Invalid sender address: {}", e)))?;

        // Local relays (mailpit, postfix on the box) don't speak TLS.
        let builder = if config.smtp_host == "localhost" {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                .map_err(|e| AppError::Integration(format!("SMTP relay error: {}", e)))?
        };
        let mut builder = builder.port(config.smtp_port);

        if let (Some(username), Some(password)) = (config.username.clone(), config.password.clone()) {
            builder = builder.credentials(Credentials::new(username, password));
        }

        Ok(Some(Self {
            transport: builder.build(),
            from,
            config,
        }))
    }

    async fn send(&self, notification: Notification) -> Result<()> {
        let to: Mailbox = notification
            .to
            .parse()
            .map_err(|e| AppError::Integration(format!("Invalid recipient {}: {}", notification.to, e)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(notification.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(notification.body)
            .map_err(|e| AppError::Integration(format!("Failed to build email: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::Integration(format!("SMTP send failed: {}", e)))?;

        tracing::info!("Sent notification email to {}", notification.to);
        Ok(())
    }
}

#[async_trait]
impl Integration for EmailIntegration {
    fn name(&self) -> &str {
        "Email"
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    async fn health_check(&self) -> Result<()> {
        if self.config.smtp_host.is_empty() {
            return Err(AppError::Integration("SMTP host not configured".to_string()));
        }
        Ok(())
    }

    async fn handle_event(&self, event: &IntegrationEvent) -> Result<()> {
        match compose(event) {
            Some(notification) => self.send(notification).await,
            None => Ok(()),
        }
    }
}

/// Builds the email for an integration event, if that event warrants one.
pub fn compose(event: &IntegrationEvent) -> Option<Notification> {
    match event {
        IntegrationEvent::Registered { event, registration, payment } => Some(Notification {
            to: registration.email.clone(),
            subject: format!("Registration confirmed: {}", event.title),
            body: format!(
                "Hi {},\n\nyou are registered for {}.\n{}{}",
                registration.first_name,
                event.title,
                event_details(event),
                payment_details(event, payment.as_ref()),
            ),
        }),
        IntegrationEvent::Waitlisted { event, entry, position } => Some(Notification {
            to: entry.email.clone(),
            subject: format!("Waiting list: {}", event.title),
            body: format!(
                "Hi {},\n\n{} is full, so you have been added to the waiting list at position {}.\n\
                 We will email you if a spot opens up.\n{}",
                entry.first_name,
                event.title,
                position,
                event_details(event),
            ),
        }),
        IntegrationEvent::PromotedFromWaitingList { event, registration, payment } => Some(Notification {
            to: registration.email.clone(),
            subject: format!("A spot opened up: {}", event.title),
            body: format!(
                "Hi {},\n\ngood news, a spot opened up and you have been moved from the waiting list \
                 to the registered attendees of {}.\n{}{}",
                registration.first_name,
                event.title,
                event_details(event),
                payment_details(event, payment.as_ref()),
            ),
        }),
        IntegrationEvent::RegistrationCancelled { .. } => None,
    }
}

fn event_details(event: &Event) -> String {
    format!(
        "\nWhen: {} - {}\nWhere: {}\n",
        event.from_time.format("%Y-%m-%d %H:%M UTC"),
        event.to_time.format("%H:%M UTC"),
        event.place,
    )
}

fn payment_details(event: &Event, payment: Option<&Payment>) -> String {
    match payment {
        Some(payment) => {
            let mut text = format!(
                "\nPrice: {}\nVariable symbol: {}\n",
                payment.amount, payment.variable_symbol
            );
            if let Some(account) = &event.bank_account {
                text.push_str(&format!("Bank account: {}\n", account));
            }
            text
        }
        None => String::new(),
    }
}
