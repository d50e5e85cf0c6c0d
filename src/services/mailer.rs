use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use crate::config::NotificationConfig;

const SENDGRID_URL: &str = "https://api.sendgrid.com/v3/mail/send";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    #[error("Email delivery is not configured")]
    Disabled,
    #[error("Email request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Email provider rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Outbound email. Handlers and the reminder sweep only see this trait.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailerError>;
}

/// SendGrid v3 mail API client
pub struct SendGridMailer {
    client: reqwest::Client,
    api_key: String,
    from: String,
}

impl SendGridMailer {
    pub fn new(api_key: String, from: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            from,
        }
    }

    fn payload(&self, message: &EmailMessage) -> serde_json::Value {
        json!({
            "personalizations": [{ "to": [{ "email": message.to }] }],
            "from": { "email": self.from },
            "subject": message.subject,
            "content": [
                { "type": "text/plain", "value": message.text },
                { "type": "text/html", "value": message.html }
            ]
        })
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailerError> {
        let response = self
            .client
            .post(SENDGRID_URL)
            .bearer_auth(&self.api_key)
            .json(&self.payload(message))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!("Sent email to {}", message.to);
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(MailerError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

/// Used when no provider key is configured; every send fails and is recorded as such
pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailerError> {
        tracing::warn!("Email to {} not sent: mailer disabled", message.to);
        Err(MailerError::Disabled)
    }
}

pub fn from_config(config: &NotificationConfig) -> Arc<dyn Mailer> {
    match (&config.sendgrid_api_key, &config.email_from) {
        (Some(key), Some(from)) if !key.is_empty() && !from.is_empty() => {
            Arc::new(SendGridMailer::new(key.clone(), from.clone()))
        }
        _ => {
            tracing::info!("SENDGRID_API_KEY or EMAIL_FROM not set, email delivery disabled");
            Arc::new(DisabledMailer)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> EmailMessage {
        EmailMessage {
            to: "ann@example.com".into(),
            subject: "Payment Reminder: Rent".into(),
            text: "Rent is due".into(),
            html: "<p>Rent is due</p>".into(),
        }
    }

    #[test]
    fn sendgrid_payload_shape() {
        let mailer = SendGridMailer::new("key".into(), "bills@example.com".into());
        let body = mailer.payload(&message());
        assert_eq!(body["personalizations"][0]["to"][0]["email"], "ann@example.com");
        assert_eq!(body["from"]["email"], "bills@example.com");
        assert_eq!(body["content"][1]["type"], "text/html");
    }

    #[tokio::test]
    async fn disabled_mailer_fails_every_send() {
        assert!(matches!(DisabledMailer.send(&message()).await, Err(MailerError::Disabled)));
    }
}
