use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::EmailConfig;
use crate::error::AppError;

/// Outbound notification transport. Failures are retryable, never fatal to
/// the calling workflow run.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AppError>;
}

/// Email delivery through the provider's HTTP API.
#[derive(Clone)]
pub struct HttpEmailSender {
    client: reqwest::Client,
    config: EmailConfig,
}

impl HttpEmailSender {
    pub fn new(config: EmailConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl NotificationSender for HttpEmailSender {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AppError> {
        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&serde_json::json!({
                "from": self.config.from_address,
                "to": to,
                "subject": subject,
                "text": body,
            }))
            .send()
            .await
            .map_err(|e| AppError::Notification(format!("email request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::Notification(format!(
                "email provider returned {}",
                response.status()
            )));
        }

        info!(subject, "notification sent");
        Ok(())
    }
}

/// Stand-in when no email provider is configured; logs and drops.
pub struct DisabledNotificationSender;

#[async_trait]
impl NotificationSender for DisabledNotificationSender {
    async fn send(&self, _to: &str, subject: &str, _body: &str) -> Result<(), AppError> {
        warn!(subject, "notification delivery disabled, dropping");
        Ok(())
    }
}
