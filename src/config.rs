use dotenvy::dotenv;
use std::env;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub api_url: String,
    pub api_key: String,
    pub from_address: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Hours between the initial connection-request notification and the reminder
    pub reminder_delay_hours: i64,
    pub workflow_poll_interval_secs: u64,
    pub workflow_batch_size: i64,
    pub workflow_max_retries: i32,
    pub email: Option<EmailConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| AppError::Config("DATABASE_URL missing".into()))?;
        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        let reminder_delay_hours = env::var("REMINDER_DELAY_HOURS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(24);
        let workflow_poll_interval_secs = env::var("WORKFLOW_POLL_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(15);
        let workflow_batch_size = env::var("WORKFLOW_BATCH_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(50);
        let workflow_max_retries = env::var("WORKFLOW_MAX_RETRIES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        let email = match env::var("EMAIL_API_URL") {
            Ok(api_url) if !api_url.trim().is_empty() => {
                let api_key = env::var("EMAIL_API_KEY")
                    .map_err(|_| AppError::Config("EMAIL_API_KEY missing".into()))?;
                let from_address = env::var("EMAIL_FROM_ADDRESS")
                    .map_err(|_| AppError::Config("EMAIL_FROM_ADDRESS missing".into()))?;
                Some(EmailConfig {
                    api_url,
                    api_key,
                    from_address,
                })
            }
            _ => None,
        };

        Ok(Self {
            database_url,
            port,
            reminder_delay_hours,
            workflow_poll_interval_secs,
            workflow_batch_size,
            workflow_max_retries,
            email,
        })
    }

    #[cfg(test)]
    pub fn test_defaults() -> Self {
        Self {
            database_url: "postgres://localhost/test".into(),
            port: 3000,
            reminder_delay_hours: 24,
            workflow_poll_interval_secs: 15,
            workflow_batch_size: 50,
            workflow_max_retries: 10,
            email: None,
        }
    }
}
