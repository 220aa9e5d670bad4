use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::debug;

use super::{StepOutcome, Workflow, WorkflowRun};
use crate::error::AppError;
use crate::models::{ConnectionRequest, RequestStatus, UserProfile};
use crate::repository::{ConnectionRequestRepository, UserRepository};
use crate::services::NotificationSender;

pub const CONNECTION_REQUEST_REMINDER: &str = "connection-request-reminder";

/// Two-step reminder for connection requests: notify the target immediately,
/// then once the delay has passed notify again unless the request was
/// accepted in the meantime. The re-check at step 1 is the only cancellation
/// mechanism; nothing cancels a suspended run eagerly.
pub struct ConnectionReminderWorkflow {
    requests: Arc<dyn ConnectionRequestRepository>,
    users: Arc<dyn UserRepository>,
    notifier: Arc<dyn NotificationSender>,
    reminder_delay: Duration,
}

impl ConnectionReminderWorkflow {
    pub fn new(
        requests: Arc<dyn ConnectionRequestRepository>,
        users: Arc<dyn UserRepository>,
        notifier: Arc<dyn NotificationSender>,
        reminder_delay: Duration,
    ) -> Self {
        Self {
            requests,
            users,
            notifier,
            reminder_delay,
        }
    }

    async fn load_context(
        &self,
        run: &WorkflowRun,
    ) -> Result<(ConnectionRequest, UserProfile, UserProfile), AppError> {
        let request = self
            .requests
            .find(run.subject_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let requester = self
            .users
            .find(request.from_user_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let target = self
            .users
            .find(request.to_user_id)
            .await?
            .ok_or(AppError::NotFound)?;
        Ok((request, requester, target))
    }
}

#[async_trait]
impl Workflow for ConnectionReminderWorkflow {
    fn name(&self) -> &'static str {
        CONNECTION_REQUEST_REMINDER
    }

    async fn execute(&self, run: &WorkflowRun) -> Result<StepOutcome, AppError> {
        match run.step {
            0 => {
                let (_, requester, target) = self.load_context(run).await?;
                let body = format!(
                    "Hi {}, {} (@{}) wants to connect with you.",
                    target.full_name, requester.full_name, requester.username
                );
                self.notifier
                    .send(&target.email, "New connection request", &body)
                    .await?;
                Ok(StepOutcome::SleepUntil(Utc::now() + self.reminder_delay))
            }
            1 => {
                let (request, requester, target) = self.load_context(run).await?;
                if request.status == RequestStatus::Accepted {
                    debug!(request_id = %request.id, "request already accepted, skipping reminder");
                    return Ok(StepOutcome::Completed);
                }
                let body = format!(
                    "Hi {}, the connection request from {} (@{}) is still waiting for you.",
                    target.full_name, requester.full_name, requester.username
                );
                self.notifier
                    .send(&target.email, "Connection request reminder", &body)
                    .await?;
                Ok(StepOutcome::Completed)
            }
            step => Err(AppError::Workflow(format!(
                "{CONNECTION_REQUEST_REMINDER} has no step {step}"
            ))),
        }
    }
}
