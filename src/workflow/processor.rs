use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use super::scheduler::WorkflowScheduler;
use crate::metrics::Metrics;

/// Background re-entry trigger for suspended runs.
///
/// Polls the store for due runs at a fixed interval and executes one step
/// each. Runs indefinitely; spawn it as a background task. Errors are logged
/// and the loop keeps going.
pub struct WorkflowProcessor {
    scheduler: Arc<WorkflowScheduler>,
    batch_size: i64,
    poll_interval: Duration,
    metrics: Option<Metrics>,
}

impl WorkflowProcessor {
    pub fn new(
        scheduler: Arc<WorkflowScheduler>,
        batch_size: i64,
        poll_interval: Duration,
        metrics: Option<Metrics>,
    ) -> Self {
        Self {
            scheduler,
            batch_size,
            poll_interval,
            metrics,
        }
    }

    pub async fn start(&self) {
        info!(
            batch_size = self.batch_size,
            poll_interval_secs = self.poll_interval.as_secs(),
            "workflow processor starting"
        );

        loop {
            match self.scheduler.run_due(Utc::now(), self.batch_size).await {
                Ok(advanced) if advanced > 0 => {
                    info!(advanced, "advanced workflow runs");
                }
                Ok(_) => debug!("no workflow runs due"),
                Err(e) => error!(error = ?e, "workflow processor poll failed"),
            }

            if let Some(metrics) = &self.metrics {
                if let Ok((pending, age)) = self.scheduler.pending_stats().await {
                    metrics.runs_pending.set(pending);
                    metrics.oldest_due_age_seconds.set(age);
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
