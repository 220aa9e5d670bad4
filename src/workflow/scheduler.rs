use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::store::WorkflowStore;
use super::{StepOutcome, Workflow, WorkflowRun};
use crate::error::AppError;

/// Registry of named workflows over a shared durable store.
///
/// `trigger` persists a run before executing anything, so a crash between
/// insert and first step leaves a due run for the poller instead of a lost
/// event. `run_due` is the restart-safe re-entry point; it holds no state of
/// its own, everything needed to resume lives in the store.
pub struct WorkflowScheduler {
    store: Arc<dyn WorkflowStore>,
    workflows: HashMap<&'static str, Arc<dyn Workflow>>,
    max_retries: i32,
}

impl WorkflowScheduler {
    pub fn new(store: Arc<dyn WorkflowStore>, max_retries: i32) -> Self {
        Self {
            store,
            workflows: HashMap::new(),
            max_retries,
        }
    }

    pub fn register(&mut self, workflow: Arc<dyn Workflow>) {
        self.workflows.insert(workflow.name(), workflow);
    }

    /// Start a run for a triggering event. The first step is attempted
    /// inline so immediate notifications go out at trigger time; if it
    /// fails, the run is already durable and the poller retries it.
    pub async fn trigger(
        &self,
        workflow: &str,
        subject_id: Uuid,
        payload: serde_json::Value,
    ) -> Result<WorkflowRun, AppError> {
        let handler = self
            .workflows
            .get(workflow)
            .cloned()
            .ok_or_else(|| AppError::Workflow(format!("unknown workflow: {workflow}")))?;

        let run = WorkflowRun::new(workflow, subject_id, payload);
        self.store.insert(&run).await?;
        info!(run_id = %run.id, workflow = %run.workflow, subject_id = %run.subject_id, "workflow run created");

        if let Err(e) = self.execute_step(handler, run.clone()).await {
            warn!(run_id = %run.id, error = %e, "initial step failed, will retry on next poll");
        }
        Ok(run)
    }

    /// Execute one step for every due run. Returns how many runs advanced.
    pub async fn run_due(&self, now: DateTime<Utc>, limit: i64) -> Result<usize, AppError> {
        let due = self.store.due(now, limit).await?;
        let mut advanced = 0;

        for run in due {
            // Dead-lettered runs need manual intervention; keep them visible
            if run.retry_count >= self.max_retries {
                warn!(
                    run_id = %run.id,
                    workflow = %run.workflow,
                    retry_count = run.retry_count,
                    last_error = ?run.last_error,
                    "run exceeded max retries, skipping"
                );
                continue;
            }
            let Some(handler) = self.workflows.get(run.workflow.as_str()).cloned() else {
                warn!(run_id = %run.id, workflow = %run.workflow, "no handler registered for workflow, skipping");
                continue;
            };
            if self.execute_step(handler, run).await.is_ok() {
                advanced += 1;
            }
        }

        Ok(advanced)
    }

    pub async fn pending_stats(&self) -> Result<(i64, i64), AppError> {
        self.store.pending_stats().await
    }

    async fn execute_step(
        &self,
        handler: Arc<dyn Workflow>,
        run: WorkflowRun,
    ) -> Result<(), AppError> {
        match handler.execute(&run).await {
            Ok(StepOutcome::SleepUntil(wake_at)) => {
                if self.store.suspend(run.id, run.step, wake_at).await? {
                    debug!(run_id = %run.id, step = run.step, %wake_at, "workflow run suspended");
                } else {
                    warn!(run_id = %run.id, step = run.step, "run already advanced by another worker");
                }
                Ok(())
            }
            Ok(StepOutcome::Completed) => {
                if self.store.complete(run.id, run.step).await? {
                    info!(run_id = %run.id, workflow = %run.workflow, "workflow run completed");
                } else {
                    warn!(run_id = %run.id, step = run.step, "run already advanced by another worker");
                }
                Ok(())
            }
            Err(e) => {
                self.store.record_failure(run.id, &e.to_string()).await?;
                warn!(run_id = %run.id, step = run.step, error = %e, "workflow step failed");
                Err(e)
            }
        }
    }
}
