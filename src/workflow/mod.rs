//! Durable multi-step workflows.
//!
//! A workflow run is a persisted state record, not a suspended task: each row
//! in `workflow_runs` names the workflow, the entity it concerns, the next
//! step to execute and the wall-clock instant it becomes due. The background
//! processor re-enters due runs, so a suspended run survives process restarts
//! with no in-memory state. Step advancement is a compare-and-set on the step
//! index, which doubles as the dedup key when a step is retried or two
//! workers race on the same run.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

pub mod connection_reminder;
pub mod processor;
pub mod scheduler;
pub mod store;

pub use connection_reminder::{ConnectionReminderWorkflow, CONNECTION_REQUEST_REMINDER};
pub use processor::WorkflowProcessor;
pub use scheduler::WorkflowScheduler;
pub use store::{PgWorkflowStore, WorkflowStore};

/// One execution instance of a named workflow, durably checkpointed between
/// steps. `step` is the next step to execute; `wake_at` is when it becomes
/// due. A run with `completed_at` set is finished and never re-entered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: Uuid,
    pub workflow: String,
    pub subject_id: Uuid,
    pub payload: serde_json::Value,
    pub step: i32,
    pub wake_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub retry_count: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowRun {
    pub fn new(workflow: &str, subject_id: Uuid, payload: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            workflow: workflow.to_string(),
            subject_id,
            payload,
            step: 0,
            wake_at: now,
            completed_at: None,
            retry_count: 0,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// What a step decided: park the run until a deadline, or finish it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    SleepUntil(DateTime<Utc>),
    Completed,
}

/// A named workflow's step logic. `execute` runs the step `run.step` points
/// at; it must be safe to re-run, since a failed or raced step is retried.
#[async_trait]
pub trait Workflow: Send + Sync {
    fn name(&self) -> &'static str;

    async fn execute(&self, run: &WorkflowRun) -> Result<StepOutcome, AppError>;
}
