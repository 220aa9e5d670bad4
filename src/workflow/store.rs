use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use super::WorkflowRun;
use crate::error::AppError;

/// Durable checkpoint storage for workflow runs.
///
/// `suspend` and `complete` are step-guarded: they only apply when the run is
/// still at `from_step` and not completed, and report whether they did. A
/// `false` return means another worker advanced the run first and the caller
/// must drop its result.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Persist a freshly triggered run. This must happen before the first
    /// step executes so a crash cannot lose the run.
    async fn insert(&self, run: &WorkflowRun) -> Result<(), AppError>;

    /// Live runs whose deadline has passed, oldest deadline first.
    async fn due(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<WorkflowRun>, AppError>;

    /// Advance past `from_step` and park the run until `wake_at`.
    async fn suspend(
        &self,
        id: Uuid,
        from_step: i32,
        wake_at: DateTime<Utc>,
    ) -> Result<bool, AppError>;

    /// Finish the run at `from_step`.
    async fn complete(&self, id: Uuid, from_step: i32) -> Result<bool, AppError>;

    /// Record a failed step attempt; the run stays at its current step.
    async fn record_failure(&self, id: Uuid, error: &str) -> Result<(), AppError>;

    /// (live run count, age in seconds of the longest-overdue run; 0 if none due)
    async fn pending_stats(&self) -> Result<(i64, i64), AppError>;
}

pub struct PgWorkflowStore {
    pool: PgPool,
}

impl PgWorkflowStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn run_from_row(row: &PgRow) -> Result<WorkflowRun, AppError> {
    Ok(WorkflowRun {
        id: row.try_get("id")?,
        workflow: row.try_get("workflow")?,
        subject_id: row.try_get("subject_id")?,
        payload: row.try_get("payload")?,
        step: row.try_get("step")?,
        wake_at: row.try_get("wake_at")?,
        completed_at: row.try_get("completed_at")?,
        retry_count: row.try_get("retry_count")?,
        last_error: row.try_get("last_error")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl WorkflowStore for PgWorkflowStore {
    async fn insert(&self, run: &WorkflowRun) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO workflow_runs \
             (id, workflow, subject_id, payload, step, wake_at, completed_at, retry_count, last_error, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(run.id)
        .bind(&run.workflow)
        .bind(run.subject_id)
        .bind(&run.payload)
        .bind(run.step)
        .bind(run.wake_at)
        .bind(run.completed_at)
        .bind(run.retry_count)
        .bind(&run.last_error)
        .bind(run.created_at)
        .bind(run.updated_at)
        .execute(&self.pool)
        .await?;

        debug!(run_id = %run.id, workflow = %run.workflow, "workflow run inserted");
        Ok(())
    }

    async fn due(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<WorkflowRun>, AppError> {
        let rows = sqlx::query(
            "SELECT id, workflow, subject_id, payload, step, wake_at, completed_at, retry_count, last_error, created_at, updated_at \
             FROM workflow_runs \
             WHERE completed_at IS NULL AND wake_at <= $1 \
             ORDER BY wake_at ASC \
             LIMIT $2",
        )
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(run_from_row).collect()
    }

    async fn suspend(
        &self,
        id: Uuid,
        from_step: i32,
        wake_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE workflow_runs \
             SET step = step + 1, wake_at = $3, retry_count = 0, last_error = NULL, updated_at = NOW() \
             WHERE id = $1 AND step = $2 AND completed_at IS NULL",
        )
        .bind(id)
        .bind(from_step)
        .bind(wake_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn complete(&self, id: Uuid, from_step: i32) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE workflow_runs \
             SET completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND step = $2 AND completed_at IS NULL",
        )
        .bind(id)
        .bind(from_step)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn record_failure(&self, id: Uuid, error: &str) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE workflow_runs \
             SET retry_count = retry_count + 1, last_error = $2, updated_at = NOW() \
             WHERE id = $1 AND completed_at IS NULL",
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn pending_stats(&self) -> Result<(i64, i64), AppError> {
        let row = sqlx::query(
            "SELECT \
               (SELECT COUNT(*)::BIGINT FROM workflow_runs WHERE completed_at IS NULL) AS pending, \
               COALESCE((SELECT EXTRACT(EPOCH FROM (NOW() - MIN(wake_at)))::BIGINT \
                         FROM workflow_runs \
                         WHERE completed_at IS NULL AND wake_at <= NOW()), 0) AS age_seconds",
        )
        .fetch_one(&self.pool)
        .await?;

        let pending: i64 = row.try_get("pending").unwrap_or(0);
        let age: i64 = row.try_get("age_seconds").unwrap_or(0);
        Ok((pending, age))
    }
}
