//! The task queue runner.
//!
//! Each invocation claims up to [`BATCH_SIZE`] due tasks (FIFO by
//! `created_at`) and executes them sequentially. A handler failure is
//! contained to its task: the runner records the retry or terminal failure
//! and moves on to the next claim.

use bookd_core::tasks::{backoff_minutes, TaskPayload, BATCH_SIZE, MAX_RETRIES};
use bookd_db::models::task::Task;
use bookd_db::repositories::{EventRepo, TaskRepo};
use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::context::HandlerContext;
use crate::registry::HandlerRegistry;

/// Outcome of one runner invocation, returned to the trigger caller.
#[derive(Debug, Clone, Copy)]
pub struct RunReport {
    /// Tasks that completed successfully.
    pub processed: usize,
    /// Tasks claimed this invocation (including failures).
    pub total: usize,
}

/// How an individual task attempt failed.
enum TaskFailure {
    /// Unknown task type or malformed payload. Retrying cannot help.
    Terminal(String),
    /// The handler returned an error; retried with backoff.
    Transient(String),
}

/// Polls the `tasks` table and dispatches due work to registered handlers.
pub struct TaskRunner {
    ctx: HandlerContext,
    registry: HandlerRegistry,
}

impl TaskRunner {
    pub fn new(ctx: HandlerContext, registry: HandlerRegistry) -> Self {
        Self { ctx, registry }
    }

    /// Process up to [`BATCH_SIZE`] due tasks and report the counts.
    ///
    /// Only infrastructure errors (the queue's own bookkeeping queries)
    /// propagate; handler failures are recorded per task and never abort
    /// the batch.
    pub async fn run_batch(&self) -> Result<RunReport, sqlx::Error> {
        let run_id = Uuid::new_v4();
        let mut report = RunReport {
            processed: 0,
            total: 0,
        };

        while (report.total as i64) < BATCH_SIZE {
            let Some(task) = TaskRepo::claim_next_due(&self.ctx.pool).await? else {
                break;
            };
            report.total += 1;

            match self.execute(&task).await {
                Ok(()) => {
                    TaskRepo::complete(&self.ctx.pool, task.id).await?;
                    report.processed += 1;
                    tracing::info!(
                        %run_id,
                        task_id = task.id,
                        task_type = %task.task_type,
                        "Task completed",
                    );
                }
                Err(failure) => self.record_failure(run_id, &task, failure).await?,
            }
        }

        if report.total > 0 {
            tracing::info!(
                %run_id,
                processed = report.processed,
                total = report.total,
                "Task run finished",
            );
        }
        Ok(report)
    }

    /// Validate and dispatch a single claimed task.
    async fn execute(&self, task: &Task) -> Result<(), TaskFailure> {
        let Some(handler) = self.registry.get(&task.task_type) else {
            return Err(TaskFailure::Terminal(format!(
                "no handler registered for task type: {}",
                task.task_type
            )));
        };

        // Validate the payload before the handler sees it; a payload that
        // does not match its type's schema cannot succeed later either.
        let payload = TaskPayload::parse(&task.task_type, &task.payload)
            .map_err(|e| TaskFailure::Terminal(e.to_string()))?;

        handler
            .run(&self.ctx, task, &payload)
            .await
            .map_err(|e| TaskFailure::Transient(format!("{e:#}")))
    }

    /// Apply the retry policy and emit a `task_error` event.
    async fn record_failure(
        &self,
        run_id: Uuid,
        task: &Task,
        failure: TaskFailure,
    ) -> Result<(), sqlx::Error> {
        match failure {
            TaskFailure::Terminal(error) => {
                tracing::error!(
                    %run_id,
                    task_id = task.id,
                    task_type = %task.task_type,
                    error = %error,
                    "Task failed permanently (configuration error, no retry)",
                );
                TaskRepo::fail(&self.ctx.pool, task.id, task.retry_count, &error).await?;
                self.emit_task_error(task, &error, task.retry_count).await
            }
            TaskFailure::Transient(error) => {
                let retry_count = task.retry_count + 1;
                if retry_count < MAX_RETRIES {
                    let run_at = Utc::now() + Duration::minutes(backoff_minutes(retry_count));
                    tracing::warn!(
                        %run_id,
                        task_id = task.id,
                        task_type = %task.task_type,
                        retry_count,
                        error = %error,
                        "Task failed, re-queued with backoff",
                    );
                    TaskRepo::requeue_for_retry(&self.ctx.pool, task.id, retry_count, run_at, &error)
                        .await?;
                } else {
                    tracing::error!(
                        %run_id,
                        task_id = task.id,
                        task_type = %task.task_type,
                        retry_count,
                        error = %error,
                        "Task failed permanently (retries exhausted)",
                    );
                    TaskRepo::fail(&self.ctx.pool, task.id, retry_count, &error).await?;
                }
                self.emit_task_error(task, &error, retry_count).await
            }
        }
    }

    async fn emit_task_error(
        &self,
        task: &Task,
        error: &str,
        retry_count: i32,
    ) -> Result<(), sqlx::Error> {
        EventRepo::insert(
            &self.ctx.pool,
            task.org_id,
            "task_error",
            Some(task.lead_id),
            &json!({
                "task_id": task.id,
                "task_type": task.task_type,
                "error": error,
                "retry_count": retry_count,
            }),
        )
        .await?;
        Ok(())
    }
}
