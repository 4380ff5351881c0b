//! Task lifecycle: initial report, runner invocation, and finalization.

use crate::log::{with_capture, LogBuffer};
use crate::reporter::{GcpTokenedReporter, ReportOutcome};
use saturn_protocol::{TaskPayload, TaskStatus};
use saturn_scaffold::{FinishState, ScaffoldError};
use saturn_storage::StorageClient;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Executes one operation's recipe against a task's `details`. Runners
/// are registered in the Saturn app's table, keyed by `task_type`.
#[async_trait::async_trait]
pub trait TaskRunner: Send + Sync {
    async fn run(
        &self,
        payload: &TaskPayload,
        storage: Arc<dyn StorageClient>,
        finish: FinishState,
        cancel: CancellationToken,
    ) -> Result<(), ScaffoldError>;
}

/// Drive one queued task end to end: initial report, runner invocation,
/// finalization. Returns whether the queue message should be ack'd
/// (`true`) or nack'd for redelivery (`false`).
pub async fn run_task(
    payload: TaskPayload,
    runner: Arc<dyn TaskRunner>,
    storage: Arc<dyn StorageClient>,
    reporter: Arc<GcpTokenedReporter>,
    cancel: CancellationToken,
) -> bool {
    let logs = LogBuffer::new();
    with_capture(logs.clone(), run_task_inner(payload, runner, storage, reporter, cancel, logs)).await
}

async fn run_task_inner(
    payload: TaskPayload,
    runner: Arc<dyn TaskRunner>,
    storage: Arc<dyn StorageClient>,
    reporter: Arc<GcpTokenedReporter>,
    cancel: CancellationToken,
    logs: LogBuffer,
) -> bool {
    let report_url = payload.metadata.report_url.clone();
    let finish = FinishState::new();

    let initial = reporter
        .report(&report_url, &payload.details, TaskStatus::Running, "", false)
        .await;

    match initial {
        Ok(ReportOutcome::ExternallyAborted) => {
            tracing::info!("initial report aborted by control plane");
            return true;
        }
        Ok(ReportOutcome::Accepted) => {}
        Err(e) => {
            tracing::warn!(error = %e, "initial report failed, nacking for redelivery");
            return false;
        }
    }

    let result = runner.run(&payload, storage, finish.clone(), cancel.clone()).await;

    // A runner error only falls through to `Errored` below if no step
    // already committed a verdict. Whether that's retryable decides
    // whether acking without redelivery is the right call: a decode
    // failure or unsupported language will fail identically on every
    // redelivery, so nacking it would loop forever.
    let runner_error_retryable = match &result {
        Err(e) => {
            tracing::warn!(error = %e, "task runner returned an error");
            e.retryable()
        }
        Ok(()) => true,
    };

    let (status, extra_details) = match finish.verdict() {
        Some(verdict) => (verdict.status, verdict.details),
        None if cancel.is_cancelled() => (TaskStatus::Interrupted, None),
        None => (TaskStatus::Errored, None),
    };

    if status == TaskStatus::Aborted {
        // The control plane already knows; nothing more to report.
        return true;
    }

    let mut details = payload.details.clone();
    if let Some(serde_json::Value::Object(map)) = extra_details {
        for (k, v) in map {
            details.insert(k, v);
        }
    }

    let interrupted = status == TaskStatus::Interrupted;
    match reporter.report(&report_url, &details, status, &logs.snapshot(), interrupted).await {
        Ok(_) => {
            matches!(status, TaskStatus::Completed | TaskStatus::Aborted)
                || (status == TaskStatus::Errored && !runner_error_retryable)
        }
        Err(e) => {
            // Every report failure is retryable by construction; ack
            // only if that ever stops being true.
            let ack = !e.retryable();
            tracing::warn!(error = %e, ack, "final report failed");
            ack
        }
    }
}
