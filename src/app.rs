//! Runner-table dispatch and queue-handler wiring.

use crate::queue::TaskHandler;
use crate::reporter::GcpTokenedReporter;
use crate::task::{run_task, TaskRunner};
use saturn_protocol::{TaskPayload, TaskStatus};
use saturn_scaffold::{FinishState, ScaffoldError, ScaffoldMultiplexer};
use saturn_storage::StorageClient;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

const TASK_TYPE_COMPILE: &str = "compile";
const TASK_TYPE_EXECUTE: &str = "execute";

/// Dispatches a task to the `compile` or `execute` recipe by its
/// `task-type`, serialized behind a mutex since a [`ScaffoldMultiplexer`]
/// expects to be driven by one task at a time.
pub struct Dispatcher {
    multiplexer: Mutex<ScaffoldMultiplexer>,
}

impl Dispatcher {
    pub fn new(multiplexer: ScaffoldMultiplexer) -> Self {
        Self {
            multiplexer: Mutex::new(multiplexer),
        }
    }
}

#[async_trait::async_trait]
impl TaskRunner for Dispatcher {
    async fn run(
        &self,
        payload: &TaskPayload,
        storage: Arc<dyn StorageClient>,
        finish: FinishState,
        cancel: CancellationToken,
    ) -> Result<(), ScaffoldError> {
        let mut multiplexer = self.multiplexer.lock().await;
        match payload.metadata.task_type.as_str() {
            TASK_TYPE_COMPILE => multiplexer.compile(payload, storage, finish, cancel).await,
            TASK_TYPE_EXECUTE => multiplexer.execute(payload, storage, finish, cancel).await,
            other => {
                tracing::warn!(task_type = other, "rejecting task of unknown type");
                finish.finish(
                    TaskStatus::Errored,
                    Some(serde_json::json!({"error": format!("unknown task-type {other}")})),
                );
                Ok(())
            }
        }
    }
}

/// One worker instance's request-handling loop: pulls tasks from the
/// queue subscription and drives each through [`run_task`]. Shares its
/// `cancel` token with the queue subscription that owns it, so a
/// shutdown both stops further pulls and is visible to the task
/// currently in flight.
pub struct Worker {
    dispatcher: Arc<Dispatcher>,
    storage: Arc<dyn StorageClient>,
    reporter: Arc<GcpTokenedReporter>,
    cancel: CancellationToken,
}

impl Worker {
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        storage: Arc<dyn StorageClient>,
        reporter: Arc<GcpTokenedReporter>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            dispatcher,
            storage,
            reporter,
            cancel,
        }
    }
}

#[async_trait::async_trait]
impl TaskHandler for Worker {
    async fn handle(&self, payload: TaskPayload) -> bool {
        run_task(
            payload,
            Arc::clone(&self.dispatcher) as Arc<dyn TaskRunner>,
            Arc::clone(&self.storage),
            Arc::clone(&self.reporter),
            self.cancel.clone(),
        )
        .await
    }
}
