//! Process-level orchestration: builds `parallel` worker instances over
//! disjoint scaffold roots, wires them to the queue, and tears everything
//! down on SIGINT/SIGTERM or a monitor-triggered shutdown.

use crate::app::{Dispatcher, Worker};
use crate::config::SaturnConfig;
use crate::monitor::Monitor;
use crate::queue::QueueClient;
use crate::reporter::GcpTokenedReporter;
use saturn_scaffold::ScaffoldMultiplexer;
use saturn_storage::StorageClient;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("failed to bind shutdown monitor: {0}")]
    Monitor(#[from] std::io::Error),

    #[error("a worker task panicked: {0}")]
    WorkerPanicked(#[from] tokio::task::JoinError),
}

pub struct Supervisor {
    config: SaturnConfig,
    queue: Arc<dyn QueueClient>,
    storage: Arc<dyn StorageClient>,
    reporter: Arc<GcpTokenedReporter>,
}

impl Supervisor {
    pub fn new(
        config: SaturnConfig,
        queue: Arc<dyn QueueClient>,
        storage: Arc<dyn StorageClient>,
        reporter: Arc<GcpTokenedReporter>,
    ) -> Self {
        Self {
            config,
            queue,
            storage,
            reporter,
        }
    }

    /// Runs every worker to completion: each subscribes independently,
    /// all sharing one cancellation token sourced from OS signals and the
    /// shutdown monitor. Returns once every worker has drained its
    /// in-flight task and stopped.
    pub async fn run(self) -> Result<(), SupervisorError> {
        let cancel = CancellationToken::new();

        let monitor = Monitor::bind(self.config.monitor_port).await?;
        let monitor_cancel = cancel.clone();
        tokio::spawn(async move { monitor.watch(monitor_cancel).await });

        let signal_cancel = cancel.clone();
        tokio::spawn(async move { watch_signals(signal_cancel).await });

        let lang_config = self.config.lang_config.clone();
        let mut workers = Vec::with_capacity(self.config.parallel);
        for index in 0..self.config.parallel {
            let root = self.config.worker_root(index);
            let multiplexer = ScaffoldMultiplexer::new(root, Some(self.config.git_token.clone()), lang_config.clone());
            let dispatcher = Arc::new(Dispatcher::new(multiplexer));
            let handler = Arc::new(Worker::new(
                dispatcher,
                Arc::clone(&self.storage),
                Arc::clone(&self.reporter),
                cancel.clone(),
            ));
            let queue = Arc::clone(&self.queue);
            let worker_cancel = cancel.clone();
            workers.push(tokio::spawn(async move {
                if let Err(e) = queue.subscribe(worker_cancel, handler).await {
                    tracing::error!(worker = index, error = %e, "worker subscription ended with an error");
                }
            }));
        }

        for worker in workers {
            worker.await?;
        }
        Ok(())
    }
}

#[cfg(unix)]
async fn watch_signals(cancel: CancellationToken) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "failed to install SIGTERM handler");
            return;
        }
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "failed to install SIGINT handler");
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => tracing::info!("received SIGTERM, draining in-flight tasks"),
        _ = sigint.recv() => tracing::info!("received SIGINT, draining in-flight tasks"),
        _ = cancel.cancelled() => return,
    }
    cancel.cancel();
}

#[cfg(not(unix))]
async fn watch_signals(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("received ctrl-c, draining in-flight tasks");
        cancel.cancel();
    }
}
