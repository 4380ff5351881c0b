//! Pull-based task queue subscription.
//!
//! Exactly one message is ever in flight per subscriber: each pull blocks
//! until the previous message's handler has ack'd or nack'd.

use saturn_protocol::TaskPayload;
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("queue subscription closed")]
    Closed,
}

/// Runs one task to completion for a queue message, returning whether the
/// message should be ack'd (task completed or was aborted/rejected) or
/// nack'd (retryable failure, redeliver).
#[async_trait::async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, payload: TaskPayload) -> bool;
}

/// Pull subscription contract: receive messages one at a time, dispatch
/// each to `handler`, ack or nack per its verdict, stop when `cancel`
/// fires.
#[async_trait::async_trait]
pub trait QueueClient: Send + Sync {
    async fn subscribe(&self, cancel: CancellationToken, handler: Arc<dyn TaskHandler>) -> Result<(), QueueError>;
}

/// An in-memory queue for tests and local development: messages are
/// pushed onto a FIFO, a nack'd message is requeued at the back.
#[derive(Default)]
pub struct InMemoryQueue {
    messages: Mutex<VecDeque<Vec<u8>>>,
    notify: tokio::sync::Notify,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, raw: Vec<u8>) {
        self.messages.lock().await.push_back(raw);
        self.notify.notify_one();
    }
}

#[async_trait::async_trait]
impl QueueClient for InMemoryQueue {
    async fn subscribe(&self, cancel: CancellationToken, handler: Arc<dyn TaskHandler>) -> Result<(), QueueError> {
        loop {
            let next = {
                let mut guard = self.messages.lock().await;
                guard.pop_front()
            };

            let raw = match next {
                Some(raw) => raw,
                None => {
                    tokio::select! {
                        _ = self.notify.notified() => continue,
                        _ = cancel.cancelled() => return Ok(()),
                    }
                }
            };

            match serde_json::from_slice::<TaskPayload>(&raw) {
                Ok(payload) => {
                    let acked = handler.handle(payload).await;
                    if !acked {
                        self.messages.lock().await.push_back(raw);
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "malformed task payload, acking without processing");
                }
            }

            if cancel.is_cancelled() {
                return Ok(());
            }
        }
    }
}
