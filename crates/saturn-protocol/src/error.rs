//! Errors shared across protocol (de)serialization boundaries.

use thiserror::Error;

/// Errors decoding a queue message body or a task's `details` field into
/// its typed request shape.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed task payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("task details missing or not an object")]
    MissingDetails,

    #[error("unknown task type: {0}")]
    UnknownTaskType(String),
}
