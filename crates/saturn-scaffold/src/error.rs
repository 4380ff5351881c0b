//! Errors from scaffold setup and recipe execution.

use thiserror::Error;

/// Errors a recipe step, scaffold, or multiplexer can produce.
#[derive(Debug, Error)]
pub enum ScaffoldError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Storage(#[from] saturn_storage::StorageError),

    #[error(transparent)]
    Protocol(#[from] saturn_protocol::ProtocolError),

    #[error("command {command} exited with status {status}")]
    CommandFailed { command: String, status: i32 },

    #[error("command {0} could not be started")]
    CommandNotStarted(String),

    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("task cancelled")]
    Cancelled,
}

impl ScaffoldError {
    /// Whether retrying the task might succeed: subprocess failures and
    /// storage hiccups are retryable, a language with no recipe never is.
    pub fn retryable(&self) -> bool {
        match self {
            ScaffoldError::Io(_) | ScaffoldError::CommandFailed { .. } => true,
            ScaffoldError::Storage(e) => e.retryable(),
            ScaffoldError::CommandNotStarted(_) => true,
            ScaffoldError::Protocol(_) => false,
            ScaffoldError::UnsupportedLanguage(_) => false,
            ScaffoldError::Cancelled => false,
        }
    }
}

/// Outcome of running one recipe step: either it failed outright, or it
/// called `finish` and the recipe should stop without treating that as an
/// error.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("step finished the task")]
    Finished,

    #[error(transparent)]
    Failed(#[from] ScaffoldError),
}
