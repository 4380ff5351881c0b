//! Saturn wire protocol
//!
//! Defines the task queue message shape, the status values a task can
//! finish in, and the compile/execute request bodies exchanged with
//! object storage.

pub mod episode;
pub mod error;
pub mod request;
pub mod task;

pub use episode::{Episode, Language};
pub use error::ProtocolError;
pub use request::{CompileRequest, ExecuteRequest, FileSpec, Submission};
pub use task::{TaskMetadata, TaskPayload, TaskStatus};
