//! Saturn - queue-driven build and match-execution worker
//!
//! Pulls tasks from a subscription, compiles or executes submissions
//! through a per-episode git scaffold, and reports outcomes back to the
//! tournament control plane.

pub mod app;
pub mod cli;
pub mod config;
pub mod log;
pub mod monitor;
pub mod queue;
pub mod reporter;
pub mod secret;
pub mod supervisor;
pub mod task;

pub use app::{Dispatcher, Worker};
pub use config::SaturnConfig;
pub use log::{with_capture, LogBuffer, TaskLogLayer};
pub use queue::{InMemoryQueue, QueueClient, QueueError, TaskHandler};
pub use reporter::{GcpTokenedReporter, ReportError, ReportOutcome, StaticToken, TokenProvider};
pub use secret::{read_secret_file, Secret, SecretError};
pub use supervisor::{Supervisor, SupervisorError};
pub use task::{run_task, TaskRunner};
