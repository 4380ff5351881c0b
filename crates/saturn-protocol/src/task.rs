//! Task queue message and its terminal status.

use crate::episode::Episode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Metadata carried alongside a task's opaque `details`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskMetadata {
    #[serde(rename = "report-url")]
    pub report_url: String,
    #[serde(rename = "task-type")]
    pub task_type: String,
}

/// A single queued unit of work: which episode it belongs to, where to
/// report the result, and an operation-specific `details` body decoded
/// later by the matching runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPayload {
    pub episode: Episode,
    pub metadata: TaskMetadata,
    pub details: HashMap<String, serde_json::Value>,
}

/// Terminal (or in-flight) status of a task.
///
/// The wire tag is a 3-character string sent in every report. `Errored`
/// and `Interrupted` share the tag `TRY` — both mean "retry this task",
/// they differ only in why the task stopped (a bug or a shutdown), which
/// is visible separately in the report's `interrupted` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Running,
    Completed,
    Aborted,
    Errored,
    Interrupted,
}

impl TaskStatus {
    /// The exact wire tag sent in a report's `invocation.status` field.
    pub fn wire_tag(&self) -> &'static str {
        match self {
            TaskStatus::Running => "RUN",
            TaskStatus::Completed => "OK!",
            TaskStatus::Aborted => "ABT",
            TaskStatus::Errored => "TRY",
            TaskStatus::Interrupted => "TRY",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wire_tag())
    }
}
