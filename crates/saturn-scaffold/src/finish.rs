//! Non-local task completion.
//!
//! A recipe step that decides the task's outcome calls [`Finisher::finish`]
//! and then returns immediately. The outcome is committed to shared
//! [`FinishState`] rather than carried in the error value, so the first
//! call to `finish` always wins even if a buggy step kept running after
//! calling it — there is no second write to overwrite.

use saturn_protocol::TaskStatus;
use std::sync::{Arc, Mutex};

/// The committed outcome of a task: its final status and any structured
/// details to merge into the report body (e.g. `{"accepted": false}` or
/// `{"scores": [3, 1]}`).
#[derive(Debug, Clone)]
pub struct Verdict {
    pub status: TaskStatus,
    pub details: Option<serde_json::Value>,
}

/// Commits a task's outcome. Only the first call commits; later calls are
/// no-ops.
pub trait Finisher: Send + Sync {
    fn finish(&self, status: TaskStatus, details: Option<serde_json::Value>);
}

/// Shared, clonable handle to a task's committed verdict.
#[derive(Clone, Default)]
pub struct FinishState(Arc<Mutex<Option<Verdict>>>);

impl FinishState {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(None)))
    }

    /// True if some step has already finished this task.
    pub fn is_finished(&self) -> bool {
        self.0.lock().unwrap().is_some()
    }

    /// The committed verdict, if any step has finished the task yet.
    pub fn verdict(&self) -> Option<Verdict> {
        self.0.lock().unwrap().clone()
    }
}

impl Finisher for FinishState {
    fn finish(&self, status: TaskStatus, details: Option<serde_json::Value>) {
        let mut guard = self.0.lock().unwrap();
        if guard.is_some() {
            return;
        }
        *guard = Some(Verdict { status, details });
    }
}
