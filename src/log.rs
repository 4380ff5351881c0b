//! Per-task log capture.
//!
//! Every structured log line emitted while a task is running is tee'd
//! into that task's own buffer so it can be included verbatim in the
//! final report. Implemented as a task-local buffer plus a
//! `tracing_subscriber::Layer` that consults it, so concurrent workers
//! (each its own Tokio task, never sharing the task-local) never
//! cross-contaminate buffers.

use std::fmt::Write as _;
use std::future::Future;
use std::sync::{Arc, Mutex};

tokio::task_local! {
    static CURRENT: LogBuffer;
}

/// Shared, append-only buffer for one task's captured log lines.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<String>>);

impl LogBuffer {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(String::new())))
    }

    /// The captured text so far, without clearing it.
    pub fn snapshot(&self) -> String {
        self.0.lock().unwrap().clone()
    }

    fn append(&self, line: &str) {
        let mut buf = self.0.lock().unwrap();
        buf.push_str(line);
        buf.push('\n');
    }
}

/// Run `fut` with `buffer` installed as the task-local log sink for its
/// duration; every `tracing` event emitted anywhere within it is
/// appended to `buffer`.
pub async fn with_capture<F: Future>(buffer: LogBuffer, fut: F) -> F::Output {
    CURRENT.scope(buffer, fut).await
}

/// A `tracing_subscriber::Layer` that appends every event's formatted
/// message to whichever `LogBuffer` is installed via [`with_capture`] on
/// the calling task, if any.
pub struct TaskLogLayer;

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for TaskLogLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let _ = CURRENT.try_with(|buffer| {
            let mut line = format!("{} ", event.metadata().level());
            let mut visitor = MessageVisitor(&mut line);
            event.record(&mut visitor);
            buffer.append(&line);
        });
    }
}

struct MessageVisitor<'a>(&'a mut String);

impl tracing::field::Visit for MessageVisitor<'_> {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.0, "{value:?}");
        } else {
            let _ = write!(self.0, "{}={:?} ", field.name(), value);
        }
    }
}
