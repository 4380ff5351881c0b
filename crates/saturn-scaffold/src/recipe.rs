//! Ordered, named steps that make up a compile or execute recipe.

use crate::error::{ScaffoldError, StepError};
use crate::finish::FinishState;
use saturn_storage::StorageClient;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

/// Everything a step needs: the task's raw `details`, a storage client,
/// the scaffold's working directory, and the shared finish state.
pub struct StepArguments {
    pub details: serde_json::Value,
    pub storage: Arc<dyn StorageClient>,
    pub root: PathBuf,
    pub finish: FinishState,
    pub cancel: tokio_util::sync::CancellationToken,
}

impl StepArguments {
    /// Commit the task's outcome and return the sentinel error that tells
    /// the recipe to stop without surfacing a failure.
    pub fn finish_with(&self, status: saturn_protocol::TaskStatus, details: Option<serde_json::Value>) -> StepError {
        use crate::finish::Finisher;
        self.finish.finish(status, details);
        StepError::Finished
    }
}

pub type StepFuture<'a> = Pin<Box<dyn Future<Output = Result<(), StepError>> + Send + 'a>>;

/// A single named unit of recipe work.
///
/// Built from a closure returning a boxed future directly (rather than a
/// generic `Fn(&StepArguments) -> impl Future`) because the future
/// necessarily borrows its `StepArguments` argument, and that borrow's
/// lifetime can't be expressed as a single associated type across every
/// call — see `Box::pin(async move { .. })` at each call site.
pub struct Step {
    pub name: &'static str,
    callable: Box<dyn for<'a> Fn(&'a StepArguments) -> StepFuture<'a> + Send + Sync>,
}

impl Step {
    pub fn new<F>(name: &'static str, callable: F) -> Self
    where
        F: for<'a> Fn(&'a StepArguments) -> StepFuture<'a> + Send + Sync + 'static,
    {
        Self {
            name,
            callable: Box::new(callable),
        }
    }

    async fn run(&self, index: usize, total: usize, arg: &StepArguments) -> Result<(), StepError> {
        tracing::info!(step = self.name, index, total, ">>> Starting step {}/{}: {}", index, total, self.name);
        let result = (self.callable)(arg).await;
        tracing::info!(step = self.name, index, total, ">>> Ending step {}/{}: {}", index, total, self.name);
        result
    }
}

/// An ordered sequence of steps executed in order. The first step that
/// errors (without calling `finish`) stops the recipe; a step that calls
/// `finish` also stops the recipe, but not as a failure.
pub struct Recipe(pub Vec<Step>);

impl Recipe {
    pub fn new(steps: Vec<Step>) -> Self {
        Self(steps)
    }

    pub async fn run(&self, arg: &StepArguments) -> Result<(), ScaffoldError> {
        let total = self.0.len();
        for (i, step) in self.0.iter().enumerate() {
            if arg.cancel.is_cancelled() {
                return Err(ScaffoldError::Cancelled);
            }
            match step.run(i + 1, total, arg).await {
                Ok(()) => continue,
                Err(StepError::Finished) => return Ok(()),
                Err(StepError::Failed(e)) => return Err(e),
            }
        }
        Ok(())
    }
}
