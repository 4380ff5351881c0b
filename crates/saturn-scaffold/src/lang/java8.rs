//! Java 8 flavor: not yet supported.
//!
//! Kept as a recognized [`saturn_protocol::Language`] value so episodes
//! can be configured for it ahead of the recipe being built, matching
//! every task to an immediate, non-retryable failure rather than a panic.

use crate::error::StepError;
use crate::recipe::{Recipe, Step, StepArguments};
use saturn_protocol::TaskStatus;

pub fn recipes() -> (Recipe, Recipe) {
    (unsupported_recipe(), unsupported_recipe())
}

fn unsupported_recipe() -> Recipe {
    Recipe::new(vec![Step::new("unsupported", |arg: &StepArguments| {
        Box::pin(async move {
            tracing::warn!("Java 8 is not yet supported.");
            Err::<(), StepError>(arg.finish_with(TaskStatus::Errored, None))
        })
    })])
}
