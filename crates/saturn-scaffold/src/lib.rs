//! Per-episode git scaffolds and language recipes for compiling
//! submissions and executing matches.

pub mod error;
pub mod finish;
pub mod lang;
pub mod multiplexer;
pub mod recipe;
pub mod scaffold;

pub use error::{ScaffoldError, StepError};
pub use finish::{FinishState, Finisher, Verdict};
pub use multiplexer::ScaffoldMultiplexer;
pub use recipe::{Recipe, Step, StepArguments};
pub use scaffold::{LangConfig, Scaffold};
