//! Episode identity: which competition, language, and git scaffold a task belongs to.

use serde::{Deserialize, Serialize};

/// Language flavor a submission is written against.
///
/// Determines which scaffold recipe runs the task. `Java8` is carried as a
/// recognized value but has no working recipe; see `saturn-scaffold`'s
/// `lang::java8` module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Java8,
    Java21,
    #[serde(rename = "py3")]
    Python3,
}

impl Language {
    /// Short tag used in log lines and scaffold root directory names.
    pub fn tag(&self) -> &'static str {
        match self {
            Language::Java8 => "java8",
            Language::Java21 => "java21",
            Language::Python3 => "py3",
        }
    }
}

/// The competition episode a task runs against: its name (used as the
/// scaffold cache key), language, and the git remote to clone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub name: String,
    pub language: Language,
    pub scaffold: String,
}
