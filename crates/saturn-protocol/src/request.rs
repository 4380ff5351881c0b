//! Compile and execute request bodies.
//!
//! These mirror the `details` payload of a queued task exactly: field
//! names and JSON tags here are load-bearing wire format, not just Rust
//! API surface.

use serde::{Deserialize, Serialize};

/// Location of a blob in object storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSpec {
    pub bucket: String,
    pub name: String,
}

/// A team's submitted code: source archive plus where the compiled
/// binary archive should land.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub source: FileSpec,
    pub binary: FileSpec,
    #[serde(rename = "team-name")]
    pub team_name: String,
    pub package: String,
}

/// Payload of a `compile` task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileRequest {
    #[serde(flatten)]
    pub submission: Submission,
}

/// Payload of an `execute` task: two compiled submissions facing off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub a: Submission,
    pub b: Submission,
    pub maps: Vec<String>,
    pub replay: FileSpec,
    #[serde(rename = "alternate-order")]
    pub alternate_order: bool,
}
