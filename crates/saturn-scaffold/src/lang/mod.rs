//! Per-language compile/execute recipes.

pub mod java21;
pub mod java8;
pub mod python3;

use crate::error::{ScaffoldError, StepError};
use serde::de::DeserializeOwned;

/// Decode a task's opaque `details` into its typed request shape. A
/// decode failure is a malformed task, not a transient fault — the
/// caller treats it as a non-retryable error.
pub fn decode_details<T: DeserializeOwned>(details: &serde_json::Value) -> Result<T, StepError> {
    serde_json::from_value(details.clone())
        .map_err(saturn_protocol::ProtocolError::from)
        .map_err(ScaffoldError::from)
        .map_err(StepError::from)
}

/// Matches a server log line announcing a match winner, e.g.
/// `[server] Team A (A) wins (round 4)`. Multiline mode: `^`/`$` match
/// line boundaries within the captured subprocess output, not just the
/// whole-string boundaries.
pub const WINNER_REGEX: &str = r"(?m)^\[server\]\s*.*\(([AB])\) wins \(round [0-9]+\)$";

/// Tally `A`/`B` wins from captured match output. Returns `[a_wins,
/// b_wins]`, or an error if a winner group doesn't match `A` or `B`.
pub fn tally_scores(output: &str) -> Result<[u32; 2], crate::error::ScaffoldError> {
    let re = regex::Regex::new(WINNER_REGEX).expect("winner regex is valid");
    let mut scores = [0u32; 2];
    for captures in re.captures_iter(output) {
        match captures.get(1).map(|m| m.as_str()) {
            Some("A") => scores[0] += 1,
            Some("B") => scores[1] += 1,
            _ => {
                return Err(crate::error::ScaffoldError::CommandFailed {
                    command: "determine-scores".to_string(),
                    status: -1,
                })
            }
        }
    }
    Ok(scores)
}
