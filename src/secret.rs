//! Git credential loading.
//!
//! The secret manager RPC itself is a black box; what matters is the
//! JSON shape fetched from it and the non-production fallback of
//! reading the same shape from a local file.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use std::path::Path;

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("failed to read secret file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed secret payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Credentials used to authenticate scaffold git clones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Secret {
    #[serde(rename = "git-token")]
    pub git_token: String,
}

/// Reads `Secret` from a local JSON file. Used when not running in
/// production mode, where the real secret manager round trip is skipped
/// in favor of an operator-provided file.
pub fn read_secret_file(path: &Path) -> Result<Secret, SecretError> {
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}
