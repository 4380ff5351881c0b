//! Fully-resolved runtime configuration.
//!
//! `Cli` captures what the operator specified; `SaturnConfig` captures
//! what the process will actually run with, after merging in the
//! fetched secret.

use crate::secret::Secret;
use saturn_scaffold::LangConfig;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct SaturnConfig {
    pub project: String,
    pub subscription: String,
    pub audience: String,
    pub useragent: String,
    pub monitor_port: u16,
    pub scaffold_root: PathBuf,
    pub parallel: usize,
    pub storage_url: String,
    pub queue_url: String,
    pub git_token: String,
    pub lang_config: LangConfig,
}

impl SaturnConfig {
    pub fn from_cli(cli: crate::cli::Cli, secret: Secret) -> Self {
        Self {
            project: cli.project,
            subscription: cli.subscription,
            audience: cli.audience,
            useragent: cli.useragent,
            monitor_port: cli.port,
            scaffold_root: cli.scaffold,
            parallel: cli.parallel.max(1),
            storage_url: cli.storage_url,
            queue_url: cli.queue_url,
            git_token: secret.git_token,
            lang_config: LangConfig {
                java_home: cli.java_home,
                python_bin: cli.python_bin,
                on_saturn: cli.onsaturn,
            },
        }
    }

    /// The disjoint scaffold root owned by worker `index`.
    pub fn worker_root(&self, index: usize) -> PathBuf {
        self.scaffold_root.join(index.to_string())
    }
}
