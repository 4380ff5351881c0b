//! Caches one [`Scaffold`] per episode and dispatches compile/execute
//! tasks into it.
//!
//! Callers are expected to serialize access (a worker processes one task
//! at a time, since each subscription only ever has one message
//! outstanding), so this type does no internal locking of its own.

use crate::error::ScaffoldError;
use crate::finish::FinishState;
use crate::scaffold::{LangConfig, Scaffold};
use saturn_protocol::{Episode, TaskPayload};
use saturn_storage::StorageClient;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct ScaffoldMultiplexer {
    root: PathBuf,
    git_token: Option<String>,
    lang_config: LangConfig,
    scaffolds: HashMap<String, Scaffold>,
}

impl ScaffoldMultiplexer {
    pub fn new(root: PathBuf, git_token: Option<String>, lang_config: LangConfig) -> Self {
        Self {
            root,
            git_token,
            lang_config,
            scaffolds: HashMap::new(),
        }
    }

    async fn scaffold_for(&mut self, episode: &Episode, cancel: &CancellationToken) -> Result<&mut Scaffold, ScaffoldError> {
        if !self.scaffolds.contains_key(&episode.name) {
            let episode_root = self.root.join(&episode.name);
            let scaffold = Scaffold::new(episode, episode_root, self.git_token.clone(), &self.lang_config)?;
            self.scaffolds.insert(episode.name.clone(), scaffold);
        }
        let scaffold = self.scaffolds.get_mut(&episode.name).expect("just inserted");
        scaffold.refresh(cancel).await?;
        Ok(scaffold)
    }

    /// Run the `compile` recipe for `payload`.
    pub async fn compile(
        &mut self,
        payload: &TaskPayload,
        storage: Arc<dyn StorageClient>,
        finish: FinishState,
        cancel: CancellationToken,
    ) -> Result<(), ScaffoldError> {
        let details = details_value(payload);
        let scaffold = self.scaffold_for(&payload.episode, &cancel).await?;
        let args = crate::recipe::StepArguments {
            details,
            storage,
            root: scaffold.root.clone(),
            finish,
            cancel,
        };
        scaffold.compile.run(&args).await
    }

    /// Run the `execute` recipe for `payload`.
    pub async fn execute(
        &mut self,
        payload: &TaskPayload,
        storage: Arc<dyn StorageClient>,
        finish: FinishState,
        cancel: CancellationToken,
    ) -> Result<(), ScaffoldError> {
        let details = details_value(payload);
        let scaffold = self.scaffold_for(&payload.episode, &cancel).await?;
        let args = crate::recipe::StepArguments {
            details,
            storage,
            root: scaffold.root.clone(),
            finish,
            cancel,
        };
        scaffold.execute.run(&args).await
    }
}

fn details_value(payload: &TaskPayload) -> serde_json::Value {
    serde_json::Value::Object(
        payload
            .details
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    )
}
