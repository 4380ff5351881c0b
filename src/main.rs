//! Saturn worker entry point: parse flags, load the git credential,
//! wire up storage/reporting clients, and run the supervisor until a
//! shutdown signal drains it.

use anyhow::Context;
use clap::Parser;
use saturn::cli::Cli;
use saturn::{GcpTokenedReporter, InMemoryQueue, SaturnConfig, StaticToken, Supervisor, TaskLogLayer};
use saturn_storage::{ObjectStoreClient, StorageClient};
use std::sync::Arc;
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(TaskLogLayer)
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let secret = match &cli.secret_file {
        Some(path) => saturn::read_secret_file(path).context("reading secret file")?,
        None => anyhow::bail!(
            "production secret-manager retrieval is a separate integration; pass --secret-file for this build"
        ),
    };

    let config = SaturnConfig::from_cli(cli, secret);

    let storage: Arc<dyn StorageClient> =
        Arc::new(ObjectStoreClient::new(reqwest::Client::new(), config.storage_url.clone()));

    // The real pull subscription (ack/nack semantics against the
    // control plane's queue) is a black-box transport here, same as the
    // OIDC token mint; this build runs against an empty in-memory queue
    // until a concrete transport is wired to `config.queue_url`.
    tracing::warn!(queue_url = %config.queue_url, "no production queue transport wired; running an empty in-memory queue");
    let queue = Arc::new(InMemoryQueue::new());

    let tokens = Arc::new(StaticToken("dev-token".to_string()));
    let reporter = Arc::new(GcpTokenedReporter::new(tokens, config.audience.clone(), config.useragent.clone()));

    let supervisor = Supervisor::new(config, queue, storage, reporter);
    supervisor.run().await.context("supervisor exited with an error")?;

    Ok(())
}
