//! Supervisor CLI flags.
//!
//! Every flag is also readable from an environment variable of the same
//! shape, for container deployment without a wrapper script.

use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "saturn", about = "Queue-driven build and match-execution worker", version)]
pub struct Cli {
    /// Control-plane project identifier.
    #[arg(long, env = "SATURN_PROJECT")]
    pub project: String,

    /// Secret manager entry name holding the git token.
    #[arg(long, env = "SATURN_SECRET")]
    pub secret: String,

    /// Local JSON file to read the secret from instead of the secret
    /// manager, for non-production runs.
    #[arg(long, env = "SATURN_SECRET_FILE")]
    pub secret_file: Option<PathBuf>,

    /// Queue subscription identifier.
    #[arg(long, env = "SATURN_SUBSCRIPTION")]
    pub subscription: String,

    /// OIDC audience for minted report tokens.
    #[arg(long, env = "SATURN_AUDIENCE")]
    pub audience: String,

    /// User-Agent header sent with every report request.
    #[arg(long, env = "SATURN_USERAGENT", default_value = "Saturn")]
    pub useragent: String,

    /// TCP port the shutdown monitor listens on.
    #[arg(long, env = "SATURN_PORT", default_value_t = 8005)]
    pub port: u16,

    /// Root directory under which each worker gets its own `<root>/<i>`
    /// scaffold tree.
    #[arg(long, env = "SATURN_SCAFFOLD", default_value = "/scaffolds")]
    pub scaffold: PathBuf,

    /// Number of parallel workers.
    #[arg(long, env = "SATURN_PARALLEL", default_value_t = 1)]
    pub parallel: usize,

    /// Whether this process is running inside Saturn's own
    /// infrastructure (passed through to build scripts as -PonSaturn /
    /// --on-saturn).
    #[arg(long, env = "SATURN_ONSATURN", default_value_t = false)]
    pub onsaturn: bool,

    /// Path to the JDK 21 installation used by the Java flavor.
    #[arg(long, env = "SATURN_JAVA_HOME", default_value = "/opt/jdk-21")]
    pub java_home: String,

    /// Path to the Python interpreter used by the Python flavor.
    #[arg(long, env = "SATURN_PYTHON_BIN", default_value = "python3")]
    pub python_bin: String,

    /// Base URL of the object storage REST endpoint.
    #[arg(long, env = "SATURN_STORAGE_URL")]
    pub storage_url: String,

    /// Base URL of the queue pull/ack/nack REST endpoint.
    #[arg(long, env = "SATURN_QUEUE_URL")]
    pub queue_url: String,
}
