//! Per-episode git scaffold: a lazily-cloned working tree refreshed before
//! every task, holding the compile and execute recipes for one language.

use crate::error::ScaffoldError;
use crate::lang;
use crate::recipe::Recipe;
use saturn_protocol::{Episode, Language};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Per-language settings threaded into recipe construction: where the
/// Java/Python toolchains live, and whether the scaffold is running in
/// Saturn's own infrastructure (some build scripts behave differently
/// when invoked from a developer's own machine).
#[derive(Debug, Clone)]
pub struct LangConfig {
    pub java_home: String,
    pub python_bin: String,
    pub on_saturn: bool,
}

/// A cloned-and-refreshed working tree for one episode, plus the compile
/// and execute recipes for its language.
pub struct Scaffold {
    pub root: PathBuf,
    pub remote: String,
    pub compile: Recipe,
    pub execute: Recipe,
    cloned: bool,
}

impl Scaffold {
    /// Build a scaffold for `episode`, selecting its compile/execute
    /// recipes by language. The working tree is not cloned yet; that
    /// happens lazily on first `ensure_ready`.
    pub fn new(
        episode: &Episode,
        root: PathBuf,
        git_token: Option<String>,
        lang_config: &LangConfig,
    ) -> Result<Self, ScaffoldError> {
        let remote = authenticated_remote(&episode.scaffold, git_token.as_deref());
        let (compile, execute) = match episode.language {
            Language::Java8 => lang::java8::recipes(),
            Language::Java21 => lang::java21::recipes(&lang_config.java_home, lang_config.on_saturn),
            Language::Python3 => lang::python3::recipes(&lang_config.python_bin, lang_config.on_saturn),
        };
        Ok(Self {
            root,
            remote,
            compile,
            execute,
            cloned: false,
        })
    }

    /// Clone the working tree on first use, otherwise reset it to a clean
    /// copy of the remote's default branch: `git reset --hard && git clean
    /// -fd && git pull`.
    pub async fn refresh(&mut self, cancel: &CancellationToken) -> Result<(), ScaffoldError> {
        if !self.cloned {
            tokio::fs::create_dir_all(&self.root).await?;
            run_command("git", &["clone", &self.remote, "."], &self.root, &[], cancel).await?;
            self.cloned = true;
            return Ok(());
        }
        run_command("git", &["reset", "--hard"], &self.root, &[], cancel).await?;
        run_command("git", &["clean", "-fd"], &self.root, &[], cancel).await?;
        run_command("git", &["pull"], &self.root, &[], cancel).await?;
        Ok(())
    }
}

/// Inject a git token into an https remote URL for clone/pull auth.
/// `git@`-style remotes are left untouched (auth is via deploy key there).
fn authenticated_remote(remote: &str, token: Option<&str>) -> String {
    match (token, remote.strip_prefix("https://")) {
        (Some(token), Some(rest)) => format!("https://x-access-token:{token}@{rest}"),
        _ => remote.to_string(),
    }
}

/// Run a subprocess to completion, capturing combined stdout+stderr as one
/// string and streaming each line through `tracing`. Cancellation sends
/// SIGTERM, waits for the grace period, then SIGKILL.
pub async fn run_command(
    cmd: &str,
    args: &[&str],
    work_dir: &Path,
    extra_env: &[(&str, &str)],
    cancel: &CancellationToken,
) -> Result<String, ScaffoldError> {
    let mut command = Command::new(cmd);
    command
        .args(args)
        .current_dir(work_dir)
        .envs(extra_env.iter().map(|(k, v)| (*k, *v)))
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command
        .spawn()
        .map_err(|_| ScaffoldError::CommandNotStarted(cmd.to_string()))?;

    let mut stdout = tokio::io::BufReader::new(child.stdout.take().expect("piped stdout"));
    let mut stderr = tokio::io::BufReader::new(child.stderr.take().expect("piped stderr"));

    let mut captured = String::new();
    let status = loop {
        tokio::select! {
            result = child.wait() => break result?,
            _ = cancel.cancelled() => {
                terminate(&mut child).await;
                return Err(ScaffoldError::Cancelled);
            }
            line = read_line(&mut stdout) => {
                if let Some(line) = line {
                    tracing::debug!(command = cmd, "{}", line);
                    captured.push_str(&line);
                    captured.push('\n');
                }
            }
            line = read_line(&mut stderr) => {
                if let Some(line) = line {
                    tracing::debug!(command = cmd, "[stderr] {}", line);
                    captured.push_str(&line);
                    captured.push('\n');
                }
            }
        }
    };

    drain_remaining(&mut stdout, &mut captured).await;
    drain_remaining(&mut stderr, &mut captured).await;

    if !status.success() {
        return Err(ScaffoldError::CommandFailed {
            command: format!("{cmd} {}", args.join(" ")),
            status: status.code().unwrap_or(-1),
        });
    }

    Ok(captured)
}

async fn read_line<R: tokio::io::AsyncBufRead + Unpin>(reader: &mut R) -> Option<String> {
    use tokio::io::AsyncBufReadExt;
    let mut line = String::new();
    match reader.read_line(&mut line).await {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim_end().to_string()),
    }
}

async fn drain_remaining<R: tokio::io::AsyncBufRead + Unpin>(reader: &mut R, captured: &mut String) {
    while let Some(line) = read_line(reader).await {
        captured.push_str(&line);
        captured.push('\n');
    }
}

async fn terminate(child: &mut tokio::process::Child) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            unsafe {
                libc::kill(pid as i32, libc::SIGTERM);
            }
        }
        let grace = tokio::time::sleep(std::time::Duration::from_secs(10));
        tokio::select! {
            _ = child.wait() => return,
            _ = grace => {}
        }
    }
    let _ = child.kill().await;
    let _ = child.wait().await;
}
