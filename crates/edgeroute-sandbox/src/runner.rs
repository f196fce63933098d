//! Sandboxed script execution.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::process::Command;

use crate::error::{SandboxError, SandboxResult};
use crate::runtime::RuntimeLocator;

/// Default timeout for one sandbox run.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// One script run inside the sandbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxInvocation {
    /// Script to execute.
    pub script: PathBuf,
    /// Arguments passed to the script.
    pub args: Vec<String>,
    /// Paths the script may read.
    pub read_paths: Vec<PathBuf>,
    /// The single file the script may write.
    pub write_path: PathBuf,
    /// Wall-clock limit for the run.
    pub timeout: Duration,
}

/// Captured result of a sandbox run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SandboxOutput {
    /// Exit code, or `None` if the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Runs scripts in an isolated subprocess.
pub trait SandboxRunner: Send + Sync {
    /// Runs the invocation to completion.
    ///
    /// Returns [`SandboxError::Timeout`] if the run exceeds its timeout; the
    /// process is killed before the error is returned.
    fn run<'a>(&'a self, invocation: &'a SandboxInvocation)
        -> BoxFuture<'a, SandboxResult<SandboxOutput>>;
}

/// Runs scripts with the Deno runtime, granting only the permissions
/// listed in the invocation.
#[derive(Debug, Clone)]
pub struct DenoRunner {
    locator: Arc<RuntimeLocator>,
}

impl DenoRunner {
    /// Creates a runner that acquires its runtime through `locator`.
    pub fn new(locator: Arc<RuntimeLocator>) -> Self {
        Self { locator }
    }

    fn command(runtime: &std::path::Path, invocation: &SandboxInvocation) -> Command {
        let read_paths = invocation
            .read_paths
            .iter()
            .map(|path| path.display().to_string())
            .collect::<Vec<_>>()
            .join(",");

        // deno run --quiet --no-prompt --no-config --allow-read=<paths> --allow-write=<collector> <script> <args...>
        let mut cmd = Command::new(runtime);
        cmd.arg("run")
            .arg("--quiet")
            .arg("--no-prompt")
            .arg("--no-config")
            .arg(format!("--allow-read={}", read_paths))
            .arg(format!("--allow-write={}", invocation.write_path.display()))
            .arg(&invocation.script)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl SandboxRunner for DenoRunner {
    fn run<'a>(
        &'a self,
        invocation: &'a SandboxInvocation,
    ) -> BoxFuture<'a, SandboxResult<SandboxOutput>> {
        Box::pin(async move {
            let runtime = self.locator.get().await?;
            let child = Self::command(&runtime, invocation)
                .spawn()
                .map_err(SandboxError::SpawnFailed)?;

            // Dropping the wait future on timeout drops the child, which kills it.
            let output = tokio::time::timeout(invocation.timeout, child.wait_with_output())
                .await
                .map_err(|_| SandboxError::Timeout {
                    timeout_secs: invocation.timeout.as_secs(),
                })?
                .map_err(SandboxError::Io)?;

            Ok(SandboxOutput {
                exit_code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            })
        })
    }
}
