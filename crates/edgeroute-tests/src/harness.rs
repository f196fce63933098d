//! Test harness utilities for running the pipeline against a scripted sandbox.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use edgeroute_cli::{build, resolve_declarations, BuildOptions, BuildOutput, PipelineError};
use edgeroute_cli::ResolvedDeclarations;
use edgeroute_sandbox::{
    ConfigExitCode, SandboxError, SandboxInvocation, SandboxOutput, SandboxResult, SandboxRunner,
};
use edgeroute_spec::MemoryLogger;
use futures_util::future::BoxFuture;
use url::Url;

/// What the sandbox reports for one function.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The module exports this config object.
    Config(serde_json::Value),
    /// The script exits with this code and writes nothing.
    Exit(ConfigExitCode),
    /// The script exits with this code and prints the given output.
    Output {
        code: ConfigExitCode,
        stdout: String,
        stderr: String,
    },
    /// The run exceeds its timeout.
    Timeout,
}

/// Sandbox runner that answers from a table keyed by function path.
///
/// Functions without an entry report [`ConfigExitCode::NoConfig`].
#[derive(Default)]
pub struct ScriptedRunner {
    outcomes: HashMap<PathBuf, Outcome>,
    invocations: Mutex<Vec<SandboxInvocation>>,
}

impl ScriptedRunner {
    /// Create a runner where no function has a config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the outcome for the function at `path`.
    pub fn with(mut self, path: impl AsRef<Path>, outcome: Outcome) -> Self {
        self.outcomes.insert(path.as_ref().to_path_buf(), outcome);
        self
    }

    /// Script a config export for the function at `path`.
    pub fn with_config(self, path: impl AsRef<Path>, config: serde_json::Value) -> Self {
        self.with(path, Outcome::Config(config))
    }

    /// Every invocation received so far.
    pub fn invocations(&self) -> Vec<SandboxInvocation> {
        self.invocations
            .lock()
            .expect("invocation log poisoned")
            .clone()
    }

    fn outcome_for(&self, invocation: &SandboxInvocation) -> Outcome {
        invocation
            .args
            .first()
            .and_then(|arg| Url::parse(arg).ok())
            .and_then(|url| url.to_file_path().ok())
            .and_then(|path| self.outcomes.get(&path).cloned())
            .unwrap_or(Outcome::Exit(ConfigExitCode::NoConfig))
    }
}

impl SandboxRunner for ScriptedRunner {
    fn run<'a>(
        &'a self,
        invocation: &'a SandboxInvocation,
    ) -> BoxFuture<'a, SandboxResult<SandboxOutput>> {
        Box::pin(async move {
            self.invocations
                .lock()
                .expect("invocation log poisoned")
                .push(invocation.clone());

            match self.outcome_for(invocation) {
                Outcome::Config(config) => {
                    std::fs::write(&invocation.write_path, config.to_string())?;
                    Ok(SandboxOutput {
                        exit_code: Some(ConfigExitCode::Success.code()),
                        ..Default::default()
                    })
                }
                Outcome::Exit(code) => Ok(SandboxOutput {
                    exit_code: Some(code.code()),
                    ..Default::default()
                }),
                Outcome::Output {
                    code,
                    stdout,
                    stderr,
                } => Ok(SandboxOutput {
                    exit_code: Some(code.code()),
                    stdout,
                    stderr,
                }),
                Outcome::Timeout => Err(SandboxError::Timeout {
                    timeout_secs: invocation.timeout.as_secs(),
                }),
            }
        })
    }
}

/// Runs the pipeline with a scripted runner and a recording logger.
pub struct BuildHarness {
    pub runner: Arc<ScriptedRunner>,
    pub logger: Arc<MemoryLogger>,
}

impl BuildHarness {
    /// Create a harness around `runner`.
    pub fn new(runner: ScriptedRunner) -> Self {
        Self {
            runner: Arc::new(runner),
            logger: Arc::new(MemoryLogger::new()),
        }
    }

    /// Run discovery, extraction and merging.
    pub async fn resolve(
        &self,
        options: &BuildOptions,
    ) -> Result<ResolvedDeclarations, PipelineError> {
        resolve_declarations(options, self.runner.clone(), self.logger.clone()).await
    }

    /// Run the whole pipeline.
    pub async fn build(&self, options: &BuildOptions) -> Result<BuildOutput, PipelineError> {
        build(options, self.runner.clone(), self.logger.clone()).await
    }
}

/// Check if tests that execute the real Deno sandbox should run.
pub fn should_run_deno_tests() -> bool {
    std::env::var("EDGEROUTE_RUN_DENO_TESTS")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Returns true if a compiled manifest pattern matches `path`.
pub fn route_matches(pattern: &str, path: &str) -> bool {
    regex::Regex::new(pattern)
        .map(|re| re.is_match(path))
        .unwrap_or(false)
}
