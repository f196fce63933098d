//! In-source config extraction.
//!
//! Each function module is run in the sandbox by the extraction script,
//! which reports its outcome through the exit code (see
//! [`ConfigExitCode`]) and writes the config to a [`Collector`] file.
//! Anything other than a clean success resolves to the empty config and a
//! log message, except for the outcomes that are build errors.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use edgeroute_spec::{
    BuildError, EdgeFunction, ExtractedConfig, FunctionConfigs, InvalidConfigPolicy, Logger,
};
use futures_util::{stream, StreamExt, TryStreamExt};
use url::Url;

use crate::collector::Collector;
use crate::error::{SandboxError, SandboxResult};
use crate::exit_code::ConfigExitCode;
use crate::runner::{SandboxInvocation, SandboxOutput, SandboxRunner, DEFAULT_TIMEOUT_SECS};

const EMBEDDED_EXTRACT_SCRIPT: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../../sandbox/extract_config.ts"
));

/// Environment variable that overrides the extraction script.
pub const EXTRACT_SCRIPT_ENV: &str = "EDGEROUTE_EXTRACT_SCRIPT";

/// Default number of extractions run at once.
pub const DEFAULT_JOBS: usize = 8;

/// Configuration for the config extractor.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Path to the extraction script. The embedded copy is used when unset.
    pub script_path: Option<PathBuf>,
    /// Timeout for one extraction.
    pub timeout: Duration,
    /// Maximum number of concurrent extractions.
    pub jobs: usize,
    /// Additional directories the sandbox may read, e.g. shared modules.
    pub read_roots: Vec<PathBuf>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            script_path: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            jobs: DEFAULT_JOBS,
            read_roots: Vec::new(),
        }
    }
}

impl ExtractorConfig {
    /// Sets the extraction script path.
    pub fn script_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.script_path = Some(path.into());
        self
    }

    /// Sets the timeout in seconds.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    /// Sets the concurrency limit.
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    /// Adds a directory the sandbox may read.
    pub fn read_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.read_roots.push(dir.into());
        self
    }
}

#[derive(Debug)]
struct ResolvedScript {
    path: PathBuf,
    _tempfile: Option<tempfile::NamedTempFile>,
}

fn resolve_script(config: &ExtractorConfig) -> SandboxResult<ResolvedScript> {
    // Config override first.
    if let Some(ref path) = config.script_path {
        if path.exists() {
            return Ok(ResolvedScript {
                path: path.clone(),
                _tempfile: None,
            });
        }
        return Err(SandboxError::ScriptNotFound { path: path.clone() });
    }

    // Environment override (fallback).
    if let Ok(path) = std::env::var(EXTRACT_SCRIPT_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Ok(ResolvedScript {
                path,
                _tempfile: None,
            });
        }
        return Err(SandboxError::ScriptNotFound { path });
    }

    // Last resort: write the embedded script to a temp file.
    let mut file = tempfile::Builder::new()
        .prefix("edgeroute_extract_config_")
        .suffix(".ts")
        .tempfile()?;
    file.write_all(EMBEDDED_EXTRACT_SCRIPT.as_bytes())?;
    file.flush()?;

    Ok(ResolvedScript {
        path: file.path().to_path_buf(),
        _tempfile: Some(file),
    })
}

/// Extracts the `config` export of function modules.
pub struct ConfigExtractor {
    runner: Arc<dyn SandboxRunner>,
    logger: Arc<dyn Logger>,
    config: ExtractorConfig,
    policy: InvalidConfigPolicy,
    script: ResolvedScript,
}

impl ConfigExtractor {
    /// Creates an extractor.
    ///
    /// Fails if a configured script override does not exist or the embedded
    /// script cannot be written out.
    pub fn new(
        runner: Arc<dyn SandboxRunner>,
        logger: Arc<dyn Logger>,
        config: ExtractorConfig,
        policy: InvalidConfigPolicy,
    ) -> SandboxResult<Self> {
        let script = resolve_script(&config)?;
        Ok(Self {
            runner,
            logger,
            config,
            policy,
            script,
        })
    }

    /// Returns the path of the script passed to the sandbox.
    pub fn script_path(&self) -> &std::path::Path {
        &self.script.path
    }

    /// Extracts the config of every function, at most `jobs` at a time.
    ///
    /// The result is keyed by function name in the order of `functions`.
    /// The first build or system error aborts the whole batch.
    pub async fn extract_all(&self, functions: &[EdgeFunction]) -> SandboxResult<FunctionConfigs> {
        let configs: Vec<(String, ExtractedConfig)> = stream::iter(functions)
            .map(|func| async move {
                let config = self.extract(func).await?;
                Ok::<_, SandboxError>((func.name.clone(), config))
            })
            .buffered(self.config.jobs.max(1))
            .try_collect()
            .await?;

        Ok(configs.into_iter().collect())
    }

    /// Extracts the config of one function.
    pub async fn extract(&self, func: &EdgeFunction) -> SandboxResult<ExtractedConfig> {
        let collector = Collector::new()?;
        let invocation = self.invocation(func, &collector)?;

        let output = match self.runner.run(&invocation).await {
            Ok(output) => output,
            Err(SandboxError::Timeout { timeout_secs }) => {
                self.logger.system(&format!(
                    "Config extraction for edge function at '{}' timed out after {} seconds",
                    func.path.display(),
                    timeout_secs
                ));
                return Ok(ExtractedConfig::default());
            }
            Err(err) => return Err(err),
        };

        if !output.stdout.is_empty() {
            self.logger.user(&output.stdout);
        }

        let config = self.handle_outcome(func, &collector, &output).await?;

        if let Some(value) = config.invalid_on_error() {
            return Err(BuildError::InvalidOnError {
                function: func.name.clone(),
                path: func.path.clone(),
                value: value.to_string(),
            }
            .into());
        }

        Ok(config)
    }

    fn invocation(
        &self,
        func: &EdgeFunction,
        collector: &Collector,
    ) -> SandboxResult<SandboxInvocation> {
        let function_url =
            Url::from_file_path(&func.path).map_err(|_| SandboxError::InvalidModulePath {
                path: func.path.clone(),
            })?;

        let mut read_paths = self.config.read_roots.clone();
        read_paths.push(
            func.path
                .parent()
                .map(|dir| dir.to_path_buf())
                .unwrap_or_else(|| func.path.clone()),
        );
        read_paths.push(self.script.path.clone());

        Ok(SandboxInvocation {
            script: self.script.path.clone(),
            args: vec![
                function_url.to_string(),
                collector.url()?.to_string(),
                ConfigExitCode::protocol_json(),
            ],
            read_paths,
            write_path: collector.path().to_path_buf(),
            timeout: self.config.timeout,
        })
    }

    async fn handle_outcome(
        &self,
        func: &EdgeFunction,
        collector: &Collector,
        output: &SandboxOutput,
    ) -> SandboxResult<ExtractedConfig> {
        let path = func.path.display();
        let outcome = output.exit_code.and_then(ConfigExitCode::from_code);

        match outcome {
            Some(ConfigExitCode::Success) => match collector.read_config().await {
                Ok(config) => return Ok(config),
                Err(err) => self.logger.system(&format!(
                    "Could not read configuration of edge function at '{}': {}",
                    path, err
                )),
            },
            Some(ConfigExitCode::InvalidDefaultExport) => {
                return Err(BuildError::invalid_default_export(&func.name, &func.path).into());
            }
            Some(ConfigExitCode::ImportError) => {
                self.notify(with_diagnostics(
                    format!("Could not load edge function at '{}'", path),
                    &output.stderr,
                ));
            }
            Some(ConfigExitCode::NoConfig) => {
                self.logger
                    .system(&format!("No in-source config found for edge function at '{}'", path));
            }
            Some(ConfigExitCode::InvalidExport) => match self.policy {
                InvalidConfigPolicy::Fail => {
                    return Err(BuildError::invalid_config_export(&func.name, &func.path).into());
                }
                InvalidConfigPolicy::Ignore => self.notify(format!(
                    "'config' export in edge function at '{}' must be an object",
                    path
                )),
            },
            Some(ConfigExitCode::RuntimeError) => {
                self.notify(with_diagnostics(
                    format!("Error while running code in edge function at '{}'", path),
                    &output.stderr,
                ));
            }
            Some(ConfigExitCode::SerializationError) => {
                self.notify(format!(
                    "'config' object in edge function at '{}' must contain primitive values only",
                    path
                ));
            }
            Some(ConfigExitCode::UnhandledError) | None => {
                self.logger.system(&with_diagnostics(
                    format!(
                        "Could not extract configuration for edge function at '{}' (exit code {:?})",
                        path, output.exit_code
                    ),
                    &output.stderr,
                ));
            }
        }

        Ok(ExtractedConfig::default())
    }

    /// Sends a diagnostic to the user channel as a complete line.
    fn notify(&self, mut message: String) {
        message.push('\n');
        self.logger.user(&message);
    }
}

fn with_diagnostics(message: String, stderr: &str) -> String {
    let stderr = stderr.trim_end();
    if stderr.is_empty() {
        message
    } else {
        format!("{}\n{}", message, stderr)
    }
}

impl std::fmt::Debug for ConfigExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigExtractor")
            .field("config", &self.config)
            .field("policy", &self.policy)
            .field("script", &self.script.path)
            .finish()
    }
}
