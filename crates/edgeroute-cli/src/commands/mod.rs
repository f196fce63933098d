//! CLI command implementations

pub mod build;
pub mod declarations;
pub mod discover;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use edgeroute_sandbox::{
    DenoRunner, ExtractorConfig, LocalRuntime, RuntimeLocator, SandboxRunner, DEFAULT_JOBS,
    DEFAULT_TIMEOUT_SECS,
};
use edgeroute_spec::{DeployConfig, Logger};

use crate::discovery::absolute_path;
use crate::input::{load_bundles, load_declarations, load_feature_flags};
use crate::pipeline::BuildOptions;

/// Project inputs shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct ProjectArgs {
    /// Directory of user edge functions (repeatable)
    #[arg(long = "src", value_name = "DIR")]
    pub user_roots: Vec<PathBuf>,

    /// Directory of internal edge functions, scanned before user functions (repeatable)
    #[arg(long = "internal-src", value_name = "DIR")]
    pub internal_roots: Vec<PathBuf>,

    /// JSON file with the project's function declarations
    #[arg(long, value_name = "FILE")]
    pub declarations: Option<PathBuf>,

    /// JSON file written by the deploy pipeline
    #[arg(long, value_name = "FILE")]
    pub deploy_config: Option<PathBuf>,

    /// JSON file with the bundles produced by the bundler
    #[arg(long, value_name = "FILE")]
    pub bundles: Option<PathBuf>,

    /// JSON object of feature flags
    #[arg(long, value_name = "FILE")]
    pub feature_flags: Option<PathBuf>,

    /// Enable a feature flag, or set it with NAME=true|false (repeatable)
    #[arg(long = "flag", value_name = "NAME")]
    pub flags: Vec<String>,

    #[command(flatten)]
    pub sandbox: SandboxArgs,
}

/// Settings of the config extraction sandbox.
#[derive(Args, Debug, Clone)]
pub struct SandboxArgs {
    /// Path to the Deno runtime (default: EDGEROUTE_RUNTIME_PATH, then PATH)
    #[arg(long, value_name = "PATH")]
    pub runtime: Option<PathBuf>,

    /// Directory holding a cached runtime binary
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Path to a custom config extraction script
    #[arg(long, value_name = "FILE")]
    pub extract_script: Option<PathBuf>,

    /// Timeout for extracting the config of one function
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Maximum number of concurrent extractions
    #[arg(long, default_value_t = DEFAULT_JOBS)]
    pub jobs: usize,
}

impl Default for SandboxArgs {
    fn default() -> Self {
        Self {
            runtime: None,
            cache_dir: None,
            extract_script: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            jobs: DEFAULT_JOBS,
        }
    }
}

impl SandboxArgs {
    /// Returns the extractor settings.
    pub fn extractor_config(&self, read_roots: &[PathBuf]) -> ExtractorConfig {
        let mut config = ExtractorConfig::default()
            .timeout_secs(self.timeout_secs)
            .jobs(self.jobs);
        if let Some(ref script) = self.extract_script {
            config = config.script_path(script);
        }
        for root in read_roots {
            config = config.read_root(root);
        }
        config
    }

    /// Creates a runner backed by a locally installed runtime.
    pub fn runner(&self) -> Arc<dyn SandboxRunner> {
        let mut runtime = LocalRuntime::new();
        if let Some(ref path) = self.runtime {
            runtime = runtime.path(path);
        }
        if let Some(ref dir) = self.cache_dir {
            runtime = runtime.cache_dir(dir);
        }
        Arc::new(DenoRunner::new(Arc::new(RuntimeLocator::local(runtime))))
    }
}

impl ProjectArgs {
    /// Loads every input file and returns the build options.
    pub fn load(&self, logger: &dyn Logger) -> Result<BuildOptions> {
        let deploy_config = DeployConfig::load(self.deploy_config.as_deref(), logger)
            .context("Failed to load deploy config")?;
        let deploy_config_dir = self
            .deploy_config
            .as_deref()
            .and_then(|path| path.parent())
            .map(|dir| absolute_path(dir.to_path_buf()));

        let internal_roots = absolute_roots(&self.internal_roots);
        let user_roots = absolute_roots(&self.user_roots);
        let read_roots: Vec<PathBuf> = internal_roots
            .iter()
            .chain(user_roots.iter())
            .cloned()
            .collect();

        Ok(BuildOptions {
            extractor: self.sandbox.extractor_config(&read_roots),
            internal_roots,
            user_roots,
            declarations: load_declarations(self.declarations.as_deref())?,
            deploy_config,
            deploy_config_dir,
            bundles: load_bundles(self.bundles.as_deref())?,
            flags: load_feature_flags(self.feature_flags.as_deref(), &self.flags)?,
        })
    }
}

fn absolute_roots(roots: &[PathBuf]) -> Vec<PathBuf> {
    roots.iter().cloned().map(absolute_path).collect()
}
