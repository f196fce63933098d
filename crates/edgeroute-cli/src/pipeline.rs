//! The build pipeline.
//!
//! Discovery and extraction are asynchronous; merging, pattern compilation
//! and assembly run synchronously on their results.

use std::path::PathBuf;
use std::sync::Arc;

use edgeroute_sandbox::{ConfigExtractor, ExtractorConfig, SandboxError, SandboxRunner};
use edgeroute_spec::{
    generate_manifest, merge_declarations, with_generator_fallback, BuildError, BuildSettings,
    Bundle, Declaration, DeployConfig, EdgeFunction, FeatureFlags, FunctionConfigs,
    GeneratedManifest, Logger, ManifestInputs, MergeInputs,
};
use thiserror::Error;

use crate::discovery::{find_functions, DiscoveredFunction, SourceRoot, Tier};

/// Errors that abort a build.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Extraction failed with a system error or a function failed validation.
    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    /// Route compilation failed.
    #[error(transparent)]
    Build(#[from] BuildError),
}

impl PipelineError {
    /// Returns the build error, if this is one.
    pub fn as_build_error(&self) -> Option<&BuildError> {
        match self {
            PipelineError::Build(err) | PipelineError::Sandbox(SandboxError::Build(err)) => {
                Some(err)
            }
            PipelineError::Sandbox(_) => None,
        }
    }
}

/// Everything a build reads.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Directories of internal functions, highest precedence first.
    pub internal_roots: Vec<PathBuf>,
    /// Directories of user functions.
    pub user_roots: Vec<PathBuf>,
    /// Declarations from the project file.
    pub declarations: Vec<Declaration>,
    /// The deploy feed.
    pub deploy_config: DeployConfig,
    /// Directory the deploy feed's relative paths are resolved against.
    pub deploy_config_dir: Option<PathBuf>,
    /// Bundles produced by the bundler.
    pub bundles: Vec<Bundle>,
    /// Feature flags for this build.
    pub flags: FeatureFlags,
    /// Sandbox extraction settings.
    pub extractor: ExtractorConfig,
}

impl BuildOptions {
    /// Source roots in precedence order: internal roots, then user roots.
    pub fn source_roots(&self) -> Vec<SourceRoot> {
        self.internal_roots
            .iter()
            .map(SourceRoot::internal)
            .chain(self.user_roots.iter().map(SourceRoot::user))
            .collect()
    }
}

/// Functions, extracted configs and merged declarations of a build.
#[derive(Debug, Clone)]
pub struct ResolvedDeclarations {
    pub settings: BuildSettings,
    pub functions: Vec<DiscoveredFunction>,
    pub internal_configs: FunctionConfigs,
    pub user_configs: FunctionConfigs,
    pub declarations: Vec<Declaration>,
}

impl ResolvedDeclarations {
    /// Returns the discovered functions without their tier.
    pub fn edge_functions(&self) -> Vec<EdgeFunction> {
        self.functions.iter().map(|f| f.function.clone()).collect()
    }
}

/// Discovers functions, extracts their configs and merges declarations.
pub async fn resolve_declarations(
    options: &BuildOptions,
    runner: Arc<dyn SandboxRunner>,
    logger: Arc<dyn Logger>,
) -> Result<ResolvedDeclarations, PipelineError> {
    let settings = options.flags.resolve();
    tracing::debug!("Build settings: {:?}", settings);

    let functions = find_functions(&options.source_roots()).await;
    tracing::info!("Found {} edge functions", functions.len());

    let edge_functions: Vec<EdgeFunction> = functions.iter().map(|f| f.function.clone()).collect();
    let extractor = ConfigExtractor::new(
        runner,
        logger,
        options.extractor.clone(),
        settings.invalid_config,
    )?;
    let configs = extractor.extract_all(&edge_functions).await?;

    let mut internal_configs = FunctionConfigs::new();
    let mut user_configs = FunctionConfigs::new();
    for func in &functions {
        let name = func.function.name.as_str();
        let config = configs.get(name).cloned().unwrap_or_default();
        match func.tier {
            Tier::Internal => internal_configs.insert(name, config),
            Tier::User => user_configs.insert(name, config),
        }
    }

    let merged = merge_declarations(
        &MergeInputs {
            file_declarations: &options.declarations,
            deploy_declarations: &options.deploy_config.declarations,
            internal_configs: &internal_configs,
            user_configs: &user_configs,
        },
        settings.merge_order,
    );

    let internal_names: Vec<&str> = functions
        .iter()
        .filter(|f| f.tier == Tier::Internal)
        .map(|f| f.function.name.as_str())
        .collect();
    let declarations = with_generator_fallback(&merged, &internal_names);

    Ok(ResolvedDeclarations {
        settings,
        functions,
        internal_configs,
        user_configs,
        declarations,
    })
}

/// Result of a complete build.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub resolved: ResolvedDeclarations,
    pub generated: GeneratedManifest,
}

/// Runs the whole pipeline and returns the manifest.
///
/// Route warnings are sent to the user channel as well as returned. The
/// manifest is not written; see [`edgeroute_spec::Manifest::write`].
pub async fn build(
    options: &BuildOptions,
    runner: Arc<dyn SandboxRunner>,
    logger: Arc<dyn Logger>,
) -> Result<BuildOutput, PipelineError> {
    let resolved = resolve_declarations(options, runner, logger.clone()).await?;
    let functions = resolved.edge_functions();

    let base_dir = options
        .deploy_config_dir
        .clone()
        .or_else(|| std::env::current_dir().ok());
    let import_map = base_dir.and_then(|dir| {
        options
            .deploy_config
            .import_map_url(&dir)
            .map(|url| url.to_string())
    });

    let generated = generate_manifest(
        &ManifestInputs {
            functions: &functions,
            declarations: &resolved.declarations,
            internal_configs: &resolved.internal_configs,
            user_configs: &resolved.user_configs,
            bundles: &options.bundles,
            layers: &options.deploy_config.layers,
            import_map: import_map.as_deref(),
        },
        &resolved.settings,
    )?;

    for warning in &generated.warnings {
        logger.user(&format!("{}\n", warning.message));
    }

    Ok(BuildOutput {
        resolved,
        generated,
    })
}
