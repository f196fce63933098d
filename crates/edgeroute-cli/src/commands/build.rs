//! Build command implementation
//!
//! Runs the whole pipeline and writes the routing manifest.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use colored::Colorize;
use edgeroute_sandbox::SandboxRunner;
use edgeroute_spec::{BuildError, Logger, ManifestWarning};
use serde::Serialize;

use super::ProjectArgs;
use crate::logger::ConsoleLogger;
use crate::pipeline::{self, BuildOptions, BuildOutput, PipelineError};

/// Default output directory for the manifest.
pub const DEFAULT_OUT_DIR: &str = "dist";

/// Run the build command
///
/// # Arguments
/// * `project` - Project inputs and sandbox settings
/// * `out_dir` - Directory the manifest is written to
/// * `json_output` - Whether to output machine-readable JSON
///
/// # Returns
/// Exit code: 0 on success, 1 if a function failed validation
pub async fn run(project: &ProjectArgs, out_dir: &Path, json_output: bool) -> Result<ExitCode> {
    let logger: Arc<dyn Logger> = Arc::new(ConsoleLogger::for_output(json_output));
    let options = project.load(logger.as_ref())?;
    run_with(&options, project.sandbox.runner(), logger, out_dir, json_output).await
}

/// Runs the build with an explicit runner and logger.
pub async fn run_with(
    options: &BuildOptions,
    runner: Arc<dyn SandboxRunner>,
    logger: Arc<dyn Logger>,
    out_dir: &Path,
    json_output: bool,
) -> Result<ExitCode> {
    let start = Instant::now();

    if !json_output {
        println!(
            "{} {} source root(s)",
            "Building:".cyan().bold(),
            options.internal_roots.len() + options.user_roots.len()
        );
    }

    let output = match pipeline::build(options, runner, logger).await {
        Ok(output) => output,
        Err(err) => return report_failure(err, json_output),
    };

    let manifest_path = output
        .generated
        .manifest
        .write(out_dir)
        .context("Failed to write manifest")?;
    let duration_ms = start.elapsed().as_millis() as u64;

    if json_output {
        print_json(&BuildJsonOutput::success(&output, &manifest_path))?;
    } else {
        print_build_results(&output, &manifest_path);
        println!(
            "\n{} Manifest built ({}ms)",
            "SUCCESS".green().bold(),
            duration_ms
        );
    }

    Ok(ExitCode::SUCCESS)
}

fn report_failure(err: PipelineError, json_output: bool) -> Result<ExitCode> {
    let Some(build_error) = err.as_build_error() else {
        return Err(err).context("Failed to build manifest");
    };

    if json_output {
        print_json(&BuildJsonOutput::failure(build_error))?;
    } else {
        println!("\n{}", "Errors:".red().bold());
        println!(
            "  {} [{}]: {}",
            "x".red(),
            build_error.code().red(),
            build_error
        );
        println!("\n{} Build failed", "FAILED".red().bold());
    }

    Ok(ExitCode::from(1))
}

fn print_build_results(output: &BuildOutput, manifest_path: &Path) {
    let manifest = &output.generated.manifest;

    println!(
        "{} {} function(s), {} declaration(s)",
        "Found:".dimmed(),
        output.resolved.functions.len(),
        output.resolved.declarations.len()
    );
    println!(
        "{} {} route(s), {} post-cache route(s)",
        "Routes:".dimmed(),
        manifest.routes.len(),
        manifest.post_cache_routes.len()
    );

    if !output.generated.warnings.is_empty() {
        println!(
            "{} {} route(s) use unsupported patterns",
            "Warnings:".yellow().bold(),
            output.generated.warnings.len()
        );
    }

    println!("\n{} {}", "Manifest written to:".dimmed(), manifest_path.display());
}

fn print_json(output: &BuildJsonOutput) -> Result<()> {
    let json = serde_json::to_string_pretty(output).context("Failed to serialize build output")?;
    println!("{}", json);
    Ok(())
}

/// Machine-readable result of the build command.
#[derive(Debug, Serialize)]
pub struct BuildJsonOutput {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_path: Option<PathBuf>,
    pub warnings: Vec<JsonWarning>,
    pub errors: Vec<JsonError>,
}

/// A warning in JSON output.
#[derive(Debug, Serialize)]
pub struct JsonWarning {
    pub function: String,
    pub path: PathBuf,
    pub message: String,
}

impl From<&ManifestWarning> for JsonWarning {
    fn from(warning: &ManifestWarning) -> Self {
        Self {
            function: warning.function.clone(),
            path: warning.path.clone(),
            message: warning.message.clone(),
        }
    }
}

/// An error in JSON output.
#[derive(Debug, Serialize)]
pub struct JsonError {
    pub code: String,
    pub function: String,
    pub message: String,
}

impl BuildJsonOutput {
    fn success(output: &BuildOutput, manifest_path: &Path) -> Self {
        Self {
            success: true,
            manifest_path: Some(manifest_path.to_path_buf()),
            warnings: output.generated.warnings.iter().map(JsonWarning::from).collect(),
            errors: Vec::new(),
        }
    }

    fn failure(error: &BuildError) -> Self {
        Self {
            success: false,
            manifest_path: None,
            warnings: Vec::new(),
            errors: vec![JsonError {
                code: error.code().to_string(),
                function: error.function().to_string(),
                message: error.to_string(),
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgeroute_sandbox::{
        ConfigExitCode, SandboxInvocation, SandboxOutput, SandboxResult,
    };
    use edgeroute_spec::{Declaration, Manifest, MemoryLogger, MANIFEST_FILE_NAME};
    use futures_util::future::BoxFuture;
    use pretty_assertions::assert_eq;

    /// Runner whose functions all export the same outcome.
    struct FixedRunner(ConfigExitCode);

    impl SandboxRunner for FixedRunner {
        fn run<'a>(
            &'a self,
            _invocation: &'a SandboxInvocation,
        ) -> BoxFuture<'a, SandboxResult<SandboxOutput>> {
            Box::pin(async move {
                Ok(SandboxOutput {
                    exit_code: Some(self.0.code()),
                    ..Default::default()
                })
            })
        }
    }

    fn project() -> (tempfile::TempDir, BuildOptions) {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("edge-functions");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("hello.ts"), "export default () => {}\n").unwrap();

        let options = BuildOptions {
            user_roots: vec![src],
            declarations: vec![Declaration::with_path("hello", "/hello")],
            ..Default::default()
        };
        (dir, options)
    }

    #[tokio::test]
    async fn test_build_writes_manifest() {
        let (dir, options) = project();
        let out_dir = dir.path().join("dist");

        let code = run_with(
            &options,
            Arc::new(FixedRunner(ConfigExitCode::NoConfig)),
            Arc::new(MemoryLogger::new()),
            &out_dir,
            true,
        )
        .await
        .unwrap();

        assert_eq!(code, ExitCode::SUCCESS);
        let json = std::fs::read_to_string(out_dir.join(MANIFEST_FILE_NAME)).unwrap();
        let manifest: Manifest = serde_json::from_str(&json).unwrap();
        assert_eq!(manifest.routes.len(), 1);
        assert_eq!(manifest.routes[0].function, "hello");
        assert_eq!(manifest.routes[0].pattern, "^/hello/?$");
    }

    #[tokio::test]
    async fn test_invalid_default_export_fails_without_manifest() {
        let (dir, options) = project();
        let out_dir = dir.path().join("dist");

        let code = run_with(
            &options,
            Arc::new(FixedRunner(ConfigExitCode::InvalidDefaultExport)),
            Arc::new(MemoryLogger::new()),
            &out_dir,
            true,
        )
        .await
        .unwrap();

        assert_eq!(code, ExitCode::from(1));
        assert!(!out_dir.join(MANIFEST_FILE_NAME).exists());
    }

    #[test]
    fn test_failure_json_names_function() {
        let err = BuildError::invalid_default_export("hello", "/src/hello.ts");
        let output = BuildJsonOutput::failure(&err);
        let json = serde_json::to_value(&output).unwrap();

        assert_eq!(json["success"], false);
        assert_eq!(json["errors"][0]["code"], "BUILD_001");
        assert_eq!(json["errors"][0]["function"], "hello");
        assert!(json.get("manifest_path").is_none());
    }
}
