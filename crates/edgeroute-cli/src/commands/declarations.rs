//! Declarations command implementation
//!
//! Prints the merged declaration list that drives route generation, in
//! match priority order.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use edgeroute_sandbox::SandboxRunner;
use edgeroute_spec::{Declaration, Logger};

use super::ProjectArgs;
use crate::logger::ConsoleLogger;
use crate::pipeline::{resolve_declarations, BuildOptions};

/// Run the declarations command
///
/// # Arguments
/// * `project` - Project inputs and sandbox settings
/// * `pretty` - Whether to pretty-print the JSON
pub async fn run(project: &ProjectArgs, pretty: bool) -> Result<ExitCode> {
    // stdout carries the JSON document.
    let logger: Arc<dyn Logger> = Arc::new(ConsoleLogger::stderr());
    let options = project.load(logger.as_ref())?;
    let declarations = merged(&options, project.sandbox.runner(), logger).await?;
    println!("{}", to_json(&declarations, pretty)?);
    Ok(ExitCode::SUCCESS)
}

/// Returns the merged declarations of a project.
pub async fn merged(
    options: &BuildOptions,
    runner: Arc<dyn SandboxRunner>,
    logger: Arc<dyn Logger>,
) -> Result<Vec<Declaration>> {
    let resolved = resolve_declarations(options, runner, logger)
        .await
        .context("Failed to resolve declarations")?;
    Ok(resolved.declarations)
}

fn to_json(declarations: &[Declaration], pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(declarations)
    } else {
        serde_json::to_string(declarations)
    };
    json.context("Failed to serialize declarations")
}
