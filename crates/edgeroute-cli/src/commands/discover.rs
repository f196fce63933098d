//! Discover command implementation
//!
//! Lists the edge functions found in the source roots.

use std::process::ExitCode;

use anyhow::{Context, Result};
use colored::Colorize;

use super::ProjectArgs;
use crate::discovery::{find_functions, DiscoveredFunction};
use crate::pipeline::BuildOptions;

/// Run the discover command
///
/// # Returns
/// Exit code: always 0; missing roots contribute no functions
pub async fn run(project: &ProjectArgs, json_output: bool) -> Result<ExitCode> {
    let options = BuildOptions {
        internal_roots: project.internal_roots.clone(),
        user_roots: project.user_roots.clone(),
        ..Default::default()
    };
    let functions = find_functions(&options.source_roots()).await;

    if json_output {
        let json = serde_json::to_string_pretty(&functions)
            .context("Failed to serialize discovered functions")?;
        println!("{}", json);
    } else {
        print_functions(&functions);
    }

    Ok(ExitCode::SUCCESS)
}

fn print_functions(functions: &[DiscoveredFunction]) {
    if functions.is_empty() {
        println!("{}", "No edge functions found".yellow());
        return;
    }

    println!("{} {} function(s)", "Found:".cyan().bold(), functions.len());
    for func in functions {
        println!(
            "  {} {} {}",
            func.function.name.bold(),
            format!("[{}]", func.tier).dimmed(),
            func.function.path.display()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_discover_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello.ts"), "export default () => {}\n").unwrap();
        let project = ProjectArgs {
            user_roots: vec![dir.path().to_path_buf()],
            ..Default::default()
        };

        let code = run(&project, true).await.unwrap();

        assert_eq!(code, ExitCode::SUCCESS);
    }

    #[test]
    fn test_discovered_function_json_shape() {
        let func = DiscoveredFunction {
            function: edgeroute_spec::EdgeFunction::new("hello", "/src/hello.ts"),
            tier: crate::discovery::Tier::Internal,
        };
        let json = serde_json::to_value(&func).unwrap();

        assert_eq!(json["name"], "hello");
        assert_eq!(json["path"], "/src/hello.ts");
        assert_eq!(json["tier"], "internal");
    }
}
