//! CLI argument definitions for the edgeroute command-line interface.
//!
//! All `#[derive(Parser)]` and `#[derive(Subcommand)]` types are defined here,
//! keeping `main.rs` focused on dispatch logic.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use edgeroute_cli::commands::build::DEFAULT_OUT_DIR;
use edgeroute_cli::commands::ProjectArgs;

/// edgeroute - Edge function routing manifest compiler
#[derive(Parser)]
#[command(name = "edgeroute")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub(crate) struct Cli {
    /// Log filter (e.g. "info", "edgeroute=debug")
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Shorthand for --log-level debug
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Returns the effective log filter.
    pub fn log_filter(&self) -> &str {
        if self.debug {
            "debug"
        } else {
            &self.log_level
        }
    }
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Discover functions, extract their configs and write the routing manifest
    Build {
        #[command(flatten)]
        project: ProjectArgs,

        /// Output directory for manifest.json
        #[arg(short, long, default_value = DEFAULT_OUT_DIR)]
        out_dir: PathBuf,

        /// Output machine-readable JSON diagnostics (no colored output)
        #[arg(long)]
        json: bool,
    },

    /// List the edge functions found in the source directories
    Discover {
        #[command(flatten)]
        project: ProjectArgs,

        /// Output machine-readable JSON (no colored output)
        #[arg(long)]
        json: bool,
    },

    /// Print the merged function declarations as JSON
    Declarations {
        #[command(flatten)]
        project: ProjectArgs,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
}
