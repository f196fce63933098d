//! edgeroute CLI - Command-line interface for edge function routing
//!
//! This binary discovers edge functions, reads their in-source configs and
//! writes the routing manifest consumed by the edge runtime.

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use edgeroute_cli::commands;

mod cli_args;

use cli_args::{Cli, Commands};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(cli.log_filter()).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("{}: {}", colored::Colorize::red("error"), e);
            return ExitCode::from(1);
        }
    };

    let result = runtime.block_on(async {
        match cli.command {
            Commands::Build {
                project,
                out_dir,
                json,
            } => commands::build::run(&project, &out_dir, json).await,
            Commands::Discover { project, json } => commands::discover::run(&project, json).await,
            Commands::Declarations { project, pretty } => {
                commands::declarations::run(&project, pretty).await
            }
        }
    });

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", colored::Colorize::red("error"), e);
            ExitCode::from(1)
        }
    }
}
