//! edgeroute Sandbox Backend
//!
//! This crate reads the in-source `config` export of edge functions by
//! running each module in an isolated script runtime subprocess.
//!
//! # Architecture
//!
//! The backend uses a two-part architecture:
//!
//! 1. **Rust extractor** - Resolves the runtime, spawns one sandbox per
//!    function and interprets the outcome
//! 2. **Extraction script** - Runs inside the sandbox, imports the module
//!    and reports what it found
//!
//! Communication happens through the exit code and a collector file:
//! - The exit code reports the outcome (see [`ConfigExitCode`])
//! - On success the script writes the config JSON to the collector file
//! - Standard output belongs to the function and is forwarded to the user
//!
//! The sandbox may read the function's directory and write only its
//! collector file.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use edgeroute_sandbox::{ConfigExtractor, DenoRunner, ExtractorConfig, LocalRuntime, RuntimeLocator};
//! use edgeroute_spec::{EdgeFunction, InvalidConfigPolicy, TracingLogger};
//!
//! let locator = Arc::new(RuntimeLocator::local(LocalRuntime::new()));
//! let extractor = ConfigExtractor::new(
//!     Arc::new(DenoRunner::new(locator)),
//!     Arc::new(TracingLogger),
//!     ExtractorConfig::default(),
//!     InvalidConfigPolicy::Ignore,
//! )?;
//!
//! let config = extractor
//!     .extract(&EdgeFunction::new("hello", "/project/edge-functions/hello.ts"))
//!     .await?;
//! ```
//!
//! # Runtime Requirements
//!
//! Extraction requires Deno. The runtime is searched for in:
//!
//! 1. An explicitly configured path
//! 2. `EDGEROUTE_RUNTIME_PATH` environment variable
//! 3. System PATH
//! 4. The configured cache directory

pub mod collector;
pub mod error;
pub mod exit_code;
pub mod extractor;
pub mod runner;
pub mod runtime;

pub use collector::{Collector, CollectorReadError};
pub use error::{SandboxError, SandboxResult};
pub use exit_code::ConfigExitCode;
pub use extractor::{ConfigExtractor, ExtractorConfig, DEFAULT_JOBS, EXTRACT_SCRIPT_ENV};
pub use runner::{DenoRunner, SandboxInvocation, SandboxOutput, SandboxRunner, DEFAULT_TIMEOUT_SECS};
pub use runtime::{LocalRuntime, RuntimeLocator, RuntimeProvider, RUNTIME_PATH_ENV};
