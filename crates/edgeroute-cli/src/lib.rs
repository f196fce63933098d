//! edgeroute CLI library
//!
//! Exposes the build pipeline and command implementations so they can be
//! driven from tests and other tools.

pub mod commands;
pub mod discovery;
pub mod input;
pub mod logger;
pub mod pipeline;

pub use discovery::{find_functions, DiscoveredFunction, SourceRoot, Tier, ALLOWED_EXTENSIONS};
pub use logger::{ConsoleLogger, Stream};
pub use pipeline::{
    build, resolve_declarations, BuildOptions, BuildOutput, PipelineError, ResolvedDeclarations,
};
