//! edgeroute Routing Manifest Library
//!
//! This crate provides the data model and the synchronous stages of the
//! edgeroute build: declaration merging, route pattern compilation and
//! manifest assembly. Everything here is a pure function of its inputs;
//! discovery and in-source config extraction live in other crates.
//!
//! # Example
//!
//! ```
//! use edgeroute_spec::{
//!     generate_manifest, merge_declarations, BuildSettings, Declaration, EdgeFunction,
//!     FunctionConfigs, ManifestInputs, MergeInputs,
//! };
//!
//! let functions = vec![EdgeFunction::new("hello", "/project/edge-functions/hello.ts")];
//! let file_declarations = vec![Declaration::with_path("hello", "/hello/*")];
//! let configs = FunctionConfigs::new();
//! let settings = BuildSettings::default();
//!
//! let declarations = merge_declarations(
//!     &MergeInputs {
//!         file_declarations: &file_declarations,
//!         deploy_declarations: &[],
//!         internal_configs: &configs,
//!         user_configs: &configs,
//!     },
//!     settings.merge_order,
//! );
//!
//! let generated = generate_manifest(
//!     &ManifestInputs {
//!         functions: &functions,
//!         declarations: &declarations,
//!         internal_configs: &configs,
//!         user_configs: &configs,
//!         bundles: &[],
//!         layers: &[],
//!         import_map: None,
//!     },
//!     &settings,
//! )
//! .unwrap();
//!
//! assert_eq!(generated.manifest.routes[0].pattern, "^/hello/([^/]*)/?$");
//! ```
//!
//! # Modules
//!
//! - [`function`]: Discovered function identity
//! - [`config`]: In-source config exported by function modules
//! - [`declaration`]: Function-to-route bindings
//! - [`deploy_config`]: Deploy-time configuration feed
//! - [`flags`]: Feature flags and per-build settings
//! - [`merge`]: Declaration merging
//! - [`pattern`]: Glob and regex pattern compilation
//! - [`manifest`]: Manifest assembly and serialization
//! - [`log`]: Logging seam
//! - [`error`]: Error types

pub mod config;
pub mod declaration;
pub mod deploy_config;
pub mod error;
pub mod flags;
pub mod function;
pub mod log;
pub mod manifest;
pub mod merge;
pub mod pattern;

// Re-export commonly used types at the crate root
pub use config::{is_valid_on_error, Cache, ExtractedConfig, FunctionConfigs, StringList};
pub use declaration::{with_generator_fallback, Declaration, Matcher, INTERNAL_GENERATOR};
pub use deploy_config::{DeployConfig, Layer, DEPLOY_CONFIG_VERSION};
pub use error::{BuildError, BuildResult, DeployConfigError, ManifestWriteError};
pub use flags::{
    BuildSettings, FeatureFlags, InvalidConfigPolicy, MergeOrder, UnsupportedRegexPolicy,
};
pub use function::{find_function, EdgeFunction};
pub use log::{LogChannel, LogEntry, Logger, MemoryLogger, TracingLogger};
pub use manifest::{
    generate_manifest, Bundle, FunctionConfigEntry, GeneratedManifest, Manifest, ManifestBundle,
    ManifestInputs, ManifestLayer, Route, BUNDLER_VERSION, MANIFEST_FILE_NAME,
};
pub use merge::{merge_declarations, merge_one_source, synthesize_from_configs, MergeInputs, Visited};
pub use pattern::{glob_to_pattern, translate_regex, ManifestWarning, PatternCompiler, PatternError};
