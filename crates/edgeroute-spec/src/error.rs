//! Error types for the build pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for operations that can abort a build.
pub type BuildResult<T> = Result<T, BuildError>;

/// User-facing errors that abort a build.
///
/// Every variant names the offending function and the file it was loaded
/// from, so that the message is actionable without further context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// The default export of a function module is not invocable.
    #[error("Default export in edge function '{function}' at '{path}' must be a function")]
    InvalidDefaultExport { function: String, path: PathBuf },

    /// The in-source `onError` value is outside the allowed set.
    #[error("The 'onError' configuration property in edge function '{function}' at '{path}' must be one of 'fail', 'bypass', or a path starting with '/'. Got '{value}'")]
    InvalidOnError {
        function: String,
        path: PathBuf,
        value: String,
    },

    /// The in-source `config` export has the wrong shape (strict mode only).
    #[error("The 'config' export in edge function '{function}' at '{path}' must be an object")]
    InvalidConfigExport { function: String, path: PathBuf },

    /// A raw pattern uses a construct the router cannot evaluate (strict mode only).
    #[error("Could not parse path declaration of function '{function}' at '{path}': {reason}")]
    UnsupportedRegex {
        function: String,
        path: PathBuf,
        reason: String,
    },
}

impl BuildError {
    /// Creates a new invalid default export error.
    pub fn invalid_default_export(function: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::InvalidDefaultExport {
            function: function.into(),
            path: path.into(),
        }
    }

    /// Creates a new invalid config export error.
    pub fn invalid_config_export(function: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::InvalidConfigExport {
            function: function.into(),
            path: path.into(),
        }
    }

    /// Returns a stable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            BuildError::InvalidDefaultExport { .. } => "BUILD_001",
            BuildError::InvalidOnError { .. } => "BUILD_002",
            BuildError::InvalidConfigExport { .. } => "BUILD_003",
            BuildError::UnsupportedRegex { .. } => "BUILD_004",
        }
    }

    /// Returns the name of the function the error refers to.
    pub fn function(&self) -> &str {
        match self {
            BuildError::InvalidDefaultExport { function, .. }
            | BuildError::InvalidOnError { function, .. }
            | BuildError::InvalidConfigExport { function, .. }
            | BuildError::UnsupportedRegex { function, .. } => function,
        }
    }
}

/// Errors loading the deploy-time configuration feed.
#[derive(Debug, Error)]
pub enum DeployConfigError {
    /// The feed file exists but could not be read.
    #[error("Failed to read deploy config from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The feed is not valid JSON or does not have the expected shape.
    #[error("Failed to parse deploy config: {0}")]
    Parse(#[source] serde_json::Error),

    /// The feed declares a version this build does not understand.
    #[error("Unsupported deploy config version {version} (expected {expected})")]
    UnsupportedVersion { version: u32, expected: u32 },
}

/// Errors writing the manifest to disk.
#[derive(Debug, Error)]
pub enum ManifestWriteError {
    /// Failed to serialize the manifest.
    #[error("Failed to serialize manifest: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Failed to create the output directory or write the file.
    #[error("Failed to write manifest to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
