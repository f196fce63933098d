//! Error types for the sandbox backend.

use edgeroute_spec::BuildError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for sandbox operations.
pub type SandboxResult<T> = Result<T, SandboxError>;

/// Errors that can occur while extracting in-source config.
#[derive(Debug, Error)]
pub enum SandboxError {
    /// The script runtime could not be located.
    #[error("Sandbox runtime not found. Install Deno and make sure it is in PATH, or set EDGEROUTE_RUNTIME_PATH")]
    RuntimeNotFound,

    /// Failed to spawn the sandbox process.
    #[error("Failed to spawn sandbox process: {0}")]
    SpawnFailed(#[source] std::io::Error),

    /// The sandbox process did not finish in time.
    #[error("Sandbox process timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// Failed to create the collector file.
    #[error("Failed to create collector file: {0}")]
    CollectorFailed(#[source] std::io::Error),

    /// The extraction script override does not exist.
    #[error("Config extraction script not found at: {path}")]
    ScriptNotFound { path: PathBuf },

    /// A function path cannot be expressed as a `file:` URL.
    #[error("Function path is not absolute: {path}")]
    InvalidModulePath { path: PathBuf },

    /// A function failed validation.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SandboxError {
    /// Returns a stable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            SandboxError::RuntimeNotFound => "SANDBOX_001",
            SandboxError::SpawnFailed(_) => "SANDBOX_002",
            SandboxError::Timeout { .. } => "SANDBOX_003",
            SandboxError::CollectorFailed(_) => "SANDBOX_004",
            SandboxError::ScriptNotFound { .. } => "SANDBOX_005",
            SandboxError::InvalidModulePath { .. } => "SANDBOX_006",
            SandboxError::Build(err) => err.code(),
            SandboxError::Io(_) => "SANDBOX_007",
        }
    }

    /// Returns true if the error is a user-facing build error.
    pub fn is_build_error(&self) -> bool {
        matches!(self, SandboxError::Build(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SandboxError::RuntimeNotFound;
        assert!(err.to_string().contains("EDGEROUTE_RUNTIME_PATH"));

        let err = SandboxError::Timeout { timeout_secs: 60 };
        assert!(err.to_string().contains("60 seconds"));
    }

    #[test]
    fn test_build_errors_keep_their_message_and_code() {
        let build = BuildError::invalid_default_export("func-1", "/src/func-1.ts");
        let err = SandboxError::from(build.clone());

        assert_eq!(err.to_string(), build.to_string());
        assert_eq!(err.code(), "BUILD_001");
        assert!(err.is_build_error());
        assert!(!SandboxError::RuntimeNotFound.is_build_error());
    }
}
