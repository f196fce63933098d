//! Collector file for extracted config.
//!
//! The script writes the serialized config to a dedicated file instead of
//! standard output, which belongs to the function. The file is owned by a
//! [`Collector`] and removed when it is dropped, including when the
//! extraction future is cancelled.

use std::path::Path;

use edgeroute_spec::ExtractedConfig;
use tempfile::NamedTempFile;
use url::Url;

use crate::error::{SandboxError, SandboxResult};

/// Errors reading back the collector file.
#[derive(Debug, thiserror::Error)]
pub enum CollectorReadError {
    #[error("Failed to read collector file: {0}")]
    Read(#[source] std::io::Error),

    #[error("Failed to parse collector file: {0}")]
    Parse(#[source] serde_json::Error),
}

/// A temporary file the sandbox writes its result to.
#[derive(Debug)]
pub struct Collector {
    file: NamedTempFile,
}

impl Collector {
    /// Creates an empty collector file in the system temp directory.
    pub fn new() -> SandboxResult<Self> {
        let file = tempfile::Builder::new()
            .prefix("edgeroute_collector_")
            .suffix(".json")
            .tempfile()
            .map_err(SandboxError::CollectorFailed)?;
        Ok(Self { file })
    }

    /// Returns the collector's path.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Returns the collector's location as a `file:` URL.
    pub fn url(&self) -> SandboxResult<Url> {
        Url::from_file_path(self.path()).map_err(|_| SandboxError::InvalidModulePath {
            path: self.path().to_path_buf(),
        })
    }

    /// Reads and parses the config written by the sandbox.
    pub async fn read_config(&self) -> Result<ExtractedConfig, CollectorReadError> {
        let contents = tokio::fs::read_to_string(self.path())
            .await
            .map_err(CollectorReadError::Read)?;
        ExtractedConfig::from_json(&contents).map_err(CollectorReadError::Parse)
    }
}
