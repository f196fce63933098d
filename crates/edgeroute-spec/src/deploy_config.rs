//! Deploy-time configuration feed.
//!
//! The feed is a JSON file written by the deploy pipeline before the build
//! runs. It contributes declarations for internal functions, the layers
//! exposed to functions, and an optional import map.

use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::declaration::Declaration;
use crate::error::DeployConfigError;
use crate::log::Logger;

/// The only feed version this build understands.
pub const DEPLOY_CONFIG_VERSION: u32 = 1;

/// An externally supplied module exposed to functions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    /// Module specifier the layer is imported as.
    pub name: String,
    /// Feature flag that enables the layer at request time.
    pub flag: String,
}

/// The parsed deploy feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployConfig {
    pub version: u32,
    #[serde(default, rename = "functions")]
    pub declarations: Vec<Declaration>,
    #[serde(default)]
    pub layers: Vec<Layer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_map: Option<String>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            version: DEPLOY_CONFIG_VERSION,
            declarations: Vec::new(),
            layers: Vec::new(),
            import_map: None,
        }
    }
}

impl DeployConfig {
    /// Loads the feed from `path`.
    ///
    /// A missing path or file yields an empty feed. A file that cannot be
    /// read or parsed is an error.
    pub fn load(path: Option<&Path>, logger: &dyn Logger) -> Result<Self, DeployConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                logger.system(&format!(
                    "No deploy config found at {}, continuing without it",
                    path.display()
                ));
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(DeployConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let config = Self::parse(&contents)?;
        logger.system(&format!(
            "Loaded deploy config from {} ({} declarations, {} layers)",
            path.display(),
            config.declarations.len(),
            config.layers.len()
        ));
        Ok(config)
    }

    /// Parses and validates the feed.
    pub fn parse(json: &str) -> Result<Self, DeployConfigError> {
        let config: DeployConfig = serde_json::from_str(json).map_err(DeployConfigError::Parse)?;
        if config.version != DEPLOY_CONFIG_VERSION {
            return Err(DeployConfigError::UnsupportedVersion {
                version: config.version,
                expected: DEPLOY_CONFIG_VERSION,
            });
        }
        Ok(config)
    }

    /// Resolves the import map specifier against `base_dir`.
    ///
    /// Absolute URLs are returned as they are; relative specifiers become
    /// `file:` URLs. Returns `None` when no import map is set or the
    /// specifier cannot be resolved.
    pub fn import_map_url(&self, base_dir: &Path) -> Option<Url> {
        let specifier = self.import_map.as_deref()?;
        if let Ok(url) = Url::parse(specifier) {
            return Some(url);
        }
        Url::from_directory_path(base_dir).ok()?.join(specifier).ok()
    }
}
