//! Feature flags and the build settings derived from them.
//!
//! Flags arrive as plain `name -> bool` pairs. They are resolved once per
//! build into [`BuildSettings`], which is what the pipeline stages consult.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Selects the corrected declaration merge order.
pub const FLAG_CORRECT_ORDER: &str = "edge_functions_correct_order";
/// Turns unsupported regular expressions into build errors.
pub const FLAG_FAIL_UNSUPPORTED_REGEX: &str = "edge_functions_fail_unsupported_regex";
/// Turns an invalid in-source `config` export into a build error.
pub const FLAG_INVALID_CONFIG_THROW: &str = "edge_functions_invalid_config_throw";

/// Recognised feature flags. Unknown flags are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    pub edge_functions_correct_order: bool,
    pub edge_functions_fail_unsupported_regex: bool,
    pub edge_functions_invalid_config_throw: bool,
}

impl FeatureFlags {
    /// Builds flags from a key/value map, ignoring unknown keys.
    pub fn from_map(values: &BTreeMap<String, bool>) -> Self {
        let mut flags = FeatureFlags::default();
        for (name, value) in values {
            flags.set(name, *value);
        }
        flags
    }

    /// Parses flags from a JSON object.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Sets a flag by name. Returns false if the flag is not recognised.
    pub fn set(&mut self, name: &str, value: bool) -> bool {
        match name {
            FLAG_CORRECT_ORDER => self.edge_functions_correct_order = value,
            FLAG_FAIL_UNSUPPORTED_REGEX => self.edge_functions_fail_unsupported_regex = value,
            FLAG_INVALID_CONFIG_THROW => self.edge_functions_invalid_config_throw = value,
            _ => return false,
        }
        true
    }

    /// Resolves the flags into the settings the pipeline runs with.
    pub fn resolve(&self) -> BuildSettings {
        BuildSettings {
            merge_order: if self.edge_functions_correct_order {
                MergeOrder::Corrected
            } else {
                MergeOrder::Legacy
            },
            invalid_config: if self.edge_functions_invalid_config_throw {
                InvalidConfigPolicy::Fail
            } else {
                InvalidConfigPolicy::Ignore
            },
            unsupported_regex: if self.edge_functions_fail_unsupported_regex {
                UnsupportedRegexPolicy::Fail
            } else {
                UnsupportedRegexPolicy::Warn
            },
        }
    }
}

/// Order in which declaration sources are merged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergeOrder {
    /// User file, user leftovers, deploy feed, internal leftovers.
    #[default]
    Legacy,
    /// Deploy feed, internal leftovers, user file, user leftovers.
    Corrected,
}

/// What to do when a function's `config` export has the wrong shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InvalidConfigPolicy {
    /// Log to the user and treat the config as empty.
    #[default]
    Ignore,
    /// Abort the build.
    Fail,
}

/// What to do when a raw pattern uses an unsupported construct.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnsupportedRegexPolicy {
    /// Warn and pass the pattern through unchanged.
    #[default]
    Warn,
    /// Abort the build.
    Fail,
}

/// Immutable per-build settings derived from feature flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildSettings {
    pub merge_order: MergeOrder,
    pub invalid_config: InvalidConfigPolicy,
    pub unsupported_regex: UnsupportedRegexPolicy,
}
