//! Loading of the JSON inputs accepted by the CLI.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use edgeroute_spec::{Bundle, Declaration, FeatureFlags};

/// Loads the project's declarations file.
pub fn load_declarations(path: Option<&Path>) -> Result<Vec<Declaration>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read declarations file: {}", path.display()))?;
    Declaration::list_from_json(&contents)
        .with_context(|| format!("Failed to parse declarations file: {}", path.display()))
}

/// Loads the bundle descriptors produced by the bundler.
pub fn load_bundles(path: Option<&Path>) -> Result<Vec<Bundle>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read bundles file: {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse bundles file: {}", path.display()))
}

/// Loads feature flags from an optional JSON file, then applies `--flag`
/// switches on top.
///
/// A switch is either `name` (enables the flag) or `name=true|false`.
pub fn load_feature_flags(path: Option<&Path>, switches: &[String]) -> Result<FeatureFlags> {
    let mut flags = match path {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read feature flags file: {}", path.display()))?;
            let values: BTreeMap<String, bool> = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse feature flags file: {}", path.display()))?;
            FeatureFlags::from_map(&values)
        }
        None => FeatureFlags::default(),
    };

    for switch in switches {
        let (name, value) = parse_switch(switch)?;
        if !flags.set(name, value) {
            tracing::warn!("Ignoring unknown feature flag '{}'", name);
        }
    }

    Ok(flags)
}

fn parse_switch(switch: &str) -> Result<(&str, bool)> {
    match switch.split_once('=') {
        None => Ok((switch, true)),
        Some((name, "true")) => Ok((name, true)),
        Some((name, "false")) => Ok((name, false)),
        Some((name, value)) => anyhow::bail!(
            "invalid value '{}' for feature flag '{}' (expected true or false)",
            value,
            name
        ),
    }
}
