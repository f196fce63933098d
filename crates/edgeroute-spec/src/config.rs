//! In-source function configuration.
//!
//! An [`ExtractedConfig`] is what a function module exports as `config`,
//! read by running the module in the sandbox. A failed or absent extraction
//! is represented by the empty config, never by a missing value.

use serde::{Deserialize, Serialize};

/// A value that may be given either as a single string or as a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringList {
    One(String),
    Many(Vec<String>),
}

impl StringList {
    /// Returns the values as a slice, regardless of how they were written.
    pub fn as_slice(&self) -> &[String] {
        match self {
            StringList::One(value) => std::slice::from_ref(value),
            StringList::Many(values) => values,
        }
    }

    /// Returns true if there are no values.
    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}

impl From<&str> for StringList {
    fn from(value: &str) -> Self {
        StringList::One(value.to_string())
    }
}

impl From<String> for StringList {
    fn from(value: String) -> Self {
        StringList::One(value)
    }
}

impl From<Vec<String>> for StringList {
    fn from(values: Vec<String>) -> Self {
        StringList::Many(values)
    }
}

impl<const N: usize> From<[&str; N]> for StringList {
    fn from(values: [&str; N]) -> Self {
        StringList::Many(values.iter().map(|v| v.to_string()).collect())
    }
}

/// Caching mode of a route.
///
/// `manual` defers the function until after the caching layer. Values this
/// build does not know are kept as [`Cache::Unsupported`] and behave like
/// the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cache {
    Manual,
    Off,
    #[serde(other)]
    Unsupported,
}

/// Configuration exported by a function module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<StringList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excluded_path: Option<StringList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<Cache>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
}

impl ExtractedConfig {
    /// Parses a config from the JSON written by the sandbox.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Returns true if no field is set.
    pub fn is_empty(&self) -> bool {
        self == &ExtractedConfig::default()
    }

    /// Returns the declared paths; empty when none are declared.
    pub fn paths(&self) -> &[String] {
        self.path.as_ref().map(StringList::as_slice).unwrap_or(&[])
    }

    /// Returns the declared excluded paths; empty when none are declared.
    pub fn excluded_paths(&self) -> &[String] {
        self.excluded_path
            .as_ref()
            .map(StringList::as_slice)
            .unwrap_or(&[])
    }

    /// Returns the `onError` value if it is present and not allowed.
    pub fn invalid_on_error(&self) -> Option<&str> {
        self.on_error
            .as_deref()
            .filter(|value| !is_valid_on_error(value))
    }
}

/// Returns true if `value` is an allowed `onError` mode.
///
/// Allowed values are `fail`, `bypass`, or a path starting with `/`.
pub fn is_valid_on_error(value: &str) -> bool {
    value == "fail" || value == "bypass" || value.starts_with('/')
}

/// Extracted configs keyed by function name, in function discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionConfigs {
    entries: Vec<(String, ExtractedConfig)>,
}

impl FunctionConfigs {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the config for `name`, keeping its original position.
    pub fn insert(&mut self, name: impl Into<String>, config: ExtractedConfig) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = config,
            None => self.entries.push((name, config)),
        }
    }

    /// Returns the config for `name`.
    pub fn get(&self, name: &str) -> Option<&ExtractedConfig> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, config)| config)
    }

    /// Iterates over `(name, config)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ExtractedConfig)> {
        self.entries
            .iter()
            .map(|(name, config)| (name.as_str(), config))
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, ExtractedConfig)> for FunctionConfigs {
    fn from_iter<I: IntoIterator<Item = (String, ExtractedConfig)>>(iter: I) -> Self {
        let mut configs = FunctionConfigs::new();
        for (name, config) in iter {
            configs.insert(name, config);
        }
        configs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_collector_output() {
        let config = ExtractedConfig::from_json(
            r#"{"path":["/b","/c"],"excludedPath":"/b/skip","cache":"manual","onError":"bypass","name":"Shop","unknown":1}"#,
        )
        .unwrap();

        assert_eq!(config.paths().to_vec(), vec!["/b", "/c"]);
        assert_eq!(config.excluded_paths().to_vec(), vec!["/b/skip"]);
        assert_eq!(config.cache, Some(Cache::Manual));
        assert_eq!(config.on_error.as_deref(), Some("bypass"));
        assert_eq!(config.name.as_deref(), Some("Shop"));
        assert_eq!(config.generator, None);
    }

    #[test]
    fn test_unknown_cache_value_is_kept_as_unsupported() {
        let config = ExtractedConfig::from_json(r#"{"cache":"sometimes"}"#).unwrap();
        assert_eq!(config.cache, Some(Cache::Unsupported));
    }

    #[test]
    fn test_empty_config() {
        let config = ExtractedConfig::from_json("{}").unwrap();
        assert!(config.is_empty());
        assert!(config.paths().is_empty());

        let config = ExtractedConfig {
            path: Some(StringList::Many(vec![])),
            ..Default::default()
        };
        assert!(!config.is_empty());
        assert!(config.paths().is_empty());
    }

    #[test]
    fn test_on_error_values() {
        assert!(is_valid_on_error("fail"));
        assert!(is_valid_on_error("bypass"));
        assert!(is_valid_on_error("/oops"));
        assert!(!is_valid_on_error("retry"));
        assert!(!is_valid_on_error(""));

        let config = ExtractedConfig {
            on_error: Some("retry".to_string()),
            ..Default::default()
        };
        assert_eq!(config.invalid_on_error(), Some("retry"));
        assert_eq!(ExtractedConfig::default().invalid_on_error(), None);
    }

    #[test]
    fn test_function_configs_keep_insertion_order() {
        let mut configs = FunctionConfigs::new();
        configs.insert("b", ExtractedConfig::default());
        configs.insert("a", ExtractedConfig::default());
        configs.insert(
            "b",
            ExtractedConfig {
                name: Some("B".to_string()),
                ..Default::default()
            },
        );

        let names: Vec<&str> = configs.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(configs.get("b").unwrap().name.as_deref(), Some("B"));
        assert_eq!(configs.len(), 2);
    }
}
