//! Function-to-route declarations.
//!
//! A declaration binds a function to either a glob-style `path` or a raw
//! regular expression `pattern`, plus optional overrides. Declarations come
//! from the project file, from the deploy feed, or are synthesized from
//! in-source config. They are never mutated once created; merging produces
//! new values.

use serde::{de, Deserialize, Deserializer, Serialize};

use crate::config::{Cache, StringList};

/// Generator recorded on declarations of internal functions that carry none.
pub const INTERNAL_GENERATOR: &str = "internalFunc";

/// What a declaration matches: a glob path or a raw pattern, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Matcher {
    Path { path: String },
    Pattern { pattern: String },
}

impl<'de> Deserialize<'de> for Matcher {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct RawMatcher {
            path: Option<String>,
            pattern: Option<String>,
        }

        let raw = RawMatcher::deserialize(deserializer)?;
        match (raw.path, raw.pattern) {
            (Some(path), None) => Ok(Matcher::Path { path }),
            (None, Some(pattern)) => Ok(Matcher::Pattern { pattern }),
            (Some(_), Some(_)) => Err(de::Error::custom(
                "declaration must have either `path` or `pattern`, not both",
            )),
            (None, None) => Err(de::Error::custom(
                "declaration must have either `path` or `pattern`",
            )),
        }
    }
}

/// A single function-to-route binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Declaration {
    pub function: String,
    #[serde(flatten)]
    pub matcher: Matcher,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excluded_path: Option<StringList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excluded_pattern: Option<StringList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<Cache>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
}

impl Declaration {
    /// Creates a declaration binding `function` to a glob path.
    pub fn with_path(function: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(function, Matcher::Path { path: path.into() })
    }

    /// Creates a declaration binding `function` to a raw pattern.
    pub fn with_pattern(function: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(
            function,
            Matcher::Pattern {
                pattern: pattern.into(),
            },
        )
    }

    fn new(function: impl Into<String>, matcher: Matcher) -> Self {
        Self {
            function: function.into(),
            matcher,
            excluded_path: None,
            excluded_pattern: None,
            cache: None,
            on_error: None,
            name: None,
            generator: None,
        }
    }

    /// Sets the excluded glob paths.
    pub fn excluded_path(mut self, paths: impl Into<StringList>) -> Self {
        self.excluded_path = Some(paths.into());
        self
    }

    /// Sets the excluded raw patterns.
    pub fn excluded_pattern(mut self, patterns: impl Into<StringList>) -> Self {
        self.excluded_pattern = Some(patterns.into());
        self
    }

    /// Sets the cache mode.
    pub fn cache(mut self, cache: Cache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Sets the display name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the generator.
    pub fn generator(mut self, generator: impl Into<String>) -> Self {
        self.generator = Some(generator.into());
        self
    }

    /// Returns true if the route runs after the caching layer.
    pub fn is_post_cache(&self) -> bool {
        self.cache == Some(Cache::Manual)
    }

    /// Returns the excluded glob paths; empty when none are declared.
    pub fn excluded_paths(&self) -> &[String] {
        self.excluded_path
            .as_ref()
            .map(StringList::as_slice)
            .unwrap_or(&[])
    }

    /// Returns the excluded raw patterns; empty when none are declared.
    pub fn excluded_patterns(&self) -> &[String] {
        self.excluded_pattern
            .as_ref()
            .map(StringList::as_slice)
            .unwrap_or(&[])
    }

    /// Parses a list of declarations from JSON.
    pub fn list_from_json(json: &str) -> Result<Vec<Declaration>, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Returns a copy of `declarations` where those referencing one of
/// `internal_functions` carry [`INTERNAL_GENERATOR`] when no generator is set.
pub fn with_generator_fallback(
    declarations: &[Declaration],
    internal_functions: &[&str],
) -> Vec<Declaration> {
    declarations
        .iter()
        .map(|declaration| {
            let mut declaration = declaration.clone();
            if declaration.generator.is_none()
                && internal_functions.contains(&declaration.function.as_str())
            {
                declaration.generator = Some(INTERNAL_GENERATOR.to_string());
            }
            declaration
        })
        .collect()
}
