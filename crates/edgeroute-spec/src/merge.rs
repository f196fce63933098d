//! Declaration merging.
//!
//! Combines the project file's declarations, the deploy feed's declarations
//! and the in-source configs of internal and user functions into one ordered
//! list. The order of the result is the router's match priority.
//!
//! Each source is folded with [`merge_one_source`], which threads a
//! [`Visited`] accumulator through and returns it. After each fold,
//! [`synthesize_from_configs`] creates declarations for functions that only
//! declare their paths in source.

use std::collections::BTreeSet;

use crate::config::{ExtractedConfig, FunctionConfigs};
use crate::declaration::{Declaration, Matcher};
use crate::flags::MergeOrder;

/// Names of functions already referenced by a folded declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Visited(BTreeSet<String>);

impl Visited {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `function` has been visited.
    pub fn contains(&self, function: &str) -> bool {
        self.0.contains(function)
    }

    /// Returns the accumulator with `function` marked as visited.
    pub fn with(mut self, function: &str) -> Self {
        self.0.insert(function.to_string());
        self
    }

    /// Returns the number of visited functions.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no function has been visited.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The inputs to [`merge_declarations`].
#[derive(Debug, Clone, Copy)]
pub struct MergeInputs<'a> {
    /// Declarations from the project file, in file order.
    pub file_declarations: &'a [Declaration],
    /// Declarations from the deploy feed, in feed order.
    pub deploy_declarations: &'a [Declaration],
    /// Extracted configs of internal functions.
    pub internal_configs: &'a FunctionConfigs,
    /// Extracted configs of user functions.
    pub user_configs: &'a FunctionConfigs,
}

/// Merges all declaration sources in the given order.
///
/// - [`MergeOrder::Legacy`]: user file fold, user leftovers, deploy feed
///   fold, internal leftovers.
/// - [`MergeOrder::Corrected`]: deploy feed fold, internal leftovers, user
///   file fold, user leftovers.
pub fn merge_declarations(inputs: &MergeInputs<'_>, order: MergeOrder) -> Vec<Declaration> {
    let user = (inputs.file_declarations, inputs.user_configs);
    let internal = (inputs.deploy_declarations, inputs.internal_configs);
    let sources = match order {
        MergeOrder::Legacy => [user, internal],
        MergeOrder::Corrected => [internal, user],
    };

    let mut merged = Vec::new();
    let mut visited = Visited::new();

    for (declarations, configs) in sources {
        let (folded, next) = merge_one_source(declarations, configs, visited);
        merged.extend(folded);
        merged.extend(synthesize_from_configs(configs, &next));
        visited = next;
    }

    merged
}

/// Folds one source's declarations with that source's extracted configs.
///
/// Returns the new declarations and the accumulator with every referenced
/// function marked as visited.
pub fn merge_one_source(
    declarations: &[Declaration],
    configs: &FunctionConfigs,
    visited: Visited,
) -> (Vec<Declaration>, Visited) {
    declarations
        .iter()
        .fold((Vec::new(), visited), |(mut merged, visited), declaration| {
            match configs.get(&declaration.function) {
                Some(config) if !config.is_empty() => {
                    merged.extend(apply_config(declaration, config));
                }
                _ => merged.push(declaration.clone()),
            }
            (merged, visited.with(&declaration.function))
        })
}

/// Creates declarations for unvisited functions whose config declares paths.
pub fn synthesize_from_configs(configs: &FunctionConfigs, visited: &Visited) -> Vec<Declaration> {
    configs
        .iter()
        .filter(|(name, _)| !visited.contains(name))
        .flat_map(|(name, config)| {
            config.paths().iter().map(move |path| Declaration {
                cache: config.cache,
                ..Declaration::with_path(name, path.as_str())
            })
        })
        .collect()
}

fn apply_config(declaration: &Declaration, config: &ExtractedConfig) -> Vec<Declaration> {
    let paths = config.paths();

    if paths.is_empty() {
        return vec![Declaration {
            cache: config.cache.or(declaration.cache),
            on_error: config.on_error.clone().or_else(|| declaration.on_error.clone()),
            name: config.name.clone().or_else(|| declaration.name.clone()),
            generator: config
                .generator
                .clone()
                .or_else(|| declaration.generator.clone()),
            ..declaration.clone()
        }];
    }

    paths
        .iter()
        .map(|path| Declaration {
            matcher: Matcher::Path { path: path.clone() },
            cache: config.cache.or(declaration.cache),
            ..declaration.clone()
        })
        .collect()
}
