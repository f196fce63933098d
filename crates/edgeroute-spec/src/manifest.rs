//! Manifest assembly.
//!
//! The manifest is the only artifact of a build. Its keys are snake_case
//! because it is read by the router, which is a separate system.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{ExtractedConfig, FunctionConfigs};
use crate::declaration::Declaration;
use crate::deploy_config::Layer;
use crate::error::{BuildResult, ManifestWriteError};
use crate::flags::BuildSettings;
use crate::function::{find_function, EdgeFunction};
use crate::pattern::{glob_to_pattern, ManifestWarning, PatternCompiler};

/// File name of the manifest inside the output directory.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Version recorded in every manifest.
pub const BUNDLER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// A bundle produced by the external bundler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    /// Content hash, used as the asset's file stem.
    pub hash: String,
    /// File extension including the leading dot.
    pub extension: String,
    /// Bundle format, e.g. `eszip2`.
    pub format: String,
}

/// A bundle as referenced from the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestBundle {
    pub asset: String,
    pub format: String,
}

impl From<&Bundle> for ManifestBundle {
    fn from(bundle: &Bundle) -> Self {
        Self {
            asset: format!("{}{}", bundle.hash, bundle.extension),
            format: bundle.format.clone(),
        }
    }
}

/// A compiled route.
///
/// Exclusions are a property of the function and live in
/// [`Manifest::function_config`]; `excluded_patterns` is always written
/// empty so the router schema stays stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub function: String,
    pub pattern: String,
    #[serde(default)]
    pub excluded_patterns: Vec<String>,
}

/// Per-function overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionConfigEntry {
    #[serde(default)]
    pub excluded_patterns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
}

impl FunctionConfigEntry {
    /// Returns true if the entry carries no information.
    pub fn is_empty(&self) -> bool {
        self.excluded_patterns.is_empty()
            && is_blank(&self.on_error)
            && is_blank(&self.name)
            && is_blank(&self.generator)
    }

    fn apply_config(&mut self, config: &ExtractedConfig) {
        if config.on_error.is_some() {
            self.on_error = config.on_error.clone();
        }
        if config.name.is_some() {
            self.name = config.name.clone();
        }
        if config.generator.is_some() {
            self.generator = config.generator.clone();
        }
        self.excluded_patterns.extend(
            config
                .excluded_paths()
                .iter()
                .map(|path| glob_to_pattern(path)),
        );
    }

    fn fill_from_declaration(&mut self, declaration: &Declaration) {
        if self.on_error.is_none() {
            self.on_error = declaration.on_error.clone();
        }
        if self.name.is_none() {
            self.name = declaration.name.clone();
        }
        if self.generator.is_none() {
            self.generator = declaration.generator.clone();
        }
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}

/// A layer as referenced from the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestLayer {
    pub name: String,
    pub flag: String,
}

impl From<&Layer> for ManifestLayer {
    fn from(layer: &Layer) -> Self {
        Self {
            name: layer.name.clone(),
            flag: layer.flag.clone(),
        }
    }
}

/// The routing manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub bundler_version: String,
    pub bundles: Vec<ManifestBundle>,
    pub routes: Vec<Route>,
    pub post_cache_routes: Vec<Route>,
    pub function_config: BTreeMap<String, FunctionConfigEntry>,
    pub layers: Vec<ManifestLayer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_map: Option<String>,
}

impl Manifest {
    /// Serializes the manifest as a single JSON document.
    pub fn to_json(&self) -> Result<String, ManifestWriteError> {
        serde_json::to_string(self).map_err(ManifestWriteError::Serialize)
    }

    /// Writes the manifest to [`MANIFEST_FILE_NAME`] under `dist_dir`,
    /// creating the directory if needed. Returns the written path.
    pub fn write(&self, dist_dir: &Path) -> Result<PathBuf, ManifestWriteError> {
        let json = self.to_json()?;
        std::fs::create_dir_all(dist_dir).map_err(|source| ManifestWriteError::Write {
            path: dist_dir.to_path_buf(),
            source,
        })?;

        let path = dist_dir.join(MANIFEST_FILE_NAME);
        std::fs::write(&path, json).map_err(|source| ManifestWriteError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

/// Everything the assembler reads.
#[derive(Debug, Clone, Copy)]
pub struct ManifestInputs<'a> {
    /// Discovered functions.
    pub functions: &'a [EdgeFunction],
    /// Merged declarations, in match priority order.
    pub declarations: &'a [Declaration],
    /// Extracted configs of internal functions.
    pub internal_configs: &'a FunctionConfigs,
    /// Extracted configs of user functions.
    pub user_configs: &'a FunctionConfigs,
    /// Bundles supplied by the bundler.
    pub bundles: &'a [Bundle],
    /// Layers from the deploy feed.
    pub layers: &'a [Layer],
    /// Import map specifier from the deploy feed.
    pub import_map: Option<&'a str>,
}

/// A manifest together with the warnings raised while building it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedManifest {
    pub manifest: Manifest,
    pub warnings: Vec<ManifestWarning>,
}

/// Assembles the manifest.
///
/// Declarations naming an unknown function are dropped. Routes keep the
/// declaration order, split by cache mode into `routes` and
/// `post_cache_routes`.
pub fn generate_manifest(
    inputs: &ManifestInputs<'_>,
    settings: &BuildSettings,
) -> BuildResult<GeneratedManifest> {
    let compiler = PatternCompiler::new(settings.unsupported_regex);
    let mut warnings = Vec::new();

    let mut function_config: BTreeMap<String, FunctionConfigEntry> = inputs
        .functions
        .iter()
        .map(|func| (func.name.clone(), FunctionConfigEntry::default()))
        .collect();

    for configs in [inputs.internal_configs, inputs.user_configs] {
        for (name, config) in configs.iter() {
            if let Some(entry) = function_config.get_mut(name) {
                entry.apply_config(config);
            }
        }
    }

    let mut routes = Vec::new();
    let mut post_cache_routes = Vec::new();

    for declaration in inputs.declarations {
        let Some(func) = find_function(inputs.functions, &declaration.function) else {
            continue;
        };

        let pattern = compiler.compile_declaration(func, declaration, &mut warnings)?;
        let exclusions = compiler.compile_exclusions(func, declaration, &mut warnings)?;

        let entry = function_config.entry(func.name.clone()).or_default();
        entry.excluded_patterns.extend(exclusions);
        entry.fill_from_declaration(declaration);

        let route = Route {
            function: func.name.clone(),
            pattern,
            excluded_patterns: Vec::new(),
        };
        if declaration.is_post_cache() {
            post_cache_routes.push(route);
        } else {
            routes.push(route);
        }
    }

    function_config.retain(|_, entry| !entry.is_empty());

    let manifest = Manifest {
        bundler_version: BUNDLER_VERSION.to_string(),
        bundles: inputs.bundles.iter().map(ManifestBundle::from).collect(),
        routes,
        post_cache_routes,
        function_config,
        layers: inputs.layers.iter().map(ManifestLayer::from).collect(),
        import_map: inputs.import_map.map(str::to_string),
    };

    Ok(GeneratedManifest { manifest, warnings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Cache, StringList};
    use crate::error::BuildError;
    use crate::flags::UnsupportedRegexPolicy;
    use pretty_assertions::assert_eq;
    use regex::Regex;

    fn functions() -> Vec<EdgeFunction> {
        vec![
            EdgeFunction::new("func-1", "/path/to/func-1.ts"),
            EdgeFunction::new("func-2", "/path/to/func-2.ts"),
            EdgeFunction::new("func-3", "/path/to/func-3.ts"),
        ]
    }

    fn generate(
        functions: &[EdgeFunction],
        declarations: &[Declaration],
        settings: &BuildSettings,
    ) -> BuildResult<GeneratedManifest> {
        let empty = FunctionConfigs::new();
        generate_manifest(
            &ManifestInputs {
                functions,
                declarations,
                internal_configs: &empty,
                user_configs: &empty,
                bundles: &[],
                layers: &[],
                import_map: None,
            },
            settings,
        )
    }

    fn route(function: &str, pattern: &str) -> Route {
        Route {
            function: function.to_string(),
            pattern: pattern.to_string(),
            excluded_patterns: vec![],
        }
    }

    #[test]
    fn test_routes_and_bundles() {
        let functions = functions();
        let declarations = vec![
            Declaration::with_path("func-1", "/f1"),
            Declaration::with_path("func-2", "/f2/*"),
            Declaration::with_pattern("func-3", "^/f3/(?<id>\\d+)$"),
        ];
        let bundles = vec![
            Bundle {
                hash: "123456789".to_string(),
                extension: ".eszip".to_string(),
                format: "eszip2".to_string(),
            },
            Bundle {
                hash: "abcdef".to_string(),
                extension: ".js".to_string(),
                format: "js".to_string(),
            },
        ];
        let empty = FunctionConfigs::new();

        let generated = generate_manifest(
            &ManifestInputs {
                functions: &functions,
                declarations: &declarations,
                internal_configs: &empty,
                user_configs: &empty,
                bundles: &bundles,
                layers: &[],
                import_map: Some("file:///dist/import_map.json"),
            },
            &BuildSettings::default(),
        )
        .unwrap();
        let manifest = generated.manifest;

        assert!(generated.warnings.is_empty());
        assert_eq!(
            manifest.bundles,
            vec![
                ManifestBundle {
                    asset: "123456789.eszip".to_string(),
                    format: "eszip2".to_string(),
                },
                ManifestBundle {
                    asset: "abcdef.js".to_string(),
                    format: "js".to_string(),
                },
            ]
        );
        assert_eq!(
            manifest.routes,
            vec![
                route("func-1", "^/f1/?$"),
                route("func-2", "^/f2/([^/]*)/?$"),
                route("func-3", "^/f3/(\\d+)$"),
            ]
        );
        assert!(manifest.post_cache_routes.is_empty());
        assert!(manifest.function_config.is_empty());
        assert_eq!(manifest.bundler_version, BUNDLER_VERSION);
        assert_eq!(
            manifest.import_map.as_deref(),
            Some("file:///dist/import_map.json")
        );
    }

    #[test]
    fn test_unknown_functions_are_dropped() {
        let declarations = vec![
            Declaration::with_path("func-1", "/f1"),
            Declaration::with_path("does-not-exist", "/nope"),
        ];

        let manifest = generate(&functions(), &declarations, &BuildSettings::default())
            .unwrap()
            .manifest;

        assert_eq!(manifest.routes, vec![route("func-1", "^/f1/?$")]);
    }

    #[test]
    fn test_manual_cache_goes_to_post_cache_routes() {
        let declarations = vec![
            Declaration::with_path("func-1", "/a").cache(Cache::Manual),
            Declaration::with_path("func-2", "/b"),
            Declaration::with_path("func-3", "/c").cache(Cache::Manual),
            Declaration::with_path("func-1", "/d").cache(Cache::Off),
        ];

        let manifest = generate(&functions(), &declarations, &BuildSettings::default())
            .unwrap()
            .manifest;

        assert_eq!(
            manifest.routes,
            vec![route("func-2", "^/b/?$"), route("func-1", "^/d/?$")]
        );
        assert_eq!(
            manifest.post_cache_routes,
            vec![route("func-1", "^/a/?$"), route("func-3", "^/c/?$")]
        );
    }

    #[test]
    fn test_exclusions_accumulate_in_function_config() {
        let functions = functions();
        let declarations = vec![
            Declaration::with_path("func-1", "/f1/*").excluded_path("/f1/exclude"),
            Declaration::with_pattern("func-1", "^/f1/x/.*$").excluded_pattern("^/f1/x/skip$"),
        ];
        let internal = FunctionConfigs::new();
        let mut user = FunctionConfigs::new();
        user.insert(
            "func-1",
            ExtractedConfig {
                excluded_path: Some(StringList::from("/f1/from-source")),
                on_error: Some("bypass".to_string()),
                ..Default::default()
            },
        );

        let manifest = generate_manifest(
            &ManifestInputs {
                functions: &functions,
                declarations: &declarations,
                internal_configs: &internal,
                user_configs: &user,
                bundles: &[],
                layers: &[],
                import_map: None,
            },
            &BuildSettings::default(),
        )
        .unwrap()
        .manifest;

        assert_eq!(
            manifest.function_config.get("func-1"),
            Some(&FunctionConfigEntry {
                excluded_patterns: vec![
                    "^/f1/from-source/?$".to_string(),
                    "^/f1/exclude/?$".to_string(),
                    "^/f1/x/skip$".to_string(),
                ],
                on_error: Some("bypass".to_string()),
                ..Default::default()
            })
        );
        assert!(manifest.routes.iter().all(|r| r.excluded_patterns.is_empty()));
        assert_eq!(manifest.function_config.len(), 1);
    }

    #[test]
    fn test_user_config_overrides_internal_config() {
        let functions = functions();
        let mut internal = FunctionConfigs::new();
        internal.insert(
            "func-1",
            ExtractedConfig {
                name: Some("Internal".to_string()),
                generator: Some("plugin@1".to_string()),
                ..Default::default()
            },
        );
        let mut user = FunctionConfigs::new();
        user.insert(
            "func-1",
            ExtractedConfig {
                name: Some("User".to_string()),
                ..Default::default()
            },
        );

        let manifest = generate_manifest(
            &ManifestInputs {
                functions: &functions,
                declarations: &[],
                internal_configs: &internal,
                user_configs: &user,
                bundles: &[],
                layers: &[],
                import_map: None,
            },
            &BuildSettings::default(),
        )
        .unwrap()
        .manifest;

        let entry = &manifest.function_config["func-1"];
        assert_eq!(entry.name.as_deref(), Some("User"));
        assert_eq!(entry.generator.as_deref(), Some("plugin@1"));
        assert!(manifest.routes.is_empty());
    }

    #[test]
    fn test_declaration_fields_fill_gaps() {
        let declarations = vec![Declaration::with_path("func-2", "/f2").generator("internalFunc")];

        let manifest = generate(&functions(), &declarations, &BuildSettings::default())
            .unwrap()
            .manifest;

        assert_eq!(
            manifest.function_config["func-2"].generator.as_deref(),
            Some("internalFunc")
        );
    }

    #[test]
    fn test_unsupported_regex_warns_by_default() {
        let declarations = vec![Declaration::with_pattern("func-1", "^/\\w+(?=\\d)$")];

        let generated =
            generate(&functions(), &declarations, &BuildSettings::default()).unwrap();

        assert_eq!(
            generated.manifest.routes,
            vec![route("func-1", "^/\\w+(?=\\d)$")]
        );
        assert_eq!(generated.warnings.len(), 1);
        assert!(generated.warnings[0].message.contains("func-1"));
    }

    #[test]
    fn test_unsupported_regex_fails_in_strict_mode() {
        let declarations = vec![Declaration::with_pattern("func-1", "^/\\w+(?=\\d)$")];
        let settings = BuildSettings {
            unsupported_regex: UnsupportedRegexPolicy::Fail,
            ..Default::default()
        };

        let err = generate(&functions(), &declarations, &settings).unwrap_err();

        assert_eq!(err.function(), "func-1");
        assert!(matches!(err, BuildError::UnsupportedRegex { .. }));
        assert!(err.to_string().contains("lookaheads"));
    }

    #[test]
    fn test_compiled_routes_match_requests() {
        let declarations = vec![
            Declaration::with_path("func-1", "/f1/*").excluded_path("/f1/exclude"),
            Declaration::with_path("func-2", "/**/*.html"),
        ];

        let manifest = generate(&functions(), &declarations, &BuildSettings::default())
            .unwrap()
            .manifest;

        let route = Regex::new(&manifest.routes[0].pattern).unwrap();
        let excluded = Regex::new(&manifest.function_config["func-1"].excluded_patterns[0]).unwrap();
        assert!(route.is_match("/f1/hello"));
        assert!(excluded.is_match("/f1/exclude"));
        assert!(!excluded.is_match("/f1/hello"));

        let route = Regex::new(&manifest.routes[1].pattern).unwrap();
        assert!(route.is_match("/grandparent/parent/child/grandchild.html"));
        assert!(!route.is_match("/test.jpg"));
    }

    #[test]
    fn test_serialized_keys_are_snake_case() {
        let functions = functions();
        let declarations = vec![
            Declaration::with_path("func-1", "/f1").excluded_path("/f1/x"),
            Declaration::with_path("func-2", "/f2").cache(Cache::Manual),
        ];
        let layers = vec![Layer {
            name: "https://edge-function-layer-template.netlify.app/mod.ts".to_string(),
            flag: "edge_functions_layer_template".to_string(),
        }];
        let empty = FunctionConfigs::new();

        let manifest = generate_manifest(
            &ManifestInputs {
                functions: &functions,
                declarations: &declarations,
                internal_configs: &empty,
                user_configs: &empty,
                bundles: &[],
                layers: &layers,
                import_map: None,
            },
            &BuildSettings::default(),
        )
        .unwrap()
        .manifest;

        let json: serde_json::Value = serde_json::from_str(&manifest.to_json().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "bundler_version": BUNDLER_VERSION,
                "bundles": [],
                "routes": [
                    {"function": "func-1", "pattern": "^/f1/?$", "excluded_patterns": []}
                ],
                "post_cache_routes": [
                    {"function": "func-2", "pattern": "^/f2/?$", "excluded_patterns": []}
                ],
                "function_config": {
                    "func-1": {"excluded_patterns": ["^/f1/x/?$"]}
                },
                "layers": [
                    {
                        "name": "https://edge-function-layer-template.netlify.app/mod.ts",
                        "flag": "edge_functions_layer_template"
                    }
                ]
            })
        );
    }

    #[test]
    fn test_output_is_deterministic() {
        let declarations = vec![
            Declaration::with_path("func-3", "/c").excluded_path("/c/x"),
            Declaration::with_path("func-1", "/a").name("A"),
        ];

        let first = generate(&functions(), &declarations, &BuildSettings::default())
            .unwrap()
            .manifest
            .to_json()
            .unwrap();
        let second = generate(&functions(), &declarations, &BuildSettings::default())
            .unwrap()
            .manifest
            .to_json()
            .unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_write_creates_manifest_file() {
        let dir = tempfile::tempdir().unwrap();
        let dist = dir.path().join("dist");
        let manifest = generate(
            &functions(),
            &[Declaration::with_path("func-1", "/f1")],
            &BuildSettings::default(),
        )
        .unwrap()
        .manifest;

        let path = manifest.write(&dist).unwrap();

        assert_eq!(path, dist.join(MANIFEST_FILE_NAME));
        let written: Manifest =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, manifest);
    }
}
