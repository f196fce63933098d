//! Declaration Precedence Tests for edgeroute
//!
//! The merged declaration order is the request-time match priority. These
//! tests pin the legacy and corrected orderings end to end.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p edgeroute-tests --test precedence
//! ```

use edgeroute_cli::BuildOptions;
use edgeroute_spec::{Declaration, DeployConfig, FeatureFlags, Manifest};
use edgeroute_tests::{route_matches, BuildHarness, ProjectFixture, ScriptedRunner};
use pretty_assertions::assert_eq;
use serde_json::json;

struct Project {
    fixture: ProjectFixture,
    runner: ScriptedRunner,
    options: BuildOptions,
}

/// Two functions competing for `/shared`, plus one undeclared function with
/// in-source paths in each tier.
fn competing_project(correct_order: bool) -> Project {
    let fixture = ProjectFixture::new();
    fixture.add_internal_function("platform.ts");
    let extra = fixture.add_internal_function("extra.ts");
    fixture.add_user_function("site.ts");
    let late = fixture.add_user_function("late.ts");

    let runner = ScriptedRunner::new()
        .with_config(&extra, json!({ "path": "/extra" }))
        .with_config(&late, json!({ "path": "/late" }));

    let options = BuildOptions {
        internal_roots: vec![fixture.internal_dir.clone()],
        user_roots: vec![fixture.user_dir.clone()],
        declarations: vec![Declaration::with_path("site", "/shared")],
        deploy_config: DeployConfig {
            declarations: vec![Declaration::with_path("platform", "/shared")],
            ..Default::default()
        },
        flags: FeatureFlags {
            edge_functions_correct_order: correct_order,
            ..Default::default()
        },
        ..Default::default()
    };

    Project {
        fixture,
        runner,
        options,
    }
}

async fn build(project: Project) -> Manifest {
    let harness = BuildHarness::new(project.runner);
    let output = harness.build(&project.options).await.unwrap();
    drop(project.fixture);
    output.generated.manifest
}

fn route_functions(manifest: &Manifest) -> Vec<&str> {
    manifest.routes.iter().map(|r| r.function.as_str()).collect()
}

fn first_match<'a>(manifest: &'a Manifest, path: &str) -> Option<&'a str> {
    manifest
        .routes
        .iter()
        .find(|r| route_matches(&r.pattern, path))
        .map(|r| r.function.as_str())
}

#[tokio::test]
async fn test_legacy_order_puts_user_declarations_first() {
    let manifest = build(competing_project(false)).await;

    assert_eq!(
        route_functions(&manifest),
        vec!["site", "late", "platform", "extra"]
    );
    assert_eq!(first_match(&manifest, "/shared"), Some("site"));
}

#[tokio::test]
async fn test_corrected_order_puts_deploy_declarations_first() {
    let manifest = build(competing_project(true)).await;

    assert_eq!(
        route_functions(&manifest),
        vec!["platform", "extra", "site", "late"]
    );
    assert_eq!(first_match(&manifest, "/shared"), Some("platform"));
}

/// Functions declared by an earlier source get no routes synthesized from
/// their in-source paths by a later source.
#[tokio::test]
async fn test_declared_function_is_not_synthesized_again() {
    let fixture = ProjectFixture::new();
    let platform = fixture.add_internal_function("platform.ts");
    let harness = BuildHarness::new(
        ScriptedRunner::new().with_config(&platform, json!({ "path": "/from-config" })),
    );
    let options = BuildOptions {
        internal_roots: vec![fixture.internal_dir.clone()],
        user_roots: vec![fixture.user_dir.clone()],
        declarations: vec![Declaration::with_path("platform", "/from-file")],
        ..Default::default()
    };

    let resolved = harness.resolve(&options).await.unwrap();

    assert_eq!(
        resolved.declarations,
        vec![Declaration::with_path("platform", "/from-file").generator("internalFunc")]
    );
}

/// Internal declarations carry the internal generator unless one is set.
#[tokio::test]
async fn test_generator_fallback_only_for_internal_functions() {
    let fixture = ProjectFixture::new();
    fixture.add_internal_function("platform.ts");
    fixture.add_internal_function("plugin.ts");
    fixture.add_user_function("site.ts");
    let harness = BuildHarness::new(ScriptedRunner::new());
    let options = BuildOptions {
        internal_roots: vec![fixture.internal_dir.clone()],
        user_roots: vec![fixture.user_dir.clone()],
        declarations: vec![Declaration::with_path("site", "/site")],
        deploy_config: DeployConfig {
            declarations: vec![
                Declaration::with_path("platform", "/platform"),
                Declaration::with_path("plugin", "/plugin").generator("my-plugin@1.0.0"),
            ],
            ..Default::default()
        },
        ..Default::default()
    };

    let resolved = harness.resolve(&options).await.unwrap();
    let generators: Vec<(&str, Option<&str>)> = resolved
        .declarations
        .iter()
        .map(|d| (d.function.as_str(), d.generator.as_deref()))
        .collect();

    assert_eq!(
        generators,
        vec![
            ("site", None),
            ("platform", Some("internalFunc")),
            ("plugin", Some("my-plugin@1.0.0")),
        ]
    );
}
