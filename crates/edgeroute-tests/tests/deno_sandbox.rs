//! Deno Sandbox Tests for edgeroute
//!
//! These tests execute the extraction script with a real Deno runtime and
//! are skipped unless explicitly enabled.
//!
//! ## Running Tests
//!
//! ```bash
//! EDGEROUTE_RUN_DENO_TESTS=1 cargo test -p edgeroute-tests --test deno_sandbox -- --ignored
//! ```

use std::sync::Arc;

use edgeroute_sandbox::{ConfigExtractor, DenoRunner, ExtractorConfig, LocalRuntime, RuntimeLocator};
use edgeroute_spec::{
    BuildError, Cache, EdgeFunction, ExtractedConfig, InvalidConfigPolicy, MemoryLogger,
    StringList,
};
use edgeroute_tests::{should_run_deno_tests, ProjectFixture};
use pretty_assertions::assert_eq;

fn extractor(logger: Arc<MemoryLogger>, fixture: &ProjectFixture) -> ConfigExtractor {
    let locator = Arc::new(RuntimeLocator::local(LocalRuntime::new()));
    ConfigExtractor::new(
        Arc::new(DenoRunner::new(locator)),
        logger,
        ExtractorConfig::default()
            .timeout_secs(30)
            .read_root(&fixture.user_dir),
        InvalidConfigPolicy::Ignore,
    )
    .unwrap()
}

macro_rules! require_deno {
    () => {
        if !should_run_deno_tests() {
            println!("Deno tests not enabled, skipping");
            return;
        }
    };
}

#[tokio::test]
#[ignore] // Run with EDGEROUTE_RUN_DENO_TESTS=1
async fn test_reads_config_object() {
    require_deno!();
    let fixture = ProjectFixture::new();
    let path = fixture.add_user_source(
        "hello.ts",
        "export default () => new Response('hi')\n\
         export const config = { path: ['/hello', '/hi'], cache: 'manual', onError: 'bypass' }\n",
    );
    let logger = Arc::new(MemoryLogger::new());

    let config = extractor(logger, &fixture)
        .extract(&EdgeFunction::new("hello", &path))
        .await
        .unwrap();

    assert_eq!(
        config,
        ExtractedConfig {
            path: Some(StringList::from(["/hello", "/hi"])),
            cache: Some(Cache::Manual),
            on_error: Some("bypass".to_string()),
            ..Default::default()
        }
    );
}

#[tokio::test]
#[ignore] // Run with EDGEROUTE_RUN_DENO_TESTS=1
async fn test_calls_config_function() {
    require_deno!();
    let fixture = ProjectFixture::new();
    let path = fixture.add_user_source(
        "dynamic.ts",
        "export default () => new Response('hi')\n\
         export const config = async () => ({ path: '/dynamic' })\n",
    );

    let config = extractor(Arc::new(MemoryLogger::new()), &fixture)
        .extract(&EdgeFunction::new("dynamic", &path))
        .await
        .unwrap();

    assert_eq!(config.paths(), &["/dynamic".to_string()]);
}

#[tokio::test]
#[ignore] // Run with EDGEROUTE_RUN_DENO_TESTS=1
async fn test_missing_default_export_is_a_build_error() {
    require_deno!();
    let fixture = ProjectFixture::new();
    let path = fixture.add_user_source("broken.ts", "export const config = { path: '/x' }\n");

    let err = extractor(Arc::new(MemoryLogger::new()), &fixture)
        .extract(&EdgeFunction::new("broken", &path))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        edgeroute_sandbox::SandboxError::Build(BuildError::InvalidDefaultExport { .. })
    ));
    assert!(err.to_string().contains(&path.display().to_string()));
}

#[tokio::test]
#[ignore] // Run with EDGEROUTE_RUN_DENO_TESTS=1
async fn test_function_output_reaches_user_channel() {
    require_deno!();
    let fixture = ProjectFixture::new();
    let path = fixture.add_user_source(
        "chatty.ts",
        "console.log('loading chatty')\n\
         export default () => new Response('hi')\n",
    );
    let logger = Arc::new(MemoryLogger::new());

    let config = extractor(logger.clone(), &fixture)
        .extract(&EdgeFunction::new("chatty", &path))
        .await
        .unwrap();

    assert!(config.is_empty());
    assert_eq!(logger.user_messages(), vec!["loading chatty\n".to_string()]);
}

#[tokio::test]
#[ignore] // Run with EDGEROUTE_RUN_DENO_TESTS=1
async fn test_soft_failures_resolve_to_empty_config() {
    require_deno!();
    let fixture = ProjectFixture::new();
    let syntax = fixture.add_user_source("syntax.ts", "export default () => {\n");
    let array = fixture.add_user_source(
        "array.ts",
        "export default () => new Response('hi')\nexport const config = ['/a']\n",
    );
    let logger = Arc::new(MemoryLogger::new());
    let extractor = extractor(logger.clone(), &fixture);

    for (name, path) in [("syntax", &syntax), ("array", &array)] {
        let config = extractor
            .extract(&EdgeFunction::new(name, path))
            .await
            .unwrap();
        assert!(config.is_empty());
    }

    let user = logger.user_messages();
    assert!(user
        .iter()
        .any(|m| m.starts_with(&format!("Could not load edge function at '{}'", syntax.display()))));
    assert!(user.iter().any(|m| m.contains("must be an object")));
}
