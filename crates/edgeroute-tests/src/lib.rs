//! edgeroute End-to-End Test Infrastructure
//!
//! This crate provides integration tests for the build pipeline:
//!
//! - Discovery: source roots on disk -> functions
//! - Extraction: scripted sandbox outcomes -> configs
//! - Merging and assembly: declarations -> manifest
//!
//! ## Running Tests
//!
//! ```bash
//! # Run all tests against a scripted sandbox (no runtime required)
//! cargo test -p edgeroute-tests
//!
//! # Also run the tests that execute the real Deno sandbox
//! EDGEROUTE_RUN_DENO_TESTS=1 cargo test -p edgeroute-tests -- --ignored
//! ```

pub mod fixtures;
pub mod harness;

pub use fixtures::ProjectFixture;
pub use harness::{route_matches, should_run_deno_tests, BuildHarness, Outcome, ScriptedRunner};
