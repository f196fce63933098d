//! Test fixture utilities for creating synthetic edge function projects.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Module source with a valid default export and no config.
pub const PLAIN_FUNCTION: &str = "export default () => new Response('ok')\n";

/// A project with an internal and a user source root.
pub struct ProjectFixture {
    pub root: TempDir,
    pub internal_dir: PathBuf,
    pub user_dir: PathBuf,
}

impl ProjectFixture {
    /// Create a new project with empty source roots.
    pub fn new() -> Self {
        let root = TempDir::new().expect("Failed to create temp dir");
        let internal_dir = root.path().join(".netlify").join("edge-functions");
        let user_dir = root.path().join("netlify").join("edge-functions");
        fs::create_dir_all(&internal_dir).expect("Failed to create internal source root");
        fs::create_dir_all(&user_dir).expect("Failed to create user source root");
        Self {
            root,
            internal_dir,
            user_dir,
        }
    }

    /// Get the project root path.
    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// Add a user function file such as `hello.ts`.
    pub fn add_user_function(&self, file_name: &str) -> PathBuf {
        write_file(&self.user_dir.join(file_name), PLAIN_FUNCTION)
    }

    /// Add an internal function file such as `ab-test.js`.
    pub fn add_internal_function(&self, file_name: &str) -> PathBuf {
        write_file(&self.internal_dir.join(file_name), PLAIN_FUNCTION)
    }

    /// Add a user function file with custom source.
    pub fn add_user_source(&self, relative_path: &str, source: &str) -> PathBuf {
        write_file(&self.user_dir.join(relative_path), source)
    }

    /// Write a JSON document at the project root and return its path.
    pub fn write_json(&self, file_name: &str, value: &serde_json::Value) -> PathBuf {
        let json = serde_json::to_string_pretty(value).expect("Failed to serialize fixture JSON");
        write_file(&self.root.path().join(file_name), &json)
    }

    /// Directory the manifest is written to.
    pub fn dist_dir(&self) -> PathBuf {
        self.root.path().join("dist")
    }
}

impl Default for ProjectFixture {
    fn default() -> Self {
        Self::new()
    }
}

fn write_file(path: &Path, contents: &str) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create fixture directory");
    }
    fs::write(path, contents).expect("Failed to write fixture file");
    path.to_path_buf()
}
