//! Edge function identity.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A discovered edge function: a unique logical name and the file that
/// implements it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeFunction {
    /// Logical function name, unique within a build.
    pub name: String,
    /// Location of the module implementing the function.
    pub path: PathBuf,
}

impl EdgeFunction {
    /// Creates a new edge function.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Returns the function's source path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Finds a function by name.
pub fn find_function<'a>(functions: &'a [EdgeFunction], name: &str) -> Option<&'a EdgeFunction> {
    functions.iter().find(|func| func.name == name)
}
