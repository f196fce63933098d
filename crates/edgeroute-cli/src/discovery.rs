//! Function discovery.
//!
//! Scans source roots for edge functions. A function is either a file with
//! an allowed extension directly inside a root, or a directory inside a
//! root that contains `<dirname>.<ext>` or `index.<ext>`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use edgeroute_spec::EdgeFunction;
use futures_util::future::join_all;
use serde::Serialize;

/// Allowed extensions, highest precedence first.
pub const ALLOWED_EXTENSIONS: &[&str] = &["js", "jsx", "ts", "tsx"];

/// Who provides the functions in a source root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Functions generated by the platform or its plugins.
    Internal,
    /// Functions written by the project author.
    User,
}

impl Tier {
    /// Returns the string representation for output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Internal => "internal",
            Tier::User => "user",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A directory scanned for functions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRoot {
    pub path: PathBuf,
    pub tier: Tier,
}

impl SourceRoot {
    /// Creates a root of internal functions.
    pub fn internal(path: impl Into<PathBuf>) -> Self {
        Self {
            path: absolute_path(path.into()),
            tier: Tier::Internal,
        }
    }

    /// Creates a root of user functions.
    pub fn user(path: impl Into<PathBuf>) -> Self {
        Self {
            path: absolute_path(path.into()),
            tier: Tier::User,
        }
    }
}

/// Resolves a relative path against the current directory.
///
/// Function paths are handed to the sandbox as `file:` URLs, which need
/// absolute paths.
pub fn absolute_path(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(err) => {
            tracing::warn!("Failed to read current directory: {}", err);
            path
        }
    }
}

/// A function together with the tier of the root it was found in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredFunction {
    #[serde(flatten)]
    pub function: EdgeFunction,
    pub tier: Tier,
}

/// Returns the precedence rank of a file's extension, lower is stronger.
pub fn extension_rank(path: &Path) -> Option<usize> {
    let extension = path.extension()?.to_str()?;
    ALLOWED_EXTENSIONS.iter().position(|allowed| *allowed == extension)
}

/// Finds the functions in `roots`.
///
/// Roots are scanned concurrently but the result follows root order, then
/// entry name order within a root. Unreadable roots contribute nothing.
pub async fn find_functions(roots: &[SourceRoot]) -> Vec<DiscoveredFunction> {
    let scans = join_all(roots.iter().map(|root| scan_root(root))).await;
    remove_duplicates_by_extension(scans.into_iter().flatten())
}

/// Keeps one occurrence per function name.
///
/// A later occurrence only wins if its extension has a strictly higher
/// precedence; it then takes the place of the earlier one.
pub fn remove_duplicates_by_extension(
    functions: impl IntoIterator<Item = DiscoveredFunction>,
) -> Vec<DiscoveredFunction> {
    let mut kept: Vec<DiscoveredFunction> = Vec::new();
    let mut seen: HashMap<String, (usize, usize)> = HashMap::new();

    for func in functions {
        let rank = extension_rank(&func.function.path).unwrap_or(usize::MAX);
        match seen.get(&func.function.name).copied() {
            None => {
                seen.insert(func.function.name.clone(), (kept.len(), rank));
                kept.push(func);
            }
            Some((index, existing)) if rank < existing => {
                tracing::debug!(
                    "Function '{}' at {} replaces {}",
                    func.function.name,
                    func.function.path.display(),
                    kept[index].function.path.display()
                );
                seen.insert(func.function.name.clone(), (index, rank));
                kept[index] = func;
            }
            Some(_) => {
                tracing::debug!(
                    "Ignoring duplicate function '{}' at {}",
                    func.function.name,
                    func.function.path.display()
                );
            }
        }
    }

    kept
}

async fn scan_root(root: &SourceRoot) -> Vec<DiscoveredFunction> {
    let mut entries = match tokio::fs::read_dir(&root.path).await {
        Ok(entries) => entries,
        Err(err) => {
            tracing::debug!("Skipping source root {}: {}", root.path.display(), err);
            return Vec::new();
        }
    };

    let mut paths = Vec::new();
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => paths.push(entry.path()),
            Ok(None) => break,
            Err(err) => {
                tracing::debug!("Error reading {}: {}", root.path.display(), err);
                break;
            }
        }
    }
    paths.sort();

    join_all(paths.iter().map(|path| function_at(path)))
        .await
        .into_iter()
        .flatten()
        .map(|function| DiscoveredFunction {
            function,
            tier: root.tier,
        })
        .collect()
}

async fn function_at(path: &Path) -> Option<EdgeFunction> {
    let metadata = tokio::fs::metadata(path).await.ok()?;

    if metadata.is_dir() {
        return function_in_directory(path).await;
    }

    extension_rank(path)?;
    let name = path.file_stem()?.to_str()?;
    Some(EdgeFunction::new(name, path))
}

async fn function_in_directory(directory: &Path) -> Option<EdgeFunction> {
    let name = directory.file_name()?.to_str()?;

    for extension in ALLOWED_EXTENSIONS {
        for stem in [name, "index"] {
            let candidate = directory.join(format!("{}.{}", stem, extension));
            if let Ok(metadata) = tokio::fs::metadata(&candidate).await {
                if metadata.is_file() {
                    return Some(EdgeFunction::new(name, candidate));
                }
            }
        }
    }

    None
}
