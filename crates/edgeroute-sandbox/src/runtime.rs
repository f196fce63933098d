//! Sandbox runtime acquisition.
//!
//! Every extraction needs the runtime binary, but it is acquired at most
//! once per build. Concurrent callers share the in-flight acquisition
//! through [`RuntimeLocator`].

use std::path::PathBuf;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use tokio::sync::OnceCell;

use crate::error::{SandboxError, SandboxResult};

/// Environment variable that overrides the runtime location.
pub const RUNTIME_PATH_ENV: &str = "EDGEROUTE_RUNTIME_PATH";

/// Supplies the path of a usable runtime binary.
pub trait RuntimeProvider: Send + Sync {
    /// Acquires the runtime and returns its path.
    fn acquire(&self) -> BoxFuture<'_, SandboxResult<PathBuf>>;
}

/// Finds an installed runtime on the local machine.
///
/// Lookup order: explicit path, [`RUNTIME_PATH_ENV`], `deno` in `PATH`,
/// then a binary previously placed in the cache directory.
#[derive(Debug, Clone, Default)]
pub struct LocalRuntime {
    explicit: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
}

impl LocalRuntime {
    /// Creates a provider with no explicit path or cache directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an explicit runtime path.
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit = Some(path.into());
        self
    }

    /// Sets the directory searched for a cached runtime binary.
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    fn binary_name() -> &'static str {
        if cfg!(windows) {
            "deno.exe"
        } else {
            "deno"
        }
    }

    fn find(&self) -> SandboxResult<PathBuf> {
        // Config override first
        if let Some(ref path) = self.explicit {
            if path.exists() {
                return Ok(path.clone());
            }
            tracing::warn!("Configured runtime {} does not exist", path.display());
        }

        if let Ok(path) = std::env::var(RUNTIME_PATH_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Ok(path);
            }
        }

        if let Ok(path) = which::which(Self::binary_name()) {
            return Ok(path);
        }

        if let Some(ref dir) = self.cache_dir {
            let path = dir.join(Self::binary_name());
            if path.exists() {
                return Ok(path);
            }
        }

        Err(SandboxError::RuntimeNotFound)
    }
}

impl RuntimeProvider for LocalRuntime {
    fn acquire(&self) -> BoxFuture<'_, SandboxResult<PathBuf>> {
        Box::pin(async move {
            let path = self.find()?;
            tracing::debug!("Using sandbox runtime at {}", path.display());
            Ok(path)
        })
    }
}

/// Single-flight cache in front of a [`RuntimeProvider`].
///
/// The first caller triggers acquisition; callers arriving while it is in
/// flight wait for the same result. A failed acquisition is not cached.
pub struct RuntimeLocator {
    provider: Arc<dyn RuntimeProvider>,
    runtime: OnceCell<PathBuf>,
}

impl RuntimeLocator {
    /// Creates a locator backed by `provider`.
    pub fn new(provider: Arc<dyn RuntimeProvider>) -> Self {
        Self {
            provider,
            runtime: OnceCell::new(),
        }
    }

    /// Creates a locator for a locally installed runtime.
    pub fn local(runtime: LocalRuntime) -> Self {
        Self::new(Arc::new(runtime))
    }

    /// Returns the runtime path, acquiring it on first use.
    pub async fn get(&self) -> SandboxResult<PathBuf> {
        self.runtime
            .get_or_try_init(|| self.provider.acquire())
            .await
            .cloned()
    }
}

impl std::fmt::Debug for RuntimeLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeLocator")
            .field("runtime", &self.runtime.get())
            .finish()
    }
}
