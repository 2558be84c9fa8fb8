//! Toolchain archive cache
//!
//! The cache only exists when the run happens inside a CI workspace (the
//! `GITHUB_WORKSPACE` marker is set). Everywhere else both operations are
//! no-ops, so local runs behave exactly like a cold CI run.
//!
//! # Failure policy
//!
//! | Operation | Backend error | Effect on the run |
//! |-----------|---------------|-------------------|
//! | restore   | logged        | treated as a miss |
//! | save      | logged        | none              |

pub mod store;

pub use store::{CacheBackend, CacheEntry, LocalStore};

use crate::config::HostEnv;
use std::path::Path;
use tracing::{debug, info, warn};

/// Directory under the workspace root holding cached archives
const STORE_DIR: &str = ".turnip-cache";

/// Cache guard that turns every backend failure into a logged no-op
pub struct ToolchainCache {
    backend: Option<Box<dyn CacheBackend>>,
}

impl ToolchainCache {
    /// Build the cache for this host; absent without a cache root marker
    pub fn from_env(env: &HostEnv) -> Self {
        let Some(ref root) = env.cache_root else {
            debug!("No cache root configured, toolchain cache disabled");
            return Self::disabled();
        };

        let store = env
            .cache_dir
            .clone()
            .unwrap_or_else(|| root.join(STORE_DIR));
        debug!("Toolchain cache at {}", store.display());
        Self::with_backend(Box::new(LocalStore::new(store)))
    }

    pub fn with_backend(backend: Box<dyn CacheBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    pub fn disabled() -> Self {
        Self { backend: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Restore `name`/`key` to `path`. Returns the key that matched on a hit,
    /// which differs from `key` when only a prefix match was found.
    pub async fn restore(&self, name: &str, key: &str, path: &Path) -> Option<String> {
        let backend = self.backend.as_ref()?;
        let entry = CacheEntry::new(name, key, path);

        match backend.restore(&entry).await {
            Ok(Some(matched)) => {
                info!("Cache hit for {} ({})", name, matched);
                Some(matched)
            }
            Ok(None) => {
                info!("Cache miss for {} ({})", name, key);
                None
            }
            Err(e) => {
                warn!("Cache restore for {} failed, continuing without it: {}", name, e);
                None
            }
        }
    }

    /// Write `path` back to the cache under `name`/`key`
    pub async fn save(&self, name: &str, key: &str, path: &Path) {
        let Some(ref backend) = self.backend else {
            return;
        };

        match backend.save(&CacheEntry::new(name, key, path)).await {
            Ok(()) => info!("Cached {} ({})", name, key),
            Err(e) => warn!("Cache save for {} failed, continuing: {}", name, e),
        }
    }
}
