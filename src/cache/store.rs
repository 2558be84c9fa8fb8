//! Cache backends
//!
//! Entries are single files (toolchain archives) addressed by name and key.

use crate::error::{BuilderError, BuilderResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tracing::debug;

/// A cacheable file: `name` groups entries, `key` identifies a version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub name: String,
    pub key: String,
    pub path: PathBuf,
}

impl CacheEntry {
    pub fn new(name: impl Into<String>, key: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            path: path.into(),
        }
    }
}

/// Storage behind the toolchain cache
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Materialize the entry at `entry.path`; returns the key that matched
    async fn restore(&self, entry: &CacheEntry) -> BuilderResult<Option<String>>;

    /// Store the file at `entry.path` under the entry's key
    async fn save(&self, entry: &CacheEntry) -> BuilderResult<()>;
}

/// Directory-backed cache laid out as `<root>/<name>/<key>/<file>`
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn slot(&self, name: &str, key: &str) -> PathBuf {
        self.root.join(name).join(key)
    }

    /// Most recently written complete slot under `name` whose key starts
    /// with `prefix`
    async fn newest_with_prefix(
        &self,
        name: &str,
        prefix: &str,
    ) -> BuilderResult<Option<(String, PathBuf)>> {
        let dir = self.root.join(name);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(BuilderError::io(format!("listing {}", dir.display()), e)),
        };

        let mut best: Option<(SystemTime, String, PathBuf)> = None;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| BuilderError::io(format!("listing {}", dir.display()), e))?
        {
            let key = entry.file_name().to_string_lossy().into_owned();
            if !key.starts_with(prefix) {
                continue;
            }
            // Interrupted saves leave slots without an archive
            let Some(file) = Self::stored_file(&entry.path()).await? else {
                continue;
            };
            let modified = entry
                .metadata()
                .await
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            if best.as_ref().map_or(true, |(t, _, _)| modified > *t) {
                best = Some((modified, key, file));
            }
        }

        Ok(best.map(|(_, key, file)| (key, file)))
    }

    /// The single file stored in a slot, whatever its name
    async fn stored_file(slot: &Path) -> BuilderResult<Option<PathBuf>> {
        let mut entries = match fs::read_dir(slot).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(BuilderError::io(format!("listing {}", slot.display()), e)),
        };
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| BuilderError::io(format!("listing {}", slot.display()), e))?
        {
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            if !hidden && entry.path().is_file() {
                return Ok(Some(entry.path()));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl CacheBackend for LocalStore {
    async fn restore(&self, entry: &CacheEntry) -> BuilderResult<Option<String>> {
        let exact = Self::stored_file(&self.slot(&entry.name, &entry.key)).await?;
        let (key, stored) = match exact {
            Some(file) => (entry.key.clone(), file),
            None => match self.newest_with_prefix(&entry.name, &entry.key).await? {
                Some((key, file)) => {
                    debug!("No exact cache entry for {}, using prefix match {}", entry.key, key);
                    (key, file)
                }
                None => return Ok(None),
            },
        };

        if let Some(parent) = entry.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| BuilderError::io(format!("creating {}", parent.display()), e))?;
        }
        fs::copy(&stored, &entry.path).await.map_err(|e| {
            BuilderError::io(
                format!("restoring {} to {}", stored.display(), entry.path.display()),
                e,
            )
        })?;

        Ok(Some(key))
    }

    async fn save(&self, entry: &CacheEntry) -> BuilderResult<()> {
        let file_name = entry.path.file_name().ok_or_else(|| {
            BuilderError::Internal(format!("cache path has no file name: {}", entry.path.display()))
        })?;
        let slot = self.slot(&entry.name, &entry.key);
        fs::create_dir_all(&slot)
            .await
            .map_err(|e| BuilderError::io(format!("creating {}", slot.display()), e))?;

        // Slots only ever hold complete archives
        let partial = slot.join(".partial");
        fs::copy(&entry.path, &partial).await.map_err(|e| {
            BuilderError::io(format!("caching {}", entry.path.display()), e)
        })?;
        fs::rename(&partial, slot.join(file_name))
            .await
            .map_err(|e| BuilderError::io(format!("finalizing {}", slot.display()), e))?;

        Ok(())
    }
}
