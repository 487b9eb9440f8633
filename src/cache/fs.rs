//! Filesystem-backed content store

use super::{ByteStream, CachedFile, ContentStore};
use crate::error::{Error, Result};
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Suffix of in-progress writes; never listed
const PART_SUFFIX: &str = ".part";

/// Content store rooted at a local directory
///
/// Entries are plain files at `<root>/<key>`. Writes go to `<key>.part` and are
/// renamed into place once the stream completes, so a crash or a failed stream
/// never leaves a truncated entry behind. Expiry times are tracked in memory;
/// [`purge_expired`](FsContentStore::purge_expired) deletes entries whose TTL has
/// lapsed.
#[derive(Debug)]
pub struct FsContentStore {
    root: PathBuf,
    expiries: Mutex<HashMap<String, SystemTime>>,
}

impl FsContentStore {
    /// Create a store rooted at `root`, creating the directory if needed
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to create cache directory '{}': {}", root.display(), e),
            ))
        })?;
        Ok(Self {
            root,
            expiries: Mutex::new(HashMap::new()),
        })
    }

    /// Root directory of the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// When the entry at `relative_path` expires, if a TTL was registered
    pub fn expiry(&self, relative_path: &str) -> Option<SystemTime> {
        self.expiries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(relative_path)
            .copied()
    }

    /// Delete every entry whose TTL has lapsed; returns the number removed
    pub async fn purge_expired(&self) -> Result<usize> {
        let now = SystemTime::now();
        let expired: Vec<String> = {
            let expiries = self
                .expiries
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            expiries
                .iter()
                .filter(|(_, at)| **at <= now)
                .map(|(key, _)| key.clone())
                .collect()
        };

        let mut removed = 0;
        for key in expired {
            let path = self.resolve(&key)?;
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(key = %key, error = %e, "failed to evict expired cache entry");
                    continue;
                }
            }
            self.forget(&key);
        }

        if removed > 0 {
            info!(removed, "evicted expired cache entries");
        }
        Ok(removed)
    }

    fn forget(&self, key: &str) {
        self.expiries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(key);
    }

    fn set_expiry(&self, key: &str, ttl: Duration) {
        let at = SystemTime::now() + ttl;
        self.expiries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.to_string(), at);
    }

    /// Map a key to a path under the root, rejecting anything that could escape it
    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key.trim_end_matches('/'));
        let clean = !key.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !clean {
            return Err(Error::Cache(format!("invalid cache key {:?}", key)));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ContentStore for FsContentStore {
    async fn list(&self, prefix: &str) -> Result<Vec<CachedFile>> {
        let dir = self.resolve(prefix)?;
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::Io(e)),
        };

        let key_prefix = format!("{}/", prefix.trim_end_matches('/'));
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name.ends_with(PART_SUFFIX) {
                continue;
            }
            files.push(CachedFile {
                relative_path: format!("{}{}", key_prefix, name),
                absolute_path: entry.path(),
                len: metadata.len(),
            });
        }

        files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        debug!(prefix, count = files.len(), "listed cache prefix");
        Ok(files)
    }

    async fn write(
        &self,
        relative_path: &str,
        mut body: ByteStream,
        ttl: Duration,
    ) -> Result<PathBuf> {
        let path = self.resolve(relative_path)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut part_name = path.as_os_str().to_owned();
        part_name.push(PART_SUFFIX);
        let part_path = PathBuf::from(part_name);

        let written: Result<u64> = async {
            let mut file = tokio::fs::File::create(&part_path).await?;
            let mut total = 0u64;
            while let Some(chunk) = body.next().await {
                let chunk = chunk?;
                file.write_all(&chunk).await?;
                total += chunk.len() as u64;
            }
            file.flush().await?;
            file.sync_all().await?;
            Ok(total)
        }
        .await;

        let bytes = match written {
            Ok(bytes) => bytes,
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_file(&part_path).await
                    && cleanup.kind() != std::io::ErrorKind::NotFound
                {
                    warn!(path = ?part_path, error = %cleanup, "failed to remove partial cache write");
                }
                return Err(e);
            }
        };

        tokio::fs::rename(&part_path, &path).await?;
        self.set_expiry(relative_path, ttl);
        debug!(key = relative_path, bytes, ttl_secs = ttl.as_secs(), "cache entry written");
        Ok(path)
    }

    async fn register_ttl(&self, relative_path: &str, ttl: Duration) -> Result<()> {
        let path = self.resolve(relative_path)?;
        if tokio::fs::metadata(&path).await.is_err() {
            return Err(Error::Cache(format!(
                "cannot refresh TTL of missing entry {}",
                relative_path
            )));
        }
        self.set_expiry(relative_path, ttl);
        Ok(())
    }

    async fn purge(&self, prefix: &str) -> Result<()> {
        let dir = self.resolve(prefix)?;
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(Error::Io(e)),
        }

        let key_prefix = format!("{}/", prefix.trim_end_matches('/'));
        self.expiries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .retain(|key, _| !key.starts_with(&key_prefix));
        debug!(prefix, "purged cache prefix");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fs"
    }
}
