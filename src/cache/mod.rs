//! Local content store interface
//!
//! The fetch pipeline consumes the store through the narrow [`ContentStore`]
//! trait: list a key prefix, write a byte stream under a key with a TTL, refresh
//! a key's TTL, and purge a prefix. Expiry and eviction are entirely the store's
//! business; the pipeline only creates and queries entries.
//!
//! Keys are `/`-separated relative paths of the form
//! `<namespace>/<artwork_id>/<file>`. Use [`artwork_prefix`] and [`artwork_key`]
//! to build them.
//!
//! [`FsContentStore`] is the filesystem implementation used by default.

mod fs;

pub use fs::FsContentStore;

use crate::error::Result;
use crate::types::ArtworkId;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::Duration;

/// Stream of body chunks handed to [`ContentStore::write`]
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// One entry returned by [`ContentStore::list`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedFile {
    /// Store key (`<namespace>/<artwork_id>/<file>`)
    pub relative_path: String,
    /// Location on disk
    pub absolute_path: PathBuf,
    /// Size in bytes
    pub len: u64,
}

impl CachedFile {
    /// Last segment of the key
    pub fn file_name(&self) -> &str {
        self.relative_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.relative_path)
    }
}

/// Content store consumed by the fetch pipeline
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// List entries directly under `prefix`, sorted by key
    ///
    /// A prefix with no entries yields an empty list, not an error.
    async fn list(&self, prefix: &str) -> Result<Vec<CachedFile>>;

    /// Stream `body` into the entry at `relative_path` and register `ttl` for it
    ///
    /// Returns the absolute path of the written entry. Readers never observe a
    /// partially written entry.
    async fn write(&self, relative_path: &str, body: ByteStream, ttl: Duration) -> Result<PathBuf>;

    /// Refresh the TTL of an existing entry
    async fn register_ttl(&self, relative_path: &str, ttl: Duration) -> Result<()>;

    /// Remove every entry under `prefix`
    async fn purge(&self, prefix: &str) -> Result<()>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Key prefix holding every file of one artwork: `<namespace>/<id>/`
#[must_use]
pub fn artwork_prefix(namespace: &str, id: &ArtworkId) -> String {
    format!("{}/{}/", namespace, id)
}

/// Key of one file of an artwork: `<namespace>/<id>/<file_name>`
#[must_use]
pub fn artwork_key(namespace: &str, id: &ArtworkId, file_name: &str) -> String {
    format!("{}{}", artwork_prefix(namespace, id), file_name)
}

/// Stream a local file in chunks without reading it into memory
pub async fn file_stream(path: &Path) -> Result<ByteStream> {
    let file = tokio::fs::File::open(path).await.map_err(|e| {
        crate::Error::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to open '{}': {}", path.display(), e),
        ))
    })?;
    Ok(tokio_util::io::ReaderStream::new(file).boxed())
}

/// Wrap an in-memory buffer as a single-chunk stream
#[must_use]
pub fn bytes_stream(bytes: impl Into<Bytes>) -> ByteStream {
    let bytes = bytes.into();
    futures::stream::once(async move { Ok(bytes) }).boxed()
}
