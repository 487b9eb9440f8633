//! Core types and events for artfetch

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Identifier of one artwork on the provider
///
/// Opaque to this crate apart from one rule: it becomes a path component of
/// cache keys, so it must be non-empty and free of path separators.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtworkId(String);

impl ArtworkId {
    /// Create a new ArtworkId, rejecting values that are unsafe as a path component
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\', '\0']) {
            return Err(Error::InvalidArtworkId(id));
        }
        Ok(Self(id))
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for ArtworkId {
    type Error = Error;

    fn try_from(id: &str) -> Result<Self> {
        Self::new(id)
    }
}

impl TryFrom<String> for ArtworkId {
    type Error = Error;

    fn try_from(id: String) -> Result<Self> {
        Self::new(id)
    }
}

/// Shape of an artwork as reported by the provider
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtworkKind {
    /// One or more still pages
    Static,
    /// A single frame archive to be assembled into one asset
    Animated,
}

/// One still page to download
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageTask {
    /// Position of the page in the provider's ordering
    pub index: usize,
    /// Remote URL of the page
    pub source_url: String,
    /// Cache key the page is written under
    pub relative_path: String,
}

/// Lifecycle events emitted by the fetcher
///
/// Subscribe via [`ArtworkFetcher::subscribe`](crate::ArtworkFetcher::subscribe).
/// Events are best-effort: with no subscribers they are dropped.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A caller holds the artwork lock and starts the lookup
    FetchStarted {
        /// Artwork being fetched
        id: ArtworkId,
    },

    /// The cache satisfied the request
    CacheHit {
        /// Artwork being fetched
        id: ArtworkId,
        /// Number of cached files returned
        files: usize,
    },

    /// One page of a static artwork landed in the cache
    PageDownloaded {
        /// Artwork being fetched
        id: ArtworkId,
        /// Page index in provider order
        index: usize,
        /// Total pages in the artwork
        total: usize,
    },

    /// An animated artwork was encoded into a single asset
    Assembled {
        /// Artwork being fetched
        id: ArtworkId,
        /// Number of frames fed to the encoder
        frames: usize,
        /// Size of the encoded asset in bytes
        size_bytes: u64,
    },

    /// An oversized asset was brought under the size budget
    Compressed {
        /// Artwork being fetched
        id: ArtworkId,
        /// Number of re-encode passes
        iterations: u32,
        /// Size before compression
        original_size: u64,
        /// Size after compression
        final_size: u64,
    },

    /// The fetch finished and the files are cached
    FetchCompleted {
        /// Artwork being fetched
        id: ArtworkId,
        /// Cached file paths, in page order
        paths: Vec<PathBuf>,
    },

    /// The fetch failed
    FetchFailed {
        /// Artwork being fetched
        id: ArtworkId,
        /// Error message
        error: String,
    },
}
