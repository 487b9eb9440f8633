//! Provider metadata lookup
//!
//! Before any asset bytes are fetched, the provider is asked what an artwork
//! is: a list of still pages, or one frame archive to assemble. The
//! [`MetadataProvider`] trait is the seam; [`HttpMetadataProvider`] talks to a
//! JSON endpoint.

mod http;

pub use http::HttpMetadataProvider;

use crate::error::Result;
use crate::types::{ArtworkId, ArtworkKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What the provider reports about one artwork
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArtworkMetadata {
    /// Still pages, in display order
    Static {
        /// Page URLs in the provider's order
        pages: Vec<String>,
    },
    /// A frame archive to encode into one animated asset
    Animated {
        /// URL of the frame archive
        archive_url: String,
        /// Frame rate suggested by the provider, if any
        #[serde(default, skip_serializing_if = "Option::is_none")]
        frame_rate: Option<u32>,
    },
}

impl ArtworkMetadata {
    /// Classification of this artwork
    pub fn kind(&self) -> ArtworkKind {
        match self {
            ArtworkMetadata::Static { .. } => ArtworkKind::Static,
            ArtworkMetadata::Animated { .. } => ArtworkKind::Animated,
        }
    }
}

/// Source of artwork metadata
///
/// Implementations must report a missing artwork as
/// [`Error::MetadataNotFound`](crate::Error::MetadataNotFound) and transport
/// failures as [`Error::Network`](crate::Error::Network), so the two stay
/// distinguishable to callers.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Look up one artwork
    async fn lookup(&self, id: &ArtworkId) -> Result<ArtworkMetadata>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
