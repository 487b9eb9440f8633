//! # artfetch
//!
//! Deduplicating, cache-first fetcher for remote artworks.
//!
//! An artwork is either a set of still pages or a ZIP of frames that is encoded
//! into a single animated asset. artfetch takes care of the plumbing around
//! getting either into a local cache:
//!
//! - **One fetch per artwork** - concurrent requests for the same artwork share a
//!   lock, so only the first one touches the network
//! - **Cache first** - a complete cached set is returned immediately and its TTL
//!   refreshed
//! - **Bounded transfers** - every page and archive download goes through one
//!   process-wide permit gate
//! - **Retry on handshake failures** - failed TLS handshakes are retried on a
//!   fixed delay; refused connections, timeouts and HTTP errors are not
//! - **Size budget** - oversized animated assets are downscaled with ffmpeg until
//!   they fit
//!
//! ## Quick Start
//!
//! ```no_run
//! use artfetch::{ArtworkFetcher, Config, FsContentStore, HttpMetadataProvider};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.http.referer = Some("https://provider.example/".to_string());
//!
//!     let store = Arc::new(FsContentStore::new(&config.cache.root_dir).await?);
//!     let client = artfetch::downloader::build_http_client(&config.http, &config.retry)?;
//!     let provider = Arc::new(HttpMetadataProvider::new(
//!         "https://provider.example/api/",
//!         client,
//!     )?);
//!
//!     let fetcher = ArtworkFetcher::new(config, provider, store)?;
//!
//!     // Subscribe to events
//!     let mut events = fetcher.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let paths = fetcher.fetch("100").await?;
//!     println!("cached {} file(s)", paths.len());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Animated asset assembly
pub mod assembler;
/// Local content store
pub mod cache;
/// Size-compliance compressor
pub mod compressor;
/// Configuration types
pub mod config;
/// Gated, retrying HTTP transfers
pub mod downloader;
/// Error types
pub mod error;
/// Frame archive extraction
pub mod extraction;
/// Fetch orchestration
pub mod fetcher;
/// Transfer concurrency gate
pub mod gate;
/// Per-artwork lock registry
pub mod locks;
/// External media tooling (ffmpeg, ffprobe)
pub mod media;
/// Artwork metadata providers
pub mod provider;
/// Retry logic for transient transfer failures
pub mod retry;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use assembler::{AssembledAsset, Assembler, ScratchWorkspace};
pub use cache::{CachedFile, ContentStore, FsContentStore};
pub use compressor::{CompressionOutcome, Compressor};
pub use config::Config;
pub use downloader::PageDownloader;
pub use error::{Error, ErrorKind, Result};
pub use fetcher::{ArtworkFetcher, FetcherParts};
pub use gate::{TransferGate, TransferPermit};
pub use locks::{EntityGuard, EntityLocks};
pub use provider::{ArtworkMetadata, HttpMetadataProvider, MetadataProvider};
pub use types::{ArtworkId, ArtworkKind, Event, PageTask};
