//! Fetch orchestration
//!
//! [`ArtworkFetcher`] is the caller-facing entry point. One fetch runs under the
//! artwork's lock from start to finish:
//!
//! 1. List the artwork's cache prefix. A complete, non-empty set is a hit: TTLs are
//!    refreshed and the cached paths returned without touching the network.
//! 2. Otherwise look up metadata once and classify the artwork.
//! 3. Static artworks download every page concurrently through the transfer gate;
//!    animated artworks go through the [`Assembler`].
//!
//! Concurrent callers for the same artwork queue on the lock, so the second one
//! finds the first one's results in the cache.

use crate::assembler::Assembler;
use crate::cache::{ContentStore, artwork_key, artwork_prefix};
use crate::compressor::Compressor;
use crate::config::Config;
use crate::downloader::{PageDownloader, build_http_client};
use crate::error::{Error, Result};
use crate::gate::TransferGate;
use crate::locks::EntityLocks;
use crate::media::{self, FrameEncoder, MediaTool};
use crate::provider::{ArtworkMetadata, MetadataProvider};
use crate::types::{ArtworkId, Event, PageTask};
use crate::utils::{page_file_name, sort_by_page_order};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Every collaborator of an [`ArtworkFetcher`], for explicit construction
pub struct FetcherParts {
    /// Validated configuration
    pub config: Config,
    /// Metadata source
    pub provider: Arc<dyn MetadataProvider>,
    /// Local cache
    pub store: Arc<dyn ContentStore>,
    /// HTTP client for page and archive transfers
    pub client: reqwest::Client,
    /// Transfer gate shared by every fetch using this instance
    pub gate: TransferGate,
    /// Per-artwork lock registry
    pub locks: EntityLocks,
    /// Encoder for animated artworks
    pub encoder: Arc<dyn FrameEncoder>,
    /// Probe/re-encode tool for the size budget
    pub media_tool: Arc<dyn MediaTool>,
}

/// Deduplicating, cache-first artwork fetcher (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct ArtworkFetcher {
    config: Arc<Config>,
    provider: Arc<dyn MetadataProvider>,
    store: Arc<dyn ContentStore>,
    gate: TransferGate,
    locks: EntityLocks,
    downloader: PageDownloader,
    assembler: Assembler,
    event_tx: broadcast::Sender<Event>,
}

impl ArtworkFetcher {
    /// Create a fetcher, building the HTTP client, gate, lock registry, and media
    /// tools from `config`
    ///
    /// # Example
    ///
    /// ```no_run
    /// use artfetch::{ArtworkFetcher, Config, FsContentStore, HttpMetadataProvider};
    /// use std::sync::Arc;
    ///
    /// # async fn example() -> artfetch::Result<()> {
    /// let config = Config::default();
    /// let store = Arc::new(FsContentStore::new(&config.cache.root_dir).await?);
    /// let provider = Arc::new(HttpMetadataProvider::new(
    ///     "https://provider.example/api/",
    ///     reqwest::Client::new(),
    /// )?);
    ///
    /// let fetcher = ArtworkFetcher::new(config, provider, store)?;
    /// for path in fetcher.fetch("100").await? {
    ///     println!("{}", path.display());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(
        config: Config,
        provider: Arc<dyn MetadataProvider>,
        store: Arc<dyn ContentStore>,
    ) -> Result<Self> {
        config.validate()?;
        let client = build_http_client(&config.http, &config.retry)?;
        let (encoder, media_tool) = media::from_config(&config.tools);
        let gate = TransferGate::new(config.fetch.max_concurrent_transfers);

        Self::with_parts(FetcherParts {
            config,
            provider,
            store,
            client,
            gate,
            locks: EntityLocks::new(),
            encoder,
            media_tool,
        })
    }

    /// Create a fetcher from explicitly supplied collaborators
    pub fn with_parts(parts: FetcherParts) -> Result<Self> {
        let FetcherParts {
            config,
            provider,
            store,
            client,
            gate,
            locks,
            encoder,
            media_tool,
        } = parts;
        config.validate()?;

        let downloader = PageDownloader::new(
            client,
            gate.clone(),
            store.clone(),
            config.retry.clone(),
            config.fetch.permit_timeout,
        );
        let compressor = Compressor::new(media_tool, config.compression.clone());
        let assembler = Assembler::new(
            downloader.clone(),
            encoder,
            compressor,
            store.clone(),
            config.animation.clone(),
            config.cache.clone(),
        );

        // Events are dropped when nobody listens
        let (event_tx, _rx) = broadcast::channel(1000);

        info!(
            store = store.name(),
            provider = provider.name(),
            max_concurrent_transfers = gate.capacity(),
            "artwork fetcher initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            provider,
            store,
            gate,
            locks,
            downloader,
            assembler,
            event_tx,
        })
    }

    /// Fetch artwork `id`, returning its cached file paths in page order
    pub async fn fetch(&self, id: &str) -> Result<Vec<PathBuf>> {
        self.fetch_with_cancel(id, CancellationToken::new()).await
    }

    /// Same as [`fetch`](Self::fetch), abandoning the work once `cancel` fires
    ///
    /// Cancellation stops lock and permit waits, HTTP attempts, retry delays, and
    /// external tools; partial page sets are purged as on any other failure.
    pub async fn fetch_with_cancel(
        &self,
        id: &str,
        cancel: CancellationToken,
    ) -> Result<Vec<PathBuf>> {
        let id = ArtworkId::new(id)?;
        let result = self.fetch_locked(&id, &cancel).await;

        match &result {
            Ok(paths) => {
                info!(artwork_id = %id, files = paths.len(), "fetch completed");
                self.emit(Event::FetchCompleted {
                    id: id.clone(),
                    paths: paths.clone(),
                });
            }
            Err(e) => {
                warn!(artwork_id = %id, error = %e, "fetch failed");
                self.emit(Event::FetchFailed {
                    id: id.clone(),
                    error: e.to_string(),
                });
            }
        }
        result
    }

    /// Subscribe to fetch lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Transfer gate shared by this fetcher's downloads
    pub fn gate(&self) -> &TransferGate {
        &self.gate
    }

    /// Per-artwork lock registry
    pub fn locks(&self) -> &EntityLocks {
        &self.locks
    }

    /// Content store backing the cache
    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn emit(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    async fn fetch_locked(&self, id: &ArtworkId, cancel: &CancellationToken) -> Result<Vec<PathBuf>> {
        let _guard = self
            .locks
            .lock_cancellable(id, self.config.fetch.lock_timeout, cancel)
            .await?;
        self.emit(Event::FetchStarted { id: id.clone() });

        if let Some(paths) = self.cached(id).await? {
            return Ok(paths);
        }

        let metadata = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            metadata = self.provider.lookup(id) => metadata?,
        };
        debug!(artwork_id = %id, kind = ?metadata.kind(), "metadata resolved");

        match metadata {
            ArtworkMetadata::Static { pages } => self.fetch_pages(id, pages, cancel).await,
            ArtworkMetadata::Animated {
                archive_url,
                frame_rate,
            } => self.fetch_animated(id, &archive_url, frame_rate, cancel).await,
        }
    }

    /// Cached paths for `id`, or `None` on a miss
    ///
    /// A set containing an empty file counts as a miss and is purged.
    async fn cached(&self, id: &ArtworkId) -> Result<Option<Vec<PathBuf>>> {
        let prefix = artwork_prefix(&self.config.cache.namespace, id);
        let mut files = self.store.list(&prefix).await?;
        if files.is_empty() {
            debug!(artwork_id = %id, "cache miss");
            return Ok(None);
        }

        if let Some(empty) = files.iter().find(|f| f.len == 0) {
            warn!(
                artwork_id = %id,
                key = %empty.relative_path,
                "zero-length cache entry, refetching artwork"
            );
            self.store.purge(&prefix).await?;
            return Ok(None);
        }

        for file in &files {
            self.store
                .register_ttl(&file.relative_path, self.config.cache.ttl)
                .await?;
        }
        sort_by_page_order(&mut files, |f| f.file_name());

        info!(artwork_id = %id, files = files.len(), "cache hit");
        self.emit(Event::CacheHit {
            id: id.clone(),
            files: files.len(),
        });
        Ok(Some(files.into_iter().map(|f| f.absolute_path).collect()))
    }

    async fn fetch_pages(
        &self,
        id: &ArtworkId,
        pages: Vec<String>,
        cancel: &CancellationToken,
    ) -> Result<Vec<PathBuf>> {
        if pages.is_empty() {
            return Err(Error::InvalidMetadata(format!(
                "static artwork {} has no pages",
                id
            )));
        }

        let namespace = &self.config.cache.namespace;
        let total = pages.len();
        let tasks: Vec<PageTask> = pages
            .into_iter()
            .enumerate()
            .map(|(index, source_url)| PageTask {
                index,
                relative_path: artwork_key(
                    namespace,
                    id,
                    &page_file_name(id.as_str(), index, &source_url),
                ),
                source_url,
            })
            .collect();
        info!(artwork_id = %id, pages = total, "downloading pages");

        let ttl = self.config.cache.ttl;
        let downloads = tasks.iter().map(|task| async move {
            let path = self.downloader.download_page(task, ttl, cancel).await?;
            self.emit(Event::PageDownloaded {
                id: id.clone(),
                index: task.index,
                total,
            });
            Ok::<_, Error>(path)
        });

        // try_join_all keeps input order, so paths come back in page order
        match futures::future::try_join_all(downloads).await {
            Ok(paths) => Ok(paths),
            Err(e) => {
                let prefix = artwork_prefix(namespace, id);
                if let Err(purge) = self.store.purge(&prefix).await {
                    warn!(artwork_id = %id, error = %purge, "failed to purge partial page set");
                }
                Err(e)
            }
        }
    }

    async fn fetch_animated(
        &self,
        id: &ArtworkId,
        archive_url: &str,
        frame_rate: Option<u32>,
        cancel: &CancellationToken,
    ) -> Result<Vec<PathBuf>> {
        let asset = self
            .assembler
            .assemble(id, archive_url, frame_rate, cancel)
            .await?;

        self.emit(Event::Assembled {
            id: id.clone(),
            frames: asset.frames,
            size_bytes: asset.encoded_size,
        });
        if let Some(compression) = &asset.compression {
            self.emit(Event::Compressed {
                id: id.clone(),
                iterations: compression.iterations,
                original_size: compression.original_size,
                final_size: compression.final_size,
            });
        }
        Ok(vec![asset.path])
    }
}
