//! Common test utilities for artfetch integration tests

#[allow(dead_code)]
pub mod fakes;
#[allow(dead_code)]
pub mod fixtures;

#[allow(unused_imports)]
pub use fakes::*;
#[allow(unused_imports)]
pub use fixtures::*;

use artfetch::downloader::build_http_client;
use artfetch::media::{FrameEncoder, MediaTool, NoOpMediaTool};
use artfetch::{
    ArtworkFetcher, Config, EntityLocks, FetcherParts, FsContentStore, HttpMetadataProvider,
    MetadataProvider, TransferGate,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::MockServer;

/// Cache root, scratch root, and a mock provider/asset host for one test
pub struct TestEnv {
    pub server: MockServer,
    pub cache_dir: TempDir,
    pub scratch_dir: TempDir,
}

impl TestEnv {
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
            cache_dir: TempDir::new().expect("cache dir"),
            scratch_dir: TempDir::new().expect("scratch dir"),
        }
    }

    /// Configuration pointing at this environment, with fast retries
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.cache.root_dir = self.cache_dir.path().to_path_buf();
        config.animation.scratch_dir = Some(self.scratch_dir.path().to_path_buf());
        config.retry.max_attempts = 3;
        config.retry.initial_delay = Duration::from_millis(10);
        config.retry.max_delay = Duration::from_millis(10);
        config.retry.request_timeout = Duration::from_secs(10);
        config.http.referer = Some("https://provider.example/".to_string());
        config
    }

    /// Provider querying this environment's mock server, wrapped to count lookups
    pub fn provider(&self) -> Arc<CountingProvider> {
        let base = format!("{}/api", self.server.uri());
        let http = HttpMetadataProvider::new(&base, reqwest::Client::new()).expect("provider");
        Arc::new(CountingProvider::new(Arc::new(http)))
    }

    pub fn builder(&self) -> FetcherBuilder {
        FetcherBuilder {
            config: self.config(),
            provider: self.provider(),
            encoder: Arc::new(NoOpMediaTool),
            media_tool: Arc::new(NoOpMediaTool),
        }
    }

    pub fn cache_path(&self, relative: &str) -> std::path::PathBuf {
        self.cache_dir.path().join(relative)
    }

    pub fn scratch_is_empty(&self) -> bool {
        dir_is_empty(self.scratch_dir.path())
    }
}

/// Assembles an [`ArtworkFetcher`] with swappable collaborators
pub struct FetcherBuilder {
    pub config: Config,
    pub provider: Arc<CountingProvider>,
    pub encoder: Arc<dyn FrameEncoder>,
    pub media_tool: Arc<dyn MediaTool>,
}

impl FetcherBuilder {
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config.fetch.max_concurrent_transfers = capacity;
        self
    }

    pub fn encoder(mut self, encoder: Arc<dyn FrameEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn media_tool(mut self, tool: Arc<dyn MediaTool>) -> Self {
        self.media_tool = tool;
        self
    }

    pub fn budget(mut self, budget: Option<u64>) -> Self {
        self.config.compression.budget_bytes = budget;
        self
    }

    pub async fn build(self) -> (ArtworkFetcher, Arc<CountingProvider>) {
        let store = Arc::new(
            FsContentStore::new(&self.config.cache.root_dir)
                .await
                .expect("store"),
        );
        let client = build_http_client(&self.config.http, &self.config.retry).expect("client");
        let gate = TransferGate::new(self.config.fetch.max_concurrent_transfers);
        let provider: Arc<dyn MetadataProvider> = self.provider.clone();

        let fetcher = ArtworkFetcher::with_parts(FetcherParts {
            config: self.config,
            provider,
            store,
            client,
            gate,
            locks: EntityLocks::new(),
            encoder: self.encoder,
            media_tool: self.media_tool,
        })
        .expect("fetcher");
        (fetcher, self.provider)
    }
}

pub fn dir_is_empty(path: &Path) -> bool {
    std::fs::read_dir(path)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(true)
}
