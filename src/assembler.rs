//! Animated asset assembly
//!
//! An animated artwork is a remote ZIP of still frames. Assembly downloads the
//! archive into a private scratch workspace, extracts and renumbers the frames,
//! runs the external encoder over them, shrinks the result if it exceeds the size
//! budget, and finally streams the single output file into the content store.
//!
//! The workspace never outlives the call: it is removed explicitly on every
//! return path, and the `TempDir` drop handler covers futures that are dropped
//! mid-flight.

use crate::cache::{ContentStore, artwork_key, file_stream};
use crate::compressor::{CompressionOutcome, Compressor};
use crate::config::{AnimationConfig, CacheConfig};
use crate::downloader::PageDownloader;
use crate::error::{Error, Result};
use crate::extraction::extract_frames;
use crate::media::FrameEncoder;
use crate::types::ArtworkId;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Prefix of every scratch directory
const SCRATCH_PREFIX: &str = "artfetch-";

/// Disposable directory for one assembly attempt
#[derive(Debug)]
pub struct ScratchWorkspace {
    dir: TempDir,
}

impl ScratchWorkspace {
    /// Create a fresh workspace under `root`, or the OS temp dir when `None`
    pub async fn create(root: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX);
        let dir = match root {
            Some(root) => {
                tokio::fs::create_dir_all(root).await?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        debug!(path = ?dir.path(), "scratch workspace created");
        Ok(Self { dir })
    }

    /// Root of the workspace
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Remove the workspace; failures are logged, never returned
    pub async fn close(self) {
        let path = self.dir.path().to_path_buf();
        let dir = self.dir;
        match tokio::task::spawn_blocking(move || dir.close()).await {
            Ok(Ok(())) => debug!(?path, "scratch workspace removed"),
            Ok(Err(e)) => warn!(?path, error = %e, "failed to remove scratch workspace"),
            Err(e) => warn!(?path, error = %e, "scratch cleanup task failed"),
        }
    }
}

/// A persisted animated asset
#[derive(Clone, Debug)]
pub struct AssembledAsset {
    /// Cache key of the asset
    pub relative_path: String,
    /// Location of the asset in the cache
    pub path: PathBuf,
    /// Frames fed to the encoder
    pub frames: usize,
    /// Encoder output size, before any compression
    pub encoded_size: u64,
    /// Present when the asset had to be shrunk under the budget
    pub compression: Option<CompressionOutcome>,
}

/// Builds animated assets from frame archives
#[derive(Clone)]
pub struct Assembler {
    downloader: PageDownloader,
    encoder: Arc<dyn FrameEncoder>,
    compressor: Compressor,
    store: Arc<dyn ContentStore>,
    animation: AnimationConfig,
    cache: CacheConfig,
}

impl Assembler {
    /// Create an assembler
    pub fn new(
        downloader: PageDownloader,
        encoder: Arc<dyn FrameEncoder>,
        compressor: Compressor,
        store: Arc<dyn ContentStore>,
        animation: AnimationConfig,
        cache: CacheConfig,
    ) -> Self {
        Self {
            downloader,
            encoder,
            compressor,
            store,
            animation,
            cache,
        }
    }

    /// Download, encode, and persist the animated artwork `id`
    ///
    /// `frame_rate` overrides the configured default when the provider supplies
    /// one. The asset lands at `<namespace>/<id>/<id>.<format>`.
    pub async fn assemble(
        &self,
        id: &ArtworkId,
        archive_url: &str,
        frame_rate: Option<u32>,
        cancel: &CancellationToken,
    ) -> Result<AssembledAsset> {
        let workspace = ScratchWorkspace::create(self.animation.scratch_dir.as_deref()).await?;
        let frame_rate = frame_rate
            .filter(|fps| *fps > 0)
            .unwrap_or(self.animation.frame_rate);

        let result = self
            .assemble_in(&workspace, id, archive_url, frame_rate, cancel)
            .await;
        workspace.close().await;

        if let Err(e) = &result {
            warn!(artwork_id = %id, error = %e, "animated assembly failed");
        }
        result
    }

    async fn assemble_in(
        &self,
        workspace: &ScratchWorkspace,
        id: &ArtworkId,
        archive_url: &str,
        frame_rate: u32,
        cancel: &CancellationToken,
    ) -> Result<AssembledAsset> {
        let archive = workspace.path().join("archive.zip");
        self.downloader
            .download_to_file(archive_url, &archive, cancel)
            .await?;

        let frames = extract_frames(&archive, &workspace.path().join("frames")).await?;

        let file_name = format!("{}.{}", id, self.animation.output_format);
        let output = workspace.path().join(&file_name);
        cancellable(cancel, self.encoder.encode(&frames, frame_rate, &output)).await?;

        let encoded_size = match tokio::fs::metadata(&output).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => return Err(e.into()),
        };
        if encoded_size == 0 {
            return Err(Error::EmptyOutput(output));
        }
        info!(
            artwork_id = %id,
            frames = frames.count,
            frame_rate,
            size = encoded_size,
            encoder = self.encoder.name(),
            "frames encoded"
        );

        let compression = match self.compressor.budget() {
            Some(budget) if encoded_size >= budget => Some(
                cancellable(cancel, self.compressor.compress_under(&output, budget)).await?,
            ),
            _ => None,
        };

        let relative_path = artwork_key(&self.cache.namespace, id, &file_name);
        let path = self
            .store
            .write(&relative_path, file_stream(&output).await?, self.cache.ttl)
            .await?;

        Ok(AssembledAsset {
            relative_path,
            path,
            frames: frames.count,
            encoded_size,
            compression,
        })
    }
}

/// Abandon `work` (dropping any child process it owns) once `cancel` fires
async fn cancellable<T>(
    cancel: &CancellationToken,
    work: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        _ = cancel.cancelled() => Err(Error::Cancelled),
        result = work => result,
    }
}
