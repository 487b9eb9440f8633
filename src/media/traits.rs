//! Traits and types for external media tooling

use crate::extraction::FrameSequence;
use async_trait::async_trait;
use std::path::Path;

/// Pixel dimensions of a media file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// Encodes a frame sequence into a single animated asset
///
/// Implementations run synchronously from the caller's point of view: `encode`
/// returns once the output is complete. A non-zero exit of an external process
/// is an [`Error::ExternalTool`](crate::Error::ExternalTool). Dropping the
/// returned future must stop any child process.
#[async_trait]
pub trait FrameEncoder: Send + Sync {
    /// Encode `frames` at `frame_rate` frames per second into `output`
    ///
    /// The output container is chosen from the extension of `output`.
    async fn encode(
        &self,
        frames: &FrameSequence,
        frame_rate: u32,
        output: &Path,
    ) -> crate::Result<()>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Probes and re-encodes media for the size-compliance loop
///
/// Same subprocess contract as [`FrameEncoder`].
#[async_trait]
pub trait MediaTool: Send + Sync {
    /// Read the dimensions of the first video stream of `path`
    async fn probe(&self, path: &Path) -> crate::Result<Dimensions>;

    /// Re-encode `input` at `width` pixels wide (aspect ratio preserved) into `output`
    async fn rescale(&self, input: &Path, width: u32, output: &Path) -> crate::Result<()>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
