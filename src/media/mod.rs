//! External media tooling
//!
//! Encoding frames into an animated asset and downscaling oversized assets are
//! delegated to external programs. The [`FrameEncoder`] and [`MediaTool`] traits
//! are the seams; implementations:
//!
//! - [`FfmpegEncoder`] / [`FfmpegMediaTool`]: run `ffmpeg` and `ffprobe`
//! - [`NoOpMediaTool`]: stub when the binaries are unavailable
//!
//! [`from_config`] picks implementations the same way for both traits: an
//! explicit path wins, then a PATH search if enabled, then the stub.

mod cli;
mod noop;
mod traits;

pub use cli::{FfmpegEncoder, FfmpegMediaTool};
pub use noop::NoOpMediaTool;
pub use traits::{Dimensions, FrameEncoder, MediaTool};

use crate::config::ToolsConfig;
use std::sync::Arc;

/// Encoder and probe/re-encode tool selected from configuration
pub fn from_config(tools: &ToolsConfig) -> (Arc<dyn FrameEncoder>, Arc<dyn MediaTool>) {
    let ffmpeg = tools.ffmpeg_path.clone().or_else(|| {
        tools
            .search_path
            .then(|| which::which("ffmpeg").ok())
            .flatten()
    });
    let ffprobe = tools.ffprobe_path.clone().or_else(|| {
        tools
            .search_path
            .then(|| which::which("ffprobe").ok())
            .flatten()
    });

    let encoder: Arc<dyn FrameEncoder> = match &ffmpeg {
        Some(path) => Arc::new(FfmpegEncoder::new(path.clone())),
        None => Arc::new(NoOpMediaTool),
    };
    let tool: Arc<dyn MediaTool> = match (ffmpeg, ffprobe) {
        (Some(ffmpeg), Some(ffprobe)) => Arc::new(FfmpegMediaTool::new(ffmpeg, ffprobe)),
        _ => Arc::new(NoOpMediaTool),
    };

    tracing::info!(
        encoder = encoder.name(),
        media_tool = tool.name(),
        "media tooling initialized"
    );
    (encoder, tool)
}
