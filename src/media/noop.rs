//! No-op media tooling for graceful degradation

use super::traits::{Dimensions, FrameEncoder, MediaTool};
use crate::extraction::FrameSequence;
use async_trait::async_trait;
use std::path::Path;

/// Stand-in used when ffmpeg/ffprobe are unavailable
///
/// Static artworks still fetch normally; animated artworks and compression fail
/// with `Error::NotSupported`.
///
/// # Examples
///
/// ```
/// use artfetch::media::{MediaTool, NoOpMediaTool};
/// use std::path::Path;
///
/// # #[tokio::main]
/// # async fn main() {
/// let tool = NoOpMediaTool;
/// assert!(tool.probe(Path::new("a.gif")).await.is_err());
/// # }
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpMediaTool;

fn unsupported(what: &str) -> crate::Error {
    crate::Error::NotSupported(format!(
        "{} requires an external ffmpeg binary. \
         Configure tools.ffmpeg_path or ensure ffmpeg is in PATH.",
        what
    ))
}

#[async_trait]
impl FrameEncoder for NoOpMediaTool {
    async fn encode(
        &self,
        _frames: &FrameSequence,
        _frame_rate: u32,
        _output: &Path,
    ) -> crate::Result<()> {
        Err(unsupported("Animated artwork encoding"))
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}

#[async_trait]
impl MediaTool for NoOpMediaTool {
    async fn probe(&self, _path: &Path) -> crate::Result<Dimensions> {
        Err(unsupported("Media probing"))
    }

    async fn rescale(&self, _input: &Path, _width: u32, _output: &Path) -> crate::Result<()> {
        Err(unsupported("Size-budget compression"))
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
