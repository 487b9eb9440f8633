//! Frame archive extraction
//!
//! Animated artworks arrive as a ZIP of numbered still frames. This module
//! unpacks the archive off the async runtime and lays the frames out as a
//! contiguous `frame_000000.<ext>` sequence the encoder can consume with a
//! single input pattern.

mod zip;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use zip::ZipExtractor;

use crate::error::{Error, Result};
use crate::utils::sort_by_frame_order;
use std::path::{Path, PathBuf};
use tokio::task::spawn_blocking;
use tracing::{info, warn};

/// File extensions accepted as frames
const FRAME_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp"];

/// Frames ready for encoding
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameSequence {
    /// Directory holding the frames
    pub dir: PathBuf,
    /// Extension shared by every frame (lowercase, no dot)
    pub extension: String,
    /// Number of frames
    pub count: usize,
}

impl FrameSequence {
    /// printf-style input pattern, e.g. `<dir>/frame_%06d.jpg`
    pub fn pattern(&self) -> PathBuf {
        self.dir.join(format!("frame_%06d.{}", self.extension))
    }
}

/// Extract `archive_path` into `dest_path` and renumber its frames
///
/// Frames are ordered by their original file name. Non-image entries are
/// ignored; an archive without frames, or with frames of mixed formats, is an
/// [`Error::Extraction`].
pub async fn extract_frames(archive_path: &Path, dest_path: &Path) -> Result<FrameSequence> {
    // Unpack beside the final layout so renumbering can never overwrite a frame
    let raw_dir = dest_path.join(".raw");
    let archive_owned = archive_path.to_path_buf();
    let dest_owned = raw_dir.clone();

    let extracted = spawn_blocking(move || ZipExtractor::extract(&archive_owned, &dest_owned))
        .await
        .map_err(|e| Error::Extraction {
            archive: archive_path.to_path_buf(),
            reason: format!("extraction task panicked: {}", e),
        })??;

    let sequence = renumber_frames(archive_path, dest_path, extracted).await?;
    if let Err(e) = tokio::fs::remove_dir_all(&raw_dir).await {
        warn!(?raw_dir, error = %e, "failed to remove raw extraction directory");
    }
    info!(
        ?archive_path,
        frames = sequence.count,
        extension = %sequence.extension,
        "frame archive extracted"
    );
    Ok(sequence)
}

fn frame_extension(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    FRAME_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

async fn renumber_frames(
    archive_path: &Path,
    dest_path: &Path,
    extracted: Vec<PathBuf>,
) -> Result<FrameSequence> {
    let mut frames: Vec<(PathBuf, String)> = extracted
        .into_iter()
        .filter_map(|path| frame_extension(&path).map(|ext| (path, ext)))
        .collect();

    if frames.is_empty() {
        return Err(Error::Extraction {
            archive: archive_path.to_path_buf(),
            reason: "archive contains no frames".into(),
        });
    }

    sort_by_frame_order(&mut frames, |(path, _)| {
        path.file_name().and_then(|n| n.to_str()).unwrap_or_default()
    });

    // jpeg and jpg are the same format for the encoder
    let normalize = |ext: &str| if ext == "jpeg" { "jpg".to_string() } else { ext.to_string() };
    let extension = normalize(&frames[0].1);
    if let Some((odd, _)) = frames.iter().find(|(_, ext)| normalize(ext) != extension) {
        return Err(Error::Extraction {
            archive: archive_path.to_path_buf(),
            reason: format!(
                "mixed frame formats: expected .{}, found {}",
                extension,
                odd.display()
            ),
        });
    }

    tokio::fs::create_dir_all(dest_path).await?;
    let count = frames.len();
    for (i, (path, _)) in frames.into_iter().enumerate() {
        let target = dest_path.join(format!("frame_{:06}.{}", i, extension));
        tokio::fs::rename(&path, &target).await?;
    }

    Ok(FrameSequence {
        dir: dest_path.to_path_buf(),
        extension,
        count,
    })
}
