//! Size-compliance compressor
//!
//! Repeatedly downscales an asset until it fits a byte budget. Each pass probes
//! the current width, re-encodes at `width * scale_factor` (never below
//! `min_width`) into a numbered intermediate next to the input, and keeps only the
//! newest intermediate. The loop is bounded twice: by `max_iterations`, and by
//! refusing to run a pass that cannot reduce the width.

use crate::config::CompressionConfig;
use crate::error::{Error, Result};
use crate::media::MediaTool;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a successful [`Compressor::compress_under`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompressionOutcome {
    /// Path of the compliant asset (always the input path)
    pub path: PathBuf,
    /// Number of re-encode passes performed
    pub iterations: u32,
    /// Size before the first pass
    pub original_size: u64,
    /// Size after the last pass
    pub final_size: u64,
    /// Width produced by the last pass; `None` if no pass ran
    pub final_width: Option<u32>,
}

/// Shrinks assets under a byte budget with an external [`MediaTool`]
#[derive(Clone)]
pub struct Compressor {
    tool: Arc<dyn MediaTool>,
    config: CompressionConfig,
}

impl Compressor {
    /// Create a compressor driving `tool`
    pub fn new(tool: Arc<dyn MediaTool>, config: CompressionConfig) -> Self {
        Self { tool, config }
    }

    /// Configured budget, if compression is enabled
    pub fn budget(&self) -> Option<u64> {
        self.config.budget_bytes
    }

    /// Shrink `path` in place until it is smaller than `budget` bytes
    ///
    /// On success the last intermediate replaces `path` atomically. On failure
    /// every intermediate is removed and `path` is left as it was.
    pub async fn compress_under(&self, path: &Path, budget: u64) -> Result<CompressionOutcome> {
        let original_size = tokio::fs::metadata(path).await?.len();
        let mut created = Vec::new();

        let result = self
            .shrink(path, budget, original_size, &mut created)
            .await;

        match result {
            Ok(mut outcome) => {
                if let Some(last) = created.pop() {
                    tokio::fs::rename(&last, path).await?;
                }
                remove_all(&created).await;
                info!(
                    ?path,
                    iterations = outcome.iterations,
                    original_size,
                    final_size = outcome.final_size,
                    "asset compressed under budget"
                );
                outcome.path = path.to_path_buf();
                Ok(outcome)
            }
            Err(e) => {
                remove_all(&created).await;
                Err(e)
            }
        }
    }

    async fn shrink(
        &self,
        path: &Path,
        budget: u64,
        original_size: u64,
        created: &mut Vec<PathBuf>,
    ) -> Result<CompressionOutcome> {
        let mut current = path.to_path_buf();
        let mut size = original_size;
        let mut iterations = 0u32;
        let mut final_width = None;

        while size >= budget {
            if iterations >= self.config.max_iterations {
                return Err(self.exceeded(path, size, budget, iterations));
            }

            let dimensions = self.tool.probe(&current).await?;
            let target = self.next_width(dimensions.width);
            if target >= dimensions.width {
                debug!(?path, width = dimensions.width, "asset cannot shrink further");
                return Err(self.exceeded(path, size, budget, iterations));
            }

            iterations += 1;
            let next = intermediate_path(path, iterations);
            created.push(next.clone());
            self.tool.rescale(&current, target, &next).await?;

            let len = match tokio::fs::metadata(&next).await {
                Ok(meta) => meta.len(),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
                Err(e) => return Err(e.into()),
            };
            if len == 0 {
                return Err(Error::EmptyOutput(next));
            }

            // Keep only the newest intermediate; the input is never deleted
            if current != path {
                if let Err(e) = tokio::fs::remove_file(&current).await {
                    warn!(path = ?current, error = %e, "failed to remove intermediate");
                }
                created.retain(|p| p != &current);
            }

            debug!(
                ?path,
                pass = iterations,
                width = target,
                size = len,
                budget,
                "re-encode pass finished"
            );
            current = next;
            size = len;
            final_width = Some(target);
        }

        Ok(CompressionOutcome {
            path: current,
            iterations,
            original_size,
            final_size: size,
            final_width,
        })
    }

    fn next_width(&self, width: u32) -> u32 {
        let scaled = (f64::from(width) * self.config.scale_factor).floor() as u32;
        scaled.max(self.config.min_width)
    }

    fn exceeded(&self, path: &Path, size: u64, budget: u64, iterations: u32) -> Error {
        Error::SizeBudgetExceeded {
            path: path.to_path_buf(),
            size,
            budget,
            iterations,
        }
    }
}

/// `<dir>/<stem>.pass<N>.<ext>`
fn intermediate_path(path: &Path, pass: u32) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}.pass{}.{}", stem, pass, ext.to_string_lossy()),
        None => format!("{}.pass{}", stem, pass),
    };
    path.with_file_name(name)
}

async fn remove_all(paths: &[PathBuf]) {
    for path in paths {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(?path, error = %e, "failed to remove intermediate"),
        }
    }
}
