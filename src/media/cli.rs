//! ffmpeg/ffprobe-backed media tools

use super::traits::{Dimensions, FrameEncoder, MediaTool};
use crate::error::{Error, Result};
use crate::extraction::FrameSequence;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;
use tracing::debug;

/// Longest stderr excerpt carried into an error message
const STDERR_EXCERPT: usize = 512;

/// Frame encoder using an external `ffmpeg` binary
///
/// # Examples
///
/// ```no_run
/// use artfetch::media::{FfmpegEncoder, FrameEncoder};
/// use std::path::PathBuf;
///
/// // Create with explicit path
/// let encoder = FfmpegEncoder::new(PathBuf::from("/usr/bin/ffmpeg"));
///
/// // Or auto-discover from PATH
/// let encoder = FfmpegEncoder::from_path().expect("ffmpeg not found in PATH");
/// assert_eq!(encoder.name(), "ffmpeg");
/// ```
#[derive(Clone, Debug)]
pub struct FfmpegEncoder {
    binary_path: PathBuf,
}

impl FfmpegEncoder {
    /// Create a new encoder with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Attempt to find ffmpeg in PATH
    pub fn from_path() -> Option<Self> {
        which::which("ffmpeg").ok().map(Self::new)
    }

    /// Path of the binary this encoder runs
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }
}

#[async_trait]
impl FrameEncoder for FfmpegEncoder {
    async fn encode(&self, frames: &FrameSequence, frame_rate: u32, output: &Path) -> Result<()> {
        let mut command = Command::new(&self.binary_path);
        command
            .args(["-hide_banner", "-loglevel", "error", "-y"])
            .arg("-framerate")
            .arg(frame_rate.to_string())
            .arg("-i")
            .arg(frames.pattern())
            .arg(output);

        debug!(
            frames = frames.count,
            frame_rate,
            ?output,
            "encoding frame sequence"
        );
        run_tool("ffmpeg", &mut command).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}

/// Probe/re-encode tool using external `ffprobe` and `ffmpeg` binaries
#[derive(Clone, Debug)]
pub struct FfmpegMediaTool {
    ffmpeg_path: PathBuf,
    ffprobe_path: PathBuf,
}

impl FfmpegMediaTool {
    /// Create a tool with explicit binary paths
    pub fn new(ffmpeg_path: PathBuf, ffprobe_path: PathBuf) -> Self {
        Self {
            ffmpeg_path,
            ffprobe_path,
        }
    }

    /// Attempt to find both ffmpeg and ffprobe in PATH
    pub fn from_path() -> Option<Self> {
        let ffmpeg = which::which("ffmpeg").ok()?;
        let ffprobe = which::which("ffprobe").ok()?;
        Some(Self::new(ffmpeg, ffprobe))
    }
}

#[async_trait]
impl MediaTool for FfmpegMediaTool {
    async fn probe(&self, path: &Path) -> Result<Dimensions> {
        let mut command = Command::new(&self.ffprobe_path);
        command
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height",
                "-of",
                "csv=p=0:s=x",
            ])
            .arg(path);

        let output = run_tool("ffprobe", &mut command).await?;
        parse_dimensions(&output.stdout)
    }

    async fn rescale(&self, input: &Path, width: u32, output: &Path) -> Result<()> {
        let mut command = Command::new(&self.ffmpeg_path);
        command
            .args(["-hide_banner", "-loglevel", "error", "-y", "-i"])
            .arg(input)
            .arg("-vf")
            .arg(format!("scale={}:-1", width))
            .arg(output);

        debug!(?input, width, ?output, "re-encoding at reduced width");
        run_tool("ffmpeg", &mut command).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}

/// Run an external tool to completion and fail on a non-zero exit
///
/// The child is killed if the returned future is dropped.
pub(crate) async fn run_tool(tool: &str, command: &mut Command) -> Result<Output> {
    command.kill_on_drop(true);
    let output = command
        .output()
        .await
        .map_err(|e| Error::ExternalTool(format!("Failed to execute {}: {}", tool, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        let excerpt: String = stderr.chars().take(STDERR_EXCERPT).collect();
        let code = output
            .status
            .code()
            .map_or_else(|| "signal".to_string(), |c| c.to_string());
        return Err(Error::ExternalTool(format!(
            "{} exited with status {}: {}",
            tool, code, excerpt
        )));
    }

    Ok(output)
}

/// Parse `<width>x<height>` as printed by ffprobe's csv writer
pub(crate) fn parse_dimensions(stdout: &[u8]) -> Result<Dimensions> {
    let text = String::from_utf8_lossy(stdout);
    let line = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| Error::ExternalTool("ffprobe printed no dimensions".into()))?;

    let parse = |s: &str| -> Option<u32> { s.trim().parse().ok().filter(|v| *v > 0) };
    let (w, h) = line
        .split_once('x')
        .ok_or_else(|| Error::ExternalTool(format!("unexpected ffprobe output {:?}", line)))?;
    match (parse(w), parse(h)) {
        (Some(width), Some(height)) => Ok(Dimensions { width, height }),
        _ => Err(Error::ExternalTool(format!(
            "unexpected ffprobe output {:?}",
            line
        ))),
    }
}
