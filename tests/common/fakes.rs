//! Stand-ins for the provider and the external media tools

use artfetch::extraction::FrameSequence;
use artfetch::media::{Dimensions, FrameEncoder, MediaTool};
use artfetch::{ArtworkId, ArtworkMetadata, MetadataProvider, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Delegating provider that counts lookups
pub struct CountingProvider {
    inner: Arc<dyn MetadataProvider>,
    lookups: AtomicUsize,
}

impl CountingProvider {
    pub fn new(inner: Arc<dyn MetadataProvider>) -> Self {
        Self {
            inner,
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataProvider for CountingProvider {
    async fn lookup(&self, id: &ArtworkId) -> Result<ArtworkMetadata> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.lookup(id).await
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

/// Encoder that concatenates the frames in sequence order
#[derive(Default)]
pub struct ConcatEncoder {
    pub calls: AtomicUsize,
}

#[async_trait]
impl FrameEncoder for ConcatEncoder {
    async fn encode(&self, frames: &FrameSequence, _frame_rate: u32, output: &Path) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut joined = Vec::new();
        for i in 0..frames.count {
            let frame = frames
                .dir
                .join(format!("frame_{:06}.{}", i, frames.extension));
            joined.extend(tokio::fs::read(frame).await?);
        }
        tokio::fs::write(output, joined).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "concat"
    }
}

/// Media tool whose re-encode keeps `ratio` of the input size
pub struct ScalingTool {
    pub width: u32,
    pub ratio: f64,
    pub passes: AtomicUsize,
}

impl ScalingTool {
    pub fn new(width: u32, ratio: f64) -> Self {
        Self {
            width,
            ratio,
            passes: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl MediaTool for ScalingTool {
    async fn probe(&self, _path: &Path) -> Result<Dimensions> {
        // Width shrinks with every pass so the minimum-width check never trips first
        let passes = self.passes.load(Ordering::SeqCst) as i32;
        let width = (f64::from(self.width) * 0.8f64.powi(passes)).max(16.0) as u32;
        Ok(Dimensions { width, height: width })
    }

    async fn rescale(&self, input: &Path, _width: u32, output: &Path) -> Result<()> {
        self.passes.fetch_add(1, Ordering::SeqCst);
        let data = tokio::fs::read(input).await?;
        let keep = (data.len() as f64 * self.ratio) as usize;
        tokio::fs::write(output, &data[..keep]).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "scaling"
    }
}
