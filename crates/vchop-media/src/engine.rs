//! The embedded transcoding capability.
//!
//! `MediaEngine` is the black-box contract the local execution path drives:
//! probe a duration, cut a time range with a watermark burned in. The
//! FFmpeg implementation is the production engine; tests substitute
//! scripted fakes.
//!
//! The engine is single-user and stateful (one child process and one temp
//! working set at a time); callers must invoke it strictly sequentially.

use std::path::Path;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, info};

use vchop_models::{EncodingConfig, SegmentSpec};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe;
use crate::watermark::WatermarkConfig;

/// Black-box transcoding capability.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Probe the media duration in seconds. `Ok(None)` means the engine
    /// cannot determine a duration for this input.
    async fn probe_duration(&self, source: &Path) -> MediaResult<Option<f64>>;

    /// Cut one time range out of the source, overlay the watermark text at
    /// the fixed bottom-right anchor, and return the produced bytes.
    async fn extract_segment(
        &self,
        source: &Path,
        spec: &SegmentSpec,
        watermark_text: &str,
    ) -> MediaResult<Vec<u8>>;
}

/// FFmpeg-backed engine.
pub struct FfmpegEngine {
    encoding: EncodingConfig,
    cancel_rx: Option<watch::Receiver<bool>>,
    timeout_secs: Option<u64>,
}

impl FfmpegEngine {
    /// Create an engine with the given encoding settings.
    pub fn new(encoding: EncodingConfig) -> Self {
        Self {
            encoding,
            cancel_rx: None,
            timeout_secs: None,
        }
    }

    /// Set a cancellation signal propagated to every invocation.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    /// Set a per-invocation timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    fn runner(&self) -> FfmpegRunner {
        let mut runner = FfmpegRunner::new();
        if let Some(rx) = &self.cancel_rx {
            runner = runner.with_cancel(rx.clone());
        }
        if let Some(secs) = self.timeout_secs {
            runner = runner.with_timeout(secs);
        }
        runner
    }
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self::new(EncodingConfig::default())
    }
}

#[async_trait]
impl MediaEngine for FfmpegEngine {
    async fn probe_duration(&self, source: &Path) -> MediaResult<Option<f64>> {
        probe::probe_duration(source).await
    }

    async fn extract_segment(
        &self,
        source: &Path,
        spec: &SegmentSpec,
        watermark_text: &str,
    ) -> MediaResult<Vec<u8>> {
        if !source.exists() {
            return Err(MediaError::FileNotFound(source.to_path_buf()));
        }

        // Scratch space is dropped before returning, so the engine holds no
        // temporary data once the segment bytes are captured.
        let temp_dir = tempfile::tempdir()?;
        let output = temp_dir.path().join(&spec.output_name);

        let watermark = WatermarkConfig::default().with_text(watermark_text);

        info!(
            segment = spec.index,
            start = spec.start_secs,
            duration = spec.duration_secs,
            "Extracting watermarked segment"
        );

        let cmd = FfmpegCommand::new(source, &output)
            .seek(spec.start_secs)
            .duration(spec.duration_secs)
            .video_filter(watermark.to_drawtext_filter())
            .output_args(self.encoding.to_ffmpeg_args());

        self.runner().run(&cmd).await?;

        let bytes = tokio::fs::read(&output).await?;
        debug!(
            segment = spec.index,
            size = bytes.len(),
            "Segment captured into memory"
        );

        Ok(bytes)
    }
}
