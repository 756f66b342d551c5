//! Local synchronous backend.
//!
//! Drives an embedded media engine one segment at a time, in plan order.
//! The engine instance is single-user and stateful, so segments are never
//! transcoded concurrently.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{info, warn};

use vchop_media::{MediaEngine, MediaError};
use vchop_models::{Artifact, Job, VideoSource};

use crate::backend::{BackendEvent, BackendOutcome, EventSender, ExecutionBackend};
use crate::error::{SplitError, SplitResult};
use crate::progress::ProgressUpdate;

/// Runs splits against an in-process [`MediaEngine`].
pub struct LocalSyncBackend {
    engine: Arc<dyn MediaEngine>,
    watermark_text: String,
}

impl LocalSyncBackend {
    pub fn new(engine: Arc<dyn MediaEngine>, watermark_text: impl Into<String>) -> Self {
        Self {
            engine,
            watermark_text: watermark_text.into(),
        }
    }
}

#[async_trait]
impl ExecutionBackend for LocalSyncBackend {
    async fn probe(&self, source: &VideoSource) -> SplitResult<Option<f64>> {
        match self.engine.probe_duration(&source.path).await {
            Ok(duration) => Ok(duration),
            Err(e) => {
                // An unreadable duration surfaces at submit time, not here.
                warn!(file = %source.file_name, error = %e, "Duration probe failed");
                Ok(None)
            }
        }
    }

    fn requires_known_duration(&self) -> bool {
        true
    }

    async fn execute(
        &self,
        job: Job,
        events: EventSender,
        cancel: watch::Receiver<bool>,
    ) -> SplitResult<BackendOutcome> {
        let plan = job.plan.as_ref().ok_or(SplitError::DurationUnavailable)?;
        let total = plan.segments.len();

        let _ = events.send(BackendEvent::Acknowledged);
        info!(job_id = %job.id, segments = total, "Starting local split");

        let mut artifacts = Vec::with_capacity(total);
        for spec in &plan.segments {
            if *cancel.borrow() {
                return Err(SplitError::Cancelled);
            }

            let bytes = self
                .engine
                .extract_segment(&job.source.path, spec, &self.watermark_text)
                .await
                .map_err(|e| match e {
                    MediaError::Cancelled => SplitError::Cancelled,
                    other => SplitError::EngineInvocationFailed {
                        segment: spec.index,
                        message: other.to_string(),
                    },
                })?;

            let artifact = Artifact::in_memory(spec.index, spec.output_name.clone(), bytes);
            let _ = events.send(BackendEvent::SegmentDone(artifact.clone()));
            artifacts.push(artifact);

            let completed = artifacts.len();
            let percent = ((completed as f64 / total as f64) * 100.0).round() as u8;
            let _ = events.send(BackendEvent::Progress(ProgressUpdate::new(
                percent,
                format!("Processing segment {completed} of {total}..."),
            )));
        }

        info!(job_id = %job.id, segments = total, "Local split complete");
        Ok(BackendOutcome {
            artifacts,
            bundle_locator: None,
        })
    }
}
