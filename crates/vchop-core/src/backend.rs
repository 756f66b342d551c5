//! Execution backends.
//!
//! A backend takes a submitted job and runs it to completion, streaming
//! lifecycle events back to the controller. Two variants exist: the
//! remote service client ([`remote::RemoteAsyncBackend`]) and the
//! embedded engine driver ([`local::LocalSyncBackend`]).

pub mod local;
pub mod remote;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use vchop_models::{Artifact, Job, VideoSource};

use crate::error::SplitResult;
use crate::progress::ProgressUpdate;

/// Events a backend emits while a job runs.
#[derive(Debug, Clone)]
pub enum BackendEvent {
    /// Upload transfer percent, emitted before acknowledgement
    UploadProgress(u8),
    /// Backend accepted the job; processing begins at zero percent
    Acknowledged,
    /// Processing progress for the active phase
    Progress(ProgressUpdate),
    /// One segment finished. Emitted as segments land so partial output
    /// survives a mid-job failure.
    SegmentDone(Artifact),
}

pub type EventSender = mpsc::UnboundedSender<BackendEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<BackendEvent>;

/// Final result of a successful run.
#[derive(Debug, Clone)]
pub struct BackendOutcome {
    /// The complete artifact set, in segment order
    pub artifacts: Vec<Artifact>,
    /// Locator for a bundled archive of all segments, when available
    pub bundle_locator: Option<String>,
}

/// A strategy for turning one source into N watermarked segments.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Probe the source duration up front, if this backend can.
    async fn probe(&self, source: &VideoSource) -> SplitResult<Option<f64>>;

    /// Whether submission requires the duration to already be known.
    fn requires_known_duration(&self) -> bool {
        false
    }

    /// Run the job to completion. Emits events through `events`; watches
    /// `cancel` for best-effort cancellation.
    async fn execute(
        &self,
        job: Job,
        events: EventSender,
        cancel: watch::Receiver<bool>,
    ) -> SplitResult<BackendOutcome>;
}

/// Resolves once the cancel flag is raised; never resolves if the
/// sender side is gone.
pub(crate) async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow() {
            return;
        }
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
