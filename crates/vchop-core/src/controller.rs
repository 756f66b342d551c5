//! The job controller.
//!
//! Owns the lifecycle state machine and is the single object the outer
//! UI layer talks to. It composes a backend, the artifact registry, and
//! the progress reporter; exactly one job is active at a time, and a new
//! submission replaces the prior one.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use vchop_media::MediaEngine;
use vchop_models::{
    FailureKind, FailureReason, Job, JobId, JobState, SegmentPlan, SplitRequest, VideoSource,
    MAX_SOURCE_DURATION_SECS,
};

use crate::artifact_store::{ArtifactFetcher, ArtifactStore};
use crate::backend::local::LocalSyncBackend;
use crate::backend::{BackendEvent, BackendOutcome, EventReceiver, ExecutionBackend};
use crate::config::ControllerConfig;
use crate::error::{SplitError, SplitResult};
use crate::progress::{ProgressReporter, ProgressUpdate};

/// An in-flight backend run.
struct ActiveRun {
    events: EventReceiver,
    handle: JoinHandle<SplitResult<BackendOutcome>>,
    cancel: watch::Sender<bool>,
}

impl Drop for ActiveRun {
    fn drop(&mut self) {
        // The driver future may be abandoned mid-flight; the detached
        // backend task must still observe cancellation, so the flag is
        // raised on every teardown path. Harmless after normal
        // completion, when the receiver side is already gone.
        let _ = self.cancel.send(true);
    }
}

/// Drives one video-splitting job at a time through the lifecycle
/// `Idle -> SourceSelected -> Validated -> Submitted -> Processing ->
/// Completed | Failed`, with an explicit reset back to `Idle` from any
/// state.
pub struct JobController {
    backend: Arc<dyn ExecutionBackend>,
    config: ControllerConfig,
    store: ArtifactStore,
    reporter: ProgressReporter,
    state: JobState,
    source: Option<VideoSource>,
    job: Option<Job>,
    run: Option<ActiveRun>,
    progress_tx: Option<mpsc::UnboundedSender<ProgressUpdate>>,
}

impl JobController {
    pub fn new(backend: Arc<dyn ExecutionBackend>, config: ControllerConfig) -> Self {
        Self {
            backend,
            config,
            store: ArtifactStore::new(),
            reporter: ProgressReporter::new(),
            state: JobState::Idle,
            source: None,
            job: None,
            run: None,
            progress_tx: None,
        }
    }

    /// Build a controller driving an embedded engine. The watermark text
    /// burned into every segment comes from the config.
    pub fn with_local_engine(engine: Arc<dyn MediaEngine>, config: ControllerConfig) -> Self {
        let backend = LocalSyncBackend::new(engine, config.watermark_text.clone());
        Self::new(Arc::new(backend), config)
    }

    /// Attach the fetcher used to resolve remote artifact handles.
    pub fn with_artifact_fetcher(mut self, fetcher: Arc<dyn ArtifactFetcher>) -> Self {
        self.store = ArtifactStore::new().with_fetcher(fetcher);
        self
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn job(&self) -> Option<&Job> {
        self.job.as_ref()
    }

    pub fn source(&self) -> Option<&VideoSource> {
        self.source.as_ref()
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Receive every clamped progress update as it is applied to the job.
    pub fn subscribe_progress(&mut self) -> mpsc::UnboundedReceiver<ProgressUpdate> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.progress_tx = Some(tx);
        rx
    }

    /// Accept a source description. Fails with [`SplitError::SourceTooLarge`]
    /// when the byte size exceeds the configured policy; the state is left
    /// untouched on rejection.
    ///
    /// Re-selection from `SourceSelected` or `Validated` is an intentional
    /// convenience that replaces the pending source (picking a different
    /// file before submitting). Once a job is in flight or terminal, an
    /// explicit reset is required first.
    pub fn select_source(&mut self, source: VideoSource) -> SplitResult<()> {
        match self.state {
            JobState::Idle | JobState::SourceSelected | JobState::Validated => {}
            state => {
                return Err(SplitError::InvalidState {
                    operation: "select_source",
                    state,
                })
            }
        }

        let limit = self.config.source_policy.max_source_bytes;
        if source.size_bytes > limit {
            return Err(SplitError::SourceTooLarge {
                size_bytes: source.size_bytes,
                limit_bytes: limit,
            });
        }

        info!(file = %source.file_name, size = source.size_bytes, "Source selected");
        self.source = Some(source);
        self.state = JobState::SourceSelected;
        Ok(())
    }

    /// Accept a source file from disk, reading its size.
    pub async fn select_file(&mut self, path: impl AsRef<std::path::Path>) -> SplitResult<()> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| SplitError::UploadFailed(format!("cannot read {}: {e}", path.display())))?;
        self.select_source(VideoSource::new(path, metadata.len()))
    }

    /// Probe the source duration through the backend and move to
    /// `Validated`. A probe that yields no duration still validates; the
    /// remote pipeline defers planning to the service.
    pub async fn probe_source(&mut self) -> SplitResult<Option<f64>> {
        if self.state != JobState::SourceSelected {
            return Err(SplitError::InvalidState {
                operation: "probe_source",
                state: self.state,
            });
        }
        let source = self.source.as_ref().ok_or(SplitError::NoActiveJob)?;

        let duration = self.backend.probe(source).await?;
        if let Some(d) = duration {
            if d > MAX_SOURCE_DURATION_SECS {
                return Err(SplitError::DurationTooLong {
                    duration_secs: d,
                    limit_secs: MAX_SOURCE_DURATION_SECS as u64,
                });
            }
            if let Some(source) = self.source.as_mut() {
                source.duration = Some(d);
            }
        }

        self.state = JobState::Validated;
        Ok(duration)
    }

    /// Submit a split for the validated source. Rejected parameters leave
    /// the state untouched; on acceptance the backend run is spawned and
    /// the job enters `Submitted`.
    pub fn submit(&mut self, segment_count: u32) -> SplitResult<JobId> {
        if self.state != JobState::Validated {
            return Err(SplitError::InvalidState {
                operation: "submit",
                state: self.state,
            });
        }
        let source = self.source.clone().ok_or(SplitError::NoActiveJob)?;
        let request = SplitRequest::new(segment_count)?;

        let plan = match source.duration {
            Some(duration) => Some(
                SegmentPlan::compute(duration, &request)
                    .map_err(|_| SplitError::DurationUnavailable)?,
            ),
            None if self.backend.requires_known_duration() => {
                return Err(SplitError::DurationUnavailable)
            }
            None => None,
        };

        // Replace whatever the previous job left behind.
        self.store.release_all();
        self.reporter.reset();

        let job = Job::new(source, request, plan);
        let job_id = job.id.clone();
        info!(job_id = %job_id, segments = segment_count, "Job submitted");

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let backend = Arc::clone(&self.backend);
        let run_job = job.clone();
        let handle = tokio::spawn(async move { backend.execute(run_job, event_tx, cancel_rx).await });

        self.job = Some(job);
        self.run = Some(ActiveRun {
            events: event_rx,
            handle,
            cancel: cancel_tx,
        });
        self.state = JobState::Submitted;
        Ok(job_id)
    }

    /// Drive the active run to a terminal state, applying backend events
    /// as they arrive. Returns the terminal state reached.
    pub async fn run_to_completion(&mut self) -> SplitResult<JobState> {
        let mut run = self.run.take().ok_or(SplitError::NoActiveJob)?;

        let result = loop {
            tokio::select! {
                biased;
                Some(event) = run.events.recv() => self.apply_event(event),
                result = &mut run.handle => break result,
            }
        };
        // Events queued before the task finished are already drained: the
        // biased arm empties the channel before the join resolves.
        while let Ok(event) = run.events.try_recv() {
            self.apply_event(event);
        }

        match result {
            Ok(Ok(outcome)) => self.finish(outcome),
            Ok(Err(SplitError::Cancelled)) => Err(SplitError::Cancelled),
            Ok(Err(e)) => {
                let reason = e.failure_reason().unwrap_or_else(|| {
                    FailureReason::new(FailureKind::BackendReportedFailure, e.to_string())
                });
                self.fail(reason);
                Ok(JobState::Failed)
            }
            Err(join_error) => {
                self.fail(FailureReason::new(
                    FailureKind::BackendReportedFailure,
                    format!("backend task aborted: {join_error}"),
                ));
                Ok(JobState::Failed)
            }
        }
    }

    /// Discard everything and return to `Idle`. Safe in any state; a reset
    /// during processing also requests cancellation of the in-flight run.
    pub fn reset(&mut self) {
        if let Some(run) = self.run.take() {
            // Best-effort: the detached task observes the flag and winds
            // itself down.
            let _ = run.cancel.send(true);
            warn!("Reset with a run in flight; cancellation requested");
        }
        self.store.release_all();
        self.reporter.reset();
        self.job = None;
        self.source = None;
        self.state = JobState::Idle;
    }

    /// Bytes of one completed segment.
    pub async fn download_segment(&self, segment_index: u32) -> SplitResult<Vec<u8>> {
        self.store.get(segment_index).await
    }

    /// Bundled archive of all segments. Only offered once the job
    /// completed; partial output is never bundled.
    pub async fn download_all(&self) -> SplitResult<Vec<u8>> {
        if self.state != JobState::Completed {
            return Err(SplitError::InvalidState {
                operation: "download_all",
                state: self.state,
            });
        }
        self.store.get_bundle().await
    }

    fn apply_event(&mut self, event: BackendEvent) {
        match event {
            BackendEvent::UploadProgress(percent) => {
                let update = self
                    .reporter
                    .observe(ProgressUpdate::new(percent, "Uploading video..."));
                if let Some(job) = self.job.as_mut() {
                    job.set_progress(update.percent, update.phase.clone());
                }
                self.emit_progress(update);
            }
            BackendEvent::Acknowledged => {
                if let Some(job) = self.job.as_mut() {
                    job.start();
                }
                self.state = JobState::Processing;
                // A new progress domain starts at zero.
                self.reporter.reset();
            }
            BackendEvent::Progress(raw) => {
                let update = self.reporter.observe(raw);
                if let Some(job) = self.job.as_mut() {
                    job.set_progress(update.percent, update.phase.clone());
                }
                self.emit_progress(update);
            }
            BackendEvent::SegmentDone(artifact) => {
                self.store.register(artifact);
            }
        }
    }

    fn emit_progress(&mut self, update: ProgressUpdate) {
        if let Some(tx) = &self.progress_tx {
            if tx.send(update).is_err() {
                self.progress_tx = None;
            }
        }
    }

    /// Attach artifacts and complete. Atomic: a short artifact set fails
    /// the job instead of completing it.
    fn finish(&mut self, outcome: BackendOutcome) -> SplitResult<JobState> {
        let expected = self
            .job
            .as_ref()
            .map(|job| job.request.segment_count() as usize)
            .unwrap_or(0);

        if outcome.artifacts.len() != expected {
            self.fail(FailureReason::new(
                FailureKind::BackendReportedFailure,
                format!(
                    "backend produced {} of {} segments",
                    outcome.artifacts.len(),
                    expected
                ),
            ));
            return Ok(JobState::Failed);
        }

        for artifact in &outcome.artifacts {
            self.store.register(artifact.clone());
        }
        if let Some(locator) = outcome.bundle_locator {
            self.store.set_bundle_locator(locator);
        }
        if let Some(job) = self.job.as_mut() {
            job.complete(outcome.artifacts);
            info!(job_id = %job.id, segments = expected, "Job completed");
        }
        self.state = JobState::Completed;
        Ok(JobState::Completed)
    }

    fn fail(&mut self, reason: FailureReason) {
        warn!(kind = ?reason.kind, message = %reason.message, "Job failed");
        if let Some(job) = self.job.as_mut() {
            job.fail(reason);
        }
        self.state = JobState::Failed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use vchop_media::{MediaError, MediaResult};
    use vchop_models::{Artifact, SegmentSpec};

    use crate::backend::EventSender;
    use crate::config::SourcePolicy;

    struct ScriptedEngine {
        duration: f64,
        fail_after: Option<u32>,
        segment_delay: Option<Duration>,
        calls: AtomicU32,
        watermarks: Mutex<Vec<String>>,
    }

    impl ScriptedEngine {
        fn ok(duration: f64) -> Self {
            Self {
                duration,
                fail_after: None,
                segment_delay: None,
                calls: AtomicU32::new(0),
                watermarks: Mutex::new(Vec::new()),
            }
        }

        fn failing_after(duration: f64, segments: u32) -> Self {
            Self {
                fail_after: Some(segments),
                ..Self::ok(duration)
            }
        }

        fn with_segment_delay(mut self, delay: Duration) -> Self {
            self.segment_delay = Some(delay);
            self
        }
    }

    #[async_trait]
    impl MediaEngine for ScriptedEngine {
        async fn probe_duration(&self, _source: &Path) -> MediaResult<Option<f64>> {
            Ok(Some(self.duration))
        }

        async fn extract_segment(
            &self,
            _source: &Path,
            spec: &SegmentSpec,
            watermark_text: &str,
        ) -> MediaResult<Vec<u8>> {
            let done = self.calls.fetch_add(1, Ordering::SeqCst);
            self.watermarks
                .lock()
                .unwrap()
                .push(watermark_text.to_string());
            if let Some(delay) = self.segment_delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(limit) = self.fail_after {
                if done >= limit {
                    return Err(MediaError::ffmpeg_failed("boom", None, Some(1)));
                }
            }
            Ok(vec![spec.index as u8; 8])
        }
    }

    fn local_controller(engine: ScriptedEngine) -> JobController {
        let backend = LocalSyncBackend::new(Arc::new(engine), "mark");
        JobController::new(
            Arc::new(backend),
            ControllerConfig::default().with_source_policy(SourcePolicy::local_default()),
        )
    }

    #[tokio::test]
    async fn test_end_to_end_local_split() {
        let mut controller = local_controller(ScriptedEngine::ok(120.0));
        let mut progress = controller.subscribe_progress();

        controller
            .select_source(VideoSource::new("/tmp/in.mp4", 1024))
            .unwrap();
        assert_eq!(controller.state(), JobState::SourceSelected);

        let duration = controller.probe_source().await.unwrap();
        assert_eq!(duration, Some(120.0));
        assert_eq!(controller.state(), JobState::Validated);

        controller.submit(4).unwrap();
        assert_eq!(controller.state(), JobState::Submitted);

        let terminal = controller.run_to_completion().await.unwrap();
        assert_eq!(terminal, JobState::Completed);

        let mut percents = Vec::new();
        while let Ok(update) = progress.try_recv() {
            percents.push(update.percent);
        }
        assert_eq!(percents, vec![25, 50, 75, 100]);

        let job = controller.job().unwrap();
        assert_eq!(job.state, JobState::Completed);
        assert_eq!(job.artifacts.len(), 4);
        let names: Vec<&str> = job.artifacts.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "segment_01.mp4",
                "segment_02.mp4",
                "segment_03.mp4",
                "segment_04.mp4"
            ]
        );

        let bytes = controller.download_segment(2).await.unwrap();
        assert_eq!(bytes, vec![2u8; 8]);
    }

    #[tokio::test]
    async fn test_oversized_source_leaves_state_untouched() {
        let mut controller = local_controller(ScriptedEngine::ok(60.0));
        let limit = SourcePolicy::local_default().max_source_bytes;

        let err = controller
            .select_source(VideoSource::new("/tmp/huge.mp4", limit + 1))
            .unwrap_err();
        assert!(matches!(err, SplitError::SourceTooLarge { .. }));
        assert_eq!(controller.state(), JobState::Idle);
        assert!(controller.source().is_none());
    }

    #[tokio::test]
    async fn test_invalid_segment_count_is_rejected_without_transition() {
        let mut controller = local_controller(ScriptedEngine::ok(60.0));
        controller
            .select_source(VideoSource::new("/tmp/in.mp4", 1024))
            .unwrap();
        controller.probe_source().await.unwrap();

        for bad in [0u32, 13] {
            let err = controller.submit(bad).unwrap_err();
            assert!(matches!(err, SplitError::InvalidSegmentCount(_)));
            assert_eq!(controller.state(), JobState::Validated);
            assert!(controller.job().is_none());
        }
    }

    #[tokio::test]
    async fn test_partial_failure_retains_artifacts_without_completing() {
        let mut controller = local_controller(ScriptedEngine::failing_after(100.0, 2));
        controller
            .select_source(VideoSource::new("/tmp/in.mp4", 1024))
            .unwrap();
        controller.probe_source().await.unwrap();
        controller.submit(5).unwrap();

        let terminal = controller.run_to_completion().await.unwrap();
        assert_eq!(terminal, JobState::Failed);

        // The two finished segments stay retrievable; the job is not
        // completed and no bundle is offered.
        assert_eq!(controller.store().len(), 2);
        let job = controller.job().unwrap();
        assert_eq!(job.state, JobState::Failed);
        assert!(job.artifacts.is_empty());
        assert_eq!(
            job.failure_reason.as_ref().unwrap().kind,
            FailureKind::EngineInvocationFailed
        );
        assert!(matches!(
            controller.download_all().await,
            Err(SplitError::InvalidState { .. })
        ));
    }

    #[tokio::test]
    async fn test_reset_releases_everything() {
        let mut controller = local_controller(ScriptedEngine::ok(120.0));
        controller
            .select_source(VideoSource::new("/tmp/in.mp4", 1024))
            .unwrap();
        controller.probe_source().await.unwrap();
        controller.submit(2).unwrap();
        controller.run_to_completion().await.unwrap();
        assert_eq!(controller.store().len(), 2);

        controller.reset();
        assert_eq!(controller.state(), JobState::Idle);
        assert!(controller.job().is_none());
        assert!(controller.store().is_empty());

        // Idempotent from Idle as well.
        controller.reset();
        assert_eq!(controller.state(), JobState::Idle);
    }

    #[tokio::test]
    async fn test_abandoned_driver_still_cancels_backend() {
        let engine = Arc::new(
            ScriptedEngine::ok(120.0).with_segment_delay(Duration::from_millis(100)),
        );
        let backend = LocalSyncBackend::new(Arc::clone(&engine) as Arc<dyn MediaEngine>, "mark");
        let mut controller = JobController::new(
            Arc::new(backend),
            ControllerConfig::default().with_source_policy(SourcePolicy::local_default()),
        );
        controller
            .select_source(VideoSource::new("/tmp/in.mp4", 1024))
            .unwrap();
        controller.probe_source().await.unwrap();
        controller.submit(4).unwrap();

        // Abandon the driver mid-processing; dropping it must raise the
        // cancel flag for the detached backend task.
        let driven =
            tokio::time::timeout(Duration::from_millis(150), controller.run_to_completion()).await;
        assert!(driven.is_err());

        controller.reset();
        assert_eq!(controller.state(), JobState::Idle);

        // Without cancellation all four segments would finish well within
        // this window.
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(engine.calls.load(Ordering::SeqCst) < 4);
    }

    #[tokio::test]
    async fn test_configured_watermark_reaches_engine() {
        let engine = Arc::new(ScriptedEngine::ok(60.0));
        let config = ControllerConfig::default()
            .with_source_policy(SourcePolicy::local_default())
            .with_watermark_text("Sample Mark");
        let mut controller =
            JobController::with_local_engine(Arc::clone(&engine) as Arc<dyn MediaEngine>, config);

        controller
            .select_source(VideoSource::new("/tmp/in.mp4", 1024))
            .unwrap();
        controller.probe_source().await.unwrap();
        controller.submit(2).unwrap();
        controller.run_to_completion().await.unwrap();

        let marks = engine.watermarks.lock().unwrap();
        assert_eq!(marks.as_slice(), ["Sample Mark", "Sample Mark"]);
    }

    #[tokio::test]
    async fn test_submit_requires_validation() {
        let mut controller = local_controller(ScriptedEngine::ok(60.0));
        let err = controller.submit(4).unwrap_err();
        assert!(matches!(err, SplitError::InvalidState { .. }));

        controller
            .select_source(VideoSource::new("/tmp/in.mp4", 1024))
            .unwrap();
        let err = controller.submit(4).unwrap_err();
        assert!(matches!(err, SplitError::InvalidState { .. }));
    }

    /// Backend that replays a fixed progress script, including regressed
    /// values, then completes.
    struct ReplayBackend {
        script: Vec<u8>,
    }

    #[async_trait]
    impl ExecutionBackend for ReplayBackend {
        async fn probe(&self, _source: &VideoSource) -> SplitResult<Option<f64>> {
            Ok(Some(60.0))
        }

        async fn execute(
            &self,
            job: Job,
            events: EventSender,
            _cancel: watch::Receiver<bool>,
        ) -> SplitResult<BackendOutcome> {
            let _ = events.send(BackendEvent::Acknowledged);
            for percent in &self.script {
                let _ = events.send(BackendEvent::Progress(ProgressUpdate::new(
                    *percent,
                    format!("{percent}%"),
                )));
            }
            let artifacts = (1..=job.request.segment_count())
                .map(|i| Artifact::in_memory(i, vchop_models::segment_name(i), vec![0u8; 4]))
                .collect();
            Ok(BackendOutcome {
                artifacts,
                bundle_locator: None,
            })
        }
    }

    #[tokio::test]
    async fn test_progress_never_regresses_across_updates() {
        let backend = ReplayBackend {
            script: vec![30, 60, 20, 45, 80],
        };
        let mut controller =
            JobController::new(Arc::new(backend), ControllerConfig::default());
        let mut progress = controller.subscribe_progress();

        controller
            .select_source(VideoSource::new("/tmp/in.mp4", 64))
            .unwrap();
        controller.probe_source().await.unwrap();
        controller.submit(2).unwrap();
        controller.run_to_completion().await.unwrap();

        let mut observed = Vec::new();
        while let Ok(update) = progress.try_recv() {
            observed.push(update.percent);
        }
        assert_eq!(observed, vec![30, 60, 60, 60, 80]);
        assert_eq!(controller.job().unwrap().progress_percent, 100);
    }

    #[tokio::test]
    async fn test_short_artifact_set_fails_instead_of_completing() {
        struct ShortBackend;

        #[async_trait]
        impl ExecutionBackend for ShortBackend {
            async fn probe(&self, _source: &VideoSource) -> SplitResult<Option<f64>> {
                Ok(Some(60.0))
            }

            async fn execute(
                &self,
                _job: Job,
                events: EventSender,
                _cancel: watch::Receiver<bool>,
            ) -> SplitResult<BackendOutcome> {
                let _ = events.send(BackendEvent::Acknowledged);
                Ok(BackendOutcome {
                    artifacts: vec![Artifact::in_memory(1, "segment_01.mp4", vec![0u8; 4])],
                    bundle_locator: None,
                })
            }
        }

        let mut controller =
            JobController::new(Arc::new(ShortBackend), ControllerConfig::default());
        controller
            .select_source(VideoSource::new("/tmp/in.mp4", 64))
            .unwrap();
        controller.probe_source().await.unwrap();
        controller.submit(3).unwrap();

        let terminal = controller.run_to_completion().await.unwrap();
        assert_eq!(terminal, JobState::Failed);
        assert_eq!(controller.job().unwrap().state, JobState::Failed);
    }
}
