//! Remote asynchronous backend.
//!
//! Uploads the source, requests the split, then polls job status at a
//! fixed cadence until a terminal status. Individual poll failures are
//! logged and tolerated; only a run of consecutive failures, or an
//! explicit failed status, ends the job. Artifact references resolve to
//! download locators and bytes are fetched lazily.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use vchop_models::{segment_name, Artifact, Job, VideoSource};
use vchop_remote::{RemoteStatus, SplitServiceClient, StatusResponse};

use crate::artifact_store::ArtifactFetcher;
use crate::backend::{cancelled, BackendEvent, BackendOutcome, EventSender, ExecutionBackend};
use crate::config::PollPolicy;
use crate::error::{SplitError, SplitResult};
use crate::progress::ProgressUpdate;

/// Runs splits through the remote split service.
pub struct RemoteAsyncBackend {
    client: Arc<SplitServiceClient>,
    poll: PollPolicy,
}

impl RemoteAsyncBackend {
    pub fn new(client: Arc<SplitServiceClient>) -> Self {
        Self {
            client,
            poll: PollPolicy::default(),
        }
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// The underlying client, shared with the artifact fetcher.
    pub fn client(&self) -> Arc<SplitServiceClient> {
        Arc::clone(&self.client)
    }

    fn resolve_artifacts(&self, remote_job_id: &str, status: &StatusResponse) -> Vec<Artifact> {
        let count = if status.output_files.is_empty() {
            status.total_segments as usize
        } else {
            status.output_files.len()
        };

        (1..=count as u32)
            .map(|index| {
                let name = status
                    .output_files
                    .get(index as usize - 1)
                    .and_then(|path| path.rsplit('/').next())
                    .map(str::to_string)
                    .unwrap_or_else(|| segment_name(index));
                Artifact::remote(index, name, self.client.segment_url(remote_job_id, index))
            })
            .collect()
    }
}

#[async_trait]
impl ExecutionBackend for RemoteAsyncBackend {
    async fn probe(&self, _source: &VideoSource) -> SplitResult<Option<f64>> {
        // The service probes duration server-side during upload.
        Ok(None)
    }

    async fn execute(
        &self,
        job: Job,
        events: EventSender,
        mut cancel: watch::Receiver<bool>,
    ) -> SplitResult<BackendOutcome> {
        // Upload phase. The service probes duration and assigns its own
        // job ID; everything after this keys on that ID.
        let progress = events.clone();
        let upload = {
            let upload_future = self.client.upload(&job.source, move |percent| {
                let _ = progress.send(BackendEvent::UploadProgress(percent));
            });
            tokio::select! {
                result = upload_future => {
                    result.map_err(|e| SplitError::UploadFailed(e.to_string()))?
                }
                _ = cancelled(&mut cancel) => return Err(SplitError::Cancelled),
            }
        };
        info!(
            remote_job_id = %upload.job_id,
            duration = upload.duration,
            "Upload accepted"
        );

        let ack = self
            .client
            .request_split(&upload.job_id, job.request.segment_count())
            .await
            .map_err(|e| SplitError::SubmissionRejected(e.to_string()))?;
        let _ = events.send(BackendEvent::Acknowledged);
        info!(remote_job_id = %ack.job_id, num_splits = ack.num_splits, "Split acknowledged");

        // Poll phase.
        let mut interval = tokio::time::interval(self.poll.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut consecutive_failures = 0u32;

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = cancelled(&mut cancel) => {
                    self.client.cleanup(&upload.job_id).await;
                    return Err(SplitError::Cancelled);
                }
            }

            match self.client.fetch_status(&upload.job_id).await {
                Ok(status) => {
                    consecutive_failures = 0;
                    let _ = events.send(BackendEvent::Progress(ProgressUpdate::new(
                        status.progress_percent,
                        status.message.clone(),
                    )));

                    match status.status {
                        RemoteStatus::Completed => {
                            let artifacts = self.resolve_artifacts(&upload.job_id, &status);
                            return Ok(BackendOutcome {
                                artifacts,
                                bundle_locator: Some(self.client.bundle_url(&upload.job_id)),
                            });
                        }
                        RemoteStatus::Failed => {
                            let message = if status.message.is_empty() {
                                "job failed".to_string()
                            } else {
                                status.message
                            };
                            return Err(SplitError::BackendReportedFailure(message));
                        }
                        RemoteStatus::Pending | RemoteStatus::Processing => {}
                    }
                }
                Err(e) => {
                    consecutive_failures += 1;
                    warn!(
                        remote_job_id = %upload.job_id,
                        attempt = consecutive_failures,
                        error = %e,
                        "Status poll failed"
                    );
                    if consecutive_failures >= self.poll.max_consecutive_failures {
                        return Err(SplitError::PollTransportError {
                            attempts: consecutive_failures,
                            message: e.to_string(),
                        });
                    }
                }
            }
        }
    }
}

#[async_trait]
impl ArtifactFetcher for SplitServiceClient {
    async fn fetch(&self, locator: &str) -> SplitResult<Vec<u8>> {
        self.fetch_bytes(locator)
            .await
            .map_err(|e| SplitError::ArtifactFetchFailed(e.to_string()))
    }
}
