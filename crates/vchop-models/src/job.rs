//! Job lifecycle definitions.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::artifact::Artifact;
use crate::plan::SegmentPlan;
use crate::request::SplitRequest;
use crate::source::VideoSource;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string (e.g. a server-assigned ID).
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of the orchestration layer.
///
/// `Completed` and `Failed` are terminal until an explicit reset returns
/// the machine to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// No source accepted yet
    #[default]
    Idle,
    /// A source passed the size guard
    SourceSelected,
    /// Duration probe finished (possibly without a duration)
    Validated,
    /// Backend acknowledged the split request
    Submitted,
    /// Segments are being produced
    Processing,
    /// All segments produced and attached
    Completed,
    /// Job terminated with a failure reason
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Idle => "idle",
            JobState::SourceSelected => "source_selected",
            JobState::Validated => "validated",
            JobState::Submitted => "submitted",
            JobState::Processing => "processing",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    /// Terminal states only leave via an explicit reset.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classified failure cause, one variant per stage that can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Source exceeded the configured byte limit
    SourceTooLarge,
    /// Requested segment count outside 1..=12
    InvalidSegmentCount,
    /// Local backend requires a known duration
    DurationUnavailable,
    /// Upload transfer failed
    UploadFailed,
    /// Backend declined the split request
    SubmissionRejected,
    /// Too many consecutive status poll failures
    PollTransportError,
    /// Backend reported the job failed
    BackendReportedFailure,
    /// Embedded engine invocation failed for a segment
    EngineInvocationFailed,
}

/// Failure cause surfaced on a terminal job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FailureReason {
    /// Classified kind
    pub kind: FailureKind,
    /// Human-readable message (backend text passed through verbatim)
    pub message: String,
}

impl FailureReason {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// The unit of work: one end-to-end segmentation request.
///
/// Exactly one job exists per active submission; a new submission replaces
/// the prior one. The controller owns the job exclusively.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Job {
    /// Unique job ID (may be replaced by a server-assigned ID on upload)
    pub id: JobId,
    /// Source the job operates on
    pub source: VideoSource,
    /// Validated request parameters
    pub request: SplitRequest,
    /// Planned boundaries; `None` when planning is deferred to the backend
    pub plan: Option<SegmentPlan>,
    /// Current lifecycle state
    pub state: JobState,
    /// Aggregated progress (0-100, monotonically non-decreasing)
    pub progress_percent: u8,
    /// Human-readable phase label
    pub phase_message: String,
    /// Produced artifacts; attached atomically on completion
    pub artifacts: Vec<Artifact>,
    /// Failure cause, set only in `Failed`
    pub failure_reason: Option<FailureReason>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a job in `Submitted` state.
    pub fn new(source: VideoSource, request: SplitRequest, plan: Option<SegmentPlan>) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            source,
            request,
            plan,
            state: JobState::Submitted,
            progress_percent: 0,
            phase_message: "Submitted".to_string(),
            artifacts: Vec::new(),
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Backend acknowledged the job start.
    pub fn start(&mut self) {
        self.state = JobState::Processing;
        self.updated_at = Utc::now();
    }

    /// Record a progress update. The caller is responsible for the
    /// monotonic clamp; this only caps at 100.
    pub fn set_progress(&mut self, percent: u8, phase: impl Into<String>) {
        self.progress_percent = percent.min(100);
        self.phase_message = phase.into();
        self.updated_at = Utc::now();
    }

    /// Attach all artifacts and mark the job completed. The transition is
    /// atomic: either every artifact is present or the job stays as it was.
    pub fn complete(&mut self, artifacts: Vec<Artifact>) {
        self.artifacts = artifacts;
        self.state = JobState::Completed;
        self.progress_percent = 100;
        self.phase_message = "Completed".to_string();
        self.updated_at = Utc::now();
    }

    /// Mark the job failed with a classified reason.
    pub fn fail(&mut self, reason: FailureReason) {
        self.phase_message = reason.message.clone();
        self.failure_reason = Some(reason);
        self.state = JobState::Failed;
        self.updated_at = Utc::now();
    }

    /// Whether the job reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}
