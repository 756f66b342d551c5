//! Orchestration error taxonomy.

use thiserror::Error;

use vchop_models::{FailureKind, FailureReason, InvalidSegmentCount, JobState};

pub type SplitResult<T> = Result<T, SplitError>;

/// Everything that can go wrong between source selection and a terminal
/// job state. Variants carrying a [`FailureKind`] surface on the job as a
/// classified [`FailureReason`]; the rest are operational errors returned
/// to the caller without touching the job.
#[derive(Debug, Error)]
pub enum SplitError {
    #[error("source is {size_bytes} bytes, limit is {limit_bytes}")]
    SourceTooLarge { size_bytes: u64, limit_bytes: u64 },

    #[error(transparent)]
    InvalidSegmentCount(#[from] InvalidSegmentCount),

    #[error("source duration is unavailable; splitting requires a probed duration")]
    DurationUnavailable,

    #[error("source duration {duration_secs:.0}s exceeds the {limit_secs}s ceiling")]
    DurationTooLong { duration_secs: f64, limit_secs: u64 },

    #[error("upload failed: {0}")]
    UploadFailed(String),

    #[error("backend declined the job: {0}")]
    SubmissionRejected(String),

    #[error("status polling failed {attempts} consecutive times: {message}")]
    PollTransportError { attempts: u32, message: String },

    #[error("backend reported failure: {0}")]
    BackendReportedFailure(String),

    #[error("engine invocation failed for segment {segment}: {message}")]
    EngineInvocationFailed { segment: u32, message: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error("{operation} is not valid in state {state}")]
    InvalidState {
        operation: &'static str,
        state: JobState,
    },

    #[error("no artifact registered for segment {0}")]
    ArtifactUnavailable(u32),

    #[error("artifact retrieval failed: {0}")]
    ArtifactFetchFailed(String),

    #[error("no active job")]
    NoActiveJob,
}

impl SplitError {
    /// Classified kind for errors that terminate a job. `None` for
    /// operational errors that never produce a `Failed` transition.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            SplitError::SourceTooLarge { .. } => Some(FailureKind::SourceTooLarge),
            SplitError::InvalidSegmentCount(_) => Some(FailureKind::InvalidSegmentCount),
            SplitError::DurationUnavailable | SplitError::DurationTooLong { .. } => {
                Some(FailureKind::DurationUnavailable)
            }
            SplitError::UploadFailed(_) => Some(FailureKind::UploadFailed),
            SplitError::SubmissionRejected(_) => Some(FailureKind::SubmissionRejected),
            SplitError::PollTransportError { .. } => Some(FailureKind::PollTransportError),
            SplitError::BackendReportedFailure(_) => Some(FailureKind::BackendReportedFailure),
            SplitError::EngineInvocationFailed { .. } => Some(FailureKind::EngineInvocationFailed),
            SplitError::Cancelled
            | SplitError::InvalidState { .. }
            | SplitError::ArtifactUnavailable(_)
            | SplitError::ArtifactFetchFailed(_)
            | SplitError::NoActiveJob => None,
        }
    }

    /// Failure reason to attach to a job, when this error is terminal.
    pub fn failure_reason(&self) -> Option<FailureReason> {
        self.failure_kind()
            .map(|kind| FailureReason::new(kind, self.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_errors_classify() {
        let err = SplitError::EngineInvocationFailed {
            segment: 3,
            message: "encoder exited with status 1".to_string(),
        };
        assert_eq!(err.failure_kind(), Some(FailureKind::EngineInvocationFailed));
        let reason = err.failure_reason().unwrap();
        assert!(reason.message.contains("segment 3"));
    }

    #[test]
    fn test_operational_errors_do_not_classify() {
        assert!(SplitError::Cancelled.failure_kind().is_none());
        assert!(SplitError::NoActiveJob.failure_reason().is_none());
        assert!(SplitError::ArtifactUnavailable(2).failure_kind().is_none());
    }
}
