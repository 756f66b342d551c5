//! Wire types for the split service.

use serde::{Deserialize, Serialize};

/// Job status as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RemoteStatus {
    /// Upload accepted, split not yet requested
    #[default]
    Pending,
    /// Segments are being produced
    #[serde(alias = "running")]
    Processing,
    /// All segments produced
    Completed,
    /// Job failed server-side
    Failed,
}

impl RemoteStatus {
    /// Whether the service will emit no further updates for this job.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RemoteStatus::Completed | RemoteStatus::Failed)
    }
}

/// Response from `POST /upload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub job_id: String,
    pub filename: String,
    /// Server-side probed duration in seconds
    pub duration: f64,
    pub file_size: u64,
    #[serde(default)]
    pub message: String,
}

/// Response from `POST /split/{job_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitAck {
    pub job_id: String,
    pub num_splits: u32,
    pub status: String,
    #[serde(default)]
    pub message: String,
}

/// Response from `GET /status/{job_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub job_id: String,
    pub status: RemoteStatus,
    #[serde(default)]
    pub message: String,
    /// Segments completed so far
    #[serde(default)]
    pub progress: u32,
    #[serde(default)]
    pub total_segments: u32,
    /// Percent derived server-side from progress/total
    #[serde(default)]
    pub progress_percent: u8,
    /// Output names, populated on completion
    #[serde(default)]
    pub output_files: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_accepts_running_alias() {
        let status: StatusResponse = serde_json::from_str(
            r#"{"job_id": "j1", "status": "running", "progress_percent": 40}"#,
        )
        .unwrap();
        assert_eq!(status.status, RemoteStatus::Processing);
        assert_eq!(status.progress_percent, 40);
        assert!(status.output_files.is_empty());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(RemoteStatus::Completed.is_terminal());
        assert!(RemoteStatus::Failed.is_terminal());
        assert!(!RemoteStatus::Processing.is_terminal());
        assert!(!RemoteStatus::Pending.is_terminal());
    }
}
