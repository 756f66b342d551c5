//! Split service HTTP client.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::TryStreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use vchop_models::VideoSource;

use crate::error::{RemoteError, RemoteResult};
use crate::types::{SplitAck, StatusResponse, UploadResponse};

/// Configuration for the split service client.
#[derive(Debug, Clone)]
pub struct SplitClientConfig {
    /// Base URL of the split service
    pub base_url: String,
    /// Request timeout (uploads of large sources dominate)
    pub timeout: Duration,
}

impl Default for SplitClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout: Duration::from_secs(3600),
        }
    }
}

impl SplitClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("VCHOP_REMOTE_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            timeout: Duration::from_secs(
                std::env::var("VCHOP_REMOTE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3600),
            ),
        }
    }
}

/// Client for the remote split service.
pub struct SplitServiceClient {
    http: Client,
    config: SplitClientConfig,
}

impl SplitServiceClient {
    /// Create a new client.
    pub fn new(config: SplitClientConfig) -> RemoteResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(RemoteError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> RemoteResult<Self> {
        Self::new(SplitClientConfig::from_env())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Download URL for one segment of a job.
    pub fn segment_url(&self, job_id: &str, segment: u32) -> String {
        self.url(&format!("download/{job_id}?segment={segment}"))
    }

    /// Download URL for the bundled archive of a job.
    pub fn bundle_url(&self, job_id: &str) -> String {
        self.url(&format!("download-all/{job_id}"))
    }

    /// Upload a source video as a multipart body, reporting transfer
    /// progress (0-100) through the callback as chunks go out.
    pub async fn upload<F>(&self, source: &VideoSource, on_progress: F) -> RemoteResult<UploadResponse>
    where
        F: Fn(u8) + Send + Sync + 'static,
    {
        let url = self.url("upload");
        debug!(url = %url, file = %source.file_name, "Uploading source video");

        let file = tokio::fs::File::open(&source.path).await?;
        let total = source.size_bytes;
        let sent = Arc::new(AtomicU64::new(0));
        let on_progress = Arc::new(on_progress);

        let counter = Arc::clone(&sent);
        let callback = Arc::clone(&on_progress);
        let stream = ReaderStream::new(file).inspect_ok(move |chunk| {
            let so_far = counter.fetch_add(chunk.len() as u64, Ordering::Relaxed) + chunk.len() as u64;
            if total > 0 {
                let percent = ((so_far.saturating_mul(100)) / total).min(100) as u8;
                callback(percent);
            }
        });

        let part = Part::stream_with_length(Body::wrap_stream(stream), total)
            .file_name(source.file_name.clone())
            .mime_str("video/mp4")
            .map_err(RemoteError::Network)?;
        let form = Form::new().part("file", part);

        let response = self.http.post(&url).multipart(form).send().await?;
        Self::into_json(response).await
    }

    /// Ask the service to split an uploaded job into `num_splits` segments.
    pub async fn request_split(&self, job_id: &str, num_splits: u32) -> RemoteResult<SplitAck> {
        let url = self.url(&format!("split/{job_id}"));
        debug!(url = %url, num_splits, "Requesting split");

        let response = self
            .http
            .post(&url)
            .query(&[("num_splits", num_splits)])
            .send()
            .await?;
        Self::into_json(response).await
    }

    /// Fetch the current status of a job.
    pub async fn fetch_status(&self, job_id: &str) -> RemoteResult<StatusResponse> {
        let url = self.url(&format!("status/{job_id}"));
        let response = self.http.get(&url).send().await?;
        Self::into_json(response).await
    }

    /// Download the bytes of one segment.
    pub async fn download_segment(&self, job_id: &str, segment: u32) -> RemoteResult<Vec<u8>> {
        self.fetch_bytes(&self.segment_url(job_id, segment)).await
    }

    /// Download the bundled archive of all segments.
    pub async fn download_all(&self, job_id: &str) -> RemoteResult<Vec<u8>> {
        self.fetch_bytes(&self.bundle_url(job_id)).await
    }

    /// Fetch raw bytes from a previously resolved locator.
    pub async fn fetch_bytes(&self, locator: &str) -> RemoteResult<Vec<u8>> {
        let response = self.http.get(locator).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Rejected { status, body });
        }

        Ok(response.bytes().await?.to_vec())
    }

    /// Ask the service to delete uploaded input and outputs for a job.
    /// Best-effort: failures are logged, never escalated.
    pub async fn cleanup(&self, job_id: &str) {
        let url = self.url(&format!("cleanup/{job_id}"));
        match self.http.delete(&url).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(job_id, "Remote cleanup done");
            }
            Ok(response) => {
                warn!(job_id, status = %response.status(), "Remote cleanup declined");
            }
            Err(e) => {
                warn!(job_id, error = %e, "Remote cleanup failed");
            }
        }
    }

    async fn into_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> RemoteResult<T> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Rejected { status, body });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            RemoteError::InvalidResponse(format!("malformed response body: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RemoteStatus;
    use std::io::Write;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> SplitServiceClient {
        SplitServiceClient::new(SplitClientConfig {
            base_url: server.uri(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_upload_reports_progress_and_parses_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "job_id": "job-1",
                "filename": "clip.mp4",
                "duration": 120.0,
                "file_size": 16,
                "message": "Video uploaded successfully"
            })))
            .mount(&server)
            .await;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0u8; 16]).unwrap();
        let source = VideoSource::new(file.path(), 16);

        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let response = client_for(&server)
            .upload(&source, move |pct| sink.lock().unwrap().push(pct))
            .await
            .unwrap();

        assert_eq!(response.job_id, "job-1");
        assert!((response.duration - 120.0).abs() < 1e-9);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.last().copied(), Some(100));
    }

    #[tokio::test]
    async fn test_split_rejection_surfaces_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/split/job-1"))
            .respond_with(ResponseTemplate::new(400).set_body_string("already processing"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .request_split("job-1", 4)
            .await
            .unwrap_err();
        match err {
            RemoteError::Rejected { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, "already processing");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status/job-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "job_id": "job-1",
                "status": "processing",
                "message": "Processing segment 2 of 4...",
                "progress": 2,
                "total_segments": 4,
                "progress_percent": 50,
                "output_files": []
            })))
            .mount(&server)
            .await;

        let status = client_for(&server).fetch_status("job-1").await.unwrap();
        assert_eq!(status.status, RemoteStatus::Processing);
        assert_eq!(status.progress_percent, 50);
    }

    #[tokio::test]
    async fn test_download_segment_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/download/job-1"))
            .and(query_param("segment", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]))
            .mount(&server)
            .await;

        let bytes = client_for(&server)
            .download_segment("job-1", 2)
            .await
            .unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
    }
}
