//! HTTP client for the remote split service.
//!
//! The service exposes an upload/split/status/download surface; this crate
//! wraps it behind typed calls with upload-progress callbacks and leaves
//! retry and escalation policy to the orchestration layer.

pub mod client;
pub mod error;
pub mod types;

pub use client::{SplitClientConfig, SplitServiceClient};
pub use error::{RemoteError, RemoteResult};
pub use types::{RemoteStatus, SplitAck, StatusResponse, UploadResponse};
