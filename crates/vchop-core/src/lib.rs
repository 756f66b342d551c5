//! Job orchestration layer for video splitting.
//!
//! Turns one source video into N equal-duration watermarked segments
//! through either a remote split service or an embedded FFmpeg engine.
//! The [`JobController`] owns the lifecycle state machine and is the
//! single entry point for embedding UIs; backends stream events to it,
//! progress is normalized to one monotonic 0-100 scale, and produced
//! artifacts live in the [`ArtifactStore`] until the job is discarded.

pub mod artifact_store;
pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
pub mod progress;
pub mod telemetry;

pub use artifact_store::{ArtifactFetcher, ArtifactStore};
pub use backend::local::LocalSyncBackend;
pub use backend::remote::RemoteAsyncBackend;
pub use backend::{BackendEvent, BackendOutcome, EventReceiver, EventSender, ExecutionBackend};
pub use config::{ControllerConfig, PollPolicy, SourcePolicy};
pub use controller::JobController;
pub use error::{SplitError, SplitResult};
pub use progress::{ProgressReporter, ProgressUpdate};
pub use telemetry::init_tracing;
