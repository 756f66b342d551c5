//! Shared data models for the VChop backend.
//!
//! This crate provides Serde-serializable types for:
//! - Video sources and split requests
//! - Segment plans and specs
//! - Jobs, job states, and failure classification
//! - Produced artifacts and their handles
//! - Encoding configuration

pub mod artifact;
pub mod encoding;
pub mod job;
pub mod plan;
pub mod request;
pub mod source;

// Re-export common types
pub use artifact::{Artifact, ArtifactHandle};
pub use encoding::EncodingConfig;
pub use job::{FailureKind, FailureReason, Job, JobId, JobState};
pub use plan::{segment_name, PlanError, SegmentPlan, SegmentSpec};
pub use request::{InvalidSegmentCount, SplitRequest, MAX_SEGMENTS, MIN_SEGMENTS};
pub use source::{VideoSource, MAX_SOURCE_DURATION_SECS};
