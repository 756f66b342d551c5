//! Validated split request parameters.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum number of segments per request.
pub const MIN_SEGMENTS: u32 = 1;
/// Maximum number of segments per request.
pub const MAX_SEGMENTS: u32 = 12;

/// Requested segment count was outside `1..=12`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("segment count must be between {MIN_SEGMENTS} and {MAX_SEGMENTS}, got {0}")]
pub struct InvalidSegmentCount(pub u32);

/// A validated segmentation request.
///
/// Construction is the single validation point: a `SplitRequest` that
/// exists always satisfies `1 <= segment_count <= 12`, so no backend call
/// is ever issued for an out-of-range count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SplitRequest {
    segment_count: u32,
}

impl SplitRequest {
    /// Validate and build a request.
    pub fn new(segment_count: u32) -> Result<Self, InvalidSegmentCount> {
        if !(MIN_SEGMENTS..=MAX_SEGMENTS).contains(&segment_count) {
            return Err(InvalidSegmentCount(segment_count));
        }
        Ok(Self { segment_count })
    }

    /// Number of segments to produce.
    pub fn segment_count(&self) -> u32 {
        self.segment_count
    }
}
