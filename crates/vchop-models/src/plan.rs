//! Segment boundary planning.
//!
//! `SegmentPlan::compute` is the pure planner: given a known duration and a
//! validated request it produces contiguous, non-overlapping segment specs
//! whose durations sum to the total exactly (the final segment absorbs the
//! rounding remainder).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::request::SplitRequest;

/// Errors from segment planning.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("cannot plan segments for non-positive duration {0}")]
    NonPositiveDuration(f64),
}

/// Build the output name for a 1-based segment index.
///
/// Width-2 zero padding keeps lexicographic and numeric order in agreement
/// for the full 1..=12 range.
pub fn segment_name(index: u32) -> String {
    format!("segment_{:02}.mp4", index)
}

/// One planned segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SegmentSpec {
    /// 1-based segment index
    pub index: u32,
    /// Start offset from the beginning of the source, in seconds
    pub start_secs: f64,
    /// Segment duration in seconds
    pub duration_secs: f64,
    /// Output file name (`segment_01.mp4`, ...)
    pub output_name: String,
}

/// An ordered sequence of segment specs covering the whole source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SegmentPlan {
    /// Total source duration the plan was computed for
    pub total_duration: f64,
    /// Planned segments, in index order
    pub segments: Vec<SegmentSpec>,
}

impl SegmentPlan {
    /// Compute segment boundaries for a known duration.
    ///
    /// Segment `i` (0-indexed) starts at `i * duration / n` and runs for
    /// `duration / n` seconds, except the last segment whose duration is
    /// `duration - (n - 1) * base` so that total coverage is exact.
    pub fn compute(duration: f64, request: &SplitRequest) -> Result<Self, PlanError> {
        if duration <= 0.0 {
            return Err(PlanError::NonPositiveDuration(duration));
        }

        let n = request.segment_count();
        let base = duration / n as f64;

        let segments = (0..n)
            .map(|i| {
                let start_secs = i as f64 * base;
                let duration_secs = if i == n - 1 {
                    duration - (n - 1) as f64 * base
                } else {
                    base
                };
                SegmentSpec {
                    index: i + 1,
                    start_secs,
                    duration_secs,
                    output_name: segment_name(i + 1),
                }
            })
            .collect();

        Ok(Self {
            total_duration: duration,
            segments,
        })
    }

    /// Number of planned segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// True when the plan holds no segments. Never the case for a computed
    /// plan, but kept for the usual `len`/`is_empty` pairing.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-6;

    fn plan(duration: f64, n: u32) -> SegmentPlan {
        let request = SplitRequest::new(n).unwrap();
        SegmentPlan::compute(duration, &request).unwrap()
    }

    #[test]
    fn test_exact_coverage_for_all_counts() {
        for n in 1..=12 {
            for duration in [1.0, 59.9, 100.0, 3600.0, 86399.5] {
                let plan = plan(duration, n);
                assert_eq!(plan.len(), n as usize);

                // Offsets are contiguous starting at 0.
                let mut expected_start = 0.0;
                for spec in &plan.segments {
                    assert!((spec.start_secs - expected_start).abs() < TOLERANCE);
                    expected_start += spec.duration_secs;
                }

                let total: f64 = plan.segments.iter().map(|s| s.duration_secs).sum();
                assert!(
                    (total - duration).abs() < TOLERANCE,
                    "duration={duration} n={n} total={total}"
                );
            }
        }
    }

    #[test]
    fn test_hundred_seconds_in_three() {
        let plan = plan(100.0, 3);
        let third = 100.0 / 3.0;

        assert!((plan.segments[0].start_secs - 0.0).abs() < TOLERANCE);
        assert!((plan.segments[0].duration_secs - third).abs() < TOLERANCE);
        assert!((plan.segments[1].start_secs - third).abs() < TOLERANCE);
        assert!((plan.segments[1].duration_secs - third).abs() < TOLERANCE);
        assert!((plan.segments[2].start_secs - 2.0 * third).abs() < TOLERANCE);

        // The last segment absorbs the remainder so the sum is exactly 100.
        let total: f64 = plan.segments.iter().map(|s| s.duration_secs).sum();
        assert!((total - 100.0).abs() < TOLERANCE);

        let names: Vec<&str> = plan.segments.iter().map(|s| s.output_name.as_str()).collect();
        assert_eq!(names, ["segment_01.mp4", "segment_02.mp4", "segment_03.mp4"]);
    }

    #[test]
    fn test_rejects_non_positive_duration() {
        let request = SplitRequest::new(3).unwrap();
        assert!(matches!(
            SegmentPlan::compute(0.0, &request),
            Err(PlanError::NonPositiveDuration(_))
        ));
        assert!(matches!(
            SegmentPlan::compute(-5.0, &request),
            Err(PlanError::NonPositiveDuration(_))
        ));
    }

    #[test]
    fn test_names_sort_lexicographically() {
        let plan = plan(120.0, 12);
        let mut names: Vec<String> = plan.segments.iter().map(|s| s.output_name.clone()).collect();
        let numeric_order = names.clone();
        names.sort();
        assert_eq!(names, numeric_order);
    }
}
