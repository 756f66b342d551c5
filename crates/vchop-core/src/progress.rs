//! Progress normalization.
//!
//! Upload transfer, remote poll percent, and local per-segment completion
//! all funnel through one `(percent, phase)` pair. The reporter enforces
//! the non-decreasing guarantee so displayed progress never rewinds, and
//! is reset when a new progress domain begins (upload vs. processing).

use serde::{Deserialize, Serialize};

/// One normalized progress observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// 0-100
    pub percent: u8,
    /// Backend-specific label, passed through verbatim
    pub phase: String,
}

impl ProgressUpdate {
    pub fn new(percent: u8, phase: impl Into<String>) -> Self {
        Self {
            percent: percent.min(100),
            phase: phase.into(),
        }
    }
}

/// Clamps a stream of percent values to be monotonically non-decreasing.
#[derive(Debug, Default)]
pub struct ProgressReporter {
    floor: u8,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe a raw update and return the clamped one. A value below the
    /// highest seen so far is lifted back to that high-water mark; the
    /// phase text is never altered.
    pub fn observe(&mut self, update: ProgressUpdate) -> ProgressUpdate {
        let percent = update.percent.min(100).max(self.floor);
        self.floor = percent;
        ProgressUpdate {
            percent,
            phase: update.phase,
        }
    }

    /// Highest percent observed since the last reset.
    pub fn last_percent(&self) -> u8 {
        self.floor
    }

    /// Start a fresh progress domain (e.g. upload finished, processing
    /// begins at zero).
    pub fn reset(&mut self) {
        self.floor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regressed_percent_is_clamped() {
        let mut reporter = ProgressReporter::new();
        assert_eq!(reporter.observe(ProgressUpdate::new(25, "a")).percent, 25);
        assert_eq!(reporter.observe(ProgressUpdate::new(50, "b")).percent, 50);
        // out-of-order update must not rewind
        assert_eq!(reporter.observe(ProgressUpdate::new(40, "c")).percent, 50);
        assert_eq!(reporter.observe(ProgressUpdate::new(75, "d")).percent, 75);
    }

    #[test]
    fn test_phase_passes_through_verbatim() {
        let mut reporter = ProgressReporter::new();
        reporter.observe(ProgressUpdate::new(60, "x"));
        let clamped = reporter.observe(ProgressUpdate::new(10, "Processing segment 1 of 4..."));
        assert_eq!(clamped.percent, 60);
        assert_eq!(clamped.phase, "Processing segment 1 of 4...");
    }

    #[test]
    fn test_reset_allows_new_domain() {
        let mut reporter = ProgressReporter::new();
        reporter.observe(ProgressUpdate::new(100, "Uploading video..."));
        reporter.reset();
        assert_eq!(reporter.observe(ProgressUpdate::new(10, "p")).percent, 10);
    }

    #[test]
    fn test_overshoot_caps_at_hundred() {
        let mut reporter = ProgressReporter::new();
        assert_eq!(reporter.observe(ProgressUpdate::new(200, "p")).percent, 100);
    }
}
