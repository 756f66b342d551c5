//! Input video descriptions.

use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Maximum declared media duration (24 hours).
pub const MAX_SOURCE_DURATION_SECS: f64 = 24.0 * 60.0 * 60.0;

/// Immutable description of an input video.
///
/// Created when a source file is accepted and dropped on reset. The
/// duration stays `None` until a probe succeeds; the remote pipeline can
/// operate without it, the local pipeline cannot.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VideoSource {
    /// Path to the source file on disk
    pub path: PathBuf,
    /// Size in bytes
    pub size_bytes: u64,
    /// Declared media duration in seconds, if known
    pub duration: Option<f64>,
    /// Original file name
    pub file_name: String,
}

impl VideoSource {
    /// Describe a source file. The file name is derived from the path.
    pub fn new(path: impl AsRef<Path>, size_bytes: u64) -> Self {
        let path = path.as_ref().to_path_buf();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string());

        Self {
            path,
            size_bytes,
            duration: None,
            file_name,
        }
    }

    /// Attach a probed duration.
    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Whether the declared duration exceeds the 24-hour ceiling.
    pub fn exceeds_max_duration(&self) -> bool {
        matches!(self.duration, Some(d) if d > MAX_SOURCE_DURATION_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_derivation() {
        let source = VideoSource::new("/tmp/uploads/talk.mp4", 1024);
        assert_eq!(source.file_name, "talk.mp4");
        assert!(source.duration.is_none());
    }

    #[test]
    fn test_duration_ceiling() {
        let source = VideoSource::new("/tmp/a.mp4", 1).with_duration(120.0);
        assert!(!source.exceeds_max_duration());

        let source = VideoSource::new("/tmp/a.mp4", 1).with_duration(25.0 * 3600.0);
        assert!(source.exceeds_max_duration());
    }
}
