//! Produced segment artifacts.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Opaque reference to an artifact's bytes.
///
/// Local runs hold the produced buffer directly; remote runs hold a
/// download locator and fetch lazily on demand. In-memory buffers are
/// reference-counted so the job record and the artifact registry share
/// one copy of the segment data.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactHandle {
    /// In-process buffer produced by the embedded engine
    Memory(Arc<Vec<u8>>),
    /// Remote resource locator (resolved against the split service)
    Remote {
        /// Download URL for this segment
        locator: String,
    },
}

impl ArtifactHandle {
    /// Whether bytes must be fetched from the remote service.
    pub fn is_remote(&self) -> bool {
        matches!(self, ArtifactHandle::Remote { .. })
    }
}

/// One produced segment and its metadata.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Artifact {
    /// 1-based segment index
    pub segment_index: u32,
    /// Output file name (`segment_01.mp4`, ...)
    pub name: String,
    /// Size in bytes, when known (remote artifacts report it lazily)
    pub size_bytes: Option<u64>,
    /// Handle used to retrieve the bytes
    pub handle: ArtifactHandle,
}

impl Artifact {
    /// Create an artifact backed by an in-memory buffer.
    pub fn in_memory(segment_index: u32, name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            segment_index,
            name: name.into(),
            size_bytes: Some(bytes.len() as u64),
            handle: ArtifactHandle::Memory(Arc::new(bytes)),
        }
    }

    /// Create an artifact backed by a remote locator.
    pub fn remote(segment_index: u32, name: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            segment_index,
            name: name.into(),
            size_bytes: None,
            handle: ArtifactHandle::Remote {
                locator: locator.into(),
            },
        }
    }
}
