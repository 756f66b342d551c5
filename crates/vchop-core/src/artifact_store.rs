//! Artifact registry.
//!
//! A passive registry the controller populates as segments complete and
//! tears down when a job is discarded. Local artifacts hold their bytes;
//! remote artifacts hold a locator and are fetched on demand.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use vchop_models::{Artifact, ArtifactHandle};

use crate::error::{SplitError, SplitResult};

/// Resolves a remote locator to bytes. Implemented by the split service
/// client; tests substitute a canned fetcher.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    async fn fetch(&self, locator: &str) -> SplitResult<Vec<u8>>;
}

/// Registry of produced segments, keyed by 1-based segment index.
#[derive(Default)]
pub struct ArtifactStore {
    artifacts: BTreeMap<u32, Artifact>,
    fetcher: Option<Arc<dyn ArtifactFetcher>>,
    /// Locator of the bundled archive, when the backend provides one
    bundle_locator: Option<String>,
}

impl ArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the fetcher used to resolve remote handles.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn ArtifactFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Register one artifact, replacing any prior entry for its index.
    pub fn register(&mut self, artifact: Artifact) {
        debug!(
            segment = artifact.segment_index,
            name = %artifact.name,
            "Registering artifact"
        );
        self.artifacts.insert(artifact.segment_index, artifact);
    }

    /// Record the locator for the backend's bundled archive.
    pub fn set_bundle_locator(&mut self, locator: impl Into<String>) {
        self.bundle_locator = Some(locator.into());
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Artifacts in segment order.
    pub fn artifacts(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts.values()
    }

    /// Retrieve the bytes of one segment. Held buffers are returned
    /// directly; remote handles are fetched now, not at registration.
    pub async fn get(&self, segment_index: u32) -> SplitResult<Vec<u8>> {
        let artifact = self
            .artifacts
            .get(&segment_index)
            .ok_or(SplitError::ArtifactUnavailable(segment_index))?;

        match &artifact.handle {
            ArtifactHandle::Memory(bytes) => Ok(bytes.as_ref().clone()),
            ArtifactHandle::Remote { locator } => self.fetch(locator).await,
        }
    }

    /// Retrieve the bundled archive of all segments, when the backend
    /// published one.
    pub async fn get_bundle(&self) -> SplitResult<Vec<u8>> {
        let locator = self
            .bundle_locator
            .as_deref()
            .ok_or_else(|| SplitError::ArtifactFetchFailed("no bundle available".to_string()))?;
        self.fetch(locator).await
    }

    async fn fetch(&self, locator: &str) -> SplitResult<Vec<u8>> {
        let fetcher = self.fetcher.as_ref().ok_or_else(|| {
            SplitError::ArtifactFetchFailed("no fetcher configured for remote handles".to_string())
        })?;
        fetcher.fetch(locator).await
    }

    /// Drop every handle. Idempotent and safe on an empty store; buffers
    /// are freed when their last reference goes away.
    pub fn release_all(&mut self) {
        if !self.artifacts.is_empty() {
            debug!(count = self.artifacts.len(), "Releasing artifacts");
        }
        self.artifacts.clear();
        self.bundle_locator = None;
    }
}
