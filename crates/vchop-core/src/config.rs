//! Orchestration configuration.
//!
//! Every knob has a sensible default and can be overridden through
//! `VCHOP_*` environment variables, loaded via [`dotenvy`] if a `.env`
//! file is present.

use std::time::Duration;

use vchop_media::DEFAULT_WATERMARK_TEXT;

/// Default byte ceiling for sources submitted to the remote service (50 GiB).
pub const DEFAULT_REMOTE_MAX_SOURCE_BYTES: u64 = 50 * 1024 * 1024 * 1024;

/// Default byte ceiling for sources processed by the embedded engine (10 GiB).
pub const DEFAULT_LOCAL_MAX_SOURCE_BYTES: u64 = 10 * 1024 * 1024 * 1024;

/// Default cadence for remote status polling.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;

/// Default bound on consecutive poll transport failures before the job
/// is declared failed.
pub const DEFAULT_MAX_CONSECUTIVE_POLL_FAILURES: u32 = 5;

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Guard applied when a source file is selected.
#[derive(Debug, Clone, Copy)]
pub struct SourcePolicy {
    /// Largest source the backend will accept, in bytes
    pub max_source_bytes: u64,
}

impl SourcePolicy {
    /// Policy for the remote service, which stages uploads on disk.
    pub fn remote_default() -> Self {
        Self {
            max_source_bytes: DEFAULT_REMOTE_MAX_SOURCE_BYTES,
        }
    }

    /// Policy for the embedded engine, which holds the working set locally.
    pub fn local_default() -> Self {
        Self {
            max_source_bytes: DEFAULT_LOCAL_MAX_SOURCE_BYTES,
        }
    }

    pub fn with_max_source_bytes(mut self, bytes: u64) -> Self {
        self.max_source_bytes = bytes;
        self
    }
}

/// Cadence and failure bound for remote status polling.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    /// Delay between consecutive status polls
    pub interval: Duration,
    /// Consecutive transport failures tolerated before giving up
    pub max_consecutive_failures: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_POLL_FAILURES,
        }
    }
}

impl PollPolicy {
    /// Load from `VCHOP_POLL_INTERVAL_SECS` and
    /// `VCHOP_MAX_POLL_FAILURES`, with defaults.
    pub fn from_env() -> Self {
        Self {
            interval: Duration::from_secs(env_parse(
                "VCHOP_POLL_INTERVAL_SECS",
                DEFAULT_POLL_INTERVAL_SECS,
            )),
            max_consecutive_failures: env_parse(
                "VCHOP_MAX_POLL_FAILURES",
                DEFAULT_MAX_CONSECUTIVE_POLL_FAILURES,
            ),
        }
    }
}

/// Top-level controller configuration.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Source acceptance guard for the configured backend
    pub source_policy: SourcePolicy,
    /// Text burned into every produced segment
    pub watermark_text: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            source_policy: SourcePolicy::remote_default(),
            watermark_text: DEFAULT_WATERMARK_TEXT.to_string(),
        }
    }
}

impl ControllerConfig {
    /// Load from the environment. Reads `VCHOP_MAX_SOURCE_BYTES` and
    /// `VCHOP_WATERMARK_TEXT`; `base` supplies the per-backend defaults.
    pub fn from_env(base: SourcePolicy) -> Self {
        let _ = dotenvy::dotenv();
        Self {
            source_policy: SourcePolicy {
                max_source_bytes: env_parse("VCHOP_MAX_SOURCE_BYTES", base.max_source_bytes),
            },
            watermark_text: std::env::var("VCHOP_WATERMARK_TEXT")
                .unwrap_or_else(|_| DEFAULT_WATERMARK_TEXT.to_string()),
        }
    }

    pub fn with_source_policy(mut self, policy: SourcePolicy) -> Self {
        self.source_policy = policy;
        self
    }

    pub fn with_watermark_text(mut self, text: impl Into<String>) -> Self {
        self.watermark_text = text.into();
        self
    }
}
