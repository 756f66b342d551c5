//! FFmpeg CLI wrapper for segment extraction.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Progress parsing from `-progress pipe:2`
//! - Cancellation support via tokio watch channels
//! - Duration probing via ffprobe
//! - Fixed-text watermark overlay (drawtext)
//! - The `MediaEngine` capability trait and its FFmpeg implementation

pub mod command;
pub mod engine;
pub mod error;
pub mod probe;
pub mod progress;
pub mod watermark;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use engine::{FfmpegEngine, MediaEngine};
pub use error::{MediaError, MediaResult};
pub use probe::probe_duration;
pub use progress::FfmpegProgress;
pub use watermark::{WatermarkConfig, DEFAULT_WATERMARK_TEXT};
