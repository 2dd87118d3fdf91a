//! Error types for the `framemark` crate.
//!
//! This module defines [`FramemarkError`], the unified error type returned by
//! all fallible operations in the crate. Errors carry rich context to aid
//! debugging, including file paths, video keys, and upstream error messages.

use std::{io::Error as IoError, path::PathBuf};

use image::ImageError;
use thiserror::Error;

/// The unified error type for all `framemark` operations.
///
/// Every public method that can fail returns `Result<T, FramemarkError>`.
/// Variants carry enough context to diagnose the problem without needing
/// additional logging at the call site.
///
/// Note the asymmetry with the permissive load paths: a corrupt checkpoint or
/// progress file on *load* is logged and treated as "no prior state", while a
/// failed checkpoint *write* is fatal for the current run
/// ([`FramemarkError::CheckpointWrite`]) since continuing would leave the
/// resume state inconsistent.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FramemarkError {
    /// The external keyframe extractor produced no usable frames, even after
    /// the single relaxed-sensitivity retry.
    #[error("Keyframe extraction failed for {path}: {reason}")]
    ExtractionFailed {
        /// Path to the video that was being extracted.
        path: PathBuf,
        /// Underlying reason (extractor stderr, missing binary, empty output).
        reason: String,
    },

    /// The detector could not be invoked or returned unusable output.
    ///
    /// At the pipeline level this is a per-frame condition: the frame is
    /// logged, left unmarked, and retried on the next run.
    #[error("Detector call failed: {0}")]
    DetectorFailure(String),

    /// A durable checkpoint write failed (disk full, permissions).
    ///
    /// Fatal for the video's current run. The atomic-replace write guarantees
    /// the previously written checkpoint file survives intact.
    #[error("Failed to write checkpoint {path}: {reason}")]
    CheckpointWrite {
        /// Destination checkpoint path.
        path: PathBuf,
        /// Underlying reason the write or rename failed.
        reason: String,
    },

    /// The video download helper failed.
    #[error("Download failed for {url}: {reason}")]
    DownloadFailed {
        /// The URL passed to [`VideoFetcher::fetch`](crate::download::VideoFetcher::fetch).
        url: String,
        /// Underlying reason (yt-dlp stderr or spawn failure).
        reason: String,
    },

    /// The input path is neither a video file nor a directory containing any.
    #[error("No video files found at {0}")]
    NoVideos(PathBuf),

    /// In-memory state could not be serialized to JSON.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// An error from the `image` crate while loading or saving a frame.
    #[error("Image processing error: {0}")]
    Image(#[from] ImageError),
}
