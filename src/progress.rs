//! Progress reporting.
//!
//! This module provides [`ProgressCallback`] for monitoring pipeline progress
//! and [`ProgressInfo`] for detailed progress snapshots. The pipeline is
//! strictly sequential and offers no cancellation mechanism beyond process
//! termination; recovery after a kill goes through the resume path instead.
//!
//! # Example
//!
//! ```
//! use framemark::{ProgressCallback, ProgressInfo};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         if let Some(pct) = info.percentage {
//!             println!("[{:?}] {pct:.1}% complete", info.operation);
//!         }
//!     }
//! }
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

/// The kind of work currently in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperationType {
    /// Running the external keyframe extractor.
    KeyframeExtraction,
    /// Running the detector over extracted keyframes.
    Detection,
    /// Downloading a video.
    Download,
}

/// A snapshot of pipeline progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// What kind of work is being performed.
    pub operation: OperationType,
    /// How many items have been handled so far (processed or skipped).
    pub current: u64,
    /// Total items expected, if known ahead of time.
    pub total: Option<u64>,
    /// Completion percentage (0.0 – 100.0), if `total` is known.
    pub percentage: Option<f32>,
    /// Wall-clock time elapsed since the operation started.
    pub elapsed: Duration,
    /// The frame id currently being handled, when applicable.
    pub current_frame: Option<u64>,
}

/// Trait for receiving progress updates during pipeline runs.
///
/// Implementations must be [`Send`] and [`Sync`]. Callbacks are infallible;
/// they observe but cannot halt the pipeline.
pub trait ProgressCallback: Send + Sync {
    /// Called once per handled unit of work (a frame during detection, a
    /// completed extraction, a completed download) and at operation end.
    fn on_progress(&self, info: &ProgressInfo);
}

/// A no-op implementation that discards all progress notifications.
///
/// This is the default when no callback is configured.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Internal helper that tracks timing and emits callbacks.
pub(crate) struct ProgressReporter {
    callback: Arc<dyn ProgressCallback>,
    operation: OperationType,
    total: Option<u64>,
    current: u64,
    start_time: Instant,
}

impl ProgressReporter {
    pub(crate) fn new(
        callback: Arc<dyn ProgressCallback>,
        operation: OperationType,
        total: Option<u64>,
    ) -> Self {
        Self {
            callback,
            operation,
            total,
            current: 0,
            start_time: Instant::now(),
        }
    }

    /// Record one handled item and fire the callback.
    pub(crate) fn advance(&mut self, frame_id: Option<u64>) {
        self.current += 1;
        self.report(frame_id);
    }

    /// Unconditionally emit a final report.
    pub(crate) fn finish(&mut self) {
        self.report(None);
    }

    fn report(&self, frame_id: Option<u64>) {
        let percentage = self
            .total
            .filter(|&total| total > 0)
            .map(|total| (self.current as f32 / total as f32) * 100.0);

        let info = ProgressInfo {
            operation: self.operation,
            current: self.current,
            total: self.total,
            percentage,
            elapsed: self.start_time.elapsed(),
            current_frame: frame_id,
        };

        self.callback.on_progress(&info);
    }
}
