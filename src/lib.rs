//! # framemark
//!
//! Build resumable, COCO-style object-detection datasets from video
//! keyframes.
//!
//! `framemark` ingests video files, extracts representative keyframes via an
//! external transcoder, runs an object-detection call against each keyframe,
//! and accumulates the results into a persisted annotation dataset. The
//! pipeline checkpoints its state as it goes and can be killed and restarted
//! at any point: already-processed frames are skipped on the next run without
//! invoking the detector again, and the checkpoint files are written with
//! atomic-replace semantics so an interruption never leaves a corrupt or
//! truncated document behind.
//!
//! ## Quick Start
//!
//! ```no_run
//! use framemark::{
//!     CommandDetector, FfmpegExtractor, PipelineOptions, VideoPipeline,
//! };
//!
//! let options = PipelineOptions::new("robot")
//!     .with_output_root("dataset")
//!     .with_save_frames(true);
//!
//! let mut source = FfmpegExtractor::new();
//! let mut detector = CommandDetector::new("moondream-detect");
//!
//! let mut pipeline = VideoPipeline::new(&mut source, &mut detector, options);
//! let summary = pipeline.run("videos/clip.mp4".as_ref()).unwrap();
//! println!("{} new detection(s)", summary.new_detections);
//! ```
//!
//! ## Resume model
//!
//! Two documents are persisted per session, always dataset first:
//!
//! - a per-video **annotation checkpoint**: a standard COCO detection
//!   document (`images`, `annotations`, `categories`), self-describing
//!   enough that the next annotation id is recomputed from it on load;
//! - a shared **progress file** mapping each video key to the set of frame
//!   ids whose detector call has completed, maintained with a
//!   read-merge-write cycle so concurrent sessions over different videos
//!   never clobber each other's entries.
//!
//! A frame is marked processed only after a *completed* detector call
//! (successful but empty results count, failed calls do not), which makes
//! rerunning the pipeline idempotent.
//!
//! ## External collaborators
//!
//! Keyframe extraction shells out to `ffmpeg` ([`FfmpegExtractor`]), object
//! detection to a configurable model command ([`CommandDetector`]), and video
//! download to `yt-dlp` ([`VideoFetcher`]). Each sits behind a narrow trait
//! or configurable command so the pipeline core can be exercised without any
//! of them installed.

pub mod annotate;
pub mod configuration;
pub mod dataset;
pub mod detector;
pub mod download;
pub mod error;
pub mod keyframes;
pub mod persist;
pub mod pipeline;
pub mod progress;
pub mod progress_log;

pub use annotate::{draw_boxes, save_annotated};
pub use configuration::{video_key, BoxStyle, PipelineOptions};
pub use dataset::{AnnotationDataset, Category, DatasetMetadata, Detection, FrameEntry};
pub use detector::{CommandDetector, Detector, PixelBBox, RawDetection};
pub use download::VideoFetcher;
pub use error::FramemarkError;
pub use keyframes::{frame_id_from_path, FfmpegExtractor, FrameSource, Keyframe};
pub use pipeline::{PipelineState, RunSummary, VideoPipeline};
pub use progress::{OperationType, ProgressCallback, ProgressInfo};
pub use progress_log::ProgressLog;
