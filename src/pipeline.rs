//! The pipeline driver.
//!
//! [`VideoPipeline`] orchestrates one video end to end: frame source →
//! detector → annotation store / progress log, applying the skip-if-done and
//! checkpoint-every-K policies that make the pipeline resumable.
//!
//! # State machine
//!
//! Each run moves through `NotStarted → Extracting → Detecting → Finalized`.
//! Extraction failure (zero frames even after one relaxed retry) is terminal
//! `Failed` and no detection is attempted. A single frame's detector failure
//! is never fatal: the frame is logged, left unmarked, and retried on the
//! next run.
//!
//! # Checkpoint ordering
//!
//! Both stores are checkpointed every K processed frames and once more at end
//! of stream, always dataset first, progress second. On crash recovery the
//! progress set therefore never claims a frame "done" whose annotations were
//! not durably saved; the reverse order would allow exactly that omission.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    annotate::{draw_boxes, save_annotated},
    configuration::{video_key, PipelineOptions},
    dataset::{AnnotationDataset, Detection, FrameEntry},
    detector::Detector,
    error::FramemarkError,
    keyframes::FrameSource,
    progress::{NoOpProgress, OperationType, ProgressCallback, ProgressReporter},
    progress_log::ProgressLog,
};

/// Video file extensions the batch driver picks up.
const VIDEO_EXTENSIONS: [&str; 4] = ["mp4", "avi", "mov", "mkv"];

/// Sensitivity step and floor for the single relaxed extraction retry.
const RELAX_STEP: f32 = 0.1;
const RELAX_FLOOR: f32 = 0.1;

/// Where a pipeline run currently is, or how it ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Nothing has happened yet.
    NotStarted,
    /// The frame source is materializing keyframes.
    Extracting,
    /// Keyframes are being run through the detector.
    Detecting,
    /// The run completed and both stores were finally checkpointed.
    Finalized,
    /// Extraction produced no frames even after the relaxed retry.
    Failed,
}

/// Outcome of one pipeline run over one video.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// The video that was processed.
    pub video: PathBuf,
    /// Stable key the video's checkpoint and progress entries live under.
    pub video_key: String,
    /// Terminal state of the run.
    pub state: PipelineState,
    /// Keyframes the frame source produced.
    pub keyframes: usize,
    /// Frames whose detector call completed during this run.
    pub processed: u64,
    /// Frames skipped because a previous run already processed them.
    pub skipped: u64,
    /// Frames whose detector call failed; they stay unmarked and will be
    /// retried on the next run.
    pub failed_frames: u64,
    /// Detections appended to the dataset during this run.
    pub new_detections: u64,
    /// Error message, present only when `state` is [`PipelineState::Failed`].
    pub error: Option<String>,
}

/// The resumable annotation pipeline for videos.
///
/// Generic over its two external collaborators so tests can substitute
/// in-memory stand-ins. The detector is borrowed mutably for the whole
/// pipeline lifetime: it is a heavyweight single-consumer resource, loaded
/// once and reused across all frames and all videos.
pub struct VideoPipeline<'a, S: FrameSource, D: Detector> {
    source: &'a mut S,
    detector: &'a mut D,
    options: PipelineOptions,
    progress: Arc<dyn ProgressCallback>,
}

impl<'a, S: FrameSource, D: Detector> VideoPipeline<'a, S, D> {
    /// Create a pipeline over the given collaborators and options.
    pub fn new(source: &'a mut S, detector: &'a mut D, options: PipelineOptions) -> Self {
        Self {
            source,
            detector,
            options,
            progress: Arc::new(NoOpProgress),
        }
    }

    /// Attach a progress callback, fired once per handled frame.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Process every video file in `dir` sequentially.
    ///
    /// Per-video failures (extraction or checkpointing) are captured in the
    /// returned summaries and the batch continues with the next video.
    /// Returns an error only when `dir` contains no video files at all.
    pub fn run_batch(&mut self, dir: &Path) -> Result<Vec<RunSummary>, FramemarkError> {
        let mut videos: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| is_video_file(path))
            .collect();
        videos.sort();

        if videos.is_empty() {
            return Err(FramemarkError::NoVideos(dir.to_path_buf()));
        }

        let mut summaries = Vec::with_capacity(videos.len());
        for video in videos {
            log::info!("Processing video: {}", video.display());
            let summary = match self.run(&video) {
                Ok(summary) => summary,
                Err(error) => {
                    log::error!("Video {} failed: {error}", video.display());
                    RunSummary {
                        video_key: video_key(&video),
                        video,
                        state: PipelineState::Failed,
                        keyframes: 0,
                        processed: 0,
                        skipped: 0,
                        failed_frames: 0,
                        new_detections: 0,
                        error: Some(error.to_string()),
                    }
                }
            };
            summaries.push(summary);
        }
        Ok(summaries)
    }

    /// Process one video end to end.
    ///
    /// Loads (or freshly creates) the video's annotation dataset and progress
    /// set, extracts keyframes, runs the detector over every not-yet-processed
    /// frame, and checkpoints both stores every K processed frames and at end
    /// of stream. Fatal errors are extraction failure and checkpoint write
    /// failure; detector failures are per-frame and non-fatal.
    pub fn run(&mut self, video: &Path) -> Result<RunSummary, FramemarkError> {
        let key = video_key(video);
        let checkpoint_path = self.options.checkpoint_path(&key);
        let progress_path = self.options.progress_path();

        let mut dataset = AnnotationDataset::load(&checkpoint_path, &key, &self.options.label);
        let mut progress_log = ProgressLog::load(&progress_path, &key);

        let mut summary = RunSummary {
            video: video.to_path_buf(),
            video_key: key.clone(),
            state: PipelineState::Extracting,
            keyframes: 0,
            processed: 0,
            skipped: 0,
            failed_frames: 0,
            new_detections: 0,
            error: None,
        };

        // Extraction is one opaque external call, so it reports as a single
        // unit of work.
        let mut extraction = ProgressReporter::new(
            Arc::clone(&self.progress),
            OperationType::KeyframeExtraction,
            Some(1),
        );
        let keyframes = self.extract_with_retry(video, &key)?;
        extraction.advance(None);
        summary.keyframes = keyframes.len();
        summary.state = PipelineState::Detecting;

        let mut reporter = ProgressReporter::new(
            Arc::clone(&self.progress),
            OperationType::Detection,
            Some(keyframes.len() as u64),
        );

        // Local id counter for this run, seeded from the loaded dataset.
        let mut next_detection_id = dataset.next_id();
        let mut since_checkpoint = 0_u64;

        for keyframe in &keyframes {
            if progress_log.contains(keyframe.frame_id) {
                // Resume fast path: no detector call at all.
                summary.skipped += 1;
                reporter.advance(Some(keyframe.frame_id));
                continue;
            }

            let image = match image::open(&keyframe.path) {
                Ok(image) => image,
                Err(error) => {
                    log::warn!(
                        "Frame {} unreadable ({error}); will retry next run",
                        keyframe.frame_id
                    );
                    summary.failed_frames += 1;
                    reporter.advance(Some(keyframe.frame_id));
                    continue;
                }
            };

            let raw = match self.detector.detect(&keyframe.path, &self.options.label) {
                Ok(raw) => raw,
                Err(error) => {
                    log::warn!(
                        "Detector failed on frame {} ({error}); will retry next run",
                        keyframe.frame_id
                    );
                    summary.failed_frames += 1;
                    reporter.advance(Some(keyframe.frame_id));
                    continue;
                }
            };

            let (image_width, image_height) = (image.width(), image.height());
            let mut boxes = Vec::with_capacity(raw.len());
            for object in &raw {
                match object.pixel_bbox(image_width, image_height) {
                    Some(bbox) => boxes.push(bbox),
                    None => {
                        log::warn!(
                            "Dropping detection without box geometry on frame {}",
                            keyframe.frame_id
                        );
                    }
                }
            }

            if !boxes.is_empty() {
                dataset.append_frame(FrameEntry {
                    id: keyframe.frame_id,
                    file_name: file_name_of(&keyframe.path),
                    width: image_width,
                    height: image_height,
                });

                for bbox in &boxes {
                    dataset.append_detection(Detection {
                        id: next_detection_id,
                        image_id: keyframe.frame_id,
                        category_id: 1,
                        bbox: [bbox.x_min, bbox.y_min, bbox.width, bbox.height],
                        area: bbox.area(),
                        iscrowd: 0,
                    });
                    next_detection_id += 1;
                    summary.new_detections += 1;
                }

                if self.options.save_frames {
                    let annotated = draw_boxes(&image, &boxes, &self.options.box_style);
                    save_annotated(
                        &self.options.frames_dir(&key),
                        keyframe.frame_id,
                        &annotated,
                    )?;
                }
            }

            // The detector call completed (found something or not), so the
            // frame counts as processed. Failed calls never reach this point.
            progress_log.mark_processed(keyframe.frame_id);
            summary.processed += 1;
            since_checkpoint += 1;
            reporter.advance(Some(keyframe.frame_id));

            if since_checkpoint >= self.options.checkpoint_interval {
                self.checkpoint_both(&dataset, &checkpoint_path, &progress_log, &progress_path)?;
                since_checkpoint = 0;
            }
        }

        // Final checkpoint regardless of how much accumulated since the last
        // periodic one.
        self.checkpoint_both(&dataset, &checkpoint_path, &progress_log, &progress_path)?;
        reporter.finish();

        summary.state = PipelineState::Finalized;
        log::info!(
            "Finalized '{key}': {} processed, {} skipped, {} failed, {} new detection(s)",
            summary.processed,
            summary.skipped,
            summary.failed_frames,
            summary.new_detections
        );
        Ok(summary)
    }

    /// Extract keyframes, retrying once with a relaxed sensitivity when the
    /// extractor yields zero frames. An explicit retry budget of one, not a
    /// loop to arbitrary depth.
    fn extract_with_retry(
        &mut self,
        video: &Path,
        key: &str,
    ) -> Result<Vec<crate::keyframes::Keyframe>, FramemarkError> {
        let output_dir = self.options.keyframes_dir(key);
        let sensitivity = self.options.scene_sensitivity;

        let keyframes = self.source.extract(video, &output_dir, sensitivity)?;
        if !keyframes.is_empty() {
            return Ok(keyframes);
        }

        let relaxed = (sensitivity - RELAX_STEP).max(RELAX_FLOOR);
        log::warn!(
            "No keyframes at sensitivity {sensitivity}; retrying once at {relaxed}"
        );

        let keyframes = self.source.extract(video, &output_dir, relaxed)?;
        if keyframes.is_empty() {
            return Err(FramemarkError::ExtractionFailed {
                path: video.to_path_buf(),
                reason: format!(
                    "no keyframes extracted at sensitivity {sensitivity} or {relaxed}"
                ),
            });
        }
        Ok(keyframes)
    }

    /// Checkpoint the dataset first, then the progress log.
    fn checkpoint_both(
        &self,
        dataset: &AnnotationDataset,
        checkpoint_path: &Path,
        progress_log: &ProgressLog,
        progress_path: &Path,
    ) -> Result<(), FramemarkError> {
        dataset.checkpoint(checkpoint_path)?;
        progress_log.checkpoint(progress_path)?;
        Ok(())
    }
}

fn is_video_file(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    path.extension()
        .and_then(|extension| extension.to_str())
        .map(|extension| {
            let extension = extension.to_ascii_lowercase();
            VIDEO_EXTENSIONS.contains(&extension.as_str())
        })
        .unwrap_or(false)
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::is_video_file;

    #[test]
    fn video_extension_matching_is_case_insensitive() {
        // is_video_file also checks existence, so exercise the extension
        // logic through paths in a real tempdir.
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.MP4", "b.mkv", "c.MoV", "d.txt", "e"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        assert!(is_video_file(&dir.path().join("a.MP4")));
        assert!(is_video_file(&dir.path().join("b.mkv")));
        assert!(is_video_file(&dir.path().join("c.MoV")));
        assert!(!is_video_file(&dir.path().join("d.txt")));
        assert!(!is_video_file(&dir.path().join("e")));
        assert!(!is_video_file(Path::new("missing.mp4")));
    }
}
