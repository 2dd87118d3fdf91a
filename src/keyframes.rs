//! The frame source: keyframe extraction via the external `ffmpeg` binary.
//!
//! Extraction is delegated to a transcoder process that writes still images
//! into a per-video directory, one file per keyframe, with the frame number
//! encoded in the file name. The pipeline only depends on the narrow
//! [`FrameSource`] trait, so tests substitute an in-memory source and never
//! need ffmpeg installed.
//!
//! [`FfmpegExtractor`] selects frames that are either codec-level reference
//! frames (`pict_type == I`) or scene changes above the configured
//! sensitivity, matching the filter expression
//! `select='eq(pict_type,I)+gt(scene,t)'`.

use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
};

use crate::error::FramemarkError;

/// One extracted keyframe still on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyframe {
    /// Frame identifier parsed from the still's file name.
    pub frame_id: u64,
    /// Path of the still image.
    pub path: PathBuf,
}

/// A producer of ordered `(frame id, still image)` pairs for a video.
///
/// `sensitivity` is the scene-change threshold in [0, 1]; lower values
/// produce more frames. Implementations return an empty vector when the
/// extractor produced nothing; the pipeline treats that as an extraction
/// failure and retries once with a relaxed sensitivity.
pub trait FrameSource {
    /// Materialize the keyframes of `video` into `output_dir`, sorted by
    /// ascending frame id.
    fn extract(
        &mut self,
        video: &Path,
        output_dir: &Path,
        sensitivity: f32,
    ) -> Result<Vec<Keyframe>, FramemarkError>;
}

/// [`FrameSource`] backed by the system `ffmpeg` binary.
#[derive(Debug, Clone)]
pub struct FfmpegExtractor {
    /// Name or path of the ffmpeg executable.
    program: String,
}

impl FfmpegExtractor {
    /// Create an extractor using `ffmpeg` from `PATH`.
    pub fn new() -> Self {
        Self {
            program: "ffmpeg".to_string(),
        }
    }

    /// Override the ffmpeg executable (name on `PATH` or full path).
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn run_ffmpeg(
        &self,
        video: &Path,
        output_dir: &Path,
        sensitivity: f32,
    ) -> Result<(), FramemarkError> {
        let extraction_error = |reason: String| FramemarkError::ExtractionFailed {
            path: video.to_path_buf(),
            reason,
        };

        // Clear any stills from a previous attempt so a relaxed retry starts
        // from a clean slate.
        if output_dir.exists() {
            fs::remove_dir_all(output_dir)
                .map_err(|error| extraction_error(error.to_string()))?;
        }
        fs::create_dir_all(output_dir).map_err(|error| extraction_error(error.to_string()))?;

        let filter = format!("select='eq(pict_type,I)+gt(scene,{sensitivity})'");
        let pattern = output_dir.join("%d.jpg");

        log::debug!(
            "Running {} on {} (sensitivity {sensitivity})",
            self.program,
            video.display()
        );

        let output = Command::new(&self.program)
            .arg("-i")
            .arg(video)
            .args(["-vf", &filter, "-vsync", "0", "-frame_pts", "1", "-q:v", "2"])
            .arg(&pattern)
            .output()
            .map_err(|error| extraction_error(format!("failed to spawn ffmpeg: {error}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(extraction_error(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(())
    }

    fn collect_stills(&self, output_dir: &Path) -> Result<Vec<Keyframe>, FramemarkError> {
        let mut keyframes = Vec::new();

        for entry in fs::read_dir(output_dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            match frame_id_from_path(&path) {
                Some(frame_id) => keyframes.push(Keyframe { frame_id, path }),
                None => {
                    log::warn!(
                        "Ignoring still with unparsable frame id: {}",
                        path.display()
                    );
                }
            }
        }

        keyframes.sort_by_key(|keyframe| keyframe.frame_id);
        Ok(keyframes)
    }
}

impl Default for FfmpegExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for FfmpegExtractor {
    fn extract(
        &mut self,
        video: &Path,
        output_dir: &Path,
        sensitivity: f32,
    ) -> Result<Vec<Keyframe>, FramemarkError> {
        self.run_ffmpeg(video, output_dir, sensitivity)?;
        let keyframes = self.collect_stills(output_dir)?;
        log::info!(
            "Extracted {} keyframe(s) from {} into {}",
            keyframes.len(),
            video.display(),
            output_dir.display()
        );
        Ok(keyframes)
    }
}

/// Parse the frame id from a still's file name: the trailing run of ASCII
/// digits in the file stem. Accepts both the extractor's `<id>.jpg` form and
/// the `<anything>_<id>.jpg` form.
pub fn frame_id_from_path(path: &Path) -> Option<u64> {
    let stem = path.file_stem()?.to_str()?;
    let digits: String = stem
        .chars()
        .rev()
        .take_while(|character| character.is_ascii_digit())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}
