//! Pipeline configuration.
//!
//! [`PipelineOptions`] is a builder that carries the full configuration
//! surface of a processing session (target label, checkpoint cadence, scene
//! sensitivity, rendering style, output layout) without polluting every
//! function signature.
//!
//! # Example
//!
//! ```
//! use framemark::{BoxStyle, PipelineOptions};
//!
//! let options = PipelineOptions::new("robot")
//!     .with_output_root("dataset")
//!     .with_checkpoint_interval(25)
//!     .with_scene_sensitivity(0.4)
//!     .with_save_frames(true)
//!     .with_box_style(BoxStyle::new([255, 0, 0, 255], 3));
//! ```

use std::path::{Path, PathBuf};

use image::Rgba;

/// Rendering style for bounding boxes drawn on annotated frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxStyle {
    /// Outline color (RGBA).
    pub color: Rgba<u8>,
    /// Outline stroke width in pixels. Clamped to a minimum of 1.
    pub width: u32,
}

impl BoxStyle {
    /// Create a style from an RGBA color and stroke width.
    pub fn new(color: [u8; 4], width: u32) -> Self {
        Self {
            color: Rgba(color),
            width: width.max(1),
        }
    }

    /// Parse a color name or `#rrggbb` hex string.
    ///
    /// Recognized names: red, green, blue, yellow, cyan, magenta, white,
    /// black. Returns `None` for anything else.
    pub fn parse_color(value: &str) -> Option<[u8; 4]> {
        match value.to_ascii_lowercase().as_str() {
            "red" => Some([255, 0, 0, 255]),
            "green" => Some([0, 255, 0, 255]),
            "blue" => Some([0, 0, 255, 255]),
            "yellow" => Some([255, 255, 0, 255]),
            "cyan" => Some([0, 255, 255, 255]),
            "magenta" => Some([255, 0, 255, 255]),
            "white" => Some([255, 255, 255, 255]),
            "black" => Some([0, 0, 0, 255]),
            hex => {
                let hex = hex.strip_prefix('#')?;
                // Length alone is not enough: a 6-byte multi-byte string
                // would pass it and the digit slices below would split a
                // character.
                if hex.len() != 6 || !hex.is_ascii() {
                    return None;
                }
                let red = u8::from_str_radix(&hex[0..2], 16).ok()?;
                let green = u8::from_str_radix(&hex[2..4], 16).ok()?;
                let blue = u8::from_str_radix(&hex[4..6], 16).ok()?;
                Some([red, green, blue, 255])
            }
        }
    }
}

impl Default for BoxStyle {
    /// Red outline, 3 pixels wide.
    fn default() -> Self {
        Self::new([255, 0, 0, 255], 3)
    }
}

/// Configuration for a processing session.
///
/// All settings besides the target label have defaults matching the values
/// the pipeline was tuned with: checkpoint every 10 frames, scene sensitivity
/// 0.3, annotated-frame saving off.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Target object label passed to the detector and recorded as the
    /// dataset's single category name.
    pub label: String,
    /// Checkpoint both stores every N processed frames. Clamped to ≥ 1.
    pub checkpoint_interval: u64,
    /// Scene-change sensitivity handed to the keyframe extractor, in [0, 1].
    /// Lower values extract more frames.
    pub scene_sensitivity: f32,
    /// When `true`, frames with at least one detection are rendered with
    /// bounding boxes and saved under the output root.
    pub save_frames: bool,
    /// Bounding-box rendering style.
    pub box_style: BoxStyle,
    /// Root directory for all pipeline output (checkpoints, progress file,
    /// keyframe stills, annotated frames).
    pub output_root: PathBuf,
}

impl PipelineOptions {
    /// Create options for detecting `label` with default settings.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            checkpoint_interval: 10,
            scene_sensitivity: 0.3,
            save_frames: false,
            box_style: BoxStyle::default(),
            output_root: PathBuf::from("framemark"),
        }
    }

    /// Set the checkpoint cadence (every N processed frames).
    /// Clamped to a minimum of 1.
    #[must_use]
    pub fn with_checkpoint_interval(mut self, interval: u64) -> Self {
        self.checkpoint_interval = interval.max(1);
        self
    }

    /// Set the scene-change sensitivity. Clamped to [0, 1].
    #[must_use]
    pub fn with_scene_sensitivity(mut self, sensitivity: f32) -> Self {
        self.scene_sensitivity = sensitivity.clamp(0.0, 1.0);
        self
    }

    /// Enable or disable saving annotated copies of detected frames.
    #[must_use]
    pub fn with_save_frames(mut self, save: bool) -> Self {
        self.save_frames = save;
        self
    }

    /// Set the bounding-box rendering style.
    #[must_use]
    pub fn with_box_style(mut self, style: BoxStyle) -> Self {
        self.box_style = style;
        self
    }

    /// Set the output root directory.
    #[must_use]
    pub fn with_output_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.output_root = root.into();
        self
    }

    /// Path of the per-video annotation checkpoint for `video_key`.
    pub fn checkpoint_path(&self, video_key: &str) -> PathBuf {
        self.output_root
            .join("annotations")
            .join(format!("{video_key}.json"))
    }

    /// Path of the shared progress file for the whole session.
    pub fn progress_path(&self) -> PathBuf {
        self.output_root.join("progress.json")
    }

    /// Directory the keyframe extractor writes stills into for `video_key`.
    pub fn keyframes_dir(&self, video_key: &str) -> PathBuf {
        self.output_root.join("keyframes").join(video_key)
    }

    /// Directory annotated frames are saved into for `video_key`.
    pub fn frames_dir(&self, video_key: &str) -> PathBuf {
        self.output_root.join("frames").join(video_key)
    }
}

/// Derive the stable video key for a video path: the file name without its
/// extension. Keys index both the checkpoint files and the shared progress
/// file, so they must not change between runs.
pub fn video_key(video_path: &Path) -> String {
    video_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string())
}
