//! The detector: an external object-detection collaborator.
//!
//! The detection model is a heavyweight, stateful, single-consumer resource.
//! It lives behind the narrow [`Detector`] trait: given a keyframe still and
//! a target label, it returns zero or more objects, each *optionally*
//! carrying four normalized coordinate fields. Objects missing any field are
//! dropped by the caller, per the interface contract.
//!
//! [`CommandDetector`] is the shipped implementation. It invokes a configured
//! external program as `<program> <image> <label>` and parses its stdout as a
//! JSON array of detection objects, e.g.:
//!
//! ```json
//! [{"x_min": 0.1, "y_min": 0.2, "x_max": 0.5, "y_max": 0.6}]
//! ```
//!
//! The model process stays loaded on the other side of that boundary and is
//! reused across all frames and all videos in a session.

use std::{path::Path, process::Command};

use serde::Deserialize;

use crate::error::FramemarkError;

/// One raw detection as returned by the model.
///
/// All coordinate fields are normalized to [0, 1] and optional: a model may
/// emit objects without box geometry, which callers ignore.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct RawDetection {
    /// Normalized left edge.
    #[serde(default)]
    pub x_min: Option<f64>,
    /// Normalized top edge.
    #[serde(default)]
    pub y_min: Option<f64>,
    /// Normalized right edge.
    #[serde(default)]
    pub x_max: Option<f64>,
    /// Normalized bottom edge.
    #[serde(default)]
    pub y_max: Option<f64>,
}

/// A bounding box in absolute pixel units: `(x_min, y_min, width, height)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBBox {
    /// Left edge in pixels.
    pub x_min: u32,
    /// Top edge in pixels.
    pub y_min: u32,
    /// Box width in pixels.
    pub width: u32,
    /// Box height in pixels.
    pub height: u32,
}

impl PixelBBox {
    /// Box area in pixels.
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl RawDetection {
    /// Convert to absolute pixel coordinates for an image of the given size.
    ///
    /// Each normalized coordinate is multiplied by the image dimension and
    /// truncated: `px_min = floor(x_min * width)`, and the box extent is
    /// `floor(x_max * width) - px_min` (same for y/height). Returns `None`
    /// when any of the four fields is absent.
    pub fn pixel_bbox(&self, image_width: u32, image_height: u32) -> Option<PixelBBox> {
        let (x_min, y_min, x_max, y_max) =
            (self.x_min?, self.y_min?, self.x_max?, self.y_max?);

        let px_min = (x_min * f64::from(image_width)) as u32;
        let py_min = (y_min * f64::from(image_height)) as u32;
        let px_max = (x_max * f64::from(image_width)) as u32;
        let py_max = (y_max * f64::from(image_height)) as u32;

        Some(PixelBBox {
            x_min: px_min,
            y_min: py_min,
            width: px_max.saturating_sub(px_min),
            height: py_max.saturating_sub(py_min),
        })
    }
}

/// An object-detection collaborator.
///
/// Implementations take `&mut self` because the underlying model is a
/// single-consumer resource; the pipeline never issues concurrent calls.
pub trait Detector {
    /// Detect instances of `label` in the still image at `image`.
    ///
    /// Returns an empty vector when nothing was found; errors indicate the
    /// call itself failed and the frame should be retried on a later run.
    fn detect(
        &mut self,
        image: &Path,
        label: &str,
    ) -> Result<Vec<RawDetection>, FramemarkError>;
}

/// [`Detector`] backed by an external command.
#[derive(Debug, Clone)]
pub struct CommandDetector {
    program: String,
}

impl CommandDetector {
    /// Create a detector invoking `program` (a name on `PATH` or a full
    /// path). The program receives the image path and the label as its two
    /// arguments and must print a JSON array of detections on stdout.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Detector for CommandDetector {
    fn detect(
        &mut self,
        image: &Path,
        label: &str,
    ) -> Result<Vec<RawDetection>, FramemarkError> {
        let output = Command::new(&self.program)
            .arg(image)
            .arg(label)
            .output()
            .map_err(|error| {
                FramemarkError::DetectorFailure(format!(
                    "failed to spawn '{}': {error}",
                    self.program
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FramemarkError::DetectorFailure(format!(
                "'{}' exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        serde_json::from_slice(&output.stdout).map_err(|error| {
            FramemarkError::DetectorFailure(format!(
                "'{}' returned malformed JSON: {error}",
                self.program
            ))
        })
    }
}
