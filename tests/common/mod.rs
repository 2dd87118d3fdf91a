//! Stub collaborators shared by the integration tests.
//!
//! The pipeline only talks to its frame source and detector through narrow
//! traits, so the tests substitute in-memory stand-ins: a source that writes
//! synthetic stills into the requested directory, and a scripted detector
//! keyed by frame id.

// Not every test binary exercises every helper.
#![allow(dead_code)]

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    path::Path,
};

use framemark::{
    frame_id_from_path, Detector, FramemarkError, FrameSource, Keyframe, RawDetection,
};
use image::DynamicImage;

/// A frame source producing synthetic stills of a fixed size.
///
/// Records every sensitivity it was invoked with, and can be configured to
/// yield nothing above a cutoff sensitivity to exercise the relaxed retry.
pub struct StubSource {
    /// Frame id → image dimensions.
    pub frames: BTreeMap<u64, (u32, u32)>,
    /// Yield zero frames when invoked with a sensitivity above this value.
    pub empty_above: Option<f32>,
    /// Sensitivities of every `extract` call, in order.
    pub calls: Vec<f32>,
}

impl StubSource {
    pub fn new(frames: &[(u64, u32, u32)]) -> Self {
        Self {
            frames: frames
                .iter()
                .map(|&(id, width, height)| (id, (width, height)))
                .collect(),
            empty_above: None,
            calls: Vec::new(),
        }
    }
}

impl FrameSource for StubSource {
    fn extract(
        &mut self,
        _video: &Path,
        output_dir: &Path,
        sensitivity: f32,
    ) -> Result<Vec<Keyframe>, FramemarkError> {
        self.calls.push(sensitivity);

        if let Some(cutoff) = self.empty_above {
            if sensitivity > cutoff {
                return Ok(Vec::new());
            }
        }

        std::fs::create_dir_all(output_dir)?;
        let mut keyframes = Vec::new();
        for (&frame_id, &(width, height)) in &self.frames {
            let path = output_dir.join(format!("{frame_id}.png"));
            DynamicImage::new_rgb8(width, height).save(&path)?;
            keyframes.push(Keyframe { frame_id, path });
        }
        Ok(keyframes)
    }
}

/// A detector scripted per frame id.
pub struct StubDetector {
    /// Frame id → detections to return. Missing ids return an empty list.
    pub results: HashMap<u64, Vec<RawDetection>>,
    /// Frame ids whose detector call fails outright.
    pub fail_ids: HashSet<u64>,
    /// Frame ids of every `detect` call, in order.
    pub calls: Vec<u64>,
}

impl StubDetector {
    pub fn empty() -> Self {
        Self {
            results: HashMap::new(),
            fail_ids: HashSet::new(),
            calls: Vec::new(),
        }
    }

    /// Return `boxes` (complete normalized geometry) for `frame_id`.
    pub fn with_boxes(mut self, frame_id: u64, boxes: &[(f64, f64, f64, f64)]) -> Self {
        let detections = boxes
            .iter()
            .map(|&(x_min, y_min, x_max, y_max)| RawDetection {
                x_min: Some(x_min),
                y_min: Some(y_min),
                x_max: Some(x_max),
                y_max: Some(y_max),
            })
            .collect();
        self.results.insert(frame_id, detections);
        self
    }

    /// Make `frame_id`'s detector call fail.
    pub fn with_failure(mut self, frame_id: u64) -> Self {
        self.fail_ids.insert(frame_id);
        self
    }
}

impl Detector for StubDetector {
    fn detect(
        &mut self,
        image: &Path,
        _label: &str,
    ) -> Result<Vec<RawDetection>, FramemarkError> {
        let frame_id = frame_id_from_path(image).expect("stub stills carry frame ids");
        self.calls.push(frame_id);

        if self.fail_ids.contains(&frame_id) {
            return Err(FramemarkError::DetectorFailure(format!(
                "scripted failure for frame {frame_id}"
            )));
        }
        Ok(self.results.get(&frame_id).cloned().unwrap_or_default())
    }
}
