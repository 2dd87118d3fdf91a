//! The annotation store: an in-memory COCO-style detection dataset plus its
//! on-disk checkpoint.
//!
//! One [`AnnotationDataset`] exists per video. It is created empty or loaded
//! from the video's checkpoint file at pipeline start, mutated only by the
//! pipeline driver while frames are processed, and written back atomically at
//! checkpoint points and at end of stream. The serialized document keeps the
//! standard COCO top-level layout (`images`, `annotations`, `categories`) so
//! any detection-dataset consumer can read it directly.
//!
//! # Resume semantics
//!
//! A checkpoint file is self-describing: the next annotation id is always
//! recomputed from the loaded records ([`AnnotationDataset::next_id`]), never
//! persisted separately, so a checkpoint alone is sufficient to resume even
//! if all companion process state is lost.

use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{error::FramemarkError, persist::write_json_atomic};

/// Dataset-level metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetMetadata {
    /// Human-readable description of the dataset.
    pub description: String,
    /// Document format version.
    pub version: String,
    /// RFC 3339 timestamp of when the dataset was first created.
    pub created_at: String,
    /// The detection label this dataset was built for.
    pub category_name: String,
}

/// One frame that produced at least one detection.
///
/// Serialized into the COCO `images` array. At most one entry exists per
/// distinct frame id within a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameEntry {
    /// The frame identifier assigned by the keyframe extractor.
    pub id: u64,
    /// File name of the keyframe still this entry was produced from.
    pub file_name: String,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
}

/// One bounding-box detection for one object instance in one frame.
///
/// Serialized into the COCO `annotations` array. Ids are strictly increasing
/// in insertion order and never reused, even across resumed runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Unique, monotonically increasing annotation id.
    pub id: u64,
    /// Id of the frame this detection belongs to.
    pub image_id: u64,
    /// Category id; always 1 (single detection class).
    pub category_id: u32,
    /// Bounding box as `[x_min, y_min, width, height]` in absolute pixels.
    pub bbox: [u32; 4],
    /// Box area (`width * height`).
    pub area: u64,
    /// COCO crowd flag; always 0.
    pub iscrowd: u8,
}

/// The single detection category of a dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    /// Category id; always 1.
    pub id: u32,
    /// The target object label.
    pub name: String,
    /// Fixed supercategory marker.
    pub supercategory: String,
}

/// A COCO-style detection dataset for one video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationDataset {
    /// Dataset-level metadata block.
    pub metadata: DatasetMetadata,
    /// Frames with at least one detection.
    pub images: Vec<FrameEntry>,
    /// All detections, in insertion order.
    pub annotations: Vec<Detection>,
    /// Single-element category list.
    pub categories: Vec<Category>,
}

impl AnnotationDataset {
    /// Create a fresh, empty dataset for detecting `label` in `video_key`.
    pub fn new(video_key: &str, label: &str) -> Self {
        Self {
            metadata: DatasetMetadata {
                description: format!("Keyframe detections for video '{video_key}'"),
                version: "1.0".to_string(),
                created_at: Utc::now().to_rfc3339(),
                category_name: label.to_string(),
            },
            images: Vec::new(),
            annotations: Vec::new(),
            categories: vec![Category {
                id: 1,
                name: label.to_string(),
                supercategory: "object".to_string(),
            }],
        }
    }

    /// Load the checkpoint at `path`, or return a fresh dataset when the file
    /// is missing or unparsable.
    ///
    /// Parse failures are warnings, not errors: a corrupt checkpoint is
    /// treated the same as no prior checkpoint, and the run starts fresh for
    /// this video.
    pub fn load(path: &Path, video_key: &str, label: &str) -> Self {
        let contents = match std::fs::read(path) {
            Ok(contents) => contents,
            Err(_) => return Self::new(video_key, label),
        };

        match serde_json::from_slice::<Self>(&contents) {
            Ok(dataset) => {
                log::info!(
                    "Resuming dataset {} ({} frames, {} detections)",
                    path.display(),
                    dataset.images.len(),
                    dataset.annotations.len()
                );
                dataset
            }
            Err(error) => {
                log::warn!(
                    "Checkpoint {} is unreadable ({error}); starting fresh",
                    path.display()
                );
                Self::new(video_key, label)
            }
        }
    }

    /// The next free annotation id: 1 for an empty dataset, otherwise the
    /// maximum existing id plus one.
    ///
    /// Always recomputed from the records so the checkpoint stays
    /// self-describing.
    pub fn next_id(&self) -> u64 {
        self.annotations
            .iter()
            .map(|detection| detection.id)
            .max()
            .map_or(1, |max| max + 1)
    }

    /// Append a frame entry unless one with the same id already exists.
    ///
    /// The guard makes duplicate processing of a frame idempotent.
    pub fn append_frame(&mut self, frame: FrameEntry) {
        if self.images.iter().any(|existing| existing.id == frame.id) {
            log::debug!("Frame {} already recorded; skipping duplicate entry", frame.id);
            return;
        }
        self.images.push(frame);
    }

    /// Append a detection. The caller supplies an id obtained from
    /// [`next_id`](Self::next_id) at insertion time and increments its own
    /// counter, so ids within one run never collide.
    pub fn append_detection(&mut self, detection: Detection) {
        self.annotations.push(detection);
    }

    /// Write the full dataset to `path` atomically.
    pub fn checkpoint(&self, path: &Path) -> Result<(), FramemarkError> {
        write_json_atomic(path, self)
    }
}

#[cfg(test)]
mod tests {
    use super::{AnnotationDataset, Detection, FrameEntry};

    fn detection(id: u64, image_id: u64) -> Detection {
        Detection {
            id,
            image_id,
            category_id: 1,
            bbox: [10, 20, 30, 40],
            area: 30 * 40,
            iscrowd: 0,
        }
    }

    #[test]
    fn next_id_starts_at_one() {
        let dataset = AnnotationDataset::new("clip", "robot");
        assert_eq!(dataset.next_id(), 1);
    }

    #[test]
    fn next_id_follows_max_not_count() {
        let mut dataset = AnnotationDataset::new("clip", "robot");
        dataset.append_detection(detection(7, 1));
        dataset.append_detection(detection(3, 2));
        assert_eq!(dataset.next_id(), 8);
    }

    #[test]
    fn append_frame_rejects_duplicates() {
        let mut dataset = AnnotationDataset::new("clip", "robot");
        let frame = FrameEntry {
            id: 5,
            file_name: "5.jpg".to_string(),
            width: 640,
            height: 480,
        };
        dataset.append_frame(frame.clone());
        dataset.append_frame(frame);
        assert_eq!(dataset.images.len(), 1);
    }
}
