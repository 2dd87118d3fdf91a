//! The progress tracker: per-video sets of already-processed frame ids.
//!
//! One shared progress file covers every video processed in a session. It is
//! a JSON mapping from video key to a sorted array of frame ids. On resume
//! the pipeline skips any frame whose id is already in its video's set,
//! without invoking the detector.
//!
//! # Write discipline
//!
//! Marking a frame processed is a pure in-memory mutation. The file is only
//! rewritten by [`ProgressLog::checkpoint`], which re-reads the shared file,
//! replaces just this video's entry, and writes the merged document
//! atomically. The merge step is required because other runs in the same
//! session may have updated other videos' entries since we loaded the file.
//!
//! The pipeline always checkpoints the annotation dataset *before* the
//! progress log, so a crash between the two writes can only lose progress
//! marks, never annotations that the marks claim exist.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::Path,
};

use crate::{error::FramemarkError, persist::write_json_atomic};

type ProgressDocument = BTreeMap<String, BTreeSet<u64>>;

/// Processed-frame tracking for one video, backed by the shared session
/// progress file.
#[derive(Debug, Clone)]
pub struct ProgressLog {
    video_key: String,
    processed: BTreeSet<u64>,
}

impl ProgressLog {
    /// Load the processed set for `video_key` from the shared file at `path`.
    ///
    /// A missing or unparsable file yields an empty set; corruption is logged
    /// as a warning and treated as "no prior progress", mirroring the
    /// annotation store's load policy.
    pub fn load(path: &Path, video_key: &str) -> Self {
        let processed = read_document(path)
            .and_then(|mut document| document.remove(video_key))
            .unwrap_or_default();

        if !processed.is_empty() {
            log::info!(
                "Resuming '{video_key}': {} frame(s) already processed",
                processed.len()
            );
        }

        Self {
            video_key: video_key.to_string(),
            processed,
        }
    }

    /// Start with an empty set, without touching the filesystem.
    pub fn empty(video_key: &str) -> Self {
        Self {
            video_key: video_key.to_string(),
            processed: BTreeSet::new(),
        }
    }

    /// Mark `frame_id` as processed. In-memory only; no I/O.
    pub fn mark_processed(&mut self, frame_id: u64) {
        self.processed.insert(frame_id);
    }

    /// Whether `frame_id` has already been processed. This is the resume
    /// fast path: the pipeline makes no detector call for such frames.
    pub fn contains(&self, frame_id: u64) -> bool {
        self.processed.contains(&frame_id)
    }

    /// Number of processed frames recorded for this video.
    pub fn len(&self) -> usize {
        self.processed.len()
    }

    /// Whether no frames have been processed yet.
    pub fn is_empty(&self) -> bool {
        self.processed.is_empty()
    }

    /// The processed frame ids, ascending.
    pub fn frame_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.processed.iter().copied()
    }

    /// Persist this video's set into the shared file at `path`.
    ///
    /// Read-merge-write: the file is re-read so entries for other videos
    /// written by other runs are preserved, then only this video's entry is
    /// replaced, and the merged document is written atomically.
    pub fn checkpoint(&self, path: &Path) -> Result<(), FramemarkError> {
        let mut document = read_document(path).unwrap_or_default();
        document.insert(self.video_key.clone(), self.processed.clone());
        write_json_atomic(path, &document)
    }
}

fn read_document(path: &Path) -> Option<ProgressDocument> {
    let contents = std::fs::read(path).ok()?;
    match serde_json::from_slice(&contents) {
        Ok(document) => Some(document),
        Err(error) => {
            log::warn!(
                "Progress file {} is unreadable ({error}); treating as empty",
                path.display()
            );
            None
        }
    }
}
