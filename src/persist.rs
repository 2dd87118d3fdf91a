//! Atomic JSON persistence.
//!
//! Both durable stores (the per-video annotation checkpoint and the shared
//! progress file) are written through [`write_json_atomic`], which serializes
//! to a temporary sibling file and renames it into place. A process kill
//! mid-write therefore leaves either the old complete file or the new
//! complete file on disk, never a truncated one.

use std::{fs, path::Path};

use serde::Serialize;

use crate::error::FramemarkError;

/// Serialize `value` as pretty-printed JSON and atomically replace `path`.
///
/// The temporary file lives in the same directory as `path` so the final
/// rename stays on one filesystem. Parent directories are created as needed.
/// Failures are reported as [`FramemarkError::CheckpointWrite`] with the
/// destination path attached.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), FramemarkError> {
    let checkpoint_error = |reason: String| FramemarkError::CheckpointWrite {
        path: path.to_path_buf(),
        reason,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|error| checkpoint_error(error.to_string()))?;
        }
    }

    let json = serde_json::to_vec_pretty(value)
        .map_err(|error| checkpoint_error(error.to_string()))?;

    let mut temp_path = path.as_os_str().to_owned();
    temp_path.push(".tmp");
    let temp_path = Path::new(&temp_path);

    fs::write(temp_path, &json).map_err(|error| checkpoint_error(error.to_string()))?;
    fs::rename(temp_path, path).map_err(|error| {
        // Leave no stray temp file behind on a failed rename.
        let _ = fs::remove_file(temp_path);
        checkpoint_error(error.to_string())
    })?;

    log::debug!("Checkpoint written: {} ({} bytes)", path.display(), json.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::write_json_atomic;

    #[test]
    fn write_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/state.json");

        write_json_atomic(&path, &serde_json::json!({"ok": true})).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("\"ok\""));
    }

    #[test]
    fn write_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        write_json_atomic(&path, &serde_json::json!({"generation": 1})).unwrap();
        write_json_atomic(&path, &serde_json::json!({"generation": 2})).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("\"generation\": 2"));
        // No temp file left behind.
        assert!(!path.with_extension("json.tmp").exists());
    }
}
