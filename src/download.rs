//! Video download via the external `yt-dlp` binary.
//!
//! A thin collaborator wrapper: given a URL and a destination directory,
//! [`VideoFetcher`] invokes `yt-dlp` with an id-based output template and the
//! usual best-mp4-with-audio format selector. `yt-dlp` itself skips downloads
//! that are already complete, so a session can be re-run without re-fetching.

use std::{path::Path, process::Command, sync::Arc};

use crate::{
    error::FramemarkError,
    progress::{OperationType, ProgressCallback, ProgressReporter},
};

const FORMAT_SELECTOR: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best";

/// Downloads videos by invoking an external downloader command.
#[derive(Debug, Clone)]
pub struct VideoFetcher {
    program: String,
}

impl VideoFetcher {
    /// Create a fetcher invoking `yt-dlp` from `PATH`.
    pub fn new() -> Self {
        Self::with_program("yt-dlp")
    }

    /// Create a fetcher invoking `program` (a name on `PATH` or a full path).
    /// The program must accept yt-dlp's `-f`/`-o` flags.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Download `url` into `dest_dir`.
    ///
    /// Files are named `<video id>.<ext>` inside `dest_dir`. Errors carry the
    /// tool's stderr.
    pub fn fetch(&self, url: &str, dest_dir: &Path) -> Result<(), FramemarkError> {
        let download_error = |reason: String| FramemarkError::DownloadFailed {
            url: url.to_string(),
            reason,
        };

        std::fs::create_dir_all(dest_dir).map_err(|error| download_error(error.to_string()))?;

        let template = dest_dir.join("%(id)s.%(ext)s");
        log::info!("Downloading {url} into {}", dest_dir.display());

        let output = Command::new(&self.program)
            .args(["-f", FORMAT_SELECTOR, "-o"])
            .arg(&template)
            .arg(url)
            .output()
            .map_err(|error| {
                download_error(format!("failed to spawn '{}': {error}", self.program))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(download_error(format!(
                "'{}' exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        Ok(())
    }

    /// Download every URL in turn, reporting one unit of progress per
    /// completed download. Stops at the first failure.
    pub fn fetch_all(
        &self,
        urls: &[String],
        dest_dir: &Path,
        progress: Arc<dyn ProgressCallback>,
    ) -> Result<(), FramemarkError> {
        let mut reporter = ProgressReporter::new(
            progress,
            OperationType::Download,
            Some(urls.len() as u64),
        );
        for url in urls {
            self.fetch(url, dest_dir)?;
            reporter.advance(None);
        }
        Ok(())
    }
}

impl Default for VideoFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use crate::progress::{OperationType, ProgressCallback, ProgressInfo};

    use super::VideoFetcher;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<(OperationType, u64, Option<f32>)>>,
    }

    impl ProgressCallback for Recorder {
        fn on_progress(&self, info: &ProgressInfo) {
            self.events
                .lock()
                .unwrap()
                .push((info.operation, info.current, info.percentage));
        }
    }

    #[test]
    fn fetch_all_reports_one_download_event_per_url() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = Arc::new(Recorder::default());
        // `true` accepts and ignores the downloader flags.
        let fetcher = VideoFetcher::with_program("true");

        let urls = vec![
            "https://a.example/1".to_string(),
            "https://a.example/2".to_string(),
        ];
        let callback: Arc<dyn ProgressCallback> = recorder.clone();
        fetcher.fetch_all(&urls, dir.path(), callback).unwrap();

        let events = recorder.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], (OperationType::Download, 1, Some(50.0)));
        assert_eq!(events[1], (OperationType::Download, 2, Some(100.0)));
    }

    #[test]
    fn fetch_failure_carries_the_url() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = VideoFetcher::with_program("framemark-no-such-downloader");
        let error = fetcher
            .fetch("https://a.example/1", dir.path())
            .unwrap_err();
        assert!(error.to_string().contains("https://a.example/1"));
    }
}
