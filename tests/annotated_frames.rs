//! Annotated-frame output tests: the optional rendering side channel.

mod common;

use common::{StubDetector, StubSource};
use framemark::{PipelineOptions, VideoPipeline};

#[test]
fn detected_frames_are_rendered_when_enabled() {
    let dir = tempfile::tempdir().unwrap();
    let options = PipelineOptions::new("robot")
        .with_output_root(dir.path())
        .with_save_frames(true);

    let mut source = StubSource::new(&[(1, 64, 64), (2, 64, 64)]);
    let mut detector = StubDetector::empty().with_boxes(1, &[(0.1, 0.1, 0.5, 0.5)]);

    VideoPipeline::new(&mut source, &mut detector, options.clone())
        .run("clip.mp4".as_ref())
        .unwrap();

    let frames_dir = options.frames_dir("clip");
    // One file per frame with >= 1 detection, named by frame id.
    assert!(frames_dir.join("000001.png").exists());
    assert!(!frames_dir.join("000002.png").exists());
}

#[test]
fn nothing_is_rendered_when_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let options = PipelineOptions::new("robot").with_output_root(dir.path());

    let mut source = StubSource::new(&[(1, 64, 64)]);
    let mut detector = StubDetector::empty().with_boxes(1, &[(0.1, 0.1, 0.5, 0.5)]);

    VideoPipeline::new(&mut source, &mut detector, options.clone())
        .run("clip.mp4".as_ref())
        .unwrap();

    assert!(!options.frames_dir("clip").exists());
}
