//! Bounding-box rendering.
//!
//! When frame saving is enabled, every frame with at least one detection is
//! rendered with its boxes drawn on a copy and saved under a per-video output
//! directory, named by frame id. The source keyframe still is never modified.

use std::path::{Path, PathBuf};

use image::{DynamicImage, Rgba, RgbaImage};

use crate::{configuration::BoxStyle, detector::PixelBBox, error::FramemarkError};

/// Draw `boxes` onto a copy of `image` using `style`.
pub fn draw_boxes(image: &DynamicImage, boxes: &[PixelBBox], style: &BoxStyle) -> RgbaImage {
    let mut canvas = image.to_rgba8();
    for bbox in boxes {
        draw_rectangle(&mut canvas, bbox, style.color, style.width);
    }
    canvas
}

/// Save an annotated frame as `<frames_dir>/<frame_id:06>.png`, creating the
/// directory as needed. Returns the path written.
pub fn save_annotated(
    frames_dir: &Path,
    frame_id: u64,
    annotated: &RgbaImage,
) -> Result<PathBuf, FramemarkError> {
    std::fs::create_dir_all(frames_dir)?;
    let path = frames_dir.join(format!("{frame_id:06}.png"));
    annotated.save(&path)?;
    log::debug!("Saved annotated frame {frame_id} to {}", path.display());
    Ok(path)
}

fn draw_rectangle(canvas: &mut RgbaImage, bbox: &PixelBBox, color: Rgba<u8>, stroke: u32) {
    let (canvas_width, canvas_height) = canvas.dimensions();
    if canvas_width == 0 || canvas_height == 0 {
        return;
    }

    let x_max = bbox.x_min.saturating_add(bbox.width);
    let y_max = bbox.y_min.saturating_add(bbox.height);

    for band in 0..stroke {
        // Horizontal edges.
        for x in bbox.x_min..=x_max.min(canvas_width.saturating_sub(1)) {
            let top = bbox.y_min.saturating_add(band);
            if top < canvas_height {
                canvas.put_pixel(x, top, color);
            }
            let bottom = y_max.saturating_sub(band);
            if bottom < canvas_height {
                canvas.put_pixel(x, bottom, color);
            }
        }
        // Vertical edges.
        for y in bbox.y_min..=y_max.min(canvas_height.saturating_sub(1)) {
            let left = bbox.x_min.saturating_add(band);
            if left < canvas_width {
                canvas.put_pixel(left, y, color);
            }
            let right = x_max.saturating_sub(band);
            if right < canvas_width {
                canvas.put_pixel(right, y, color);
            }
        }
    }
}
