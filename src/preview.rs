//! Preview rendering: box overlays and the detection-model boundary.

use image::{Rgb, RgbImage};

use crate::bbox::BBox;
use crate::error::AugError;

const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const BOX_THICKNESS: u32 = 2;

/// The call boundary to an external object-detection model.
///
/// Implementations load their weights however they like; the preview path
/// only needs one call that annotates an image and returns the detections as
/// normalized boxes. The batch engine never uses this.
pub trait Detector {
    fn detect(&mut self, image: &RgbImage) -> Result<(RgbImage, Vec<BBox>), AugError>;
}

/// Return a copy of `image` with box outlines drawn on it.
pub fn draw_boxes(image: &RgbImage, bboxes: &[BBox]) -> RgbImage {
    let mut out = image.clone();
    for bbox in bboxes {
        draw_box(&mut out, bbox);
    }
    out
}

fn draw_box(image: &mut RgbImage, bbox: &BBox) {
    let (width, height) = image.dimensions();
    let (xmin, ymin, xmax, ymax) = bbox.corners();

    let x0 = to_pixel(xmin, width);
    let y0 = to_pixel(ymin, height);
    let x1 = to_pixel(xmax, width);
    let y1 = to_pixel(ymax, height);

    for t in 0..BOX_THICKNESS {
        for x in x0..=x1 {
            put_clamped(image, x, y0.saturating_add(t));
            put_clamped(image, x, y1.saturating_sub(t));
        }
        for y in y0..=y1 {
            put_clamped(image, x0.saturating_add(t), y);
            put_clamped(image, x1.saturating_sub(t), y);
        }
    }
}

fn to_pixel(normalized: f64, extent: u32) -> u32 {
    let scaled = (normalized * extent as f64).round();
    scaled.clamp(0.0, extent.saturating_sub(1) as f64) as u32
}

fn put_clamped(image: &mut RgbImage, x: u32, y: u32) {
    let (width, height) = image.dimensions();
    if x < width && y < height {
        image.put_pixel(x, y, BOX_COLOR);
    }
}
