//! Normalized bounding boxes in YOLO center-width-height format.

use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box in normalized `(cx, cy, w, h)` format.
///
/// All four fields are fractions of the image dimensions, nominally in
/// `[0, 1]`. The type does NOT enforce the range in its constructor: label
/// files written by other tools can carry slightly out-of-range values, and
/// geometric transforms produce intermediate boxes outside the frame before
/// clipping. Validation and clipping are explicit operations.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub cx: f64,
    pub cy: f64,
    pub w: f64,
    pub h: f64,
}

impl BBox {
    /// Creates a box from center coordinates and extents.
    #[inline]
    pub fn new(cx: f64, cy: f64, w: f64, h: f64) -> Self {
        Self { cx, cy, w, h }
    }

    /// Creates a box from corner coordinates (xmin, ymin, xmax, ymax).
    #[inline]
    pub fn from_corners(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            cx: (xmin + xmax) / 2.0,
            cy: (ymin + ymax) / 2.0,
            w: xmax - xmin,
            h: ymax - ymin,
        }
    }

    /// Returns the box as corner coordinates (xmin, ymin, xmax, ymax).
    #[inline]
    pub fn corners(&self) -> (f64, f64, f64, f64) {
        (
            self.cx - self.w / 2.0,
            self.cy - self.h / 2.0,
            self.cx + self.w / 2.0,
            self.cy + self.h / 2.0,
        )
    }

    /// Returns the area of the box in normalized units.
    #[inline]
    pub fn area(&self) -> f64 {
        self.w * self.h
    }

    /// Returns true if all fields are finite and within `[0, 1]`, with
    /// non-negative extents.
    pub fn is_normalized(&self) -> bool {
        let (xmin, ymin, xmax, ymax) = self.corners();
        self.w >= 0.0
            && self.h >= 0.0
            && [xmin, ymin, xmax, ymax].iter().all(|v| v.is_finite())
            && xmin >= -1e-9
            && ymin >= -1e-9
            && xmax <= 1.0 + 1e-9
            && ymax <= 1.0 + 1e-9
    }

    /// Clips the box to the unit frame. Returns `None` when nothing of the
    /// box remains visible.
    pub fn clip_to_frame(&self) -> Option<BBox> {
        let (xmin, ymin, xmax, ymax) = self.corners();
        let xmin = xmin.max(0.0);
        let ymin = ymin.max(0.0);
        let xmax = xmax.min(1.0);
        let ymax = ymax.min(1.0);
        if xmax - xmin <= 0.0 || ymax - ymin <= 0.0 {
            return None;
        }
        Some(BBox::from_corners(xmin, ymin, xmax, ymax))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_roundtrip() {
        let bbox = BBox::new(0.5, 0.5, 0.2, 0.4);
        let (xmin, ymin, xmax, ymax) = bbox.corners();
        assert!((xmin - 0.4).abs() < 1e-12);
        assert!((ymin - 0.3).abs() < 1e-12);
        assert!((xmax - 0.6).abs() < 1e-12);
        assert!((ymax - 0.7).abs() < 1e-12);

        let restored = BBox::from_corners(xmin, ymin, xmax, ymax);
        assert!((restored.cx - bbox.cx).abs() < 1e-12);
        assert!((restored.w - bbox.w).abs() < 1e-12);
    }

    #[test]
    fn clip_keeps_inner_box_unchanged() {
        let bbox = BBox::new(0.5, 0.5, 0.2, 0.2);
        let clipped = bbox.clip_to_frame().expect("box is fully visible");
        assert_eq!(clipped, bbox);
    }

    #[test]
    fn clip_trims_overhanging_box() {
        let bbox = BBox::new(0.0, 0.5, 0.4, 0.2);
        let clipped = bbox.clip_to_frame().expect("half the box is visible");
        let (xmin, _, xmax, _) = clipped.corners();
        assert!(xmin.abs() < 1e-12);
        assert!((xmax - 0.2).abs() < 1e-12);
    }

    #[test]
    fn clip_drops_box_outside_frame() {
        let bbox = BBox::new(1.5, 0.5, 0.2, 0.2);
        assert!(bbox.clip_to_frame().is_none());
    }

    #[test]
    fn normalized_check() {
        assert!(BBox::new(0.5, 0.5, 0.2, 0.2).is_normalized());
        assert!(!BBox::new(0.95, 0.5, 0.2, 0.2).is_normalized());
        assert!(!BBox::new(0.5, 0.5, -0.1, 0.2).is_normalized());
    }
}
