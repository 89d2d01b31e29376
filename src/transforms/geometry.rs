//! Geometric transforms: these move pixels, so they remap bounding boxes.

use image::{imageops, RgbImage};
use rand::{Rng, RngCore};

use super::{transform_error, BoxTargets, Transform};
use crate::bbox::BBox;
use crate::error::AugError;

/// A box is kept after a crop only if at least this fraction of its original
/// area stays visible.
pub const MIN_BOX_VISIBILITY: f64 = 0.1;

/// Sides smaller than this (in normalized units) count as collapsed.
const MIN_BOX_SIDE: f64 = 1e-6;

/// Mirror the image left-right.
pub struct HorizontalFlip;

impl Transform for HorizontalFlip {
    fn name(&self) -> &'static str {
        "HorizontalFlip"
    }

    fn apply(
        &self,
        image: &RgbImage,
        targets: Option<BoxTargets<'_>>,
        _rng: &mut dyn RngCore,
    ) -> Result<RgbImage, AugError> {
        if let Some((bboxes, _)) = targets {
            for bbox in bboxes.iter_mut() {
                bbox.cx = 1.0 - bbox.cx;
            }
        }
        Ok(imageops::flip_horizontal(image))
    }
}

/// Mirror the image top-bottom.
pub struct VerticalFlip;

impl Transform for VerticalFlip {
    fn name(&self) -> &'static str {
        "VerticalFlip"
    }

    fn apply(
        &self,
        image: &RgbImage,
        targets: Option<BoxTargets<'_>>,
        _rng: &mut dyn RngCore,
    ) -> Result<RgbImage, AugError> {
        if let Some((bboxes, _)) = targets {
            for bbox in bboxes.iter_mut() {
                bbox.cy = 1.0 - bbox.cy;
            }
        }
        Ok(imageops::flip_vertical(image))
    }
}

/// Apply a random symmetry of the square: one of the four right-angle
/// rotations, optionally composed with a horizontal mirror (8 outcomes, drawn
/// uniformly — identity included).
pub struct D4;

impl Transform for D4 {
    fn name(&self) -> &'static str {
        "D4"
    }

    fn apply(
        &self,
        image: &RgbImage,
        targets: Option<BoxTargets<'_>>,
        rng: &mut dyn RngCore,
    ) -> Result<RgbImage, AugError> {
        let quarter_turns = rng.random_range(0..4u8);
        let mirror = rng.random_bool(0.5);

        let rotated = match quarter_turns {
            0 => image.clone(),
            1 => imageops::rotate90(image),
            2 => imageops::rotate180(image),
            _ => imageops::rotate270(image),
        };
        let result = if mirror {
            imageops::flip_horizontal(&rotated)
        } else {
            rotated
        };

        if let Some((bboxes, _)) = targets {
            for bbox in bboxes.iter_mut() {
                let mut b = *bbox;
                b = match quarter_turns {
                    0 => b,
                    1 => BBox::new(1.0 - b.cy, b.cx, b.h, b.w),
                    2 => BBox::new(1.0 - b.cx, 1.0 - b.cy, b.w, b.h),
                    _ => BBox::new(b.cy, 1.0 - b.cx, b.h, b.w),
                };
                if mirror {
                    b.cx = 1.0 - b.cx;
                }
                *bbox = b;
            }
        }

        Ok(result)
    }
}

/// Crop a random window and renormalize boxes into it. Boxes that lose too
/// much of their area to the crop are dropped together with their class ids.
pub struct RandomCrop {
    pub min_fraction: f64,
    pub max_fraction: f64,
}

impl Default for RandomCrop {
    fn default() -> Self {
        Self {
            min_fraction: 0.6,
            max_fraction: 0.95,
        }
    }
}

impl Transform for RandomCrop {
    fn name(&self) -> &'static str {
        "RandomCrop"
    }

    fn apply(
        &self,
        image: &RgbImage,
        targets: Option<BoxTargets<'_>>,
        rng: &mut dyn RngCore,
    ) -> Result<RgbImage, AugError> {
        let (width, height) = image.dimensions();
        let crop_w = (width as f64 * rng.random_range(self.min_fraction..=self.max_fraction))
            .round() as u32;
        let crop_h = (height as f64 * rng.random_range(self.min_fraction..=self.max_fraction))
            .round() as u32;

        if crop_w == 0 || crop_h == 0 || crop_w > width || crop_h > height {
            return Err(transform_error(
                "RandomCrop",
                format!("degenerate crop region {crop_w}x{crop_h} from {width}x{height}"),
            ));
        }

        let x0 = rng.random_range(0..=(width - crop_w));
        let y0 = rng.random_range(0..=(height - crop_h));
        let cropped = imageops::crop_imm(image, x0, y0, crop_w, crop_h).to_image();

        if let Some((bboxes, classes)) = targets {
            let window = CropWindow {
                x0: x0 as f64 / width as f64,
                y0: y0 as f64 / height as f64,
                w: crop_w as f64 / width as f64,
                h: crop_h as f64 / height as f64,
            };
            remap_boxes_into_window(bboxes, classes, &window);
        }

        Ok(cropped)
    }
}

struct CropWindow {
    x0: f64,
    y0: f64,
    w: f64,
    h: f64,
}

/// Renormalize boxes into the crop window, dropping the ones that fall out.
/// Boxes and class ids stay paired: every drop removes both.
fn remap_boxes_into_window(bboxes: &mut Vec<BBox>, classes: &mut Vec<usize>, window: &CropWindow) {
    let mut kept_bboxes = Vec::with_capacity(bboxes.len());
    let mut kept_classes = Vec::with_capacity(classes.len());

    for (bbox, class_id) in bboxes.iter().zip(classes.iter()) {
        let original_area = bbox.area();
        if original_area <= 0.0 {
            continue;
        }

        let (xmin, ymin, xmax, ymax) = bbox.corners();
        let shifted = BBox::from_corners(
            (xmin - window.x0) / window.w,
            (ymin - window.y0) / window.h,
            (xmax - window.x0) / window.w,
            (ymax - window.y0) / window.h,
        );

        let Some(clipped) = shifted.clip_to_frame() else {
            continue;
        };
        if clipped.w < MIN_BOX_SIDE || clipped.h < MIN_BOX_SIDE {
            continue;
        }

        // Visible fraction of the original area, measured in source units.
        let visibility = clipped.area() * window.w * window.h / original_area;
        if visibility < MIN_BOX_VISIBILITY {
            continue;
        }

        kept_bboxes.push(clipped);
        kept_classes.push(*class_id);
    }

    *bboxes = kept_bboxes;
    *classes = kept_classes;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn gradient_image(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x * 7 % 256) as u8, (y * 11 % 256) as u8, 40])
        })
    }

    #[test]
    fn horizontal_flip_mirrors_boxes() {
        let image = gradient_image(10, 10);
        let mut bboxes = vec![BBox::new(0.2, 0.4, 0.1, 0.1)];
        let mut classes = vec![1];
        let mut rng = StdRng::seed_from_u64(0);

        let out = HorizontalFlip
            .apply(&image, Some((&mut bboxes, &mut classes)), &mut rng)
            .expect("flip");

        assert_eq!(out.dimensions(), (10, 10));
        assert!((bboxes[0].cx - 0.8).abs() < 1e-12);
        assert!((bboxes[0].cy - 0.4).abs() < 1e-12);
        assert_eq!(out.get_pixel(0, 0), image.get_pixel(9, 0));
    }

    #[test]
    fn vertical_flip_mirrors_boxes() {
        let image = gradient_image(8, 6);
        let mut bboxes = vec![BBox::new(0.5, 0.25, 0.2, 0.1)];
        let mut classes = vec![0];
        let mut rng = StdRng::seed_from_u64(0);

        VerticalFlip
            .apply(&image, Some((&mut bboxes, &mut classes)), &mut rng)
            .expect("flip");

        assert!((bboxes[0].cy - 0.75).abs() < 1e-12);
    }

    #[test]
    fn d4_keeps_box_class_pairing() {
        let image = gradient_image(12, 8);
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..16 {
            let mut bboxes = vec![BBox::new(0.25, 0.5, 0.2, 0.3), BBox::new(0.75, 0.25, 0.1, 0.1)];
            let mut classes = vec![4, 7];
            let out = D4
                .apply(&image, Some((&mut bboxes, &mut classes)), &mut rng)
                .expect("d4");

            assert_eq!(bboxes.len(), classes.len());
            assert_eq!(classes, vec![4, 7]);
            for bbox in &bboxes {
                assert!(bbox.is_normalized(), "box left the frame: {bbox:?}");
            }
            let (w, h) = out.dimensions();
            assert!(matches!((w, h), (12, 8) | (8, 12)));
        }
    }

    #[test]
    fn crop_drops_outside_boxes_in_lock_step() {
        let mut bboxes = vec![
            BBox::new(0.25, 0.25, 0.2, 0.2), // inside the window
            BBox::new(0.9, 0.9, 0.1, 0.1),   // fully outside
        ];
        let mut classes = vec![1, 2];
        let window = CropWindow {
            x0: 0.0,
            y0: 0.0,
            w: 0.5,
            h: 0.5,
        };

        remap_boxes_into_window(&mut bboxes, &mut classes, &window);

        assert_eq!(bboxes.len(), 1);
        assert_eq!(classes, vec![1]);
        assert!((bboxes[0].cx - 0.5).abs() < 1e-9);
        assert!((bboxes[0].w - 0.4).abs() < 1e-9);
    }

    #[test]
    fn crop_drops_barely_visible_boxes() {
        // Only a sliver of the box remains inside the window.
        let mut bboxes = vec![BBox::new(0.52, 0.25, 0.5, 0.2)];
        let mut classes = vec![3];
        let window = CropWindow {
            x0: 0.0,
            y0: 0.0,
            w: 0.3,
            h: 0.5,
        };

        remap_boxes_into_window(&mut bboxes, &mut classes, &window);

        assert!(bboxes.is_empty());
        assert!(classes.is_empty());
    }

    #[test]
    fn crop_fails_on_degenerate_region() {
        let image = gradient_image(1, 1);
        let crop = RandomCrop {
            min_fraction: 0.1,
            max_fraction: 0.2,
        };
        let mut rng = StdRng::seed_from_u64(5);

        let err = crop.apply(&image, None, &mut rng).unwrap_err();
        assert!(matches!(err, AugError::Transform { name: "RandomCrop", .. }));
    }

    #[test]
    fn crop_output_matches_window_dimensions() {
        let image = gradient_image(40, 30);
        let crop = RandomCrop::default();
        let mut rng = StdRng::seed_from_u64(11);

        let out = crop.apply(&image, None, &mut rng).expect("crop");
        let (w, h) = out.dimensions();
        assert!(w <= 40 && h <= 30);
        assert!(w >= 24 && h >= 18, "crop window too small: {w}x{h}");
    }
}
