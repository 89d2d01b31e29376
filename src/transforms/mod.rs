//! The augmentation transform catalog.
//!
//! Every transform is an opaque operation on an RGB image. Geometric
//! transforms additionally remap any bounding boxes through the same spatial
//! change, dropping boxes (and their class ids, in lock-step) that leave the
//! visible frame. Photometric transforms never touch boxes.
//!
//! Magnitudes are drawn per call from the supplied RNG; the per-call
//! *activation* probability is not handled here but by the pipeline stage
//! wrapping each transform.

mod color;
mod degrade;
mod geometry;

use image::RgbImage;
use rand::RngCore;

use crate::bbox::BBox;
use crate::error::AugError;

pub use geometry::MIN_BOX_VISIBILITY;

/// Mutable access to the paired box/class sequences threaded through
/// geometric transforms.
pub type BoxTargets<'a> = (&'a mut Vec<BBox>, &'a mut Vec<usize>);

/// One augmentation operation.
pub trait Transform: Send + Sync {
    /// The configuration name of this transform.
    fn name(&self) -> &'static str;

    /// Apply the transform to `image`, remapping `targets` when the
    /// transform is geometric. After a successful call the two target
    /// sequences are equal in length.
    fn apply(
        &self,
        image: &RgbImage,
        targets: Option<BoxTargets<'_>>,
        rng: &mut dyn RngCore,
    ) -> Result<RgbImage, AugError>;
}

/// The closed set of recognized augmentation names, in catalog order.
pub const KNOWN_TRANSFORMS: [&str; 16] = [
    "HorizontalFlip",
    "VerticalFlip",
    "D4",
    "RandomCrop",
    "RandomBrightnessContrast",
    "ColorJitter",
    "HueSaturationValue",
    "RGBShift",
    "ChannelShuffle",
    "RandomGamma",
    "ISONoise",
    "MotionBlur",
    "Sharpen",
    "CoarseDropout",
    "PixelDropout",
    "Downscale",
];

/// Whether `name` is part of the recognized set.
pub fn is_known_transform(name: &str) -> bool {
    KNOWN_TRANSFORMS.contains(&name)
}

/// Instantiate a transform by its configuration name.
pub fn build_transform(name: &str) -> Option<Box<dyn Transform>> {
    let transform: Box<dyn Transform> = match name {
        "HorizontalFlip" => Box::new(geometry::HorizontalFlip),
        "VerticalFlip" => Box::new(geometry::VerticalFlip),
        "D4" => Box::new(geometry::D4),
        "RandomCrop" => Box::new(geometry::RandomCrop::default()),
        "RandomBrightnessContrast" => Box::new(color::RandomBrightnessContrast),
        "ColorJitter" => Box::new(color::ColorJitter),
        "HueSaturationValue" => Box::new(color::HueSaturationValue),
        "RGBShift" => Box::new(color::RgbShift),
        "ChannelShuffle" => Box::new(color::ChannelShuffle),
        "RandomGamma" => Box::new(color::RandomGamma),
        "ISONoise" => Box::new(degrade::IsoNoise),
        "MotionBlur" => Box::new(degrade::MotionBlur),
        "Sharpen" => Box::new(degrade::Sharpen),
        "CoarseDropout" => Box::new(degrade::CoarseDropout),
        "PixelDropout" => Box::new(degrade::PixelDropout),
        "Downscale" => Box::new(degrade::Downscale),
        _ => return None,
    };
    Some(transform)
}

pub(crate) fn transform_error(name: &'static str, message: impl Into<String>) -> AugError {
    AugError::Transform {
        name,
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn every_known_name_builds() {
        for name in KNOWN_TRANSFORMS {
            let transform = build_transform(name)
                .unwrap_or_else(|| panic!("'{name}' should build a transform"));
            assert_eq!(transform.name(), name);
        }
    }

    #[test]
    fn unknown_names_do_not_build() {
        assert!(build_transform("Teleport").is_none());
        assert!(!is_known_transform("Teleport"));
    }

    #[test]
    fn photometric_transforms_keep_dimensions_and_boxes() {
        let image = RgbImage::from_fn(16, 12, |x, y| image::Rgb([x as u8 * 10, y as u8 * 10, 128]));
        let mut rng = StdRng::seed_from_u64(7);

        for name in [
            "RandomBrightnessContrast",
            "ColorJitter",
            "HueSaturationValue",
            "RGBShift",
            "ChannelShuffle",
            "RandomGamma",
            "ISONoise",
            "MotionBlur",
            "Sharpen",
            "CoarseDropout",
            "PixelDropout",
            "Downscale",
        ] {
            let transform = build_transform(name).expect("known transform");
            let mut bboxes = vec![BBox::new(0.5, 0.5, 0.2, 0.2)];
            let mut classes = vec![3];
            let out = transform
                .apply(&image, Some((&mut bboxes, &mut classes)), &mut rng)
                .unwrap_or_else(|e| panic!("'{name}' failed: {e}"));

            assert_eq!(out.dimensions(), image.dimensions(), "{name}");
            assert_eq!(bboxes, vec![BBox::new(0.5, 0.5, 0.2, 0.2)], "{name}");
            assert_eq!(classes, vec![3], "{name}");
        }
    }
}
