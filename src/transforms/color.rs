//! Photometric transforms: pixel values change, geometry (and boxes) do not.

use image::{imageops, Rgb, RgbImage};
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

use super::{BoxTargets, Transform};
use crate::error::AugError;

fn clamp_u8(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

fn map_pixels(image: &RgbImage, f: impl Fn(Rgb<u8>) -> Rgb<u8>) -> RgbImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        *pixel = f(*pixel);
    }
    out
}

/// Random brightness offset combined with a random contrast factor.
pub struct RandomBrightnessContrast;

impl Transform for RandomBrightnessContrast {
    fn name(&self) -> &'static str {
        "RandomBrightnessContrast"
    }

    fn apply(
        &self,
        image: &RgbImage,
        _targets: Option<BoxTargets<'_>>,
        rng: &mut dyn RngCore,
    ) -> Result<RgbImage, AugError> {
        let brightness = rng.random_range(-0.2..=0.2) * 255.0;
        let contrast = rng.random_range(0.8..=1.2);

        Ok(map_pixels(image, |Rgb([r, g, b])| {
            let adjust = |v: u8| clamp_u8((v as f64 - 128.0) * contrast + 128.0 + brightness);
            Rgb([adjust(r), adjust(g), adjust(b)])
        }))
    }
}

/// Random brightness, contrast and hue jitter chained together.
pub struct ColorJitter;

impl Transform for ColorJitter {
    fn name(&self) -> &'static str {
        "ColorJitter"
    }

    fn apply(
        &self,
        image: &RgbImage,
        _targets: Option<BoxTargets<'_>>,
        rng: &mut dyn RngCore,
    ) -> Result<RgbImage, AugError> {
        let brightness = rng.random_range(-30..=30);
        let contrast = rng.random_range(-20.0..=20.0);
        let hue = rng.random_range(-25..=25);

        let out = imageops::brighten(image, brightness);
        let out = imageops::contrast(&out, contrast);
        Ok(imageops::huerotate(&out, hue))
    }
}

/// Hue rotation, saturation scaling and value shift.
pub struct HueSaturationValue;

impl Transform for HueSaturationValue {
    fn name(&self) -> &'static str {
        "HueSaturationValue"
    }

    fn apply(
        &self,
        image: &RgbImage,
        _targets: Option<BoxTargets<'_>>,
        rng: &mut dyn RngCore,
    ) -> Result<RgbImage, AugError> {
        let hue = rng.random_range(-20..=20);
        let saturation = rng.random_range(0.7..=1.3);
        let value = rng.random_range(-20.0..=20.0);

        let rotated = imageops::huerotate(image, hue);
        Ok(map_pixels(&rotated, |Rgb([r, g, b])| {
            let gray = 0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64;
            let adjust = |v: u8| clamp_u8(gray + (v as f64 - gray) * saturation + value);
            Rgb([adjust(r), adjust(g), adjust(b)])
        }))
    }
}

/// Independent random shift per color channel.
pub struct RgbShift;

impl Transform for RgbShift {
    fn name(&self) -> &'static str {
        "RGBShift"
    }

    fn apply(
        &self,
        image: &RgbImage,
        _targets: Option<BoxTargets<'_>>,
        rng: &mut dyn RngCore,
    ) -> Result<RgbImage, AugError> {
        let shift_r = rng.random_range(-20.0..=20.0);
        let shift_g = rng.random_range(-20.0..=20.0);
        let shift_b = rng.random_range(-20.0..=20.0);

        Ok(map_pixels(image, |Rgb([r, g, b])| {
            Rgb([
                clamp_u8(r as f64 + shift_r),
                clamp_u8(g as f64 + shift_g),
                clamp_u8(b as f64 + shift_b),
            ])
        }))
    }
}

/// Random permutation of the three color channels.
pub struct ChannelShuffle;

impl Transform for ChannelShuffle {
    fn name(&self) -> &'static str {
        "ChannelShuffle"
    }

    fn apply(
        &self,
        image: &RgbImage,
        _targets: Option<BoxTargets<'_>>,
        rng: &mut dyn RngCore,
    ) -> Result<RgbImage, AugError> {
        let mut order = [0usize, 1, 2];
        order.shuffle(rng);

        Ok(map_pixels(image, |pixel| {
            Rgb([pixel[order[0]], pixel[order[1]], pixel[order[2]]])
        }))
    }
}

/// Random gamma correction through a per-call lookup table.
pub struct RandomGamma;

impl Transform for RandomGamma {
    fn name(&self) -> &'static str {
        "RandomGamma"
    }

    fn apply(
        &self,
        image: &RgbImage,
        _targets: Option<BoxTargets<'_>>,
        rng: &mut dyn RngCore,
    ) -> Result<RgbImage, AugError> {
        let gamma = rng.random_range(0.7..=1.3);
        let mut lut = [0u8; 256];
        for (v, entry) in lut.iter_mut().enumerate() {
            *entry = clamp_u8((v as f64 / 255.0).powf(gamma) * 255.0);
        }

        Ok(map_pixels(image, |Rgb([r, g, b])| {
            Rgb([lut[r as usize], lut[g as usize], lut[b as usize]])
        }))
    }
}
