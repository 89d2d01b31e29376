//! Quality-degradation transforms: noise, blur, dropout, downscaling.

use image::{imageops, imageops::FilterType, Rgb, RgbImage};
use rand::{Rng, RngCore};

use super::{BoxTargets, Transform};
use crate::error::AugError;

fn clamp_u8(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Standard normal draw via the Box-Muller transform.
fn gaussian(rng: &mut dyn RngCore) -> f64 {
    let u1: f64 = 1.0 - rng.random::<f64>();
    let u2: f64 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

/// Sensor-style noise: shared luminance noise per pixel plus weaker
/// independent color noise per channel.
pub struct IsoNoise;

impl Transform for IsoNoise {
    fn name(&self) -> &'static str {
        "ISONoise"
    }

    fn apply(
        &self,
        image: &RgbImage,
        _targets: Option<BoxTargets<'_>>,
        rng: &mut dyn RngCore,
    ) -> Result<RgbImage, AugError> {
        let luma_sigma = rng.random_range(2.0..=10.0);
        let color_sigma = rng.random_range(1.0..=5.0);

        let mut out = image.clone();
        for pixel in out.pixels_mut() {
            let luma = gaussian(rng) * luma_sigma;
            let Rgb([r, g, b]) = *pixel;
            *pixel = Rgb([
                clamp_u8(r as f64 + luma + gaussian(rng) * color_sigma),
                clamp_u8(g as f64 + luma + gaussian(rng) * color_sigma),
                clamp_u8(b as f64 + luma + gaussian(rng) * color_sigma),
            ]);
        }
        Ok(out)
    }
}

/// Directional box blur along a random horizontal or vertical line.
pub struct MotionBlur;

impl Transform for MotionBlur {
    fn name(&self) -> &'static str {
        "MotionBlur"
    }

    fn apply(
        &self,
        image: &RgbImage,
        _targets: Option<BoxTargets<'_>>,
        rng: &mut dyn RngCore,
    ) -> Result<RgbImage, AugError> {
        let kernel: i64 = 2 * rng.random_range(1..=3i64) + 1;
        let horizontal = rng.random_bool(0.5);
        let half = kernel / 2;

        let (width, height) = image.dimensions();
        let mut out = RgbImage::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let mut sums = [0.0f64; 3];
                for offset in -half..=half {
                    let (sx, sy) = if horizontal {
                        ((x as i64 + offset).clamp(0, width as i64 - 1), y as i64)
                    } else {
                        (x as i64, (y as i64 + offset).clamp(0, height as i64 - 1))
                    };
                    let sample = image.get_pixel(sx as u32, sy as u32);
                    for (sum, channel) in sums.iter_mut().zip(sample.0) {
                        *sum += channel as f64;
                    }
                }
                let divisor = kernel as f64;
                out.put_pixel(
                    x,
                    y,
                    Rgb([
                        clamp_u8(sums[0] / divisor),
                        clamp_u8(sums[1] / divisor),
                        clamp_u8(sums[2] / divisor),
                    ]),
                );
            }
        }
        Ok(out)
    }
}

/// Unsharp-mask sharpening with a random radius.
pub struct Sharpen;

impl Transform for Sharpen {
    fn name(&self) -> &'static str {
        "Sharpen"
    }

    fn apply(
        &self,
        image: &RgbImage,
        _targets: Option<BoxTargets<'_>>,
        rng: &mut dyn RngCore,
    ) -> Result<RgbImage, AugError> {
        let sigma = rng.random_range(0.5..=1.5);
        let threshold = rng.random_range(0..=3);
        Ok(imageops::unsharpen(image, sigma, threshold))
    }
}

/// Blank out a handful of random rectangular holes.
pub struct CoarseDropout;

impl Transform for CoarseDropout {
    fn name(&self) -> &'static str {
        "CoarseDropout"
    }

    fn apply(
        &self,
        image: &RgbImage,
        _targets: Option<BoxTargets<'_>>,
        rng: &mut dyn RngCore,
    ) -> Result<RgbImage, AugError> {
        let (width, height) = image.dimensions();
        let holes = rng.random_range(1..=8usize);

        let mut out = image.clone();
        for _ in 0..holes {
            let hole_w = ((width as f64 * rng.random_range(0.05..=0.15)) as u32).max(1);
            let hole_h = ((height as f64 * rng.random_range(0.05..=0.15)) as u32).max(1);
            let hole_w = hole_w.min(width);
            let hole_h = hole_h.min(height);
            let x0 = rng.random_range(0..=(width - hole_w));
            let y0 = rng.random_range(0..=(height - hole_h));

            for y in y0..y0 + hole_h {
                for x in x0..x0 + hole_w {
                    out.put_pixel(x, y, Rgb([0, 0, 0]));
                }
            }
        }
        Ok(out)
    }
}

/// Zero out individual pixels with a small random probability.
pub struct PixelDropout;

impl Transform for PixelDropout {
    fn name(&self) -> &'static str {
        "PixelDropout"
    }

    fn apply(
        &self,
        image: &RgbImage,
        _targets: Option<BoxTargets<'_>>,
        rng: &mut dyn RngCore,
    ) -> Result<RgbImage, AugError> {
        let drop_chance = rng.random_range(0.005..=0.03);

        let mut out = image.clone();
        for pixel in out.pixels_mut() {
            if rng.random_bool(drop_chance) {
                *pixel = Rgb([0, 0, 0]);
            }
        }
        Ok(out)
    }
}

/// Downscale and re-upscale with nearest-neighbor filtering, losing detail.
pub struct Downscale;

impl Transform for Downscale {
    fn name(&self) -> &'static str {
        "Downscale"
    }

    fn apply(
        &self,
        image: &RgbImage,
        _targets: Option<BoxTargets<'_>>,
        rng: &mut dyn RngCore,
    ) -> Result<RgbImage, AugError> {
        let scale = rng.random_range(0.25..=0.5);
        let (width, height) = image.dimensions();
        let small_w = ((width as f64 * scale) as u32).max(1);
        let small_h = ((height as f64 * scale) as u32).max(1);

        let small = imageops::resize(image, small_w, small_h, FilterType::Nearest);
        Ok(imageops::resize(&small, width, height, FilterType::Nearest))
    }
}
