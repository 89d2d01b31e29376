//! The bounded-retry wrapper around one pipeline invocation.
//!
//! Probabilistic transforms can fail on configuration edge cases (a crop
//! window that degenerates to zero pixels, for instance). Since every
//! invocation re-rolls its randomness, retrying with identical inputs is a
//! legitimate recovery, bounded so a deterministic failure cannot spin.

use image::RgbImage;
use log::debug;
use rand::RngCore;

use crate::bbox::BBox;
use crate::pipeline::Pipeline;

/// Default retry budget per augmentation attempt.
pub const MAX_ATTEMPTS: usize = 3;

/// What one augmentation attempt produced.
#[derive(Debug)]
pub enum AttemptOutcome {
    /// The pipeline succeeded; these are the transformed outputs.
    Augmented {
        image: RgbImage,
        bboxes: Option<Vec<BBox>>,
        classes: Option<Vec<usize>>,
    },
    /// Every attempt failed. The caller keeps its original image and must
    /// not persist anything for this iteration.
    Exhausted,
}

/// Invoke `pipeline` up to `max_attempts` times with identical inputs,
/// returning the first success.
pub fn attempt_augmentation(
    pipeline: &Pipeline,
    rng: &mut dyn RngCore,
    image: &RgbImage,
    bboxes: Option<&[BBox]>,
    classes: Option<&[usize]>,
    max_attempts: usize,
) -> AttemptOutcome {
    for attempt in 1..=max_attempts.max(1) {
        match pipeline.apply(rng, image, bboxes, classes) {
            Ok((image, bboxes, classes)) => {
                return AttemptOutcome::Augmented {
                    image,
                    bboxes,
                    classes,
                };
            }
            Err(err) => {
                debug!("augmentation attempt {attempt}/{max_attempts} failed: {err}");
            }
        }
    }

    AttemptOutcome::Exhausted
}
