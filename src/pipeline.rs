//! Building and invoking the augmentation pipeline.
//!
//! A pipeline is an ordered chain of probabilistic stages built from an
//! [`AugmentationSpec`]. Each stage rolls its own independent activation
//! chance on every invocation, so two calls with the same inputs generally
//! produce different outputs.

use std::fmt;

use image::RgbImage;
use rand::{Rng, RngCore};

use crate::bbox::BBox;
use crate::config::AugmentationSpec;
use crate::dataset::DatasetMode;
use crate::error::AugError;
use crate::transforms::{self, Transform};

struct Stage {
    probability: f64,
    transform: Box<dyn Transform>,
}

/// An executable transform chain, fixed at build time.
pub struct Pipeline {
    stages: Vec<Stage>,
    mode: DatasetMode,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages.len())
            .field("mode", &self.mode)
            .finish()
    }
}

impl Pipeline {
    /// Build a pipeline from the enabled entries of `spec`, in insertion
    /// order. Disabled entries are omitted entirely. An empty result is legal
    /// and acts as the identity.
    pub fn build(spec: &AugmentationSpec, mode: DatasetMode) -> Result<Self, AugError> {
        let mut stages = Vec::new();
        for (name, setting) in spec {
            if !setting.enabled {
                continue;
            }
            let transform = transforms::build_transform(name)
                .ok_or_else(|| AugError::UnknownAugmentation(name.clone()))?;
            stages.push(Stage {
                probability: setting.probability,
                transform,
            });
        }

        Ok(Self { stages, mode })
    }

    #[cfg(test)]
    pub(crate) fn from_stages(
        stages: Vec<(f64, Box<dyn Transform>)>,
        mode: DatasetMode,
    ) -> Self {
        Self {
            stages: stages
                .into_iter()
                .map(|(probability, transform)| Stage {
                    probability,
                    transform,
                })
                .collect(),
            mode,
        }
    }

    pub fn mode(&self) -> DatasetMode {
        self.mode
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Run the chain once.
    ///
    /// Boxes and class ids are threaded through (and possibly reduced by)
    /// geometric stages only when the pipeline was built for
    /// [`DatasetMode::ImagesWithLabels`] and both sequences are present;
    /// otherwise the returned box/class slots are `None`. The two input
    /// slices must be equal in length.
    pub fn apply(
        &self,
        rng: &mut dyn RngCore,
        image: &RgbImage,
        bboxes: Option<&[BBox]>,
        classes: Option<&[usize]>,
    ) -> Result<(RgbImage, Option<Vec<BBox>>, Option<Vec<usize>>), AugError> {
        let mut targets = match (self.mode, bboxes, classes) {
            (DatasetMode::ImagesWithLabels, Some(bboxes), Some(classes)) => {
                debug_assert_eq!(bboxes.len(), classes.len());
                Some((bboxes.to_vec(), classes.to_vec()))
            }
            _ => None,
        };

        let mut current = image.clone();
        for stage in &self.stages {
            if rng.random::<f64>() >= stage.probability {
                continue;
            }

            current = match targets.as_mut() {
                Some((bboxes, classes)) => {
                    let out = stage.transform.apply(&current, Some((bboxes, classes)), rng)?;
                    if bboxes.len() != classes.len() {
                        return Err(AugError::Transform {
                            name: stage.transform.name(),
                            message: format!(
                                "box/class sequences diverged: {} vs {}",
                                bboxes.len(),
                                classes.len()
                            ),
                        });
                    }
                    out
                }
                None => stage.transform.apply(&current, None, rng)?,
            };
        }

        match targets {
            Some((bboxes, classes)) => Ok((current, Some(bboxes), Some(classes))),
            None => Ok((current, None, None)),
        }
    }
}
