//! Run configuration: the augmentation spec plus batch parameters.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::AugError;
use crate::transforms;

pub const DEFAULT_PROBABILITY: f64 = 0.3;
pub const DEFAULT_AUGMENTATIONS_PER_IMAGE: usize = 3;
pub const DEFAULT_WORKERS: usize = 12;
pub const MIN_WORKERS: usize = 1;
pub const MAX_WORKERS: usize = 64;

/// Per-augmentation toggle and activation probability.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AugSetting {
    pub enabled: bool,
    pub probability: f64,
}

impl Default for AugSetting {
    fn default() -> Self {
        Self {
            enabled: true,
            probability: DEFAULT_PROBABILITY,
        }
    }
}

/// Ordered mapping from augmentation name to its setting.
///
/// Insertion order is the order transforms are chained in, so it is part of
/// the configuration's meaning.
pub type AugmentationSpec = IndexMap<String, AugSetting>;

/// Full configuration for a batch run, loadable from a YAML file.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AugmentConfig {
    /// Augmentations in chaining order.
    pub augmentations: AugmentationSpec,

    /// How many augmented variants to produce per input image.
    pub augmentations_per_image: usize,

    /// Worker threads for the batch engine, clamped to `[1, 64]`.
    pub workers: usize,

    /// Optional seed for reproducible runs. Unseeded runs draw from the
    /// thread RNG.
    pub seed: Option<u64>,
}

impl Default for AugmentConfig {
    fn default() -> Self {
        let augmentations = transforms::KNOWN_TRANSFORMS
            .iter()
            .map(|name| (name.to_string(), AugSetting::default()))
            .collect();

        Self {
            augmentations,
            augmentations_per_image: DEFAULT_AUGMENTATIONS_PER_IMAGE,
            workers: DEFAULT_WORKERS,
            seed: None,
        }
    }
}

impl AugmentConfig {
    /// Load and validate a configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self, AugError> {
        let content = fs::read_to_string(path)?;
        let config: AugmentConfig = serde_yaml::from_str(&content)
            .map_err(|source| AugError::Config(format!("{}: {source}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Check name, probability and count constraints.
    pub fn validate(&self) -> Result<(), AugError> {
        for (name, setting) in &self.augmentations {
            if !transforms::is_known_transform(name) {
                return Err(AugError::UnknownAugmentation(name.clone()));
            }
            if !(0.0..=1.0).contains(&setting.probability) {
                return Err(AugError::Config(format!(
                    "probability for '{}' is {}; must be within [0, 1]",
                    name, setting.probability
                )));
            }
        }

        if self.augmentations_per_image == 0 {
            return Err(AugError::Config(
                "augmentations_per_image must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Worker count clamped to the supported range.
    pub fn effective_workers(&self) -> usize {
        self.workers.clamp(MIN_WORKERS, MAX_WORKERS)
    }
}
