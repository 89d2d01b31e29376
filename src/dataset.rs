//! Dataset directory layout: mode detection, image enumeration, output dirs.
//!
//! Two layouts are supported. A directory containing both an `images/` and a
//! `labels/` subdirectory is a labeled dataset; anything else is treated as a
//! flat directory of images.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::AugError;

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

pub const OUTPUT_IMAGES_DIR: &str = "augmented_images";
pub const OUTPUT_LABELS_DIR: &str = "augmented_labels";

/// How a dataset directory is organized.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DatasetMode {
    /// Loose image files, no annotations.
    OnlyImages,
    /// `images/` + `labels/` subdirectories with YOLO label files.
    ImagesWithLabels,
}

/// Detect the dataset mode for a directory.
///
/// `ImagesWithLabels` iff both `<dir>/images` and `<dir>/labels` exist as
/// directories. There is no error path: a missing or unreadable directory is
/// simply `OnlyImages`.
pub fn detect_mode(directory: &Path) -> DatasetMode {
    if directory.join("images").is_dir() && directory.join("labels").is_dir() {
        DatasetMode::ImagesWithLabels
    } else {
        DatasetMode::OnlyImages
    }
}

/// The resolved directory layout for one dataset.
#[derive(Clone, Debug)]
pub struct DatasetLayout {
    pub root: PathBuf,
    pub mode: DatasetMode,
    pub images_dir: PathBuf,
    pub labels_dir: PathBuf,
    pub output_images_dir: PathBuf,
    pub output_labels_dir: PathBuf,
}

impl DatasetLayout {
    /// Resolve the layout for a dataset root, detecting its mode.
    pub fn discover(root: &Path) -> Self {
        let mode = detect_mode(root);
        let images_dir = match mode {
            DatasetMode::ImagesWithLabels => root.join("images"),
            DatasetMode::OnlyImages => root.to_path_buf(),
        };
        Self {
            root: root.to_path_buf(),
            mode,
            images_dir,
            labels_dir: root.join("labels"),
            output_images_dir: root.join(OUTPUT_IMAGES_DIR),
            output_labels_dir: root.join(OUTPUT_LABELS_DIR),
        }
    }

    /// Enumerate the dataset's images, sorted by file name.
    pub fn collect_images(&self) -> Result<Vec<PathBuf>, AugError> {
        collect_image_files(&self.images_dir)
    }

    /// Create the output directories a batch run writes into. The labels
    /// directory is only created for labeled datasets.
    pub fn create_output_dirs(&self) -> Result<(), AugError> {
        fs::create_dir_all(&self.output_images_dir)?;
        if self.mode == DatasetMode::ImagesWithLabels {
            fs::create_dir_all(&self.output_labels_dir)?;
        }
        Ok(())
    }
}

/// Collect image files directly inside `dir` (not recursive — labeled
/// datasets keep their images flat under `images/`), sorted for deterministic
/// job ordering.
fn collect_image_files(dir: &Path) -> Result<Vec<PathBuf>, AugError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).max_depth(1) {
        let entry = entry.map_err(|source| {
            AugError::Config(format!(
                "failed while scanning '{}': {source}",
                dir.display()
            ))
        })?;
        if entry.file_type().is_file() && has_image_extension(entry.path()) {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

fn has_image_extension(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };

    IMAGE_EXTENSIONS
        .iter()
        .any(|allowed| ext.eq_ignore_ascii_case(allowed))
}
