#![allow(dead_code)]

use std::fs;
use std::path::Path;

use image::{Rgb, RgbImage};

/// Write a small uniform-color image. Uniform frames survive JPEG
/// re-encoding exactly, which keeps pixel-identity assertions meaningful for
/// every supported extension.
pub fn write_uniform_image(path: &Path, width: u32, height: u32, color: [u8; 3]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dirs");
    }
    RgbImage::from_pixel(width, height, Rgb(color))
        .save(path)
        .expect("write image file");
}

/// Write a gradient image for tests that need non-trivial pixel content.
pub fn write_gradient_image(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dirs");
    }
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 9 % 256) as u8, (y * 13 % 256) as u8, 77])
    })
    .save(path)
    .expect("write image file");
}

/// Lay out a labeled dataset: `images/` + `labels/` under `root`.
pub fn create_labeled_dataset(root: &Path, entries: &[(&str, &str)]) {
    fs::create_dir_all(root.join("images")).expect("create images dir");
    fs::create_dir_all(root.join("labels")).expect("create labels dir");

    for (image_name, label_content) in entries {
        write_uniform_image(&root.join("images").join(image_name), 16, 16, [128, 128, 128]);
        let stem = Path::new(image_name)
            .file_stem()
            .expect("image name has a stem")
            .to_string_lossy();
        fs::write(
            root.join("labels").join(format!("{stem}.txt")),
            label_content,
        )
        .expect("write label file");
    }
}
