//! YOLO label file codec.
//!
//! A label file holds one annotation per line: `class cx cy w h`, with the
//! class id as a non-negative integer and the four box fields normalized to
//! `[0, 1]`. Boxes and class ids form two parallel sequences whose order is
//! significant — it is what keeps a transformed box attached to its class.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::bbox::BBox;
use crate::error::AugError;

/// Derive the label path for an image: same base name with a `.txt`
/// extension, under the dataset's labels directory.
pub fn label_path_for(labels_dir: &Path, image_path: &Path) -> PathBuf {
    let stem = image_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    labels_dir.join(format!("{stem}.txt"))
}

/// Read a YOLO label file into parallel box and class sequences.
///
/// Empty and whitespace-only lines are skipped. Any malformed line fails the
/// whole file with [`AugError::LabelParse`]; callers decide whether that is
/// fatal (the batch engine treats it as "no labels for this image").
pub fn read_labels(path: &Path) -> Result<(Vec<BBox>, Vec<usize>), AugError> {
    let content = fs::read_to_string(path)?;

    let mut bboxes = Vec::new();
    let mut classes = Vec::new();
    for (line_idx, line) in content.lines().enumerate() {
        let Some((bbox, class_id)) = parse_label_line(line, path, line_idx + 1)? else {
            continue;
        };
        bboxes.push(bbox);
        classes.push(class_id);
    }

    Ok((bboxes, classes))
}

/// Write parallel box and class sequences as a YOLO label file.
///
/// One line per pair in input order, six-decimal fixed precision, overwriting
/// any existing file. Mismatched sequence lengths are rejected with
/// [`AugError::LabelValidation`] — truncating to the shorter sequence would
/// silently detach boxes from their classes.
pub fn write_labels(path: &Path, bboxes: &[BBox], classes: &[usize]) -> Result<(), AugError> {
    if bboxes.len() != classes.len() {
        return Err(AugError::LabelValidation {
            path: path.to_path_buf(),
            message: format!(
                "{} box(es) but {} class id(s); sequences must pair 1:1",
                bboxes.len(),
                classes.len()
            ),
        });
    }

    let mut file = fs::File::create(path)?;
    for (bbox, class_id) in bboxes.iter().zip(classes) {
        writeln!(
            file,
            "{} {:.6} {:.6} {:.6} {:.6}",
            class_id, bbox.cx, bbox.cy, bbox.w, bbox.h
        )?;
    }

    Ok(())
}

/// Parse a single label line into a `(box, class)` pair.
///
/// Returns `Ok(None)` for blank lines.
pub fn parse_label_line(
    line: &str,
    file_path: &Path,
    line_num: usize,
) -> Result<Option<(BBox, usize)>, AugError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    // Take at most 6 tokens so pathological inputs do not allocate unbounded memory.
    let tokens: Vec<&str> = trimmed.split_whitespace().take(6).collect();

    if tokens.len() != 5 {
        return Err(AugError::LabelParse {
            path: file_path.to_path_buf(),
            line: line_num,
            message: format!("expected 5 fields, found {}", tokens.len()),
        });
    }

    let class_id = tokens[0]
        .parse::<usize>()
        .map_err(|_| AugError::LabelParse {
            path: file_path.to_path_buf(),
            line: line_num,
            message: format!(
                "invalid class id '{}'; expected non-negative integer",
                tokens[0]
            ),
        })?;

    let cx = parse_f64_token(tokens[1], "x_center", file_path, line_num)?;
    let cy = parse_f64_token(tokens[2], "y_center", file_path, line_num)?;
    let w = parse_f64_token(tokens[3], "width", file_path, line_num)?;
    let h = parse_f64_token(tokens[4], "height", file_path, line_num)?;

    Ok(Some((BBox::new(cx, cy, w, h), class_id)))
}

/// Fuzz-only entrypoint for single-line label parsing.
#[cfg(feature = "fuzzing")]
pub fn fuzz_parse_label_line(input: &str) -> Result<(), AugError> {
    let _ = parse_label_line(input, Path::new("<fuzz>"), 1)?;
    Ok(())
}

fn parse_f64_token(
    raw: &str,
    field_name: &str,
    file_path: &Path,
    line_num: usize,
) -> Result<f64, AugError> {
    raw.parse::<f64>().map_err(|_| AugError::LabelParse {
        path: file_path.to_path_buf(),
        line: line_num,
        message: format!("invalid {field_name} '{raw}'; expected floating-point number"),
    })
}
