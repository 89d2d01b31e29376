//! Integration tests for the YOLO label codec.

use std::fs;

use dataug::bbox::BBox;
use dataug::labels::{label_path_for, read_labels, write_labels};
use dataug::AugError;

#[test]
fn read_write_read_preserves_pairs() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let source = temp.path().join("source.txt");
    fs::write(
        &source,
        "0 0.5 0.5 0.2 0.2\n3 0.125 0.25 0.0625 0.03125\n1 0.9 0.1 0.05 0.08\n",
    )
    .expect("write source labels");

    let (bboxes, classes) = read_labels(&source).expect("read source");
    assert_eq!(classes, vec![0, 3, 1]);

    let copy = temp.path().join("copy.txt");
    write_labels(&copy, &bboxes, &classes).expect("write copy");
    let (bboxes2, classes2) = read_labels(&copy).expect("read copy");

    assert_eq!(classes, classes2);
    for (a, b) in bboxes.iter().zip(&bboxes2) {
        assert!((a.cx - b.cx).abs() < 1e-6);
        assert!((a.cy - b.cy).abs() < 1e-6);
        assert!((a.w - b.w).abs() < 1e-6);
        assert!((a.h - b.h).abs() < 1e-6);
    }
}

#[test]
fn write_emits_exact_six_decimal_format() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let path = temp.path().join("labels.txt");

    write_labels(
        &path,
        &[BBox::new(0.5, 0.5, 0.2, 0.2), BBox::new(0.1, 0.9, 0.33, 0.01)],
        &[0, 7],
    )
    .expect("write labels");

    let content = fs::read_to_string(&path).expect("read back");
    assert_eq!(
        content,
        "0 0.500000 0.500000 0.200000 0.200000\n7 0.100000 0.900000 0.330000 0.010000\n"
    );
}

#[test]
fn write_overwrites_existing_file() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let path = temp.path().join("labels.txt");
    fs::write(&path, "9 0.9 0.9 0.9 0.9\n").expect("seed old content");

    write_labels(&path, &[BBox::new(0.5, 0.5, 0.2, 0.2)], &[0]).expect("write labels");

    let content = fs::read_to_string(&path).expect("read back");
    assert_eq!(content, "0 0.500000 0.500000 0.200000 0.200000\n");
}

#[test]
fn malformed_files_report_line_numbers() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let path = temp.path().join("labels.txt");
    fs::write(&path, "0 0.5 0.5 0.2 0.2\n1 0.5 0.5\n").expect("write fixture");

    let err = read_labels(&path).unwrap_err();
    match err {
        AugError::LabelParse { line, .. } => assert_eq!(line, 2),
        other => panic!("expected LabelParse, got {other:?}"),
    }
}

#[test]
fn mismatched_sequences_never_truncate() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let path = temp.path().join("labels.txt");

    let err = write_labels(
        &path,
        &[BBox::new(0.5, 0.5, 0.2, 0.2), BBox::new(0.1, 0.1, 0.1, 0.1)],
        &[0],
    )
    .unwrap_err();

    assert!(matches!(err, AugError::LabelValidation { .. }));
    assert!(!path.exists());
}

#[test]
fn label_path_derivation_handles_multi_dot_names() {
    let path = label_path_for(
        std::path::Path::new("/ds/labels"),
        std::path::Path::new("/ds/images/shot.v2.png"),
    );
    assert_eq!(path, std::path::Path::new("/ds/labels/shot.v2.txt"));
}
