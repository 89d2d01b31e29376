//! Property tests for the YOLO label codec.

use std::path::Path;

use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

use dataug::bbox::BBox;
use dataug::labels::{parse_label_line, read_labels, write_labels};

/// Written values survive one decode at six-decimal precision.
const EPS_ROUNDTRIP: f64 = 1e-6;

fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

fn arb_label_entry() -> impl Strategy<Value = (BBox, usize)> {
    (
        0.0f64..=1.0,
        0.0f64..=1.0,
        0.0f64..=1.0,
        0.0f64..=1.0,
        0usize..1000,
    )
        .prop_map(|(cx, cy, w, h, class_id)| (BBox::new(cx, cy, w, h), class_id))
}

proptest! {
    #![proptest_config(proptest_config())]

    #[test]
    fn write_read_roundtrip_preserves_pairs(entries in prop::collection::vec(arb_label_entry(), 0..40)) {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("labels.txt");

        let bboxes: Vec<BBox> = entries.iter().map(|(b, _)| *b).collect();
        let classes: Vec<usize> = entries.iter().map(|(_, c)| *c).collect();

        write_labels(&path, &bboxes, &classes).expect("write labels");
        let (restored_bboxes, restored_classes) = read_labels(&path).expect("read labels");

        prop_assert_eq!(restored_classes, classes);
        prop_assert_eq!(restored_bboxes.len(), bboxes.len());
        for (original, restored) in bboxes.iter().zip(&restored_bboxes) {
            prop_assert!((original.cx - restored.cx).abs() <= EPS_ROUNDTRIP);
            prop_assert!((original.cy - restored.cy).abs() <= EPS_ROUNDTRIP);
            prop_assert!((original.w - restored.w).abs() <= EPS_ROUNDTRIP);
            prop_assert!((original.h - restored.h).abs() <= EPS_ROUNDTRIP);
        }
    }

    #[test]
    fn second_roundtrip_is_exact(entries in prop::collection::vec(arb_label_entry(), 1..20)) {
        let temp = tempfile::tempdir().expect("create temp dir");
        let pass1 = temp.path().join("pass1.txt");
        let pass2 = temp.path().join("pass2.txt");

        let bboxes: Vec<BBox> = entries.iter().map(|(b, _)| *b).collect();
        let classes: Vec<usize> = entries.iter().map(|(_, c)| *c).collect();

        write_labels(&pass1, &bboxes, &classes).expect("write first pass");
        let (bboxes1, classes1) = read_labels(&pass1).expect("read first pass");

        write_labels(&pass2, &bboxes1, &classes1).expect("write second pass");
        let (bboxes2, classes2) = read_labels(&pass2).expect("read second pass");

        // Six-decimal quantization is idempotent: once written, values are fixed.
        prop_assert_eq!(bboxes1, bboxes2);
        prop_assert_eq!(classes1, classes2);
    }

    #[test]
    fn arbitrary_lines_never_panic(line in "\\PC{0,200}") {
        let _ = parse_label_line(&line, Path::new("fuzz.txt"), 1);
    }

    #[test]
    fn parsed_lines_agree_with_their_fields(
        (bbox, class_id) in arb_label_entry()
    ) {
        let line = format!("{} {} {} {} {}", class_id, bbox.cx, bbox.cy, bbox.w, bbox.h);
        let (parsed_bbox, parsed_class) = parse_label_line(&line, Path::new("p.txt"), 1)
            .expect("well-formed line parses")
            .expect("non-empty line yields a pair");

        prop_assert_eq!(parsed_class, class_id);
        prop_assert_eq!(parsed_bbox, bbox);
    }
}
