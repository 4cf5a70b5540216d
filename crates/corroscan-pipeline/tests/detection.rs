//! Integration tests: end-to-end detection on synthetic inspection scenes.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use corroscan_pipeline::{
    BoundingBox, DetectionConfig, DetectionResult, PipelineError, PipelineType, RgbImage,
    Severity, detect, detect_bytes, detect_staged,
};
use image::Rgb;

const GRAY: Rgb<u8> = Rgb([128, 128, 128]);
const ORANGE: Rgb<u8> = Rgb([200, 90, 30]);
const BROWN: Rgb<u8> = Rgb([120, 60, 20]);
const BLUE: Rgb<u8> = Rgb([40, 60, 200]);

fn fill(image: &mut RgbImage, bbox: BoundingBox, color: Rgb<u8>) {
    for y in bbox.y..bbox.y + bbox.height {
        for x in bbox.x..bbox.x + bbox.width {
            image.put_pixel(x, y, color);
        }
    }
}

const fn rect(x: u32, y: u32, width: u32, height: u32) -> BoundingBox {
    BoundingBox {
        x,
        y,
        width,
        height,
    }
}

/// One 60x50 orange-brown patch on mid-gray.
fn single_patch_scene() -> (RgbImage, BoundingBox) {
    let patch = rect(40, 30, 60, 50);
    let mut image = RgbImage::from_pixel(160, 120, GRAY);
    fill(&mut image, patch, ORANGE);
    (image, patch)
}

/// Two rust patches, a speck too small to count, and a blue decoy.
fn mixed_scene() -> RgbImage {
    let mut image = RgbImage::from_pixel(200, 160, GRAY);
    fill(&mut image, rect(20, 20, 60, 50), ORANGE);
    fill(&mut image, rect(120, 30, 30, 30), BROWN);
    fill(&mut image, rect(150, 120, 8, 8), ORANGE);
    fill(&mut image, rect(30, 100, 40, 40), BLUE);
    image
}

fn config(sensitivity: f64, min_area: u32) -> DetectionConfig {
    DetectionConfig::try_new(sensitivity, min_area, PipelineType::Unknown).unwrap()
}

fn assert_well_formed(result: &DetectionResult, config: &DetectionConfig) {
    for d in &result.detections {
        assert!((0.0..=1.0).contains(&d.confidence), "{d:?}");
        assert!(d.area >= config.min_area(), "{d:?}");
        assert!(d.aspect_ratio <= 10.0, "{d:?}");
        assert!(d.extent >= 0.1, "{d:?}");
        assert_eq!(d.risk_assessment, d.severity.risk_assessment());
    }
    for pair in result.detections.windows(2) {
        assert!(pair[0].confidence >= pair[1].confidence);
    }
    let ids: Vec<u32> = result.detections.iter().map(|d| d.id).collect();
    let expected: Vec<u32> = (1..).take(ids.len()).collect();
    assert_eq!(ids, expected);
}

#[test]
fn flat_gray_image_is_a_clean_inspection() {
    let image = RgbImage::from_pixel(128, 96, GRAY);
    let result = detect(&image, &config(0.5, 200)).unwrap();
    assert!(result.detections.is_empty());
    assert_eq!(result.annotated, image);
}

fn assert_single_patch_found(image: &RgbImage, patch: BoundingBox) {
    let result = detect(image, &DetectionConfig::default()).unwrap();
    let (w, h) = image.dimensions();
    assert_eq!(
        result.detections.len(),
        1,
        "{w}x{h} canvas, patch {patch:?}: {:?}",
        result.detections
    );

    let d = &result.detections[0];
    let b = d.bounding_box;
    let near = |found: u32, want: u32| found.abs_diff(want) <= 4;
    assert!(near(b.x, patch.x) && near(b.y, patch.y), "{w}x{h}: {b:?}");
    assert!(near(b.x + b.width, patch.x + patch.width), "{w}x{h}: {b:?}");
    assert!(near(b.y + b.height, patch.y + patch.height), "{w}x{h}: {b:?}");
    assert!(
        matches!(d.severity, Severity::Medium | Severity::High),
        "{w}x{h}: {d:?}"
    );
    assert_ne!(&result.annotated, image);
}

#[test]
fn single_patch_yields_one_detection_at_the_patch() {
    let (image, patch) = single_patch_scene();
    assert_single_patch_found(&image, patch);
}

#[test]
fn single_patch_is_found_on_any_canvas_and_placement() {
    for (w, h) in [(97, 83), (120, 100), (160, 120), (256, 192), (320, 240)] {
        let placements = [
            ((w - 60) / 2, (h - 50) / 2),
            (3, 3),
            (w - 63, h - 53),
            (0, h - 50),
            (w - 60, 0),
        ];
        for (x, y) in placements {
            let patch = rect(x, y, 60, 50);
            let mut image = RgbImage::from_pixel(w, h, GRAY);
            fill(&mut image, patch, ORANGE);
            assert_single_patch_found(&image, patch);
        }
    }
}

#[test]
fn patch_interior_is_fully_flagged() {
    let (image, patch) = single_patch_scene();
    let staged = detect_staged(&image, &DetectionConfig::default()).unwrap();
    let (cx, cy) = (patch.x + patch.width / 2, patch.y + patch.height / 2);
    assert_eq!(staged.combined_mask.get_pixel(cx, cy).0[0], 255);
    assert_eq!(staged.combined_mask.get_pixel(patch.x + 10, cy).0[0], 255);
}

#[test]
fn annotated_image_keeps_input_dimensions() {
    let image = mixed_scene();
    let result = detect(&image, &DetectionConfig::default()).unwrap();
    assert_eq!(result.annotated.dimensions(), image.dimensions());
}

#[test]
fn detections_are_well_formed_across_configs() {
    let image = mixed_scene();
    for pipeline_type in [
        PipelineType::Subsea,
        PipelineType::CrossCountry,
        PipelineType::Unknown,
    ] {
        for sensitivity in [0.1, 0.3, 0.5, 0.7, 0.9, 1.0] {
            for min_area in [50, 200, 1000] {
                let config = DetectionConfig::try_new(sensitivity, min_area, pipeline_type).unwrap();
                let result = detect(&image, &config).unwrap();
                assert_well_formed(&result, &config);
            }
        }
    }
}

#[test]
fn small_specks_are_filtered_out() {
    let result = detect(&mixed_scene(), &config(0.5, 200)).unwrap();
    for d in &result.detections {
        let b = d.bounding_box;
        let covers_speck = b.x <= 150 && b.x + b.width >= 158 && b.y <= 120;
        assert!(!covers_speck || d.area >= 200, "{d:?}");
    }
}

#[test]
fn blue_decoy_never_outranks_rust() {
    let result = detect(&mixed_scene(), &DetectionConfig::default()).unwrap();
    let overlaps_decoy = |b: BoundingBox| b.x < 70 && b.x + b.width > 30 && b.y + b.height > 100;
    let top = result.detections.first().expect("rust patches are detected");
    assert!(!overlaps_decoy(top.bounding_box), "{top:?}");
    for d in result.detections.iter().filter(|d| overlaps_decoy(d.bounding_box)) {
        // No rust color anywhere in the box.
        assert!(d.confidence <= 0.5, "{d:?}");
        assert!(d.severity <= Severity::Medium, "{d:?}");
    }
}

#[test]
fn raising_sensitivity_never_loses_detections() {
    let image = mixed_scene();
    let counts: Vec<usize> = [0.5, 0.6, 0.7, 0.8, 0.9, 1.0]
        .into_iter()
        .map(|s| detect(&image, &config(s, 200)).unwrap().detections.len())
        .collect();
    for pair in counts.windows(2) {
        assert!(pair[0] <= pair[1], "{counts:?}");
    }
}

#[test]
fn raising_min_area_never_adds_detections() {
    let image = mixed_scene();
    let counts: Vec<usize> = [50, 200, 800, 2000, 5000, 10_000]
        .into_iter()
        .map(|a| detect(&image, &config(0.5, a)).unwrap().detections.len())
        .collect();
    for pair in counts.windows(2) {
        assert!(pair[0] >= pair[1], "{counts:?}");
    }
    assert_eq!(counts.last(), Some(&0));
}

#[test]
fn detection_is_deterministic() {
    let image = mixed_scene();
    let a = detect(&image, &DetectionConfig::default()).unwrap();
    let b = detect(&image, &DetectionConfig::default()).unwrap();
    assert_eq!(a.detections, b.detections);
    assert_eq!(a.annotated.as_raw(), b.annotated.as_raw());
}

#[test]
fn out_of_range_sensitivity_is_rejected() {
    let result = DetectionConfig::try_new(0.05, 200, PipelineType::Unknown);
    assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
}

#[test]
fn json_config_is_validated() {
    let ok: DetectionConfig =
        serde_json::from_str(r#"{"sensitivity":0.7,"min_area":500,"pipeline_type":"subsea"}"#)
            .unwrap();
    assert_eq!(ok.min_area(), 500);
    let bad = serde_json::from_str::<DetectionConfig>(r#"{"sensitivity":2.0,"min_area":500}"#);
    assert!(bad.is_err());
}

#[test]
fn empty_bytes_are_rejected() {
    let result = detect_bytes(&[], &DetectionConfig::default());
    assert!(matches!(result, Err(PipelineError::EmptyInput)));
}

#[test]
fn zero_area_image_is_rejected() {
    let result = detect(&RgbImage::new(10, 0), &DetectionConfig::default());
    assert!(matches!(result, Err(PipelineError::InvalidInput(_))));
}

#[test]
fn result_serializes_with_every_detection_field() {
    let (image, _) = single_patch_scene();
    let result = detect(&image, &DetectionConfig::default()).unwrap();
    let json = serde_json::to_value(&result).unwrap();
    let first = &json["detections"][0];
    for field in [
        "id",
        "bounding_box",
        "area",
        "perimeter",
        "circularity",
        "aspect_ratio",
        "extent",
        "confidence",
        "severity",
        "risk_assessment",
    ] {
        assert!(!first[field].is_null(), "missing {field}");
    }
}
