//! Draw detections onto a copy of the original image.
//!
//! Each detection gets a severity-colored 2px box, a filled label tab
//! above the box reading `"{severity} ({confidence}%)"`, and its id
//! (`C001`, …) inside the bottom-left corner. Detections are drawn in
//! id order, so higher-confidence labels end up underneath.

use ab_glyph::{FontRef, PxScale};
use image::Rgb;
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use log::debug;

use crate::summary::format_confidence;
use crate::types::{BoundingBox, Detection, RgbImage, Severity};

/// DejaVu Sans (Bitstream Vera license, see `assets/DejaVuSans-LICENSE.txt`).
static LABEL_FONT_DATA: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

/// Pixel height of labels and ids.
pub const TEXT_SCALE: PxScale = PxScale { x: 16.0, y: 16.0 };

/// Space between label text and its tab edge.
pub const LABEL_PADDING: u32 = 5;

/// Box outline color for a severity.
#[must_use]
pub const fn severity_color(severity: Severity) -> Rgb<u8> {
    match severity {
        Severity::Critical => Rgb([255, 0, 0]),
        Severity::High => Rgb([255, 165, 0]),
        Severity::Medium => Rgb([255, 255, 0]),
        Severity::Low => Rgb([0, 255, 0]),
    }
}

/// Label text color that stays legible on [`severity_color`].
#[must_use]
pub const fn label_text_color(severity: Severity) -> Rgb<u8> {
    match severity {
        Severity::Critical => Rgb([255, 255, 255]),
        Severity::High | Severity::Medium | Severity::Low => Rgb([0, 0, 0]),
    }
}

/// Label text for a detection, e.g. `High (87.3%)`.
#[must_use]
pub fn label_text(detection: &Detection) -> String {
    format!(
        "{} ({})",
        detection.severity,
        format_confidence(detection.confidence)
    )
}

/// Id text for a detection, e.g. `C007`.
#[must_use]
pub fn id_text(detection: &Detection) -> String {
    format!("C{:03}", detection.id)
}

fn rect(x: i64, y: i64, width: u32, height: u32) -> Option<Rect> {
    if width == 0 || height == 0 {
        return None;
    }
    let x = i32::try_from(x).ok()?;
    let y = i32::try_from(y).ok()?;
    Some(Rect::at(x, y).of_size(width, height))
}

fn draw_box(image: &mut RgbImage, bbox: BoundingBox, color: Rgb<u8>) {
    let (x, y) = (i64::from(bbox.x), i64::from(bbox.y));
    if let Some(outer) = rect(x, y, bbox.width, bbox.height) {
        draw_hollow_rect_mut(image, outer, color);
    }
    if bbox.width > 2 && bbox.height > 2 {
        if let Some(inner) = rect(x + 1, y + 1, bbox.width - 2, bbox.height - 2) {
            draw_hollow_rect_mut(image, inner, color);
        }
    }
}

/// The embedded label font, or `None` if it fails to parse.
#[must_use]
pub fn label_font() -> Option<FontRef<'static>> {
    FontRef::try_from_slice(LABEL_FONT_DATA).ok()
}

fn draw_text(
    image: &mut RgbImage,
    font: &FontRef<'_>,
    text: &str,
    x: i64,
    y: i64,
    color: Rgb<u8>,
) {
    if let (Ok(x), Ok(y)) = (i32::try_from(x), i32::try_from(y)) {
        draw_text_mut(image, color, x, y, TEXT_SCALE, font, text);
    }
}

fn draw_label(
    image: &mut RgbImage,
    font: &FontRef<'_>,
    detection: &Detection,
    color: Rgb<u8>,
) {
    let text = label_text(detection);
    let (text_w, text_h) = text_size(TEXT_SCALE, font, &text);
    let tab_width = text_w + 2 * LABEL_PADDING;
    let tab_height = text_h + 2 * LABEL_PADDING;
    let x = i64::from(detection.bounding_box.x);
    let above = i64::from(detection.bounding_box.y) - i64::from(tab_height);
    // Tabs that would leave the top of the image go inside the box.
    let y = if above >= 0 {
        above
    } else {
        i64::from(detection.bounding_box.y)
    };

    if let Some(tab) = rect(x, y, tab_width, tab_height) {
        draw_filled_rect_mut(image, tab, color);
    }
    let pad = i64::from(LABEL_PADDING);
    draw_text(
        image,
        font,
        &text,
        x + pad,
        y + pad,
        label_text_color(detection.severity),
    );
}

fn draw_id(image: &mut RgbImage, font: &FontRef<'_>, detection: &Detection, color: Rgb<u8>) {
    let text = id_text(detection);
    let (_, text_h) = text_size(TEXT_SCALE, font, &text);
    let bbox = detection.bounding_box;
    let pad = i64::from(LABEL_PADDING);
    let bottom = i64::from(bbox.y) + i64::from(bbox.height);
    draw_text(
        image,
        font,
        &text,
        i64::from(bbox.x) + pad,
        bottom - pad - i64::from(text_h),
        color,
    );
}

/// Annotated copy of `original`. With no detections the copy is
/// unmodified. If the embedded font cannot be parsed only the boxes are
/// drawn.
#[must_use = "returns the annotated image"]
pub fn annotate(original: &RgbImage, detections: &[Detection]) -> RgbImage {
    let mut out = original.clone();
    let font = label_font();
    if font.is_none() && !detections.is_empty() {
        debug!("label font failed to parse, drawing boxes only");
    }
    for detection in detections {
        let color = severity_color(detection.severity);
        draw_box(&mut out, detection.bounding_box, color);
        if let Some(font) = &font {
            draw_label(&mut out, font, detection, color);
            draw_id(&mut out, font, detection, color);
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const BACKGROUND: Rgb<u8> = Rgb([40, 40, 40]);

    fn detection(id: u32, severity: Severity, bbox: BoundingBox) -> Detection {
        Detection {
            id,
            bounding_box: bbox,
            area: 1000,
            perimeter: 130,
            circularity: 0.7,
            aspect_ratio: 1.0,
            extent: 0.8,
            confidence: 0.873,
            severity,
            risk_assessment: severity.risk_assessment().to_owned(),
        }
    }

    fn bbox(x: u32, y: u32, width: u32, height: u32) -> BoundingBox {
        BoundingBox {
            x,
            y,
            width,
            height,
        }
    }

    #[test]
    fn no_detections_leaves_image_untouched() {
        let img = RgbImage::from_pixel(50, 40, BACKGROUND);
        assert_eq!(annotate(&img, &[]), img);
    }

    #[test]
    fn texts() {
        let d = detection(7, Severity::High, bbox(0, 0, 10, 10));
        assert_eq!(label_text(&d), "High (87.3%)");
        assert_eq!(id_text(&d), "C007");
    }

    #[test]
    fn box_is_drawn_two_pixels_wide() {
        let img = RgbImage::from_pixel(200, 200, BACKGROUND);
        let d = detection(1, Severity::Medium, bbox(60, 80, 70, 60));
        let out = annotate(&img, &[d]);
        let yellow = severity_color(Severity::Medium);
        // Right edge, away from the label and id.
        assert_eq!(*out.get_pixel(129, 110), yellow);
        assert_eq!(*out.get_pixel(128, 110), yellow);
        assert_eq!(*out.get_pixel(127, 110), BACKGROUND);
        assert_eq!(*out.get_pixel(131, 110), BACKGROUND);
    }

    #[test]
    fn embedded_font_parses() {
        let font = label_font().unwrap();
        let (w, h) = text_size(TEXT_SCALE, &font, "High (87.3%)");
        assert!(w > 40 && w < 200, "width {w}");
        assert!(h > 6 && h <= 20, "height {h}");
    }

    #[test]
    fn label_tab_sits_above_the_box() {
        let img = RgbImage::from_pixel(200, 200, BACKGROUND);
        let d = detection(1, Severity::Critical, bbox(20, 100, 60, 60));
        let font = label_font().unwrap();
        let (text_w, text_h) = text_size(TEXT_SCALE, &font, &label_text(&d));
        let top = 100 - (text_h + 2 * LABEL_PADDING);
        let out = annotate(&img, &[d]);
        let red = severity_color(Severity::Critical);
        // The tab's top-left padding is plain; the row above is untouched.
        assert_eq!(*out.get_pixel(21, top), red);
        assert_eq!(*out.get_pixel(21, top - 1), BACKGROUND);
        // Glyphs blend white into the tab.
        let text_x = 20 + LABEL_PADDING;
        let has_text = (top..100)
            .any(|y| (text_x..text_x + text_w).any(|x| *out.get_pixel(x, y) != red));
        assert!(has_text);
    }

    #[test]
    fn id_is_written_inside_the_box() {
        let img = RgbImage::from_pixel(200, 200, BACKGROUND);
        let d = detection(3, Severity::Low, bbox(40, 40, 120, 120));
        let out = annotate(&img, &[d]);
        let green = severity_color(Severity::Low);
        let inked = (140..155).any(|y| (45..90).any(|x| *out.get_pixel(x, y) != BACKGROUND));
        assert!(inked);
        assert_eq!(*out.get_pixel(100, 100), BACKGROUND);
        assert_eq!(*out.get_pixel(40, 100), green);
    }

    #[test]
    fn label_moves_inside_near_top_edge() {
        let img = RgbImage::from_pixel(200, 200, BACKGROUND);
        let d = detection(1, Severity::Low, bbox(10, 3, 80, 80));
        let out = annotate(&img, &[d]);
        assert_eq!(*out.get_pixel(12, 10), severity_color(Severity::Low));
        assert_eq!(out.dimensions(), (200, 200));
    }

    #[test]
    fn boxes_at_the_border_are_clipped() {
        let img = RgbImage::from_pixel(30, 30, BACKGROUND);
        let ds = [
            detection(1, Severity::High, bbox(25, 25, 5, 5)),
            detection(2, Severity::Low, bbox(0, 0, 1, 1)),
        ];
        let out = annotate(&img, &ds);
        assert_eq!(out.dimensions(), (30, 30));
        assert_eq!(*out.get_pixel(29, 29), severity_color(Severity::High));
    }

    #[test]
    fn text_colors_contrast() {
        for s in Severity::ALL {
            assert_ne!(severity_color(s), label_text_color(s));
        }
    }
}
