//! Color space conversions.
//!
//! HSV uses the 8-bit convention common to image-processing toolkits:
//! hue is degrees halved (`[0, 180)`), saturation and value span
//! `[0, 255]`. Lab is CIE L\*a\*b\* under D65 via `palette`; lightness is
//! scaled to `[0, 255]` so it can be histogram-equalized as a byte
//! channel, while the chroma stays `f32` so an L-only edit round-trips
//! cleanly.

use image::{GrayImage, Luma, Rgb};
use palette::{FromColor, Hsv, IntoColor, Lab, Srgb};

use crate::types::RgbImage;

/// Convert one RGB pixel to 8-bit HSV.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn rgb_to_hsv(rgb: [u8; 3]) -> [u8; 3] {
    let [r, g, b] = rgb;
    let hsv: Hsv = Srgb::new(r, g, b).into_format::<f32>().into_color();

    // 360° rounds to 180, which wraps back to 0 in halved-hue space.
    let h8 = (hsv.hue.into_positive_degrees() / 2.0).round() as u32 % 180;
    [h8 as u8, to_byte(hsv.saturation), to_byte(hsv.value)]
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_byte(unit: f32) -> u8 {
    (unit * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Luminance (`0.299 R + 0.587 G + 0.114 B`) of an RGB image.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn luminance(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0.map(u32::from);
        Luma([((299 * r + 587 * g + 114 * b + 500) / 1000) as u8])
    })
}

/// An RGB image split into byte lightness and float chroma.
#[derive(Debug, Clone)]
pub struct LabImage {
    /// Lightness, `L* × 255 / 100`.
    pub lightness: GrayImage,
    lab: Vec<Lab>,
}

/// Convert RGB to Lab.
#[must_use]
pub fn rgb_to_lab(image: &RgbImage) -> LabImage {
    let lab: Vec<Lab> = image
        .pixels()
        .map(|p| {
            let [r, g, b] = p.0;
            Srgb::new(r, g, b).into_format::<f32>().into_color()
        })
        .collect();
    let lightness = GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let i = y as usize * image.width() as usize + x as usize;
        Luma([to_byte(lab[i].l / 100.0)])
    });
    LabImage { lightness, lab }
}

impl LabImage {
    /// Replace the lightness plane, keeping chroma.
    ///
    /// A plane of different dimensions is ignored.
    #[must_use]
    pub fn with_lightness(mut self, lightness: GrayImage) -> Self {
        if lightness.dimensions() == self.lightness.dimensions() {
            self.lightness = lightness;
        }
        self
    }

    /// Convert back to RGB, clamping out-of-gamut colors.
    #[must_use]
    pub fn to_rgb(&self) -> RgbImage {
        let (w, h) = self.lightness.dimensions();
        let mut out = RgbImage::new(w, h);
        for ((px, Luma([l8])), lab) in out
            .pixels_mut()
            .zip(self.lightness.pixels())
            .zip(&self.lab)
        {
            let relit: Lab = Lab::new(f32::from(*l8) * 100.0 / 255.0, lab.a, lab.b);
            let rgb = Srgb::<f32>::from_color(relit).into_format::<u8>();
            *px = Rgb([rgb.red, rgb.green, rgb.blue]);
        }
        out
    }
}
