// THEORY:
// The `Normalizer` is the entry gate of the pipeline. Whatever resolution, format
// or aspect ratio the caller hands over, it leaves as a pair of surfaces of one
// fixed canonical size: a 3-channel color surface that is later annotated, and a
// single-channel grayscale surface the similarity engine works on.
//
// Key architectural principles:
// 1.  **Dimension Equality by Construction**: Both images of a comparison are
//     resized to the same `CanonicalSize`, so the similarity engine never sees two
//     surfaces of different shape. Aspect ratio is not preserved.
// 2.  **Weighted Luminance**: Gray values are a Rec. 601 weighted sum of R, G and B
//     (not a plain average), rounded to the nearest integer in [0, 255].
// 3.  **Pure Function**: Nothing is persisted. The source bytes are read, never
//     rewritten, and every call owns its output buffers.

use crate::error::{DiffError, Result};
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};

/// The fixed resolution every input is resized to before comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalSize {
    pub width: u32,
    pub height: u32,
}

impl Default for CanonicalSize {
    fn default() -> Self {
        Self { width: 250, height: 160 }
    }
}

/// The two comparable surfaces derived from one input image.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    /// Resized color surface, used for annotation.
    pub color: RgbImage,
    /// Grayscale surface of the same size, used for comparison.
    pub gray: GrayImage,
}

/// Decodes raw image bytes and normalizes them to `size`.
pub fn normalize_bytes(bytes: &[u8], size: CanonicalSize, filter: FilterType) -> Result<NormalizedImage> {
    if bytes.is_empty() {
        return Err(DiffError::EmptyInput);
    }
    let decoded = image::load_from_memory(bytes).map_err(DiffError::ImageDecode)?;
    Ok(normalize(&decoded, size, filter))
}

/// Resizes an already decoded image to `size` and derives its grayscale surface.
pub fn normalize(image: &DynamicImage, size: CanonicalSize, filter: FilterType) -> NormalizedImage {
    let rgb = image.to_rgb8();
    let color = if rgb.dimensions() == (size.width, size.height) {
        rgb
    } else {
        imageops::resize(&rgb, size.width, size.height, filter)
    };
    let gray = to_grayscale(&color);
    NormalizedImage { color, gray }
}

/// Converts a color surface to Rec. 601 luma.
pub fn to_grayscale(color: &RgbImage) -> GrayImage {
    GrayImage::from_fn(color.width(), color.height(), |x, y| Luma([luminance(color.get_pixel(x, y))]))
}

/// Luminance estimate (Rec. 601 luma) of a single pixel.
pub fn luminance(pixel: &Rgb<u8>) -> u8 {
    let [red, green, blue] = pixel.0;
    let luma = 0.299_f64 * red as f64 + 0.587_f64 * green as f64 + 0.114_f64 * blue as f64;
    luma.round().clamp(0.0, 255.0) as u8
}
