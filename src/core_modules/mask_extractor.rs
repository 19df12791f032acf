// THEORY:
// The `Mask Extractor` turns the graded dissimilarity map into a strict yes/no
// answer per pixel. It uses Otsu's method: the intensity histogram of the map is
// split into two classes at the level that maximizes the between-class variance
// (equivalently, minimizes the within-class variance). The level is chosen from
// the data of every comparison; there is no tuning knob.
//
// Polarity: the map is "high = different", so pixels strictly above the level
// become foreground (255) and everything else background (0). A map with a single
// intensity yields level 0, which makes an all-zero map all background and any
// other uniform map all foreground.

use crate::core_modules::similarity::DissimilarityMap;
use image::{GrayImage, Luma};

pub const FOREGROUND: u8 = 255;
pub const BACKGROUND: u8 = 0;

/// A strictly two-valued mask, foreground marking "different" pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryMask {
    image: GrayImage,
    level: u8,
}

impl BinaryMask {
    /// Wraps an existing two-valued image; any non-zero pixel counts as foreground.
    pub fn from_image(image: GrayImage) -> Self {
        let image = GrayImage::from_fn(image.width(), image.height(), |x, y| {
            if image.get_pixel(x, y).0[0] == BACKGROUND {
                Luma([BACKGROUND])
            } else {
                Luma([FOREGROUND])
            }
        });
        Self { image, level: 0 }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        self.image.get_pixel(x, y).0[0] == FOREGROUND
    }

    pub fn foreground_count(&self) -> usize {
        self.image.as_raw().iter().filter(|&&v| v == FOREGROUND).count()
    }

    /// The automatically selected threshold.
    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.image
    }
}

/// Binarizes `map` at its Otsu level.
pub fn threshold(map: &DissimilarityMap) -> BinaryMask {
    let source = map.as_image();
    let level = otsu_level(source);
    let image = GrayImage::from_fn(source.width(), source.height(), |x, y| {
        if source.get_pixel(x, y).0[0] > level {
            Luma([FOREGROUND])
        } else {
            Luma([BACKGROUND])
        }
    });
    BinaryMask { image, level }
}

/// Computes the Otsu threshold for a grayscale image.
///
/// The background class is `0..=level`. Returns 0 for empty or single-intensity images.
pub fn otsu_level(gray: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for pixel in gray.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }

    let total_pixels = gray.width() as u64 * gray.height() as u64;
    if total_pixels == 0 {
        return 0;
    }

    let sum_total: f64 = histogram.iter().enumerate().map(|(i, &count)| i as f64 * count as f64).sum();

    let mut sum_background = 0.0;
    let mut weight_background = 0u64;
    let mut max_variance = 0.0;
    let mut best_level = 0u8;

    for (t, &count) in histogram.iter().enumerate() {
        weight_background += count;
        if weight_background == 0 {
            continue;
        }
        let weight_foreground = total_pixels - weight_background;
        if weight_foreground == 0 {
            break;
        }

        sum_background += t as f64 * count as f64;
        let mean_background = sum_background / weight_background as f64;
        let mean_foreground = (sum_total - sum_background) / weight_foreground as f64;

        let between_variance =
            weight_background as f64 * weight_foreground as f64 * (mean_background - mean_foreground).powi(2);

        if between_variance > max_variance {
            max_variance = between_variance;
            best_level = t as u8;
        }
    }

    best_level
}
