// THEORY:
// The `Similarity Engine` is the analytical core of the pipeline. It answers two
// questions about a pair of equally sized grayscale surfaces: "how similar are they
// overall?" (a single score) and "where do they differ?" (a per-pixel map).
//
// Key architectural principles & algorithm steps:
// 1.  **Windowed Statistics**: A square `window_size` x `window_size` box is centred
//     on every pixel. Its local means, variances and covariance are gathered with a
//     separable box filter. Pixels beyond the border are mirrored (d c b a | a b c d),
//     so the map is defined at full resolution.
// 2.  **Structural Similarity**: Those statistics are combined with the classic
//     luminance x contrast x structure formula. The stabilizing constants C1 and C2
//     keep flat regions (zero variance) from dividing by zero.
// 3.  **Global Score**: The mean of the similarity map, ignoring the
//     `(window_size - 1) / 2` pixel band along every border where the window
//     relies on mirrored data.
// 4.  **Dissimilarity Map**: Each similarity value `s` becomes
//     `clamp(1 - s, 0, 1) * 255`, so 0 means identical and 255 means maximally
//     different at that location.
//
// The computation is symmetric in its two inputs and fully deterministic.

use crate::error::{DiffError, Result};
use image::{GrayImage, Luma};

const K1: f64 = 0.01;
const K2: f64 = 0.03;
const DATA_RANGE: f64 = 255.0;

/// Per-pixel dissimilarity on a canonical surface, rescaled to [0, 255].
#[derive(Debug, Clone, PartialEq)]
pub struct DissimilarityMap {
    image: GrayImage,
}

impl DissimilarityMap {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.image.get_pixel(x, y).0[0]
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.image
    }
}

impl From<GrayImage> for DissimilarityMap {
    fn from(image: GrayImage) -> Self {
        Self { image }
    }
}

/// The output of a single structural comparison.
#[derive(Debug, Clone)]
pub struct SimilarityReport {
    /// Mean structural similarity, nominally in [-1, 1] and in [0, 1] for natural images.
    pub score: f64,
    pub dissimilarity: DissimilarityMap,
}

/// Compares two grayscale surfaces of identical size.
pub fn compare(reference: &GrayImage, candidate: &GrayImage, window_size: u32) -> Result<SimilarityReport> {
    if reference.dimensions() != candidate.dimensions() {
        return Err(DiffError::DimensionMismatch {
            left_width: reference.width(),
            left_height: reference.height(),
            right_width: candidate.width(),
            right_height: candidate.height(),
        });
    }
    let (width, height) = reference.dimensions();
    validate_window(window_size, width, height)?;

    let similarity = similarity_map(reference, candidate, window_size);

    // Mean over the region where the window never leaves the image.
    let pad = ((window_size - 1) / 2) as usize;
    let (w, h) = (width as usize, height as usize);
    let mut total = 0.0;
    let mut count = 0usize;
    for y in pad..h - pad {
        for value in &similarity[y * w + pad..y * w + w - pad] {
            total += value;
            count += 1;
        }
    }
    let score = total / count as f64;

    let dissimilarity = GrayImage::from_fn(width, height, |x, y| {
        let s = similarity[y as usize * w + x as usize];
        Luma([((1.0 - s).clamp(0.0, 1.0) * 255.0) as u8])
    });

    Ok(SimilarityReport {
        score,
        dissimilarity: DissimilarityMap::from(dissimilarity),
    })
}

/// Checks that `window_size` is odd, at least 3 and fits inside a `width` x `height` surface.
pub fn validate_window(window_size: u32, width: u32, height: u32) -> Result<()> {
    if window_size < 3 || window_size % 2 == 0 {
        return Err(DiffError::InvalidConfig(format!(
            "window size must be an odd number >= 3, got {window_size}"
        )));
    }
    if window_size > width || window_size > height {
        return Err(DiffError::InvalidConfig(format!(
            "window size {window_size} does not fit a {width}x{height} surface"
        )));
    }
    Ok(())
}

/// Full-resolution structural similarity map, row-major.
fn similarity_map(reference: &GrayImage, candidate: &GrayImage, window_size: u32) -> Vec<f64> {
    let (width, height) = (reference.width() as usize, reference.height() as usize);
    let window = window_size as usize;

    let x: Vec<f64> = reference.as_raw().iter().map(|&v| v as f64).collect();
    let y: Vec<f64> = candidate.as_raw().iter().map(|&v| v as f64).collect();
    let xx: Vec<f64> = x.iter().map(|v| v * v).collect();
    let yy: Vec<f64> = y.iter().map(|v| v * v).collect();
    let xy: Vec<f64> = x.iter().zip(&y).map(|(a, b)| a * b).collect();

    let ux = box_mean(&x, width, height, window);
    let uy = box_mean(&y, width, height, window);
    let uxx = box_mean(&xx, width, height, window);
    let uyy = box_mean(&yy, width, height, window);
    let uxy = box_mean(&xy, width, height, window);

    // Sample (unbiased) covariance over the window.
    let samples = (window * window) as f64;
    let cov_norm = samples / (samples - 1.0);
    let c1 = (K1 * DATA_RANGE).powi(2);
    let c2 = (K2 * DATA_RANGE).powi(2);

    (0..width * height)
        .map(|i| {
            let vx = cov_norm * (uxx[i] - ux[i] * ux[i]);
            let vy = cov_norm * (uyy[i] - uy[i] * uy[i]);
            let vxy = cov_norm * (uxy[i] - ux[i] * uy[i]);

            let a1 = 2.0 * ux[i] * uy[i] + c1;
            let a2 = 2.0 * vxy + c2;
            let b1 = ux[i] * ux[i] + uy[i] * uy[i] + c1;
            let b2 = vx + vy + c2;
            (a1 * a2) / (b1 * b2)
        })
        .collect()
}

/// Separable box filter with mirrored borders. `window` must not exceed either dimension.
fn box_mean(values: &[f64], width: usize, height: usize, window: usize) -> Vec<f64> {
    let radius = (window / 2) as isize;
    let mut horizontal = vec![0.0; values.len()];
    for y in 0..height {
        let row = &values[y * width..(y + 1) * width];
        for x in 0..width {
            let mut sum = 0.0;
            for dx in -radius..=radius {
                sum += row[reflect(x as isize + dx, width)];
            }
            horizontal[y * width + x] = sum;
        }
    }

    let area = (window * window) as f64;
    let mut out = vec![0.0; values.len()];
    for y in 0..height {
        for x in 0..width {
            let mut sum = 0.0;
            for dy in -radius..=radius {
                sum += horizontal[reflect(y as isize + dy, height) * width + x];
            }
            out[y * width + x] = sum / area;
        }
    }
    out
}

/// Half-sample symmetric reflection of an index into `0..len`.
fn reflect(index: isize, len: usize) -> usize {
    let len = len as isize;
    if index < 0 {
        (-index - 1) as usize
    } else if index >= len {
        (2 * len - index - 1) as usize
    } else {
        index as usize
    }
}
