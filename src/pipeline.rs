// THEORY:
// The `pipeline` module is the top-level API of the differencing engine. It wires
// the five stages into one synchronous, single-pass call:
//
//   Normalizer -> Similarity Engine -> Mask Extractor -> Region Detector -> Annotator
//
// A `DiffPipeline` holds nothing but its configuration. Every call owns its
// working surfaces, so one pipeline value can be shared freely between threads and
// two comparisons never touch the same buffer.

use crate::core_modules::annotator::{AnnotationStyle, annotate};
use crate::core_modules::mask_extractor::{self, BinaryMask};
use crate::core_modules::normalizer::{self, CanonicalSize, NormalizedImage};
use crate::core_modules::region_detector::region_detector;
use crate::core_modules::similarity::{self, DissimilarityMap};
use crate::error::{DiffError, Result};
use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};
use log::debug;

// Re-export key data structures for the public API.
pub use crate::core_modules::region::Region;

pub const DEFAULT_WINDOW_SIZE: u32 = 7;

/// Configuration for the DiffPipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The resolution both images are resized to before comparison.
    pub canonical_size: CanonicalSize,
    /// Side of the square similarity window. Must be odd, at least 3, and fit the canonical size.
    pub window_size: u32,
    /// Resampling filter used by the normalizer.
    pub resize_filter: FilterType,
    /// How region outlines are drawn on the annotated outputs.
    pub annotation: AnnotationStyle,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            canonical_size: CanonicalSize::default(),
            window_size: DEFAULT_WINDOW_SIZE,
            resize_filter: FilterType::CatmullRom,
            annotation: AnnotationStyle::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        let CanonicalSize { width, height } = self.canonical_size;
        if width == 0 || height == 0 {
            return Err(DiffError::InvalidConfig(format!(
                "canonical size must be non-empty, got {width}x{height}"
            )));
        }
        if self.annotation.stroke_width == 0 {
            return Err(DiffError::InvalidConfig("stroke width must be at least 1".to_string()));
        }
        similarity::validate_window(self.window_size, width, height)
    }
}

/// Everything one comparison produces. Never mutated after creation.
#[derive(Debug, Clone)]
pub struct ComparisonResult {
    /// Similarity as a percentage in [0, 100], rounded to 2 decimal places.
    pub score: f64,
    /// The unrounded structural similarity in [-1, 1].
    pub raw_score: f64,
    /// The regions drawn on both annotated images.
    pub regions: Vec<Region>,
    pub annotated_reference: RgbImage,
    pub annotated_candidate: RgbImage,
    pub dissimilarity_map: DissimilarityMap,
    pub binary_mask: BinaryMask,
}

impl ComparisonResult {
    /// The user-facing verdict, e.g. `"98.21% correct"`.
    pub fn prediction(&self) -> String {
        format!("{:.2}% correct", self.score)
    }

    pub fn is_identical(&self) -> bool {
        self.regions.is_empty()
    }
}

/// Converts a raw similarity into a percentage clamped to [0, 100] with 2 decimals.
pub fn to_percentage(raw_score: f64) -> f64 {
    ((raw_score * 100.0).clamp(0.0, 100.0) * 100.0).round() / 100.0
}

/// The main, top-level struct for the differencing engine.
#[derive(Debug, Clone, Default)]
pub struct DiffPipeline {
    config: PipelineConfig,
}

impl DiffPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Compares two encoded images (any format the `image` crate can decode).
    pub fn compare_bytes(&self, reference: &[u8], candidate: &[u8]) -> Result<ComparisonResult> {
        let size = self.config.canonical_size;
        let filter = self.config.resize_filter;
        // Stage 1: Normalization
        let reference = normalizer::normalize_bytes(reference, size, filter)?;
        let candidate = normalizer::normalize_bytes(candidate, size, filter)?;
        self.run(reference, candidate)
    }

    /// Compares two already decoded images.
    pub fn compare_images(&self, reference: &DynamicImage, candidate: &DynamicImage) -> Result<ComparisonResult> {
        let size = self.config.canonical_size;
        let filter = self.config.resize_filter;
        // Stage 1: Normalization
        let reference = normalizer::normalize(reference, size, filter);
        let candidate = normalizer::normalize(candidate, size, filter);
        self.run(reference, candidate)
    }

    fn run(&self, reference: NormalizedImage, candidate: NormalizedImage) -> Result<ComparisonResult> {
        debug!(
            "normalized both images to {}x{}",
            self.config.canonical_size.width, self.config.canonical_size.height
        );

        // Stage 2: Structural Similarity
        let report = similarity::compare(&reference.gray, &candidate.gray, self.config.window_size)?;
        debug!("structural similarity {:.6}", report.score);

        // Stage 3: Automatic Thresholding
        let binary_mask = mask_extractor::threshold(&report.dissimilarity);
        debug!(
            "otsu level {} marks {} pixels as different",
            binary_mask.level(),
            binary_mask.foreground_count()
        );

        // Stage 4: Spatial Grouping
        let regions = region_detector::find_regions(&binary_mask);
        debug!("found {} difference regions", regions.len());

        // Stage 5: Annotation
        let annotated_reference = annotate(&reference.color, &regions, &self.config.annotation);
        let annotated_candidate = annotate(&candidate.color, &regions, &self.config.annotation);

        Ok(ComparisonResult {
            score: to_percentage(report.score),
            raw_score: report.score,
            regions,
            annotated_reference,
            annotated_candidate,
            dissimilarity_map: report.dissimilarity,
            binary_mask,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn percentage_rounds_to_two_decimals() {
        assert_eq!(to_percentage(1.0), 100.0);
        assert_eq!(to_percentage(0.982_149), 98.21);
        assert_eq!(to_percentage(0.982_151), 98.22);
        assert_eq!(to_percentage(-0.2), 0.0);
    }

    #[test]
    fn prediction_formats_score() {
        let result = DiffPipeline::default()
            .compare_images(
                &DynamicImage::new_rgb8(250, 160),
                &DynamicImage::new_rgb8(250, 160),
            )
            .unwrap();
        assert_eq!(result.prediction(), "100.00% correct");
        assert!(result.is_identical());
    }

    #[test]
    fn default_config_is_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let even = PipelineConfig { window_size: 8, ..PipelineConfig::default() };
        assert_eq!(DiffPipeline::new(even).unwrap_err().kind(), ErrorKind::InvalidConfig);

        let tiny = PipelineConfig {
            canonical_size: CanonicalSize { width: 5, height: 5 },
            ..PipelineConfig::default()
        };
        assert_eq!(DiffPipeline::new(tiny).unwrap_err().kind(), ErrorKind::InvalidConfig);

        let empty = PipelineConfig {
            canonical_size: CanonicalSize { width: 0, height: 160 },
            ..PipelineConfig::default()
        };
        assert_eq!(DiffPipeline::new(empty).unwrap_err().kind(), ErrorKind::InvalidConfig);

        let mut no_stroke = PipelineConfig::default();
        no_stroke.annotation.stroke_width = 0;
        assert_eq!(DiffPipeline::new(no_stroke).unwrap_err().kind(), ErrorKind::InvalidConfig);
    }

    #[test]
    fn larger_window_is_accepted() {
        let config = PipelineConfig { window_size: 11, ..PipelineConfig::default() };
        let pipeline = DiffPipeline::new(config).unwrap();
        assert_eq!(pipeline.config().window_size, 11);
    }
}
