pub mod annotator;
pub mod mask_extractor;
pub mod normalizer;
pub mod region;
pub mod region_detector;
pub mod similarity;
pub mod utils;
