// THEORY:
// The `service` module is the collaborator layer that sits between an upload
// endpoint and the synchronous `DiffPipeline`. It owns everything the pipeline
// deliberately does not: where the reference image lives, where the four output
// artifacts go, how many comparisons may run at once, and how long a caller is
// willing to wait.
//
// Key architectural principles:
// 1.  **Read-Only Reference**: The stored reference image is read fresh for every
//     request and never rewritten, so concurrent requests cannot corrupt it.
// 2.  **Bounded Blocking Work**: The pipeline is CPU-bound, so each comparison runs
//     on tokio's blocking pool. A semaphore caps how many run at once; the permit
//     travels with the job and is only released when the job really finishes.
// 3.  **External Deadline**: The pipeline cannot be interrupted. A deadline only
//     stops *waiting*, counted from submission and covering the queue for a
//     worker; a late result is discarded and never written to disk.
// 4.  **Whole Artifact Sets**: The four files are staged under temporary names and
//     only renamed into place once all of them were written.
// 5.  **Closed Error Set**: Every failure reaches the caller as a `DiffError`, ready
//     to be rendered as a message. Nothing here panics the host process.

use crate::core_modules::utils::image_helper::image_helper;
use crate::error::{DiffError, Result};
use crate::pipeline::{ComparisonResult, DiffPipeline, PipelineConfig};
use image::ExtendedColorType;
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Semaphore};

/// File names of the four artifacts written per comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactNames {
    pub original_with_boxes: String,
    pub candidate_with_boxes: String,
    pub raw_difference: String,
    pub threshold_mask: String,
}

impl Default for ArtifactNames {
    fn default() -> Self {
        Self {
            original_with_boxes: "image_original.jpg".to_string(),
            candidate_with_boxes: "image_uploaded.jpg".to_string(),
            raw_difference: "image_diff.jpg".to_string(),
            threshold_mask: "image_thresh.jpg".to_string(),
        }
    }
}

impl ArtifactNames {
    fn all(&self) -> [&str; 4] {
        [
            &self.original_with_boxes,
            &self.candidate_with_boxes,
            &self.raw_difference,
            &self.threshold_mask,
        ]
    }
}

/// Configuration for the ComparisonService.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// The stored reference image. Read on every request, never written.
    pub reference_path: PathBuf,
    /// Directory receiving the generated artifacts. Created on demand.
    pub output_dir: PathBuf,
    pub artifact_names: ArtifactNames,
    /// Maximum number of comparisons running at the same time.
    pub max_concurrent: usize,
    /// Optional per-request deadline.
    pub deadline: Option<Duration>,
    pub pipeline: PipelineConfig,
}

impl ServiceConfig {
    pub fn new(reference_path: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            reference_path: reference_path.into(),
            output_dir: output_dir.into(),
            artifact_names: ArtifactNames::default(),
            max_concurrent: num_cpus::get().max(1),
            deadline: None,
            pipeline: PipelineConfig::default(),
        }
    }
}

/// A submitted candidate image, as received from an upload form.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }
}

/// Where the four artifacts of a comparison were written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub original_with_boxes: PathBuf,
    pub candidate_with_boxes: PathBuf,
    pub raw_difference: PathBuf,
    pub threshold_mask: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ComparisonOutcome {
    pub result: ComparisonResult,
    pub artifacts: ArtifactPaths,
}

impl ComparisonOutcome {
    pub fn prediction(&self) -> String {
        self.result.prediction()
    }
}

/// The text an upload form shows after a submission.
pub fn render_message(outcome: &Result<ComparisonOutcome>) -> String {
    match outcome {
        Ok(outcome) => outcome.prediction(),
        Err(err) => err.to_string(),
    }
}

pub struct ComparisonService {
    config: ServiceConfig,
    pipeline: DiffPipeline,
    permits: Arc<Semaphore>,
    /// Serializes artifact writes; the file names are shared by every request.
    artifact_lock: Mutex<()>,
}

impl ComparisonService {
    pub fn new(config: ServiceConfig) -> Result<Self> {
        if config.max_concurrent == 0 {
            return Err(DiffError::InvalidConfig("max_concurrent must be at least 1".to_string()));
        }
        let pipeline = DiffPipeline::new(config.pipeline.clone())?;
        let permits = Arc::new(Semaphore::new(config.max_concurrent));
        Ok(Self {
            config,
            pipeline,
            permits,
            artifact_lock: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Compares an uploaded candidate against the stored reference and writes the artifacts.
    ///
    /// The deadline is measured from the call: reading the reference, queueing for a
    /// worker and the comparison itself all count against it.
    pub async fn submit(&self, upload: Upload) -> Result<ComparisonOutcome> {
        if upload.filename.is_empty() || upload.bytes.is_empty() {
            warn!("rejected upload '{}': no file selected", upload.filename);
            return Err(DiffError::EmptyInput);
        }
        let started = Instant::now();
        let filename = upload.filename.clone();

        let compared = match self.config.deadline {
            Some(deadline) => {
                let expires = tokio::time::Instant::from_std(started) + deadline;
                match tokio::time::timeout_at(expires, self.compare(upload.bytes)).await {
                    Ok(compared) => compared,
                    Err(_) => {
                        warn!("comparison of '{}' exceeded {:?}", filename, deadline);
                        return Err(DiffError::DeadlineExceeded(deadline));
                    }
                }
            }
            None => self.compare(upload.bytes).await,
        };
        let result = match compared {
            Ok(result) => result,
            Err(err) => {
                warn!("comparison of '{}' failed: {}", filename, err);
                return Err(err);
            }
        };

        let artifacts = self.write_artifacts(&result).await?;
        info!(
            "compared '{}': {} with {} regions in {:?}",
            filename,
            result.prediction(),
            result.regions.len(),
            started.elapsed()
        );
        Ok(ComparisonOutcome { result, artifacts })
    }

    /// Reads the reference, waits for a worker and runs the pipeline on it.
    /// Dropping the future before a permit is granted never starts the job.
    async fn compare(&self, candidate: Vec<u8>) -> Result<ComparisonResult> {
        let reference = self.read_reference().await?;
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| DiffError::Worker(e.to_string()))?;
        let pipeline = self.pipeline.clone();
        let job = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            pipeline.compare_bytes(&reference, &candidate)
        });
        job.await.map_err(|e| DiffError::Worker(e.to_string()))?
    }

    /// Resolves a download request to one of the four artifact files.
    pub async fn artifact_path(&self, name: &str) -> Result<PathBuf> {
        if !self.config.artifact_names.all().contains(&name) {
            return Err(DiffError::UnknownArtifact(name.to_string()));
        }
        let path = self.config.output_dir.join(name);
        if !tokio::fs::try_exists(&path).await? {
            return Err(DiffError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("artifact {} has not been generated yet", path.display()),
            )));
        }
        Ok(path)
    }

    async fn read_reference(&self) -> Result<Vec<u8>> {
        let path = &self.config.reference_path;
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!("no reference image at {}", path.display());
                Err(DiffError::MissingReference(path.clone()))
            }
            Err(err) => Err(DiffError::Io(err)),
        }
    }

    async fn write_artifacts(&self, result: &ComparisonResult) -> Result<ArtifactPaths> {
        let _guard = self.artifact_lock.lock().await;
        let output_dir = self.config.output_dir.clone();
        let names = self.config.artifact_names.clone();
        let result = result.clone();
        tokio::task::spawn_blocking(move || write_artifacts(&output_dir, &names, &result))
            .await
            .map_err(|e| DiffError::Worker(e.to_string()))?
    }
}

/// Prefix of the files an artifact set is staged under before it replaces the last one.
const PENDING_PREFIX: &str = ".pending-";

fn write_artifacts(output_dir: &Path, names: &ArtifactNames, result: &ComparisonResult) -> Result<ArtifactPaths> {
    std::fs::create_dir_all(output_dir)?;
    let paths = ArtifactPaths {
        original_with_boxes: output_dir.join(&names.original_with_boxes),
        candidate_with_boxes: output_dir.join(&names.candidate_with_boxes),
        raw_difference: output_dir.join(&names.raw_difference),
        threshold_mask: output_dir.join(&names.threshold_mask),
    };
    let finals = [
        &paths.original_with_boxes,
        &paths.candidate_with_boxes,
        &paths.raw_difference,
        &paths.threshold_mask,
    ];
    let staged = names.all().map(|name| output_dir.join(format!("{PENDING_PREFIX}{name}")));

    if let Err(err) = stage_artifacts(&staged, result) {
        for path in &staged {
            let _ = std::fs::remove_file(path);
        }
        return Err(err);
    }
    // Only a complete set replaces the previous one.
    for (from, to) in staged.iter().zip(finals) {
        std::fs::rename(from, to)?;
    }
    Ok(paths)
}

fn stage_artifacts(staged: &[PathBuf; 4], result: &ComparisonResult) -> Result<()> {
    let reference = &result.annotated_reference;
    image_helper::save(
        &staged[0],
        reference.as_raw(),
        reference.width(),
        reference.height(),
        ExtendedColorType::Rgb8,
    )?;
    let candidate = &result.annotated_candidate;
    image_helper::save(
        &staged[1],
        candidate.as_raw(),
        candidate.width(),
        candidate.height(),
        ExtendedColorType::Rgb8,
    )?;
    let diff = &result.dissimilarity_map;
    image_helper::save(
        &staged[2],
        diff.as_image().as_raw(),
        diff.width(),
        diff.height(),
        ExtendedColorType::L8,
    )?;
    let mask = &result.binary_mask;
    image_helper::save(
        &staged[3],
        mask.as_image().as_raw(),
        mask.width(),
        mask.height(),
        ExtendedColorType::L8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_artifact_names_match_download_layout() {
        let names = ArtifactNames::default();
        assert_eq!(
            names.all(),
            ["image_original.jpg", "image_uploaded.jpg", "image_diff.jpg", "image_thresh.jpg"]
        );
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let mut config = ServiceConfig::new("ref.png", "out");
        config.max_concurrent = 0;
        assert!(matches!(ComparisonService::new(config), Err(DiffError::InvalidConfig(_))));
    }

    #[test]
    fn default_concurrency_follows_cpu_count() {
        let config = ServiceConfig::new("ref.png", "out");
        assert_eq!(config.max_concurrent, num_cpus::get().max(1));
        assert!(config.deadline.is_none());
    }

    #[test]
    fn error_message_is_rendered() {
        let outcome: Result<ComparisonOutcome> = Err(DiffError::EmptyInput);
        assert_eq!(render_message(&outcome), "no image was supplied");
    }
}
