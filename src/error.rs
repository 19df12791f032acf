// THEORY:
// Every way a comparison can fail is funnelled into one closed enum. The pipeline
// never retries and never returns a partial result, so a caller only needs to
// know *which* stage refused the request. `ErrorKind` is the fieldless mirror of
// `DiffError` for callers that branch on the category (e.g. to pick which message
// to re-render in an upload form).

use std::path::PathBuf;

/// The failure categories a caller can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    EmptyInput,
    ImageDecode,
    DimensionMismatch,
    MissingReference,
    InvalidConfig,
    ArtifactWrite,
    UnknownArtifact,
    DeadlineExceeded,
    Io,
    Worker,
}

#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// No file, or a zero-byte file, was supplied.
    #[error("no image was supplied")]
    EmptyInput,

    #[error("could not decode image: {0}")]
    ImageDecode(#[source] image::ImageError),

    /// Two surfaces entering the similarity engine disagree on size.
    #[error("surfaces differ in size: {left_width}x{left_height} vs {right_width}x{right_height}")]
    DimensionMismatch {
        left_width: u32,
        left_height: u32,
        right_width: u32,
        right_height: u32,
    },

    #[error("no reference image found at {}", .0.display())]
    MissingReference(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to write artifact {}: {source}", .path.display())]
    ArtifactWrite {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("unknown artifact '{0}'")]
    UnknownArtifact(String),

    #[error("comparison exceeded its deadline of {0:?}")]
    DeadlineExceeded(std::time::Duration),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The blocking worker running the pipeline panicked or was cancelled.
    #[error("comparison worker failed: {0}")]
    Worker(String),
}

impl DiffError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DiffError::EmptyInput => ErrorKind::EmptyInput,
            DiffError::ImageDecode(_) => ErrorKind::ImageDecode,
            DiffError::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            DiffError::MissingReference(_) => ErrorKind::MissingReference,
            DiffError::InvalidConfig(_) => ErrorKind::InvalidConfig,
            DiffError::ArtifactWrite { .. } => ErrorKind::ArtifactWrite,
            DiffError::UnknownArtifact(_) => ErrorKind::UnknownArtifact,
            DiffError::DeadlineExceeded(_) => ErrorKind::DeadlineExceeded,
            DiffError::Io(_) => ErrorKind::Io,
            DiffError::Worker(_) => ErrorKind::Worker,
        }
    }
}

pub type Result<T> = std::result::Result<T, DiffError>;
