// THEORY:
// This file is the main entry point for the `diff_vision` library crate.
// It exports the `DiffPipeline` and its data structures (`PipelineConfig`,
// `ComparisonResult`, `Region`) as the high-level interface of the engine, plus
// the async `ComparisonService` for callers that receive uploads and need the
// four artifacts on disk. The individual stages live in `core_modules` and stay
// public for callers that want to run them one by one.

pub mod core_modules;
pub mod error;
pub mod pipeline;
pub mod service;

pub use error::{DiffError, ErrorKind, Result};
pub use pipeline::{ComparisonResult, DiffPipeline, PipelineConfig, Region};
pub use service::{ComparisonOutcome, ComparisonService, ServiceConfig, Upload};
