//! Facefill: Evaluation Pipeline for Face Inpainting
//!
//! Scores reconstructed faces against their ground truth with five
//! full-reference metrics (PSNR, SSIM, UIQI, NCORR, MSE), matches whole
//! directories of images by file name and writes a CSV report with
//! per-pair rows and an averages row. A batched runner drives an external
//! inpainting model over a directory of masked inputs.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    FACEFILL Pipeline                         │
//! ├──────────────────────────────────────────────────────────────┤
//! │  masked/ ──► InferenceRunner ──► pred/                       │
//! │                  (Inpainter)                                 │
//! │                                                              │
//! │  gt/ + pred/ ──► Evaluator ──► compute_all ──► Accumulator   │
//! │                 (reconcile)   (metrics, ssim)       │        │
//! │                                                     ▼        │
//! │                                        CsvReport / JSON      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use facefill::{EvalConfig, Evaluator, Silent};
//!
//! let config = EvalConfig::new("data/gt", "data/pred").with_csv_path("results/metrics.csv");
//! let summary = Evaluator::new(config).run(&Silent)?;
//! if let Some(avg) = summary.averages {
//!     println!("SSIM: {:.4}", avg.ssim);
//! }
//! # Ok::<(), facefill::FacefillError>(())
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

/// Metric records, batch computation and running averages
#[allow(clippy::missing_errors_doc)]
pub mod aggregate;

/// Evaluation configuration and settings files
#[allow(clippy::missing_errors_doc)]
pub mod config;

/// Image decoding and shape reconciliation
#[allow(clippy::missing_errors_doc)]
pub mod image_io;

/// Batched inference with an external model
#[allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]
pub mod inference;

/// Directory matching and evaluation runs
#[allow(clippy::missing_errors_doc)]
pub mod matcher;

/// Pixel-statistic metrics
#[allow(clippy::suboptimal_flops)]
pub mod metrics;

/// Progress notifications
pub mod progress;

/// CSV and JSON reports
#[allow(clippy::missing_errors_doc)]
pub mod report;

mod result;

/// Structural similarity
#[allow(clippy::suboptimal_flops, clippy::many_single_char_names)]
pub mod ssim;

pub use aggregate::{
    compute_all, compute_all_with_range, Metric, MetricAccumulator, MetricRecord, PsnrAveraging,
};
pub use config::{EvalConfig, EvalSettings, DEFAULT_CSV_PATH, DEFAULT_EXTENSION};
pub use image_io::{
    crop_top_left, load_rgb, reconcile, resize_to, shape, Reconciliation, TargetSize,
};
pub use inference::{
    collect_inputs, output_name, postprocess_to_u8, preprocess, InferenceConfig,
    InferenceRunner, InferenceSummary, Inpainter, NormalizedImage,
};
pub use matcher::{
    list_with_extension, EvaluationRow, Evaluator, FailedFile, PairOutcome, RunSummary,
};
pub use metrics::{mse, ncorr, psnr, uiqi, DEFAULT_DATA_RANGE};
pub use progress::{Progress, ProgressEvent, Silent};
pub use report::{csv_header, write_json, CsvReport};
pub use result::{FacefillError, FacefillResult};
pub use ssim::{ssim, SsimMetric, SsimResult};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::aggregate::*;
    pub use super::config::*;
    pub use super::image_io::*;
    pub use super::inference::*;
    pub use super::matcher::*;
    pub use super::metrics::*;
    pub use super::progress::*;
    pub use super::report::*;
    pub use super::result::*;
    pub use super::ssim::*;
}
