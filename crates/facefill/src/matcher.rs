//! Directory matcher: pairs ground-truth files with same-named predictions
//! and scores every pair.
//!
//! Rows always come out in lexicographic ground-truth filename order. With
//! `jobs != 1` pairs are scored on a rayon pool, but outcomes are collected
//! in input order and folded sequentially, so reports and averages do not
//! depend on thread scheduling.

use crate::aggregate::{compute_all_with_range, MetricAccumulator, MetricRecord};
use crate::config::EvalConfig;
use crate::image_io::{load_rgb, reconcile, Reconciliation};
use crate::progress::{Progress, ProgressEvent};
use crate::result::{FacefillError, FacefillResult};
use glob::{MatchOptions, Pattern};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One report row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationRow {
    /// Ground-truth file name
    pub file: String,
    /// Scores of the pair
    pub metrics: MetricRecord,
}

/// A file that could not be processed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedFile {
    /// File name
    pub file: String,
    /// Error description
    pub reason: String,
}

/// Result of processing one ground-truth file
#[derive(Debug, Clone, PartialEq)]
pub enum PairOutcome {
    /// Pair was scored
    Evaluated {
        /// Report row
        row: EvaluationRow,
        /// How shapes were reconciled
        reconciliation: Reconciliation,
    },
    /// No prediction with the same name
    Missing(String),
    /// Decoding failed and the pair was skipped
    Failed(FailedFile),
}

/// Outcome of a whole evaluation run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    /// Ground-truth files found
    pub total_gt: usize,
    /// Scored pairs in filename order
    pub rows: Vec<EvaluationRow>,
    /// Per-metric means over `rows`
    pub averages: Option<MetricRecord>,
    /// Ground-truth files without a prediction
    pub missing: Vec<String>,
    /// Pairs skipped because a file failed to decode
    pub failed: Vec<FailedFile>,
    /// Pairs that were cropped to a common shape
    pub cropped: Vec<String>,
}

impl RunSummary {
    /// Number of scored pairs
    #[must_use]
    pub fn evaluated(&self) -> usize {
        self.rows.len()
    }

    /// Ground-truth files that produced no row
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.total_gt - self.evaluated()
    }
}

/// File name of `path` as reported in rows and console lines
fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

/// Regular files directly inside `dir` whose names end with `ext`
/// (case-sensitive), sorted by file name. Dotfiles are listed only when
/// `include_hidden` is set.
pub fn list_with_extension(
    dir: &Path,
    ext: &str,
    include_hidden: bool,
) -> FacefillResult<Vec<PathBuf>> {
    let pattern = format!(
        "{}/*{}",
        Pattern::escape(&dir.to_string_lossy()),
        Pattern::escape(ext)
    );
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: !include_hidden,
    };

    let mut files: Vec<PathBuf> = glob::glob_with(&pattern, options)?
        .filter_map(Result::ok)
        .filter(|p| p.is_file())
        .collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Scores ground-truth / prediction directory pairs
#[derive(Debug, Clone)]
pub struct Evaluator {
    config: EvalConfig,
}

impl Evaluator {
    /// Create an evaluator
    #[must_use]
    pub const fn new(config: EvalConfig) -> Self {
        Self { config }
    }

    /// Get configuration
    #[must_use]
    pub const fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Process one ground-truth file.
    ///
    /// A missing prediction and (unless `fail_fast`) an undecodable file are
    /// recorded as outcomes; anything else is an error.
    pub fn evaluate_pair(&self, gt_path: &Path) -> FacefillResult<PairOutcome> {
        let file = display_name(gt_path);
        let Some(name) = gt_path.file_name() else {
            return Err(FacefillError::config(format!(
                "not a file path: {}",
                gt_path.display()
            )));
        };

        let pred_path = self.config.pred_dir.join(name);
        if !pred_path.is_file() {
            warn!(file = %file, "missing prediction");
            return Ok(PairOutcome::Missing(file));
        }

        let loaded = load_rgb(gt_path).and_then(|gt| load_rgb(&pred_path).map(|pred| (gt, pred)));
        let (gt, pred) = match loaded {
            Ok(pair) => pair,
            Err(e @ FacefillError::Decode { .. }) if !self.config.fail_fast => {
                warn!(file = %file, error = %e, "skipping undecodable pair");
                return Ok(PairOutcome::Failed(FailedFile {
                    file,
                    reason: e.to_string(),
                }));
            }
            Err(e) => return Err(e),
        };

        let (gt, pred, reconciliation) = reconcile(gt, pred, self.config.size)?;
        let metrics = compute_all_with_range(&gt, &pred, self.config.data_range)?;
        debug!(
            file = %file,
            psnr = metrics.psnr,
            ssim = metrics.ssim,
            mse = metrics.mse,
            "pair evaluated"
        );

        Ok(PairOutcome::Evaluated {
            row: EvaluationRow { file, metrics },
            reconciliation,
        })
    }

    fn evaluate_notify(&self, gt_path: &Path, progress: &dyn Progress) -> FacefillResult<PairOutcome> {
        let outcome = self.evaluate_pair(gt_path)?;
        match &outcome {
            PairOutcome::Evaluated {
                row,
                reconciliation: Reconciliation::Cropped { gt, pred, to },
            } => progress.event(&ProgressEvent::Cropped {
                file: &row.file,
                gt: *gt,
                pred: *pred,
                to: *to,
            }),
            PairOutcome::Evaluated { row, .. } => {
                progress.event(&ProgressEvent::Evaluated { file: &row.file });
            }
            PairOutcome::Missing(file) => {
                progress.event(&ProgressEvent::MissingPrediction { file });
            }
            PairOutcome::Failed(failed) => progress.event(&ProgressEvent::Failed {
                file: &failed.file,
                reason: &failed.reason,
            }),
        }
        Ok(outcome)
    }

    fn evaluate_files(
        &self,
        files: &[PathBuf],
        progress: &dyn Progress,
    ) -> FacefillResult<Vec<PairOutcome>> {
        if self.config.jobs == 1 {
            return files
                .iter()
                .map(|path| self.evaluate_notify(path, progress))
                .collect();
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.jobs)
            .build()
            .map_err(|e| FacefillError::config(format!("cannot start worker pool: {e}")))?;

        let results: Vec<FacefillResult<PairOutcome>> = pool.install(|| {
            files
                .par_iter()
                .map(|path| self.evaluate_notify(path, progress))
                .collect()
        });
        results.into_iter().collect()
    }

    /// Score every ground-truth file that has a same-named prediction.
    ///
    /// An empty ground-truth listing is not an error: the summary simply has
    /// `total_gt == 0`.
    pub fn evaluate(&self, progress: &dyn Progress) -> FacefillResult<RunSummary> {
        self.config.validate()?;

        let files = list_with_extension(&self.config.gt_dir, &self.config.ext, true)?;
        if files.is_empty() {
            warn!(
                dir = %self.config.gt_dir.display(),
                ext = %self.config.ext,
                "no ground-truth images found"
            );
            return Ok(RunSummary::default());
        }

        info!(
            files = files.len(),
            gt = %self.config.gt_dir.display(),
            pred = %self.config.pred_dir.display(),
            jobs = self.config.jobs,
            "evaluating"
        );
        progress.begin(files.len(), "Evaluating");
        let outcomes = self.evaluate_files(&files, progress);
        progress.finish();

        let mut summary = RunSummary {
            total_gt: files.len(),
            ..RunSummary::default()
        };
        let mut accumulator = MetricAccumulator::new(self.config.psnr_averaging);

        for outcome in outcomes? {
            match outcome {
                PairOutcome::Evaluated {
                    row,
                    reconciliation,
                } => {
                    accumulator.add(&row.metrics);
                    if matches!(reconciliation, Reconciliation::Cropped { .. }) {
                        summary.cropped.push(row.file.clone());
                    }
                    summary.rows.push(row);
                }
                PairOutcome::Missing(file) => summary.missing.push(file),
                PairOutcome::Failed(failed) => summary.failed.push(failed),
            }
        }

        summary.averages = accumulator.average();
        info!(
            evaluated = summary.evaluated(),
            skipped = summary.skipped(),
            "evaluation finished"
        );
        Ok(summary)
    }

    /// Evaluate and, if at least one pair was scored, write the CSV report
    /// (and the JSON summary when configured).
    ///
    /// Failures while writing either report surface as
    /// [`FacefillError::Report`].
    pub fn run(&self, progress: &dyn Progress) -> FacefillResult<RunSummary> {
        let summary = self.evaluate(progress)?;
        if summary.evaluated() > 0 {
            let csv_path = &self.config.csv_path;
            crate::report::CsvReport::new(&summary)
                .write(csv_path)
                .map_err(|e| report_error(csv_path, &e))?;
            if let Some(ref json_path) = self.config.json_path {
                crate::report::write_json(&summary, json_path)
                    .map_err(|e| report_error(json_path, &e))?;
            }
        }
        Ok(summary)
    }
}

fn report_error(path: &Path, err: &FacefillError) -> FacefillError {
    match err {
        FacefillError::Report { message } => FacefillError::report(message.clone()),
        _ => FacefillError::report(format!("cannot write {}: {err}", path.display())),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::aggregate::PsnrAveraging;
    use crate::image_io::TargetSize;
    use crate::progress::Silent;
    use image::{Rgb, RgbImage};
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct Dirs {
        _root: TempDir,
        gt: PathBuf,
        pred: PathBuf,
        out: PathBuf,
    }

    fn dirs() -> Dirs {
        let root = TempDir::new().unwrap();
        let gt = root.path().join("gt");
        let pred = root.path().join("pred");
        let out = root.path().join("results");
        std::fs::create_dir_all(&gt).unwrap();
        std::fs::create_dir_all(&pred).unwrap();
        Dirs {
            gt,
            pred,
            out,
            _root: root,
        }
    }

    fn face(width: u32, height: u32, seed: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([
                ((x * 3 + seed) % 256) as u8,
                ((y * 5 + seed * 2) % 256) as u8,
                ((x * y + seed) % 256) as u8,
            ])
        })
    }

    fn config(d: &Dirs) -> EvalConfig {
        EvalConfig::new(&d.gt, &d.pred).with_csv_path(d.out.join("metrics.csv"))
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl Progress for Recorder {
        fn event(&self, event: &ProgressEvent<'_>) {
            let line = match event {
                ProgressEvent::Evaluated { file } => format!("ok {file}"),
                ProgressEvent::Cropped { file, .. } => format!("crop {file}"),
                ProgressEvent::MissingPrediction { file } => format!("missing {file}"),
                ProgressEvent::Failed { file, .. } => format!("failed {file}"),
                ProgressEvent::Written { file, .. } => format!("written {file}"),
            };
            self.0.lock().unwrap().push(line);
        }
    }

    #[test]
    fn test_list_sorted_and_case_sensitive() {
        let d = dirs();
        for name in ["c.jpg", "a.jpg", "b.JPG", "b.jpg", ".hidden.jpg", "notes.txt"] {
            std::fs::write(d.gt.join(name), b"x").unwrap();
        }
        std::fs::create_dir(d.gt.join("folder.jpg")).unwrap();

        let files = list_with_extension(&d.gt, ".jpg", false).unwrap();
        let names: Vec<String> = files.iter().map(|p| display_name(p)).collect();
        assert_eq!(names, ["a.jpg", "b.jpg", "c.jpg"]);

        let files = list_with_extension(&d.gt, ".jpg", true).unwrap();
        let names: Vec<String> = files.iter().map(|p| display_name(p)).collect();
        assert_eq!(names, [".hidden.jpg", "a.jpg", "b.jpg", "c.jpg"]);
    }

    #[test]
    fn test_hidden_ground_truth_is_evaluated() {
        let d = dirs();
        face(16, 16, 4).save(d.gt.join(".face.png")).unwrap();
        face(16, 16, 4).save(d.pred.join(".face.png")).unwrap();
        face(16, 16, 9).save(d.gt.join("a.png")).unwrap();

        let summary = Evaluator::new(config(&d).with_ext(".png"))
            .evaluate(&Silent)
            .unwrap();
        assert_eq!(summary.total_gt, 2);
        assert_eq!(summary.evaluated(), 1);
        assert_eq!(summary.rows[0].file, ".face.png");
        assert_eq!(summary.missing, ["a.png"]);
    }

    #[test]
    fn test_png_content_with_jpg_name_is_evaluated() {
        let d = dirs();
        let mut png = std::io::Cursor::new(Vec::new());
        face(16, 16, 2)
            .write_to(&mut png, image::ImageFormat::Png)
            .unwrap();
        let bytes = png.into_inner();
        std::fs::write(d.gt.join("a.jpg"), &bytes).unwrap();
        std::fs::write(d.pred.join("a.jpg"), &bytes).unwrap();

        let summary = Evaluator::new(config(&d)).evaluate(&Silent).unwrap();
        assert!(summary.failed.is_empty(), "{:?}", summary.failed);
        assert_eq!(summary.evaluated(), 1);
        assert!(summary.rows[0].metrics.psnr.is_infinite());
    }

    #[test]
    fn test_list_missing_directory_is_empty() {
        let d = dirs();
        let files = list_with_extension(&d.gt.join("nope"), ".jpg", false).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_missing_prediction_is_skipped() {
        let d = dirs();
        for (i, name) in ["a.jpg", "b.jpg", "c.jpg"].iter().enumerate() {
            face(32, 32, i as u32).save(d.gt.join(name)).unwrap();
        }
        std::fs::copy(d.gt.join("a.jpg"), d.pred.join("a.jpg")).unwrap();
        std::fs::copy(d.gt.join("c.jpg"), d.pred.join("c.jpg")).unwrap();

        let recorder = Recorder::default();
        let summary = Evaluator::new(config(&d)).evaluate(&recorder).unwrap();

        assert_eq!(summary.total_gt, 3);
        assert_eq!(summary.evaluated(), 2);
        assert_eq!(summary.skipped(), 1);
        assert_eq!(summary.missing, ["b.jpg"]);
        let files: Vec<&str> = summary.rows.iter().map(|r| r.file.as_str()).collect();
        assert_eq!(files, ["a.jpg", "c.jpg"]);
        assert_eq!(
            *recorder.0.lock().unwrap(),
            ["ok a.jpg", "missing b.jpg", "ok c.jpg"]
        );
    }

    #[test]
    fn test_identical_directories_are_perfect() {
        let d = dirs();
        for (i, name) in ["x.png", "y.png"].iter().enumerate() {
            let img = face(40, 24, i as u32 * 17);
            img.save(d.gt.join(name)).unwrap();
            img.save(d.pred.join(name)).unwrap();
        }

        let summary = Evaluator::new(config(&d).with_ext(".png"))
            .evaluate(&Silent)
            .unwrap();
        let avg = summary.averages.unwrap();
        assert_eq!(avg.mse, 0.0);
        assert_eq!(avg.psnr, f64::INFINITY);
        assert!((avg.ssim - 1.0).abs() < 1e-9);
        assert!((avg.ncorr - 1.0).abs() < 1e-9);
        assert!((avg.uiqi - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_mismatched_shapes_are_cropped() {
        let d = dirs();
        let gt = face(100, 100, 3);
        // prediction is 90 rows high; its content equals the gt's top 90 rows
        let pred = image::imageops::crop_imm(&gt, 0, 0, 100, 90).to_image();
        gt.save(d.gt.join("p.png")).unwrap();
        pred.save(d.pred.join("p.png")).unwrap();

        let summary = Evaluator::new(config(&d).with_ext(".png"))
            .evaluate(&Silent)
            .unwrap();
        assert_eq!(summary.cropped, ["p.png"]);
        let row = &summary.rows[0];
        assert_eq!(row.metrics.mse, 0.0);
        assert_eq!(row.metrics.psnr, f64::INFINITY);
    }

    #[test]
    fn test_resize_applies_to_both() {
        let d = dirs();
        face(64, 48, 1).save(d.gt.join("r.png")).unwrap();
        face(32, 20, 1).save(d.pred.join("r.png")).unwrap();

        let summary = Evaluator::new(
            config(&d)
                .with_ext(".png")
                .with_size(Some(TargetSize::new(16, 16))),
        )
        .evaluate(&Silent)
        .unwrap();
        assert_eq!(summary.evaluated(), 1);
        assert!(summary.cropped.is_empty());
    }

    #[test]
    fn test_undecodable_pair_is_skipped() {
        let d = dirs();
        face(16, 16, 0).save(d.gt.join("ok.png")).unwrap();
        face(16, 16, 0).save(d.pred.join("ok.png")).unwrap();
        face(16, 16, 0).save(d.gt.join("bad.png")).unwrap();
        std::fs::write(d.pred.join("bad.png"), b"garbage").unwrap();

        let summary = Evaluator::new(config(&d).with_ext(".png"))
            .evaluate(&Silent)
            .unwrap();
        assert_eq!(summary.evaluated(), 1);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].file, "bad.png");
    }

    #[test]
    fn test_undecodable_pair_fails_fast() {
        let d = dirs();
        face(16, 16, 0).save(d.gt.join("bad.png")).unwrap();
        std::fs::write(d.pred.join("bad.png"), b"garbage").unwrap();

        let result = Evaluator::new(config(&d).with_ext(".png").with_fail_fast(true))
            .evaluate(&Silent);
        assert!(matches!(result, Err(FacefillError::Decode { .. })));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let d = dirs();
        for i in 0..6u32 {
            let name = format!("f{i}.png");
            face(24, 24, i).save(d.gt.join(&name)).unwrap();
            face(24, 24, i + 1).save(d.pred.join(&name)).unwrap();
        }

        let sequential = Evaluator::new(config(&d).with_ext(".png"))
            .evaluate(&Silent)
            .unwrap();
        let parallel = Evaluator::new(config(&d).with_ext(".png").with_jobs(3))
            .evaluate(&Silent)
            .unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_run_without_images_writes_nothing() {
        let d = dirs();
        let summary = Evaluator::new(config(&d)).run(&Silent).unwrap();
        assert_eq!(summary.total_gt, 0);
        assert!(!d.out.join("metrics.csv").exists());
    }

    #[test]
    fn test_run_without_pairs_writes_nothing() {
        let d = dirs();
        face(8, 8, 0).save(d.gt.join("lonely.png")).unwrap();
        let summary = Evaluator::new(config(&d).with_ext(".png"))
            .run(&Silent)
            .unwrap();
        assert_eq!(summary.evaluated(), 0);
        assert!(summary.averages.is_none());
        assert!(!d.out.join("metrics.csv").exists());
    }

    #[test]
    fn test_run_writes_csv_and_json() {
        let d = dirs();
        face(12, 12, 0).save(d.gt.join("a.png")).unwrap();
        face(12, 12, 9).save(d.pred.join("a.png")).unwrap();
        let json = d.out.join("summary.json");

        Evaluator::new(
            config(&d)
                .with_ext(".png")
                .with_json_path(Some(json.clone()))
                .with_psnr_averaging(PsnrAveraging::ExcludeInfinite),
        )
        .run(&Silent)
        .unwrap();

        let csv = std::fs::read_to_string(d.out.join("metrics.csv")).unwrap();
        assert!(csv.starts_with("file,PSNR,SSIM,UIQI,NCORR,MSE\n"));
        assert!(csv.contains("\na.png,"));
        assert!(json.exists());
    }
    #[test]
    fn test_run_unwritable_report_is_report_error() {
        let d = dirs();
        face(12, 12, 0).save(d.gt.join("a.png")).unwrap();
        face(12, 12, 0).save(d.pred.join("a.png")).unwrap();

        let err = Evaluator::new(config(&d).with_ext(".png").with_csv_path(&d.gt))
            .run(&Silent)
            .unwrap_err();
        assert!(matches!(err, FacefillError::Report { .. }));
        assert!(err.to_string().contains("cannot write"));
    }
}
