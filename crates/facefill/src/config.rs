//! Evaluation configuration.
//!
//! [`EvalConfig`] is the explicit configuration value handed to the
//! directory matcher. [`EvalSettings`] is its optional on-disk form (YAML or
//! JSON); every field is optional and only overrides what it names.

use crate::aggregate::PsnrAveraging;
use crate::image_io::TargetSize;
use crate::metrics::DEFAULT_DATA_RANGE;
use crate::result::{FacefillError, FacefillResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default CSV report location
pub const DEFAULT_CSV_PATH: &str = "results/metrics.csv";
/// Default ground-truth extension
pub const DEFAULT_EXTENSION: &str = ".jpg";

/// Configuration of one evaluation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalConfig {
    /// Ground-truth directory
    pub gt_dir: PathBuf,
    /// Prediction directory
    pub pred_dir: PathBuf,
    /// Optional resize target applied to both images
    pub size: Option<TargetSize>,
    /// CSV report path
    pub csv_path: PathBuf,
    /// Optional JSON summary path
    pub json_path: Option<PathBuf>,
    /// Extension used to enumerate ground-truth files (case-sensitive)
    pub ext: String,
    /// Sample dynamic range for PSNR and SSIM
    pub data_range: f64,
    /// Treatment of infinite PSNR in the average
    pub psnr_averaging: PsnrAveraging,
    /// Worker threads (1 = sequential, 0 = one per core)
    pub jobs: usize,
    /// Abort on the first undecodable pair instead of skipping it
    pub fail_fast: bool,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            gt_dir: PathBuf::new(),
            pred_dir: PathBuf::new(),
            size: None,
            csv_path: PathBuf::from(DEFAULT_CSV_PATH),
            json_path: None,
            ext: DEFAULT_EXTENSION.to_string(),
            data_range: DEFAULT_DATA_RANGE,
            psnr_averaging: PsnrAveraging::Propagate,
            jobs: 1,
            fail_fast: false,
        }
    }
}

impl EvalConfig {
    /// Create a configuration for a ground-truth / prediction directory pair
    #[must_use]
    pub fn new(gt_dir: impl Into<PathBuf>, pred_dir: impl Into<PathBuf>) -> Self {
        Self {
            gt_dir: gt_dir.into(),
            pred_dir: pred_dir.into(),
            ..Self::default()
        }
    }

    /// Resize both images to `size` before comparing
    #[must_use]
    pub const fn with_size(mut self, size: Option<TargetSize>) -> Self {
        self.size = size;
        self
    }

    /// Set the CSV report path
    #[must_use]
    pub fn with_csv_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.csv_path = path.into();
        self
    }

    /// Also write a JSON summary
    #[must_use]
    pub fn with_json_path(mut self, path: Option<PathBuf>) -> Self {
        self.json_path = path;
        self
    }

    /// Set the ground-truth extension
    #[must_use]
    pub fn with_ext(mut self, ext: impl Into<String>) -> Self {
        self.ext = ext.into();
        self
    }

    /// Set the data range
    #[must_use]
    pub const fn with_data_range(mut self, data_range: f64) -> Self {
        self.data_range = data_range;
        self
    }

    /// Set the PSNR averaging policy
    #[must_use]
    pub const fn with_psnr_averaging(mut self, policy: PsnrAveraging) -> Self {
        self.psnr_averaging = policy;
        self
    }

    /// Set the worker count
    #[must_use]
    pub const fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    /// Set fail-fast on decode errors
    #[must_use]
    pub const fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Overlay the fields present in `settings`
    #[must_use]
    pub fn apply(mut self, settings: &EvalSettings) -> Self {
        if let Some(ref dir) = settings.gt_dir {
            self.gt_dir.clone_from(dir);
        }
        if let Some(ref dir) = settings.pred_dir {
            self.pred_dir.clone_from(dir);
        }
        if settings.size.is_some() {
            self.size = settings.size;
        }
        if let Some(ref path) = settings.csv {
            self.csv_path.clone_from(path);
        }
        if settings.json.is_some() {
            self.json_path.clone_from(&settings.json);
        }
        if let Some(ref ext) = settings.ext {
            self.ext.clone_from(ext);
        }
        if let Some(range) = settings.data_range {
            self.data_range = range;
        }
        if let Some(policy) = settings.psnr_averaging {
            self.psnr_averaging = policy;
        }
        if let Some(jobs) = settings.jobs {
            self.jobs = jobs;
        }
        if let Some(fail_fast) = settings.fail_fast {
            self.fail_fast = fail_fast;
        }
        self
    }

    /// Check the configuration before running
    pub fn validate(&self) -> FacefillResult<()> {
        if self.gt_dir.as_os_str().is_empty() {
            return Err(FacefillError::config("ground-truth directory is not set"));
        }
        if self.pred_dir.as_os_str().is_empty() {
            return Err(FacefillError::config("prediction directory is not set"));
        }
        if let Some(size) = self.size {
            if !size.is_valid() {
                return Err(FacefillError::config(format!(
                    "resize target must be positive, got {size}"
                )));
            }
        }
        if self.ext.is_empty() {
            return Err(FacefillError::config("extension must not be empty"));
        }
        if !(self.data_range.is_finite() && self.data_range > 0.0) {
            return Err(FacefillError::config(format!(
                "data range must be positive, got {}",
                self.data_range
            )));
        }
        if let PsnrAveraging::Cap(cap) = self.psnr_averaging {
            if !cap.is_finite() || cap <= 0.0 {
                return Err(FacefillError::config(format!(
                    "PSNR cap must be a positive finite value, got {cap}"
                )));
            }
        }
        Ok(())
    }
}

/// Evaluation settings file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvalSettings {
    /// Ground-truth directory
    pub gt_dir: Option<PathBuf>,
    /// Prediction directory
    pub pred_dir: Option<PathBuf>,
    /// Resize target
    pub size: Option<TargetSize>,
    /// CSV report path
    pub csv: Option<PathBuf>,
    /// JSON summary path
    pub json: Option<PathBuf>,
    /// Ground-truth extension
    pub ext: Option<String>,
    /// Data range
    pub data_range: Option<f64>,
    /// PSNR averaging policy
    pub psnr_averaging: Option<PsnrAveraging>,
    /// Worker threads
    pub jobs: Option<usize>,
    /// Abort on decode errors
    pub fail_fast: Option<bool>,
}

impl EvalSettings {
    /// Load settings from a `.json` file or, for any other extension, YAML
    pub fn from_file(path: &Path) -> FacefillResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(serde_yaml_ng::from_str(&content)?)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = EvalConfig::new("gt", "pred");
        assert_eq!(config.csv_path, PathBuf::from("results/metrics.csv"));
        assert_eq!(config.ext, ".jpg");
        assert_eq!(config.data_range, 255.0);
        assert_eq!(config.jobs, 1);
        assert!(config.size.is_none());
        assert!(!config.fail_fast);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_size() {
        let config = EvalConfig::new("gt", "pred").with_size(Some(TargetSize::new(0, 10)));
        assert!(matches!(
            config.validate(),
            Err(FacefillError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_range_and_ext() {
        assert!(EvalConfig::new("gt", "pred").with_data_range(0.0).validate().is_err());
        assert!(EvalConfig::new("gt", "pred").with_ext("").validate().is_err());
        assert!(EvalConfig::new("gt", "pred")
            .with_psnr_averaging(PsnrAveraging::Cap(f64::INFINITY))
            .validate()
            .is_err());
    }

    #[test]
    fn test_validate_requires_directories() {
        assert!(EvalConfig::default().validate().is_err());
    }

    #[test]
    fn test_apply_overrides_only_present_fields() {
        let settings = EvalSettings {
            ext: Some(".png".to_string()),
            jobs: Some(4),
            ..EvalSettings::default()
        };
        let config = EvalConfig::new("gt", "pred").apply(&settings);
        assert_eq!(config.ext, ".png");
        assert_eq!(config.jobs, 4);
        assert_eq!(config.gt_dir, PathBuf::from("gt"));
        assert_eq!(config.csv_path, PathBuf::from(DEFAULT_CSV_PATH));
    }

    #[test]
    fn test_settings_from_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("eval.yaml");
        std::fs::write(
            &path,
            "gt_dir: data/gt\npred_dir: data/pred\nsize:\n  height: 256\n  width: 128\npsnr_averaging: exclude_infinite\n",
        )
        .unwrap();

        let settings = EvalSettings::from_file(&path).unwrap();
        assert_eq!(settings.gt_dir, Some(PathBuf::from("data/gt")));
        assert_eq!(settings.size, Some(TargetSize::new(256, 128)));
        assert_eq!(settings.psnr_averaging, Some(PsnrAveraging::ExcludeInfinite));
    }

    #[test]
    fn test_settings_from_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("eval.json");
        std::fs::write(&path, r#"{"ext": ".png", "psnr_averaging": {"cap": 100.0}}"#).unwrap();

        let settings = EvalSettings::from_file(&path).unwrap();
        assert_eq!(settings.ext.as_deref(), Some(".png"));
        assert_eq!(settings.psnr_averaging, Some(PsnrAveraging::Cap(100.0)));
    }

    #[test]
    fn test_settings_reject_unknown_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("eval.yaml");
        std::fs::write(&path, "gt_directory: nope\n").unwrap();
        assert!(matches!(
            EvalSettings::from_file(&path),
            Err(FacefillError::Yaml(_))
        ));
    }
}
