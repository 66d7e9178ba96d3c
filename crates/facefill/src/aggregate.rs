//! Per-pair metric records and running averages.

use crate::image_io::shape;
use crate::metrics::{self, DEFAULT_DATA_RANGE};
use crate::result::{FacefillError, FacefillResult};
use crate::ssim;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The five reported metrics, in report column order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    /// Peak signal-to-noise ratio (dB)
    Psnr,
    /// Structural similarity
    Ssim,
    /// Universal image quality index
    Uiqi,
    /// Normalized cross-correlation
    Ncorr,
    /// Mean squared error
    Mse,
}

impl Metric {
    /// All metrics in column order
    pub const ALL: [Self; 5] = [Self::Psnr, Self::Ssim, Self::Uiqi, Self::Ncorr, Self::Mse];

    /// Column name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Psnr => "PSNR",
            Self::Ssim => "SSIM",
            Self::Uiqi => "UIQI",
            Self::Ncorr => "NCORR",
            Self::Mse => "MSE",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Scores of one pair, or the averages of a run
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct MetricRecord {
    /// PSNR in dB; `+inf` for identical images
    pub psnr: f64,
    /// Mean SSIM
    pub ssim: f64,
    /// UIQI
    pub uiqi: f64,
    /// NCORR
    pub ncorr: f64,
    /// MSE
    pub mse: f64,
}

impl MetricRecord {
    /// Value of one metric
    #[must_use]
    pub const fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Psnr => self.psnr,
            Metric::Ssim => self.ssim,
            Metric::Uiqi => self.uiqi,
            Metric::Ncorr => self.ncorr,
            Metric::Mse => self.mse,
        }
    }

    fn get_mut(&mut self, metric: Metric) -> &mut f64 {
        match metric {
            Metric::Psnr => &mut self.psnr,
            Metric::Ssim => &mut self.ssim,
            Metric::Uiqi => &mut self.uiqi,
            Metric::Ncorr => &mut self.ncorr,
            Metric::Mse => &mut self.mse,
        }
    }

    /// (metric, value) pairs in column order
    pub fn iter(&self) -> impl Iterator<Item = (Metric, f64)> + '_ {
        Metric::ALL.into_iter().map(move |m| (m, self.get(m)))
    }
}

/// Compute all five metrics with `data_range = 255`.
///
/// Both images must have the same (height, width); no reconciliation happens
/// here.
pub fn compute_all(gt: &RgbImage, pred: &RgbImage) -> FacefillResult<MetricRecord> {
    compute_all_with_range(gt, pred, DEFAULT_DATA_RANGE)
}

/// Compute all five metrics with an explicit data range
pub fn compute_all_with_range(
    gt: &RgbImage,
    pred: &RgbImage,
    data_range: f64,
) -> FacefillResult<MetricRecord> {
    if gt.dimensions() != pred.dimensions() {
        return Err(FacefillError::ShapeMismatch {
            expected: shape(gt),
            actual: shape(pred),
        });
    }

    let mse = metrics::mse(gt, pred);
    Ok(MetricRecord {
        psnr: metrics::psnr_from_mse(mse, data_range),
        ssim: ssim::ssim(gt, pred, data_range),
        uiqi: metrics::uiqi(gt, pred),
        ncorr: metrics::ncorr(gt, pred),
        mse,
    })
}

/// How infinite PSNR values (exact matches) enter the PSNR average
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PsnrAveraging {
    /// Sum raw values; one exact match makes the average `+inf`
    #[default]
    Propagate,
    /// Average finite values only; `+inf` if every pair matched exactly
    ExcludeInfinite,
    /// Fold `min(psnr, cap)` into the sum
    Cap(f64),
}

/// Running per-metric sums over evaluated pairs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricAccumulator {
    policy: PsnrAveraging,
    sums: MetricRecord,
    count: usize,
    psnr_count: usize,
}

impl MetricAccumulator {
    /// Create an empty accumulator
    #[must_use]
    pub fn new(policy: PsnrAveraging) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Policy applied to PSNR
    #[must_use]
    pub const fn policy(&self) -> PsnrAveraging {
        self.policy
    }

    /// Number of pairs folded in
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Running sums (PSNR after the policy was applied)
    #[must_use]
    pub const fn sums(&self) -> &MetricRecord {
        &self.sums
    }

    /// Fold one pair's record into the sums
    pub fn add(&mut self, record: &MetricRecord) {
        for metric in Metric::ALL {
            if metric == Metric::Psnr {
                continue;
            }
            *self.sums.get_mut(metric) += record.get(metric);
        }

        match self.policy {
            PsnrAveraging::Propagate => {
                self.sums.psnr += record.psnr;
                self.psnr_count += 1;
            }
            PsnrAveraging::ExcludeInfinite => {
                if record.psnr.is_finite() {
                    self.sums.psnr += record.psnr;
                    self.psnr_count += 1;
                }
            }
            PsnrAveraging::Cap(cap) => {
                self.sums.psnr += record.psnr.min(cap);
                self.psnr_count += 1;
            }
        }

        self.count += 1;
    }

    /// Combine another accumulator built with the same policy
    pub fn merge(&mut self, other: &Self) {
        debug_assert_eq!(self.policy, other.policy, "merging mixed PSNR policies");
        for metric in Metric::ALL {
            *self.sums.get_mut(metric) += other.sums.get(metric);
        }
        self.count += other.count;
        self.psnr_count += other.psnr_count;
    }

    /// Per-metric arithmetic means, or `None` if nothing was added
    #[must_use]
    pub fn average(&self) -> Option<MetricRecord> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        let psnr = if self.psnr_count == 0 {
            f64::INFINITY
        } else {
            self.sums.psnr / self.psnr_count as f64
        };

        Some(MetricRecord {
            psnr,
            ssim: self.sums.ssim / n,
            uiqi: self.sums.uiqi / n,
            ncorr: self.sums.ncorr / n,
            mse: self.sums.mse / n,
        })
    }
}
