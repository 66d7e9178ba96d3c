//! Full-reference image quality metrics
//!
//! Scalar comparisons between a ground-truth image `a` and a prediction `b`:
//! - MSE (Mean Squared Error)
//! - PSNR (Peak Signal-to-Noise Ratio)
//! - NCORR (Normalized Cross-Correlation)
//! - UIQI (Universal Image Quality Index, Wang & Bovik 2002)
//!
//! The windowed SSIM lives in [`crate::ssim`]. Every function here expects
//! both images to have the same (height, width); callers reconcile shapes
//! first (see [`crate::image_io::reconcile`]).

use image::RgbImage;

/// Dynamic range of 8-bit samples
pub const DEFAULT_DATA_RANGE: f64 = 255.0;

/// Samples per pixel (RGB)
pub const CHANNELS: usize = 3;

// ============================================================================
// MSE - Mean Squared Error
// ============================================================================

/// Mean of squared per-sample differences over every pixel and channel.
///
/// Samples are widened to `f64` before subtracting, so there is no `u8`
/// wraparound. Always finite and `>= 0`.
#[must_use]
pub fn mse(a: &RgbImage, b: &RgbImage) -> f64 {
    debug_assert_eq!(a.dimensions(), b.dimensions(), "mse expects equal shapes");

    let samples = a.as_raw();
    if samples.is_empty() {
        return 0.0;
    }

    let sum: f64 = samples
        .iter()
        .zip(b.as_raw())
        .map(|(&x, &y)| {
            let diff = f64::from(x) - f64::from(y);
            diff * diff
        })
        .sum();

    sum / samples.len() as f64
}

// ============================================================================
// PSNR - Peak Signal-to-Noise Ratio
// ============================================================================

/// Peak signal-to-noise ratio in dB.
///
/// Returns `f64::INFINITY` for bit-identical images.
#[must_use]
pub fn psnr(a: &RgbImage, b: &RgbImage, data_range: f64) -> f64 {
    psnr_from_mse(mse(a, b), data_range)
}

/// PSNR for an already computed MSE: `20 * log10(data_range / sqrt(mse))`.
#[must_use]
pub fn psnr_from_mse(mse: f64, data_range: f64) -> f64 {
    if mse == 0.0 {
        f64::INFINITY
    } else {
        20.0 * (data_range / mse.sqrt()).log10()
    }
}

// ============================================================================
// NCORR - Normalized Cross-Correlation
// ============================================================================

/// Normalized cross-correlation of the flattened, mean-centred images.
///
/// Returns 0.0 when either image is constant (zero norm after centring),
/// otherwise a value in `[-1, 1]`.
#[must_use]
pub fn ncorr(a: &RgbImage, b: &RgbImage) -> f64 {
    debug_assert_eq!(a.dimensions(), b.dimensions(), "ncorr expects equal shapes");

    let xs = a.as_raw();
    let ys = b.as_raw();
    if xs.is_empty() {
        return 0.0;
    }

    let n = xs.len() as f64;
    let mean_x = xs.iter().map(|&v| f64::from(v)).sum::<f64>() / n;
    let mean_y = ys.iter().map(|&v| f64::from(v)).sum::<f64>() / n;

    let mut dot = 0.0;
    let mut norm_x = 0.0;
    let mut norm_y = 0.0;
    for (&x, &y) in xs.iter().zip(ys) {
        let dx = f64::from(x) - mean_x;
        let dy = f64::from(y) - mean_y;
        dot += dx * dy;
        norm_x += dx * dx;
        norm_y += dy * dy;
    }

    let denom = norm_x.sqrt() * norm_y.sqrt();
    if denom == 0.0 {
        return 0.0;
    }
    (dot / denom).clamp(-1.0, 1.0)
}

// ============================================================================
// UIQI - Universal Image Quality Index
// ============================================================================

/// First and second order statistics of one channel pair
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChannelStats {
    /// Mean of the ground-truth channel
    pub mean_a: f64,
    /// Mean of the predicted channel
    pub mean_b: f64,
    /// Population variance of the ground-truth channel
    pub var_a: f64,
    /// Population variance of the predicted channel
    pub var_b: f64,
    /// Population covariance between the two channels
    pub covariance: f64,
}

impl ChannelStats {
    /// Gather statistics for channel `channel` of both images
    #[must_use]
    pub fn gather(a: &RgbImage, b: &RgbImage, channel: usize) -> Self {
        let xs = a.as_raw().iter().skip(channel).step_by(CHANNELS);
        let ys = b.as_raw().iter().skip(channel).step_by(CHANNELS);

        let n = (a.width() as usize * a.height() as usize) as f64;
        if n == 0.0 {
            return Self::default();
        }

        let mean_a = xs.clone().map(|&v| f64::from(v)).sum::<f64>() / n;
        let mean_b = ys.clone().map(|&v| f64::from(v)).sum::<f64>() / n;

        let (mut var_a, mut var_b, mut covariance) = (0.0, 0.0, 0.0);
        for (&x, &y) in xs.zip(ys) {
            let dx = f64::from(x) - mean_a;
            let dy = f64::from(y) - mean_b;
            var_a += dx * dx;
            var_b += dy * dy;
            covariance += dx * dy;
        }

        Self {
            mean_a,
            mean_b,
            var_a: var_a / n,
            var_b: var_b / n,
            covariance: covariance / n,
        }
    }

    /// `4 * mu_a * mu_b * cov / ((mu_a^2 + mu_b^2) * (var_a + var_b))`, or
    /// 0.0 when the denominator vanishes
    #[must_use]
    pub fn quality_index(&self) -> f64 {
        let numerator = 4.0 * self.mean_a * self.mean_b * self.covariance;
        let denominator = (self.mean_a.powi(2) + self.mean_b.powi(2)) * (self.var_a + self.var_b);
        if denominator == 0.0 {
            0.0
        } else {
            numerator / denominator
        }
    }
}

/// Universal image quality index computed globally per channel, then averaged
/// uniformly across the three channels. 1.0 means a perfect match.
#[must_use]
pub fn uiqi(a: &RgbImage, b: &RgbImage) -> f64 {
    debug_assert_eq!(a.dimensions(), b.dimensions(), "uiqi expects equal shapes");

    let total: f64 = (0..CHANNELS)
        .map(|channel| ChannelStats::gather(a, b, channel).quality_index())
        .sum();
    total / CHANNELS as f64
}
