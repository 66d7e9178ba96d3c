//! SSIM - Structural Similarity Index (Wang et al., 2004)
//!
//! Gaussian-weighted windowed SSIM. Each RGB channel is compared
//! independently: local means, variances and covariance are taken over an
//! 11x11 Gaussian window (sigma 1.5) at every position where the window fits
//! entirely inside the image, the SSIM map is averaged, and the three channel
//! scores are averaged uniformly.
//!
//! Images smaller than the window use the largest odd window that fits.

use crate::metrics::CHANNELS;
use image::RgbImage;

/// Default Gaussian window edge length
pub const DEFAULT_WINDOW: usize = 11;
/// Default Gaussian standard deviation
pub const DEFAULT_SIGMA: f64 = 1.5;
/// Luminance stabilisation constant factor
pub const K1: f64 = 0.01;
/// Contrast stabilisation constant factor
pub const K2: f64 = 0.03;

/// Windowed structural similarity metric
#[derive(Debug, Clone)]
pub struct SsimMetric {
    /// Window edge length (odd)
    pub window_size: usize,
    /// Gaussian sigma
    pub sigma: f64,
    /// Stabilisation constants (k1, k2)
    pub constants: (f64, f64),
}

impl Default for SsimMetric {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW,
            sigma: DEFAULT_SIGMA,
            constants: (K1, K2),
        }
    }
}

/// Result of an SSIM comparison
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SsimResult {
    /// Mean of the per-channel scores
    pub score: f64,
    /// Per-channel SSIM (R, G, B)
    pub channel_scores: [f64; 3],
    /// Window edge length actually used
    pub window_size: usize,
}

/// One channel widened to `f64`, row-major
#[derive(Debug, Clone)]
struct Plane {
    width: usize,
    height: usize,
    data: Vec<f64>,
}

impl Plane {
    fn channel(img: &RgbImage, channel: usize) -> Self {
        Self {
            width: img.width() as usize,
            height: img.height() as usize,
            data: img
                .as_raw()
                .iter()
                .skip(channel)
                .step_by(CHANNELS)
                .map(|&v| f64::from(v))
                .collect(),
        }
    }

    fn zip_with(&self, other: &Self, f: impl Fn(f64, f64) -> f64) -> Self {
        Self {
            width: self.width,
            height: self.height,
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(&a, &b)| f(a, b))
                .collect(),
        }
    }

    /// Separable correlation with `kernel`, keeping only positions where the
    /// window lies fully inside the plane
    fn filter_valid(&self, kernel: &[f64]) -> Self {
        let k = kernel.len();
        let out_w = self.width + 1 - k;
        let out_h = self.height + 1 - k;

        let mut horizontal = Vec::with_capacity(out_w * self.height);
        for row in self.data.chunks_exact(self.width) {
            for x in 0..out_w {
                let acc: f64 = row[x..x + k]
                    .iter()
                    .zip(kernel)
                    .map(|(v, w)| v * w)
                    .sum();
                horizontal.push(acc);
            }
        }

        let mut data = Vec::with_capacity(out_w * out_h);
        for y in 0..out_h {
            for x in 0..out_w {
                let acc: f64 = kernel
                    .iter()
                    .enumerate()
                    .map(|(i, w)| horizontal[(y + i) * out_w + x] * w)
                    .sum();
                data.push(acc);
            }
        }

        Self {
            width: out_w,
            height: out_h,
            data,
        }
    }
}

impl SsimMetric {
    /// Create an SSIM metric with a custom window size
    #[must_use]
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size,
            ..Default::default()
        }
    }

    /// Window edge length usable on a `width` x `height` image: the configured
    /// size clamped to the smaller dimension and rounded down to odd
    #[must_use]
    pub fn effective_window(&self, width: u32, height: u32) -> usize {
        let limit = self.window_size.min(width as usize).min(height as usize);
        let odd = if limit % 2 == 0 { limit.saturating_sub(1) } else { limit };
        odd.max(1)
    }

    /// Normalised 1-D Gaussian kernel of length `size`
    #[must_use]
    pub fn kernel(&self, size: usize) -> Vec<f64> {
        let center = (size / 2) as f64;
        let two_sigma_sq = 2.0 * self.sigma * self.sigma;
        let weights: Vec<f64> = (0..size)
            .map(|i| {
                let d = i as f64 - center;
                (-(d * d) / two_sigma_sq).exp()
            })
            .collect();
        let total: f64 = weights.iter().sum();
        weights.into_iter().map(|w| w / total).collect()
    }

    /// Compare two equally shaped RGB images
    #[must_use]
    pub fn compare(&self, a: &RgbImage, b: &RgbImage, data_range: f64) -> SsimResult {
        debug_assert_eq!(a.dimensions(), b.dimensions(), "ssim expects equal shapes");

        let window_size = self.effective_window(a.width(), a.height());
        let kernel = self.kernel(window_size);

        let (k1, k2) = self.constants;
        let c1 = (k1 * data_range).powi(2);
        let c2 = (k2 * data_range).powi(2);

        let mut channel_scores = [0.0; 3];
        for (channel, score) in channel_scores.iter_mut().enumerate() {
            let x = Plane::channel(a, channel);
            let y = Plane::channel(b, channel);
            *score = channel_ssim(&x, &y, &kernel, c1, c2);
        }

        let score = channel_scores.iter().sum::<f64>() / CHANNELS as f64;

        SsimResult {
            score,
            channel_scores,
            window_size,
        }
    }
}

fn channel_ssim(x: &Plane, y: &Plane, kernel: &[f64], c1: f64, c2: f64) -> f64 {
    if x.data.is_empty() {
        return 1.0;
    }

    let mu_x = x.filter_valid(kernel);
    let mu_y = y.filter_valid(kernel);
    let xx = x.zip_with(x, |a, b| a * b).filter_valid(kernel);
    let yy = y.zip_with(y, |a, b| a * b).filter_valid(kernel);
    let xy = x.zip_with(y, |a, b| a * b).filter_valid(kernel);

    let n = mu_x.data.len();
    let mut total = 0.0;
    for i in 0..n {
        let (mx, my) = (mu_x.data[i], mu_y.data[i]);
        let var_x = xx.data[i] - mx * mx;
        let var_y = yy.data[i] - my * my;
        let cov = xy.data[i] - mx * my;

        let numerator = (2.0 * mx * my + c1) * (2.0 * cov + c2);
        let denominator = (mx * mx + my * my + c1) * (var_x + var_y + c2);
        total += numerator / denominator;
    }

    total / n as f64
}

/// Mean SSIM of two equally shaped RGB images with the default Gaussian window
#[must_use]
pub fn ssim(a: &RgbImage, b: &RgbImage, data_range: f64) -> f64 {
    SsimMetric::default().compare(a, b, data_range).score
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::metrics::DEFAULT_DATA_RANGE;
    use image::Rgb;

    fn pattern(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([
                ((x * 13 + y * 7) % 256) as u8,
                ((x * y) % 256) as u8,
                ((x ^ y) * 9 % 256) as u8,
            ])
        })
    }

    #[test]
    fn test_ssim_identical_is_one() {
        let a = pattern(40, 30);
        let score = ssim(&a, &a, DEFAULT_DATA_RANGE);
        assert!((score - 1.0).abs() < 1e-9, "got {score}");
    }

    #[test]
    fn test_ssim_constant_identical_is_one() {
        let a = RgbImage::from_pixel(16, 16, Rgb([128, 64, 0]));
        assert!((ssim(&a, &a, DEFAULT_DATA_RANGE) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_ssim_noise_lowers_score() {
        let a = pattern(32, 32);
        let mut b = a.clone();
        for (i, p) in b.pixels_mut().enumerate() {
            let delta: u8 = if i % 2 == 0 { 30 } else { 0 };
            for c in &mut p.0 {
                *c = c.saturating_add(delta);
            }
        }
        let score = ssim(&a, &b, DEFAULT_DATA_RANGE);
        assert!(score < 1.0);
        assert!(score > -1.0);
    }

    #[test]
    fn test_ssim_symmetric() {
        let a = pattern(20, 20);
        let b = RgbImage::from_fn(20, 20, |x, y| Rgb([(x * 11) as u8, (y * 3) as u8, 77]));
        let ab = ssim(&a, &b, DEFAULT_DATA_RANGE);
        let ba = ssim(&b, &a, DEFAULT_DATA_RANGE);
        assert!((ab - ba).abs() < 1e-12);
    }

    #[test]
    fn test_effective_window_clamps_to_small_images() {
        let metric = SsimMetric::default();
        assert_eq!(metric.effective_window(256, 256), 11);
        assert_eq!(metric.effective_window(8, 100), 7);
        assert_eq!(metric.effective_window(9, 9), 9);
        assert_eq!(metric.effective_window(1, 1), 1);
        assert_eq!(metric.effective_window(2, 5), 1);
    }

    #[test]
    fn test_kernel_is_normalised_and_symmetric() {
        let kernel = SsimMetric::default().kernel(11);
        assert_eq!(kernel.len(), 11);
        assert!((kernel.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!((kernel[0] - kernel[10]).abs() < 1e-15);
        assert!(kernel[5] > kernel[4]);
    }

    #[test]
    fn test_tiny_image_still_compares() {
        let a = pattern(3, 2);
        let result = SsimMetric::default().compare(&a, &a, DEFAULT_DATA_RANGE);
        assert_eq!(result.window_size, 1);
        assert!((result.score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_channel_scores_reported() {
        let a = pattern(16, 16);
        let mut b = a.clone();
        for p in b.pixels_mut() {
            p.0[2] = 255 - p.0[2];
        }
        let result = SsimMetric::default().compare(&a, &b, DEFAULT_DATA_RANGE);
        assert!((result.channel_scores[0] - 1.0).abs() < 1e-9);
        assert!((result.channel_scores[1] - 1.0).abs() < 1e-9);
        assert!(result.channel_scores[2] < 1.0);
    }
}
