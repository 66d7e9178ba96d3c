//! Batched inference with a black-box inpainting model.
//!
//! The model is anything implementing [`Inpainter`]: a function from a
//! normalised RGB image in `[-1, 1]` to another one. This module owns the
//! glue around it: enumerate inputs, preprocess, postprocess, write outputs
//! and keep going when a single file fails.

use crate::image_io::{load_rgb, TargetSize};
use crate::matcher::{list_with_extension, FailedFile};
use crate::metrics::CHANNELS;
use crate::progress::{Progress, ProgressEvent};
use crate::result::{FacefillError, FacefillResult};
use image::imageops::{self, FilterType};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Default model input size (height, width)
pub const DEFAULT_INPUT_SIZE: TargetSize = TargetSize::new(256, 256);

/// Default accepted input extensions
pub const DEFAULT_EXTENSIONS: [&str; 3] = [".png", ".jpg", ".jpeg"];

/// Map an 8-bit sample into `[-1, 1]`
#[must_use]
pub fn normalize(value: u8) -> f32 {
    (f32::from(value) - 127.5) / 127.5
}

/// Map a `[-1, 1]` sample back to 8 bits: scale, clamp, truncate
#[must_use]
pub fn denormalize(value: f32) -> u8 {
    ((value + 1.0) * 127.5).clamp(0.0, 255.0) as u8
}

/// Float RGB image in `[-1, 1]`, row-major (height, width, 3)
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedImage {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl NormalizedImage {
    /// Wrap raw samples; `data.len()` must equal `height * width * 3`
    pub fn new(width: u32, height: u32, data: Vec<f32>) -> FacefillResult<Self> {
        let expected = width as usize * height as usize * CHANNELS;
        if data.len() != expected {
            return Err(FacefillError::config(format!(
                "normalized image {width}x{height} needs {expected} samples, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Normalise an 8-bit image
    #[must_use]
    pub fn from_rgb(img: &RgbImage) -> Self {
        Self {
            width: img.width(),
            height: img.height(),
            data: img.as_raw().iter().map(|&v| normalize(v)).collect(),
        }
    }

    /// Width in pixels
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Samples, HWC order
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Mutable samples, HWC order
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }
}

/// A face-inpainting model consumed as a black box
pub trait Inpainter {
    /// Reconstruct one image; output must have the input's shape
    fn inpaint(&self, input: &NormalizedImage) -> FacefillResult<NormalizedImage>;
}

impl<F> Inpainter for F
where
    F: Fn(&NormalizedImage) -> FacefillResult<NormalizedImage>,
{
    fn inpaint(&self, input: &NormalizedImage) -> FacefillResult<NormalizedImage> {
        self(input)
    }
}

/// Decode `path`, resize (nearest neighbour) to `size` and normalise
pub fn preprocess(path: &Path, size: TargetSize) -> FacefillResult<NormalizedImage> {
    let img = load_rgb(path)?;
    let img = if (img.height(), img.width()) == size.as_hw() {
        img
    } else {
        imageops::resize(&img, size.width, size.height, FilterType::Nearest)
    };
    Ok(NormalizedImage::from_rgb(&img))
}

/// Convert model output back to an 8-bit image
#[must_use]
pub fn postprocess_to_u8(output: &NormalizedImage) -> RgbImage {
    let data: Vec<u8> = output.data.iter().map(|&v| denormalize(v)).collect();
    RgbImage::from_raw(output.width, output.height, data)
        .unwrap_or_else(|| RgbImage::new(output.width, output.height))
}

/// Output file name: input stem, then `suffix`, then the input extension
#[must_use]
pub fn output_name(input: &Path, suffix: &str) -> OsString {
    let mut name = input.file_stem().map(OsString::from).unwrap_or_default();
    name.push(suffix);
    if let Some(ext) = input.extension() {
        name.push(".");
        name.push(ext);
    }
    name
}

/// Every non-hidden file in `dir` matching any of `exts`, sorted by name
pub fn collect_inputs(dir: &Path, exts: &[String]) -> FacefillResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for ext in exts {
        files.extend(list_with_extension(dir, ext, false)?);
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    files.dedup();
    Ok(files)
}

/// Configuration of a batched inference run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Directory of masked input images
    pub input_dir: PathBuf,
    /// Directory receiving reconstructions
    pub output_dir: PathBuf,
    /// Model input size
    pub size: TargetSize,
    /// Accepted input extensions
    pub exts: Vec<String>,
    /// Inserted between stem and extension of each output name
    pub suffix: String,
}

impl InferenceConfig {
    /// Create a configuration with default size, extensions and no suffix
    #[must_use]
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            size: DEFAULT_INPUT_SIZE,
            exts: DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_string()).collect(),
            suffix: String::new(),
        }
    }

    /// Set the model input size
    #[must_use]
    pub const fn with_size(mut self, size: TargetSize) -> Self {
        self.size = size;
        self
    }

    /// Set accepted extensions
    #[must_use]
    pub fn with_exts(mut self, exts: Vec<String>) -> Self {
        self.exts = exts;
        self
    }

    /// Set the output name suffix
    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Check the configuration before running
    pub fn validate(&self) -> FacefillResult<()> {
        if !self.size.is_valid() {
            return Err(FacefillError::config(format!(
                "model input size must be positive, got {}",
                self.size
            )));
        }
        if self.exts.is_empty() || self.exts.iter().any(String::is_empty) {
            return Err(FacefillError::config("extensions must be non-empty"));
        }
        Ok(())
    }
}

/// Outcome of a batched inference run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InferenceSummary {
    /// Inputs found
    pub total: usize,
    /// Output files written, in input order
    pub written: Vec<PathBuf>,
    /// Inputs that failed and were skipped
    pub failed: Vec<FailedFile>,
}

/// Runs a model over every image of a directory
#[derive(Debug)]
pub struct InferenceRunner<'m, M: Inpainter + ?Sized> {
    model: &'m M,
    config: InferenceConfig,
}

impl<'m, M: Inpainter + ?Sized> InferenceRunner<'m, M> {
    /// Create a runner for `model`
    #[must_use]
    pub const fn new(model: &'m M, config: InferenceConfig) -> Self {
        Self { model, config }
    }

    /// Get configuration
    #[must_use]
    pub const fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Preprocess, infer, postprocess and save one input
    pub fn process(&self, input: &Path) -> FacefillResult<PathBuf> {
        let tensor = preprocess(input, self.config.size)?;
        let output = self.model.inpaint(&tensor)?;
        if (output.height(), output.width()) != (tensor.height(), tensor.width()) {
            return Err(FacefillError::inference(
                input,
                format!(
                    "model returned {}x{}, expected {}x{}",
                    output.width(),
                    output.height(),
                    tensor.width(),
                    tensor.height()
                ),
            ));
        }

        let out_path = self
            .config
            .output_dir
            .join(output_name(input, &self.config.suffix));
        std::fs::create_dir_all(&self.config.output_dir)?;
        postprocess_to_u8(&output)
            .save(&out_path)
            .map_err(|e| FacefillError::inference(input, format!("cannot save output: {e}")))?;
        Ok(out_path)
    }

    /// Process every input; per-file failures are logged and skipped
    pub fn run(&self, progress: &dyn Progress) -> FacefillResult<InferenceSummary> {
        self.config.validate()?;

        let inputs = collect_inputs(&self.config.input_dir, &self.config.exts)?;
        if inputs.is_empty() {
            warn!(
                dir = %self.config.input_dir.display(),
                exts = ?self.config.exts,
                "no input images found"
            );
            return Ok(InferenceSummary::default());
        }

        info!(
            files = inputs.len(),
            output = %self.config.output_dir.display(),
            "reconstructing"
        );
        progress.begin(inputs.len(), "Reconstructing");

        let mut summary = InferenceSummary {
            total: inputs.len(),
            ..InferenceSummary::default()
        };
        for input in &inputs {
            let file = input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            match self.process(input) {
                Ok(out_path) => {
                    progress.event(&ProgressEvent::Written {
                        file: &file,
                        output: &out_path,
                    });
                    summary.written.push(out_path);
                }
                Err(e) => {
                    let reason = e.to_string();
                    error!(file = %file, error = %reason, "inference failed, skipping");
                    progress.event(&ProgressEvent::Failed {
                        file: &file,
                        reason: &reason,
                    });
                    summary.failed.push(FailedFile { file, reason });
                }
            }
        }
        progress.finish();

        info!(
            written = summary.written.len(),
            failed = summary.failed.len(),
            "inference complete"
        );
        Ok(summary)
    }
}
