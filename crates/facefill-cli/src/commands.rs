//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Facefill: evaluate face-inpainting reconstructions and run batched inference
#[derive(Parser, Debug)]
#[command(name = "facefill")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress progress and skip notices)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Score predictions against ground truth (PSNR, SSIM, UIQI, NCORR, MSE)
    Eval(EvalArgs),

    /// Reconstruct a directory of masked faces with an external model
    Infer(InferArgs),
}

/// Arguments for the eval command.
///
/// Every option is optional at parse time so that a `--config` file can
/// supply it; explicit flags override the file.
#[derive(Parser, Debug, Default)]
pub struct EvalArgs {
    /// Directory with ground-truth images
    #[arg(long, alias = "gt_dir")]
    pub gt_dir: Option<PathBuf>,

    /// Directory with reconstructed images
    #[arg(long, alias = "pred_dir")]
    pub pred_dir: Option<PathBuf>,

    /// Resize both images to H W before evaluation
    #[arg(long, num_args = 2, value_names = ["H", "W"])]
    pub size: Option<Vec<u32>>,

    /// Where to save the metrics CSV [default: results/metrics.csv]
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Also write a JSON summary to this path
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Ground-truth extension to look for, e.g. .png [default: .jpg]
    #[arg(long)]
    pub ext: Option<String>,

    /// Dynamic range of the samples [default: 255]
    #[arg(long)]
    pub data_range: Option<f64>,

    /// How infinite PSNR values enter the average [default: propagate]
    #[arg(long)]
    pub psnr_averaging: Option<PsnrAveragingArg>,

    /// Clamp PSNR to this value before averaging; implies
    /// `--psnr-averaging cap` [default: 100]
    #[arg(long)]
    pub psnr_cap: Option<f64>,

    /// Worker threads (0 = one per core) [default: 1]
    #[arg(short = 'j', long)]
    pub jobs: Option<usize>,

    /// Abort on the first undecodable image instead of skipping the pair
    #[arg(long)]
    pub fail_fast: bool,

    /// YAML or JSON settings file
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Arguments for the infer command
#[derive(Parser, Debug)]
pub struct InferArgs {
    /// Model runner program, invoked as `<model> [model-args] <input> <output>`
    #[arg(long)]
    pub model: PathBuf,

    /// Extra argument passed to the model program before the file paths
    #[arg(long = "model-arg", allow_hyphen_values = true)]
    pub model_args: Vec<String>,

    /// Directory with masked images
    #[arg(long, alias = "input_dir")]
    pub input_dir: PathBuf,

    /// Directory to save outputs
    #[arg(long, alias = "output_dir")]
    pub output_dir: PathBuf,

    /// Model input size H W
    #[arg(long, num_args = 2, value_names = ["H", "W"], default_values = ["256", "256"])]
    pub size: Vec<u32>,

    /// Allowed image extensions
    #[arg(long, num_args = 1.., default_values = [".png", ".jpg", ".jpeg"])]
    pub exts: Vec<String>,

    /// Filename suffix added before the extension
    #[arg(long, default_value = "")]
    pub suffix: String,
}

/// Cap applied by `--psnr-averaging cap` when `--psnr-cap` is absent
pub const DEFAULT_PSNR_CAP: f64 = 100.0;

/// PSNR averaging policy argument
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PsnrAveragingArg {
    /// Keep infinite values (any exact match makes the average infinite)
    #[default]
    Propagate,
    /// Average PSNR over finite values only
    Exclude,
    /// Clamp each PSNR to `--psnr-cap` before averaging
    Cap,
}

impl PsnrAveragingArg {
    /// Resolve to the library policy
    #[must_use]
    pub fn to_policy(self, cap: f64) -> facefill::PsnrAveraging {
        match self {
            Self::Propagate => facefill::PsnrAveraging::Propagate,
            Self::Exclude => facefill::PsnrAveraging::ExcludeInfinite,
            Self::Cap => facefill::PsnrAveraging::Cap(cap),
        }
    }
}

/// Color argument for CLI
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
