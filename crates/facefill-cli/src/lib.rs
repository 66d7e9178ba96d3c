//! Facefill CLI Library
//!
//! Command-line front end for the Facefill evaluation pipeline: argument
//! parsing, console output, logging setup and the external model bridge.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Error types are self-documenting

mod commands;
mod config;
mod error;
pub mod handlers;
pub mod logging;
pub mod model;
mod output;

pub use commands::{
    Cli, ColorArg, Commands, EvalArgs, InferArgs, PsnrAveragingArg, DEFAULT_PSNR_CAP,
};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use model::CommandInpainter;
pub use output::{format_averages, ProgressReporter};
