//! Infer command handler

use super::eval::parse_size;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::model::CommandInpainter;
use crate::output::ProgressReporter;
use crate::InferArgs;
use facefill::{collect_inputs, InferenceConfig, InferenceRunner, InferenceSummary};

/// Build the inference configuration from command-line arguments
pub fn build_inference_config(args: &InferArgs) -> CliResult<InferenceConfig> {
    let config = InferenceConfig::new(&args.input_dir, &args.output_dir)
        .with_size(parse_size(&args.size)?)
        .with_exts(args.exts.clone())
        .with_suffix(args.suffix.clone());
    config.validate()?;
    Ok(config)
}

/// A model given as a path (not a bare command name) must exist
fn check_model_path(args: &InferArgs) -> CliResult<()> {
    let looks_like_path = args.model.components().count() > 1;
    if looks_like_path && !args.model.exists() {
        return Err(CliError::inference(format!(
            "model runner not found: {}",
            args.model.display()
        )));
    }
    Ok(())
}

/// Execute the infer command.
///
/// Files that fail are reported and skipped; an empty input directory is a
/// warning, not an error.
pub fn execute_infer(config: &CliConfig, args: &InferArgs) -> CliResult<InferenceSummary> {
    let inference_config = build_inference_config(args)?;
    let reporter = ProgressReporter::from_config(config);

    let inputs = collect_inputs(&inference_config.input_dir, &inference_config.exts)?;
    if inputs.is_empty() {
        reporter.warning(&format!(
            "No images found in {} with extensions {:?}",
            inference_config.input_dir.display(),
            inference_config.exts
        ));
        return Ok(InferenceSummary::default());
    }

    check_model_path(args)?;
    reporter.info(&format!("Using model runner: {}", args.model.display()));
    reporter.info(&format!(
        "Found {} images. Writing to {}",
        inputs.len(),
        inference_config.output_dir.display()
    ));

    let model = CommandInpainter::new(&args.model, args.model_args.clone());
    let summary = InferenceRunner::new(&model, inference_config).run(&reporter)?;

    reporter.done(&format!(
        "Inference complete. {} written, {} skipped.",
        summary.written.len(),
        summary.failed.len()
    ));
    Ok(summary)
}
