//! Eval command handler

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::ProgressReporter;
use crate::{EvalArgs, PsnrAveragingArg, DEFAULT_PSNR_CAP};
use facefill::{
    EvalConfig, EvalSettings, Evaluator, FacefillError, PsnrAveraging, RunSummary, TargetSize,
};

/// Turn a `--size H W` value list into a target size
pub fn parse_size(values: &[u32]) -> CliResult<TargetSize> {
    match *values {
        [height, width] if height > 0 && width > 0 => Ok(TargetSize::new(height, width)),
        [_, _] => Err(CliError::invalid_argument(format!(
            "--size values must be positive, got {values:?}"
        ))),
        _ => Err(CliError::invalid_argument(format!(
            "--size takes exactly two values (H W), got {values:?}"
        ))),
    }
}

/// Combine `--psnr-averaging` and `--psnr-cap` into a policy.
///
/// A bare `--psnr-cap` selects the cap policy; pairing it with any other
/// policy is rejected.
pub fn resolve_psnr_averaging(
    averaging: Option<PsnrAveragingArg>,
    cap: Option<f64>,
) -> CliResult<Option<PsnrAveraging>> {
    match (averaging, cap) {
        (None, None) => Ok(None),
        (None | Some(PsnrAveragingArg::Cap), Some(cap)) => {
            Ok(Some(PsnrAveragingArg::Cap.to_policy(cap)))
        }
        (Some(policy), None) => Ok(Some(policy.to_policy(DEFAULT_PSNR_CAP))),
        (Some(policy), Some(_)) => Err(CliError::invalid_argument(format!(
            "--psnr-cap requires --psnr-averaging cap, got {policy:?}"
        ))),
    }
}

/// Resolve the evaluation configuration: defaults, then the `--config`
/// file, then explicit flags
pub fn build_eval_config(args: &EvalArgs) -> CliResult<EvalConfig> {
    let settings = match args.config {
        Some(ref path) => EvalSettings::from_file(path)
            .map_err(|e| CliError::config(format!("cannot load {}: {e}", path.display())))?,
        None => EvalSettings::default(),
    };
    let mut config = EvalConfig::default().apply(&settings);

    if let Some(ref dir) = args.gt_dir {
        config.gt_dir.clone_from(dir);
    }
    if let Some(ref dir) = args.pred_dir {
        config.pred_dir.clone_from(dir);
    }
    if let Some(ref size) = args.size {
        config.size = Some(parse_size(size)?);
    }
    if let Some(ref csv) = args.csv {
        config.csv_path.clone_from(csv);
    }
    if args.json.is_some() {
        config.json_path.clone_from(&args.json);
    }
    if let Some(ref ext) = args.ext {
        config.ext.clone_from(ext);
    }
    if let Some(range) = args.data_range {
        config.data_range = range;
    }
    if let Some(policy) = resolve_psnr_averaging(args.psnr_averaging, args.psnr_cap)? {
        config.psnr_averaging = policy;
    }
    if let Some(jobs) = args.jobs {
        config.jobs = jobs;
    }
    if args.fail_fast {
        config.fail_fast = true;
    }

    if config.gt_dir.as_os_str().is_empty() {
        return Err(CliError::invalid_argument(
            "--gt-dir is required (or gt_dir in the --config file)",
        ));
    }
    if config.pred_dir.as_os_str().is_empty() {
        return Err(CliError::invalid_argument(
            "--pred-dir is required (or pred_dir in the --config file)",
        ));
    }
    config.validate()?;
    Ok(config)
}

/// Execute the eval command.
///
/// An empty ground-truth listing and a run without any matched pair are
/// reported on the console and return `Ok` without writing a report.
pub fn execute_eval(config: &CliConfig, args: &EvalArgs) -> CliResult<RunSummary> {
    let eval_config = build_eval_config(args)?;
    let reporter = ProgressReporter::from_config(config);

    let summary = Evaluator::new(eval_config.clone())
        .run(&reporter)
        .map_err(|e| match e {
            FacefillError::Report { message } => CliError::report_generation(message),
            other => other.into(),
        })?;

    if summary.total_gt == 0 {
        reporter.warning(&format!(
            "No GT images with extension {} in {}",
            eval_config.ext,
            eval_config.gt_dir.display()
        ));
        return Ok(summary);
    }

    if summary.evaluated() == 0 {
        reporter.done("No valid pairs evaluated.");
        return Ok(summary);
    }

    reporter.done(&format!(
        "Evaluated {} pairs. CSV saved to {}",
        summary.evaluated(),
        eval_config.csv_path.display()
    ));
    if let Some(ref averages) = summary.averages {
        reporter.averages(averages);
    }
    Ok(summary)
}
