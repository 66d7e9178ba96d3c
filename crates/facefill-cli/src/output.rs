//! Console output and progress reporting

use crate::config::CliConfig;
use console::{Style, Term};
use facefill::{MetricRecord, Progress, ProgressEvent};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;

/// Progress reporter for evaluation and inference runs.
///
/// Tagged lines (`[SKIP]`, `[WARN]`, `[ERROR]`, `[DONE]`) and the final
/// averages go to stdout; the progress bar draws on stderr and is hidden
/// when stderr is not a terminal.
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    progress_bar: Mutex<Option<ProgressBar>>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
    /// Verbose mode
    pub verbose: bool,
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stdout(),
            progress_bar: Mutex::new(None),
            use_color,
            quiet,
            verbose: false,
        }
    }

    /// Create a reporter honouring the CLI verbosity and color flags
    #[must_use]
    pub fn from_config(config: &CliConfig) -> Self {
        let mut reporter = Self::new(config.color.should_color(), config.verbosity.is_quiet());
        reporter.verbose = config.verbosity.is_verbose();
        reporter
    }

    /// Start a progress bar
    pub fn start_progress(&self, total: u64, message: &str) {
        if self.quiet {
            return;
        }

        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.set_message(message.to_string());
        if let Ok(mut slot) = self.progress_bar.lock() {
            *slot = Some(pb);
        }
    }

    /// Increment progress
    pub fn increment(&self, delta: u64) {
        if let Ok(slot) = self.progress_bar.lock() {
            if let Some(ref pb) = *slot {
                pb.inc(delta);
            }
        }
    }

    /// Finish and remove the progress bar
    pub fn finish_progress(&self) {
        if let Ok(mut slot) = self.progress_bar.lock() {
            if let Some(pb) = slot.take() {
                pb.finish_and_clear();
            }
        }
    }

    /// Render `[TAG] message`
    fn tagged(&self, tag: &str, style: &Style, message: &str) -> String {
        if self.use_color {
            format!(
                "{} {message}",
                style.apply_to(tag).force_styling(true)
            )
        } else {
            format!("{tag} {message}")
        }
    }

    /// Write a line without tearing an active progress bar
    fn write_line(&self, line: &str) {
        let active = self
            .progress_bar
            .lock()
            .ok()
            .and_then(|slot| slot.as_ref().cloned());
        match active {
            Some(pb) => pb.suspend(|| {
                let _ = self.term.write_line(line);
            }),
            None => {
                let _ = self.term.write_line(line);
            }
        }
    }

    /// Print a skipped-file notice
    pub fn skip(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.write_line(&self.tagged("[SKIP]", &Style::new().yellow(), message));
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.write_line(&self.tagged("[WARN]", &Style::new().yellow().bold(), message));
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        // Always print errors, even in quiet mode
        self.write_line(&self.tagged("[ERROR]", &Style::new().red().bold(), message));
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.write_line(&self.tagged("[INFO]", &Style::new().blue().bold(), message));
    }

    /// Print a completion message
    pub fn done(&self, message: &str) {
        self.write_line(&self.tagged("[DONE]", &Style::new().green().bold(), message));
    }

    /// Print one `<METRIC>: <value>` line per metric, four decimals
    pub fn averages(&self, averages: &MetricRecord) {
        for line in format_averages(averages) {
            self.write_line(&line);
        }
    }
}

/// Average lines in column order
#[must_use]
pub fn format_averages(averages: &MetricRecord) -> Vec<String> {
    averages
        .iter()
        .map(|(metric, value)| format!("{metric}: {value:.4}"))
        .collect()
}

impl Progress for ProgressReporter {
    fn begin(&self, total: usize, label: &str) {
        self.start_progress(total as u64, label);
    }

    fn event(&self, event: &ProgressEvent<'_>) {
        match *event {
            ProgressEvent::Evaluated { .. } => {}
            ProgressEvent::Cropped { file, gt, pred, to } => self.warning(&format!(
                "Cropped {file} to {}x{} (gt {}x{}, pred {}x{})",
                to.0, to.1, gt.0, gt.1, pred.0, pred.1
            )),
            ProgressEvent::MissingPrediction { file } => {
                self.skip(&format!("Missing prediction for {file}"));
            }
            ProgressEvent::Failed { file, reason } => {
                self.error(&format!("Skipping {file}: {reason}"));
            }
            ProgressEvent::Written { file, output } => {
                if self.verbose {
                    self.info(&format!("{file} -> {}", output.display()));
                }
            }
        }
        self.increment(1);
    }

    fn finish(&self) {
        self.finish_progress();
    }
}
