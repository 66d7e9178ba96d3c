//! Report writers.
//!
//! ## CSV Format
//!
//! ```text
//! file,PSNR,SSIM,UIQI,NCORR,MSE
//! <name>,<psnr>,<ssim>,<uiqi>,<ncorr>,<mse>
//! ...
//! ,,,,,
//! AVERAGES,<psnr>,<ssim>,<uiqi>,<ncorr>,<mse>
//! ```
//!
//! Infinite values are written as `inf`. The JSON summary serialises the
//! whole [`RunSummary`]; non-finite numbers become `null` there.

use crate::aggregate::{Metric, MetricRecord};
use crate::matcher::RunSummary;
use crate::result::{FacefillError, FacefillResult};
use std::fmt::Write as _;
use std::path::Path;

/// Label of the trailing averages row
pub const AVERAGES_LABEL: &str = "AVERAGES";

/// Default number of decimals per score
pub const DEFAULT_PRECISION: usize = 6;

/// CSV header line
#[must_use]
pub fn csv_header() -> String {
    let mut header = String::from("file");
    for metric in Metric::ALL {
        header.push(',');
        header.push_str(metric.name());
    }
    header
}

/// Quote a field if it contains a separator, quote or line break
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// CSV report generator
#[derive(Debug)]
pub struct CsvReport<'a> {
    summary: &'a RunSummary,
    precision: usize,
}

impl<'a> CsvReport<'a> {
    /// Create a CSV report over an evaluation summary
    #[must_use]
    pub const fn new(summary: &'a RunSummary) -> Self {
        Self {
            summary,
            precision: DEFAULT_PRECISION,
        }
    }

    /// Set decimals per score
    #[must_use]
    pub const fn with_precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    fn push_row(&self, output: &mut String, label: &str, record: &MetricRecord) {
        output.push_str(&escape_field(label));
        for (_, value) in record.iter() {
            let _ = write!(output, ",{value:.prec$}", prec = self.precision);
        }
        output.push('\n');
    }

    /// Render the report.
    ///
    /// Fails when the summary has no averages (nothing was evaluated).
    pub fn generate(&self) -> FacefillResult<String> {
        let averages = self
            .summary
            .averages
            .as_ref()
            .ok_or_else(|| FacefillError::report("no evaluated pairs to report"))?;

        let mut output = csv_header();
        output.push('\n');

        for row in &self.summary.rows {
            self.push_row(&mut output, &row.file, &row.metrics);
        }

        output.push_str(&",".repeat(Metric::ALL.len()));
        output.push('\n');
        self.push_row(&mut output, AVERAGES_LABEL, averages);

        Ok(output)
    }

    /// Render and write to `path`, creating parent directories
    pub fn write(&self, path: &Path) -> FacefillResult<()> {
        let content = self.generate()?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Write the summary as pretty-printed JSON, creating parent directories
pub fn write_json(summary: &RunSummary, path: &Path) -> FacefillResult<()> {
    let json = serde_json::to_string_pretty(summary)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, json)?;
    Ok(())
}
