//! Output formatters for guard reports.

pub mod json;
pub mod plain;

use crate::handlers::GuardReport;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Plain text output.
    #[default]
    Plain,
    /// JSON output.
    Json,
}

/// Format guard reports to a string.
pub fn format_reports_to_string(reports: &[GuardReport], format: OutputFormat) -> String {
    match format {
        OutputFormat::Plain => plain::format(reports),
        OutputFormat::Json => json::format(reports),
    }
}

/// Format and print guard reports.
pub fn format_reports(reports: &[GuardReport], format: OutputFormat) {
    print!("{}", format_reports_to_string(reports, format));
}

