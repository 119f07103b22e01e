//! Plain text formatter.

use crate::guard::GuardOutcome;
use crate::handlers::{GuardReport, PatchStatus};
use colored::Colorize;

/// Format guard reports as plain text.
pub fn format(reports: &[GuardReport]) -> String {
    let mut output = String::new();

    for report in reports {
        let status = match &report.outcome {
            GuardOutcome::Pass => "PASS".green().bold(),
            GuardOutcome::Skipped { .. } => "SKIP".cyan().bold(),
            GuardOutcome::Violation(_) => "FAIL".red().bold(),
            GuardOutcome::DataError(_) => "ERROR".red().bold(),
        };

        output.push_str(&format!("[{}] {} {}", report.guard, report.app, status));
        match &report.outcome {
            GuardOutcome::Pass => output.push('\n'),
            GuardOutcome::Skipped { reason } => output.push_str(&format!(" - {}\n", reason)),
            GuardOutcome::Violation(finding) | GuardOutcome::DataError(finding) => {
                output.push_str(&format!(
                    " ({} {}) - {}\n",
                    finding.code.status(),
                    finding.code,
                    finding.message
                ));
            }
        }

        for patch in &report.patches {
            let line = match &patch.status {
                PatchStatus::Applied => format!("  Patched: {}\n", patch.resource),
                PatchStatus::DryRun => format!("  Would patch (dry run): {}\n", patch.resource),
                PatchStatus::Failed { error } => {
                    format!("  Patch failed: {} - {}\n", patch.resource, error)
                }
            };
            output.push_str(&line);
        }
    }

    output
}
