//! JSON formatter.

use crate::handlers::{GuardReport, exit_status};
use serde::Serialize;

/// Format guard reports as JSON.
pub fn format(reports: &[GuardReport]) -> String {
    let output = JsonOutput {
        reports,
        exit_status: exit_status(reports),
    };
    let mut text = serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string());
    text.push('\n');
    text
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    reports: &'a [GuardReport],
    exit_status: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::{GuardCode, GuardKind, GuardOutcome};
    use serde_json::Value;

    #[test]
    fn test_format_json() {
        let reports = vec![
            GuardReport {
                guard: GuardKind::Hpa,
                app: "shop".to_string(),
                outcome: GuardOutcome::skipped("No HPA found"),
                patches: Vec::new(),
            },
            GuardReport {
                guard: GuardKind::Ingress,
                app: "shop".to_string(),
                outcome: GuardOutcome::data_error(GuardCode::IngressNotFound, "no ing-b"),
                patches: Vec::new(),
            },
        ];

        let value: Value = serde_json::from_str(&format(&reports)).unwrap();
        assert_eq!(value["exit_status"], 304);
        assert_eq!(value["reports"][0]["outcome"]["result"], "skipped");
        assert_eq!(value["reports"][0]["outcome"]["reason"], "No HPA found");
        assert_eq!(value["reports"][1]["outcome"]["result"], "data-error");
        assert_eq!(value["reports"][1]["outcome"]["code"], "ingress-not-found");
    }
}
