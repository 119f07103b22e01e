//! Guard outcomes and the status codes surfaced to the pipeline.
//!
//! Each guard run ends in exactly one [`GuardOutcome`]. Policy breaches and
//! unusable upstream data both carry a [`GuardCode`], and the code's
//! [`status`](GuardCode::status) is the process exit status the pipeline sees.
//! These values are part of the contract with existing pipelines and must not
//! change.

use serde::Serialize;
use std::fmt;

/// Closed set of non-passing guard results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GuardCode {
    /// A desired or live object could not be read.
    TargetUnreadable,
    /// The application or its managed resources could not be fetched.
    FetchFailed,
    /// Readiness gate condition type has nothing after the ALB prefix.
    MalformedConditionType,
    /// Readiness gate suffix is not `INGRESS_SERVICE_PORT`.
    BadGateSyntax,
    /// An autoscaler targets a workload that is not part of the application.
    MissingTarget,
    /// A workload managed by an autoscaler pins `spec.replicas`.
    ExplicitReplicas,
    /// A readiness gate points at an ingress without `target-type: ip`.
    UntrackedIngress,
    /// A readiness gate points at an ingress that does not exist.
    IngressNotFound,
    /// The gate's service/port is not a backend of the ingress.
    ServicePortNotFound,
    /// Condition type suffix exceeds the 63 character label limit.
    ConditionTypeTooLong,
    /// An IP-mode ingress has no pod readiness gate pointing to it.
    MissingReadinessGate,
}

impl GuardCode {
    /// Exit status reported to the invoking pipeline.
    pub fn status(&self) -> i32 {
        match self {
            Self::TargetUnreadable | Self::FetchFailed => 200,
            Self::MalformedConditionType => 300,
            Self::BadGateSyntax | Self::MissingTarget => 301,
            Self::ExplicitReplicas | Self::UntrackedIngress => 302,
            Self::IngressNotFound => 304,
            Self::ServicePortNotFound => 305,
            Self::ConditionTypeTooLong => 306,
            Self::MissingReadinessGate => 500,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TargetUnreadable => "target-unreadable",
            Self::FetchFailed => "fetch-failed",
            Self::MalformedConditionType => "malformed-condition-type",
            Self::BadGateSyntax => "bad-gate-syntax",
            Self::MissingTarget => "missing-target",
            Self::ExplicitReplicas => "explicit-replicas",
            Self::UntrackedIngress => "untracked-ingress",
            Self::IngressNotFound => "ingress-not-found",
            Self::ServicePortNotFound => "service-port-not-found",
            Self::ConditionTypeTooLong => "condition-type-too-long",
            Self::MissingReadinessGate => "missing-readiness-gate",
        }
    }
}

impl fmt::Display for GuardCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A reported finding: the code plus a message aimed at the workload owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub code: GuardCode,
    pub message: String,
}

impl Finding {
    pub fn new(code: GuardCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Final result of one guard run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "kebab-case")]
pub enum GuardOutcome {
    /// Every checked invariant holds.
    Pass,
    /// Nothing relevant to this guard was found.
    Skipped { reason: String },
    /// A policy breach.
    Violation(Finding),
    /// Upstream data was missing or malformed.
    DataError(Finding),
}

impl GuardOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    pub fn violation(code: GuardCode, message: impl Into<String>) -> Self {
        Self::Violation(Finding::new(code, message))
    }

    pub fn data_error(code: GuardCode, message: impl Into<String>) -> Self {
        Self::DataError(Finding::new(code, message))
    }

    /// True for `Pass` and `Skipped`.
    pub fn is_passing(&self) -> bool {
        matches!(self, Self::Pass | Self::Skipped { .. })
    }

    pub fn finding(&self) -> Option<&Finding> {
        match self {
            Self::Violation(f) | Self::DataError(f) => Some(f),
            Self::Pass | Self::Skipped { .. } => None,
        }
    }

    pub fn code(&self) -> Option<GuardCode> {
        self.finding().map(|f| f.code)
    }

    /// Exit status for this outcome; 0 when passing.
    pub fn exit_status(&self) -> i32 {
        self.code().map(|c| c.status()).unwrap_or(0)
    }
}

impl fmt::Display for GuardOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "pass"),
            Self::Skipped { reason } => write!(f, "skipped: {}", reason),
            Self::Violation(finding) => {
                write!(f, "violation [{}]: {}", finding.code, finding.message)
            }
            Self::DataError(finding) => {
                write!(f, "data error [{}]: {}", finding.code, finding.message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_table() {
        let expected = [
            (GuardCode::TargetUnreadable, 200),
            (GuardCode::FetchFailed, 200),
            (GuardCode::MalformedConditionType, 300),
            (GuardCode::BadGateSyntax, 301),
            (GuardCode::MissingTarget, 301),
            (GuardCode::ExplicitReplicas, 302),
            (GuardCode::UntrackedIngress, 302),
            (GuardCode::IngressNotFound, 304),
            (GuardCode::ServicePortNotFound, 305),
            (GuardCode::ConditionTypeTooLong, 306),
            (GuardCode::MissingReadinessGate, 500),
        ];
        for (code, status) in expected {
            assert_eq!(code.status(), status, "{}", code);
        }
    }

    #[test]
    fn test_passing_outcomes_exit_zero() {
        assert_eq!(GuardOutcome::Pass.exit_status(), 0);
        assert_eq!(GuardOutcome::skipped("No HPA found").exit_status(), 0);
        assert!(GuardOutcome::skipped("x").is_passing());
    }

    #[test]
    fn test_finding_outcomes() {
        let outcome = GuardOutcome::violation(GuardCode::ExplicitReplicas, "replicas pinned");
        assert!(!outcome.is_passing());
        assert_eq!(outcome.exit_status(), 302);
        assert_eq!(outcome.code(), Some(GuardCode::ExplicitReplicas));

        let outcome = GuardOutcome::data_error(GuardCode::TargetUnreadable, "bad json");
        assert_eq!(outcome.exit_status(), 200);
        assert!(outcome.to_string().starts_with("data error [target-unreadable]"));
    }

    #[test]
    fn test_outcome_json_shape() {
        let outcome = GuardOutcome::violation(GuardCode::IngressNotFound, "no ingress");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["result"], "violation");
        assert_eq!(json["code"], "ingress-not-found");
    }
}
