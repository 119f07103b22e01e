//! Consistency between HorizontalPodAutoscalers and the workloads they scale.
//!
//! A workload under autoscaler control must not declare `spec.replicas`:
//! every sync would reset the replica count the autoscaler chose. When the
//! desired manifest is already clean but the live object's last-applied
//! annotation still records a replica count, the next three-way diff would
//! drop the field from the live object, so those workloads are handed to the
//! patch synthesizer for remediation.

use super::document::DocumentExt;
use super::outcome::{GuardCode, GuardOutcome};
use super::resolver::AutoscalerReference;
use super::snapshot::ResourceSnapshot;
use log::{debug, error, info};
use std::collections::BTreeMap;

/// Result of the HPA guard.
#[derive(Debug, Clone, PartialEq)]
pub struct HpaEvaluation {
    pub outcome: GuardOutcome,
    /// Workload names whose last-applied annotation still pins replicas, in
    /// autoscaler order. Only meaningful when the outcome is passing.
    pub remediation: Vec<String>,
}

impl HpaEvaluation {
    fn halted(outcome: GuardOutcome) -> Self {
        Self {
            outcome,
            remediation: Vec::new(),
        }
    }
}

/// Check every autoscaler reference, stopping at the first violation.
pub fn evaluate_hpa(
    refs: &[AutoscalerReference],
    workloads_by_name: &BTreeMap<String, ResourceSnapshot>,
) -> HpaEvaluation {
    if refs.is_empty() {
        info!("No HPA found, good to pass through");
        return HpaEvaluation::halted(GuardOutcome::skipped("No HPA found"));
    }

    let mut remediation: Vec<String> = Vec::new();

    for reference in refs {
        let Some(workload) = workloads_by_name.get(&reference.target_name) else {
            let message = format!(
                "The HPA:{} refers to a non-existent resource: {}",
                reference.autoscaler_name, reference.target_name
            );
            error!("{}", message);
            return HpaEvaluation::halted(GuardOutcome::data_error(GuardCode::MissingTarget, message));
        };

        let Some(desired) = &workload.desired else {
            let message = format!(
                "The target object {} doesn't exist in the desired state",
                workload.display_name()
            );
            error!("{}", message);
            return HpaEvaluation::halted(GuardOutcome::data_error(
                GuardCode::TargetUnreadable,
                message,
            ));
        };

        if desired.non_null_at(&["spec", "replicas"]).is_some() {
            let message = format!(
                "Please set 'spec.replicas' as null ('replicas: null') in {} for kustomize templates, \
                 or delete 'spec.replicas', since the replicas are managed by HPA:{}",
                workload.display_name(),
                reference.autoscaler_name
            );
            error!("{}", message);
            return HpaEvaluation::halted(GuardOutcome::violation(
                GuardCode::ExplicitReplicas,
                message,
            ));
        }

        if workload.live.is_none() {
            debug!(
                "{} has no live object yet, first rollout is compliant",
                workload.display_name()
            );
            continue;
        }

        let pinned = workload
            .last_applied
            .as_ref()
            .map(|applied| applied.non_null_at(&["spec", "replicas"]).is_some())
            // no recorded intent yet: record one without replicas
            .unwrap_or(true);

        if !pinned {
            info!(
                "{} doesn't have 'spec.replicas', it is managed by HPA, perfect!",
                workload.display_name()
            );
            continue;
        }

        if !remediation.contains(&workload.name) {
            info!(
                "{} still records 'spec.replicas' in its last-applied-configuration",
                workload.display_name()
            );
            remediation.push(workload.name.clone());
        }
    }

    HpaEvaluation {
        outcome: GuardOutcome::Pass,
        remediation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::document::LAST_APPLIED_ANNOTATION;
    use crate::guard::resolver::resolve;
    use serde_json::{Value, json};

    fn hpa(name: &str, target: &str) -> ResourceSnapshot {
        ResourceSnapshot::new("autoscaling", "HorizontalPodAutoscaler", name).with_desired(json!({
            "metadata": { "name": name },
            "spec": { "scaleTargetRef": { "kind": "Deployment", "name": target } }
        }))
    }

    fn live_with_applied(applied: Value) -> Value {
        json!({
            "metadata": {
                "name": "dep-a",
                "annotations": { LAST_APPLIED_ANNOTATION: applied.to_string() }
            },
            "spec": { "replicas": 3 }
        })
    }

    fn run(snapshots: &[ResourceSnapshot]) -> HpaEvaluation {
        let resolved = resolve(snapshots);
        evaluate_hpa(&resolved.autoscaler_refs, &resolved.workloads_by_name)
    }

    #[test]
    fn test_no_autoscalers_passes() {
        let snapshots = vec![
            ResourceSnapshot::new("apps", "Deployment", "dep-a")
                .with_desired(json!({ "spec": { "replicas": 2 } })),
        ];
        let evaluation = run(&snapshots);
        assert!(evaluation.outcome.is_passing());
        assert_eq!(evaluation.outcome.exit_status(), 0);
        assert!(evaluation.remediation.is_empty());
    }

    #[test]
    fn test_explicit_replicas_is_302_regardless_of_live() {
        let desired = json!({ "spec": { "replicas": 2 } });
        let lives = [
            None,
            Some(live_with_applied(json!({ "spec": {} }))),
            Some(live_with_applied(json!({ "spec": { "replicas": 2 } }))),
        ];
        for live in lives {
            let mut workload =
                ResourceSnapshot::new("apps", "Deployment", "dep-a").with_desired(desired.clone());
            if let Some(live) = live {
                workload = workload.with_live(live);
            }
            let evaluation = run(&[hpa("hpa-a", "dep-a"), workload]);
            assert_eq!(evaluation.outcome.exit_status(), 302);
            assert_eq!(evaluation.outcome.code(), Some(GuardCode::ExplicitReplicas));
        }
    }

    #[test]
    fn test_null_replicas_is_not_explicit() {
        let workload = ResourceSnapshot::new("apps", "Deployment", "dep-a")
            .with_desired(json!({ "spec": { "replicas": null } }));
        let evaluation = run(&[hpa("hpa-a", "dep-a"), workload]);
        assert_eq!(evaluation.outcome, GuardOutcome::Pass);
    }

    #[test]
    fn test_first_rollout_is_compliant() {
        let workload = ResourceSnapshot::new("apps", "Deployment", "dep-a")
            .with_desired(json!({ "spec": { "template": {} } }));
        let evaluation = run(&[hpa("hpa-a", "dep-a"), workload]);
        assert_eq!(evaluation.outcome, GuardOutcome::Pass);
        assert!(evaluation.remediation.is_empty());
    }

    #[test]
    fn test_clean_last_applied_needs_no_remediation() {
        let workload = ResourceSnapshot::new("apps", "Deployment", "dep-a")
            .with_desired(json!({ "spec": {} }))
            .with_live(live_with_applied(json!({ "spec": { "template": {} } })));
        let evaluation = run(&[hpa("hpa-a", "dep-a"), workload]);
        assert_eq!(evaluation.outcome, GuardOutcome::Pass);
        assert!(evaluation.remediation.is_empty());
    }

    #[test]
    fn test_pinned_last_applied_is_remediated_once() {
        let workload = ResourceSnapshot::new("apps", "Deployment", "dep-a")
            .with_desired(json!({ "spec": {} }))
            .with_live(live_with_applied(json!({ "spec": { "replicas": 5 } })));
        let evaluation = run(&[hpa("hpa-a", "dep-a"), hpa("hpa-b", "dep-a"), workload]);
        assert_eq!(evaluation.outcome, GuardOutcome::Pass);
        assert_eq!(evaluation.remediation, vec!["dep-a".to_string()]);
    }

    #[test]
    fn test_live_without_last_applied_is_remediated() {
        let workload = ResourceSnapshot::new("apps", "Deployment", "dep-a")
            .with_desired(json!({ "spec": {} }))
            .with_live(json!({ "metadata": { "name": "dep-a" }, "spec": { "replicas": 3 } }));
        let evaluation = run(&[hpa("hpa-a", "dep-a"), workload]);
        assert_eq!(evaluation.remediation, vec!["dep-a".to_string()]);
    }

    #[test]
    fn test_missing_target_halts_before_later_checks() {
        let pinned = ResourceSnapshot::new("apps", "Deployment", "dep-b")
            .with_desired(json!({ "spec": { "replicas": 2 } }));
        let evaluation = run(&[hpa("hpa-a", "dep-missing"), hpa("hpa-b", "dep-b"), pinned]);
        assert!(matches!(evaluation.outcome, GuardOutcome::DataError(_)));
        assert_eq!(evaluation.outcome.code(), Some(GuardCode::MissingTarget));
        assert!(evaluation.remediation.is_empty());
    }

    #[test]
    fn test_target_without_desired_state_is_data_error() {
        let workload = ResourceSnapshot::new("apps", "Deployment", "dep-a");
        let evaluation = run(&[hpa("hpa-a", "dep-a"), workload]);
        assert_eq!(evaluation.outcome.code(), Some(GuardCode::TargetUnreadable));
        assert_eq!(evaluation.outcome.exit_status(), 200);
    }
}
