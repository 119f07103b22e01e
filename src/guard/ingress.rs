//! Pod readiness gates for IP-mode ALB ingresses.
//!
//! With `alb.ingress.kubernetes.io/target-type: ip` the load balancer sends
//! traffic straight to pod IPs, so a rolling update can drop requests unless
//! pods carry a readiness gate the ALB ingress controller flips once the
//! target is healthy. Gates are named
//! `target-health.alb.ingress.k8s.aws/<INGRESS>_<SERVICE>_<PORT>`, or use one
//! of the static suffixes that cover every target group.

use super::document::{Document, DocumentExt};
use super::outcome::{GuardCode, GuardOutcome};
use super::resolver::partition;
use super::snapshot::ResourceSnapshot;
use log::{debug, error, info};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

pub const ALB_CONDITION_PREFIX: &str = "target-health.alb.ingress.k8s.aws/";
pub const TARGET_TYPE_ANNOTATION: &str = "alb.ingress.kubernetes.io/target-type";
/// Suffixes that make the controller gate on every target group.
pub const STATIC_CONDITION_SUFFIXES: [&str; 2] =
    ["load-balancer-any-tg-ready", "load-balancer-all-tg-ready"];
/// Kubernetes limits the name part of a condition type to 63 characters.
pub const MAX_CONDITION_SUFFIX_LEN: usize = 63;

/// What an ALB readiness gate refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadinessGateReference {
    /// Static suffix: every tracked ingress is covered.
    AllIngresses,
    Backend {
        ingress: String,
        service: String,
        port: String,
    },
}

/// Why a condition type could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateSyntaxError {
    pub code: GuardCode,
    pub message: String,
}

/// Parse an ALB readiness gate condition type.
///
/// Returns `Ok(None)` for condition types that are not ALB target-health gates.
pub fn parse_condition_type(
    condition_type: &str,
) -> Result<Option<ReadinessGateReference>, GateSyntaxError> {
    let Some(suffix) = condition_type.strip_prefix(ALB_CONDITION_PREFIX) else {
        return Ok(None);
    };

    if suffix.is_empty() {
        return Err(GateSyntaxError {
            code: GuardCode::MalformedConditionType,
            message: format!(
                "The pod readiness condition {} doesn't point to the right INGRESS_SERVICE_PORT",
                condition_type
            ),
        });
    }

    if suffix.len() > MAX_CONDITION_SUFFIX_LEN {
        return Err(GateSyntaxError {
            code: GuardCode::ConditionTypeTooLong,
            message: format!(
                "The pod readiness conditionType '{}' is more than {} characters which is a limitation \
                 from k8s, please use static conditionType '{}' instead",
                suffix, MAX_CONDITION_SUFFIX_LEN, STATIC_CONDITION_SUFFIXES[0]
            ),
        });
    }

    if STATIC_CONDITION_SUFFIXES.contains(&suffix) {
        return Ok(Some(ReadinessGateReference::AllIngresses));
    }

    match suffix.split('_').collect::<Vec<_>>().as_slice() {
        [ingress, service, port] => Ok(Some(ReadinessGateReference::Backend {
            ingress: ingress.to_string(),
            service: service.to_string(),
            port: port.to_string(),
        })),
        _ => Err(GateSyntaxError {
            code: GuardCode::BadGateSyntax,
            message: format!(
                "The pod readiness condition {} doesn't have 3 parts separated with '_', \
                 the right syntax is 'INGRESS_SERVICE_PORT'",
                condition_type
            ),
        }),
    }
}

/// A service port as written in an ingress backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendPort {
    Number(u32),
    Name(String),
}

impl BackendPort {
    /// Accepts JSON integers and strings; numeric strings become numbers.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()).map(Self::Number),
            Value::String(s) => Some(Self::parse(s)),
            _ => None,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.parse::<u32>() {
            Ok(n) => Self::Number(n),
            Err(_) => Self::Name(s.to_string()),
        }
    }
}

impl fmt::Display for BackendPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Name(name) => write!(f, "{}", name),
        }
    }
}

/// A service backend of an ingress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngressBackend {
    pub service: String,
    pub port: BackendPort,
}

impl IngressBackend {
    /// Read either the `extensions/v1beta1` shape (`serviceName`/`servicePort`)
    /// or the `networking.k8s.io/v1` shape (`service.name`/`service.port`).
    fn from_value(backend: &Value) -> Option<Self> {
        if let (Some(service), Some(port)) = (
            backend.str_at(&["serviceName"]),
            backend.non_null_at(&["servicePort"]),
        ) {
            return Some(Self {
                service: service.to_string(),
                port: BackendPort::from_value(port)?,
            });
        }

        let service = backend.str_at(&["service", "name"])?;
        let port = backend
            .non_null_at(&["service", "port", "number"])
            .or_else(|| backend.non_null_at(&["service", "port", "name"]))?;
        Some(Self {
            service: service.to_string(),
            port: BackendPort::from_value(port)?,
        })
    }

    pub fn matches(&self, service: &str, port: &str) -> bool {
        self.service.eq_ignore_ascii_case(service) && self.port == BackendPort::parse(port)
    }
}

/// Every service backend of an ingress: default backend first, then the
/// fanout rules in order.
pub fn ingress_backends(ingress: &Document) -> Vec<IngressBackend> {
    let mut backends = Vec::new();

    for key in ["backend", "defaultBackend"] {
        if let Some(backend) = ingress.path(&["spec", key]).and_then(IngressBackend::from_value) {
            backends.push(backend);
        }
    }

    let paths = ingress
        .sequence_at(&["spec", "rules"])
        .into_iter()
        .flatten()
        .filter_map(|rule| rule.sequence_at(&["http", "paths"]))
        .flatten();
    backends.extend(
        paths
            .filter_map(|path| path.path(&["backend"]))
            .filter_map(IngressBackend::from_value),
    );

    backends
}

fn is_ip_target(ingress: &Document) -> bool {
    ingress.annotation(TARGET_TYPE_ANNOTATION) == Some("ip")
}

/// Verify that every IP-mode ingress has a readiness gate pointing to it.
///
/// Stops at the first malformed or dangling gate.
pub fn evaluate_ingress(snapshots: &[ResourceSnapshot]) -> GuardOutcome {
    let resolved = partition(snapshots);
    if resolved.ingresses_by_name.is_empty() {
        info!("No Ingress found, good to pass through");
        return GuardOutcome::skipped("No Ingress found");
    }

    // ingress name -> has a compliant readiness gate
    let mut gate_enabled: BTreeMap<&str, bool> = resolved
        .ingresses_by_name
        .iter()
        .filter(|(_, ingress)| is_ip_target(ingress))
        .map(|(name, _)| (name.as_str(), false))
        .collect();

    if gate_enabled.is_empty() {
        info!(
            "No Ingress has annotation '{}=ip', good to pass through",
            TARGET_TYPE_ANNOTATION
        );
        return GuardOutcome::skipped(format!("No Ingress has annotation '{}=ip'", TARGET_TYPE_ANNOTATION));
    }

    let mut all_exempt = false;

    for workload in resolved.workloads_by_name.values() {
        let Some(desired) = &workload.desired else {
            let message = format!(
                "The target object of {} doesn't exist",
                workload.display_name()
            );
            error!("{}", message);
            return GuardOutcome::data_error(GuardCode::TargetUnreadable, message);
        };

        let gates = desired
            .sequence_at(&["spec", "template", "spec", "readinessGates"])
            .into_iter()
            .flatten()
            .filter_map(|gate| gate.str_at(&["conditionType"]));

        for condition_type in gates {
            let reference = match parse_condition_type(condition_type) {
                Ok(Some(reference)) => reference,
                Ok(None) => continue,
                Err(e) => {
                    error!("{}", e.message);
                    return GuardOutcome::violation(e.code, e.message);
                }
            };

            let (ingress_name, service, port) = match reference {
                ReadinessGateReference::AllIngresses => {
                    debug!(
                        "{} uses static condition type {}, every Ingress passes",
                        workload.display_name(),
                        condition_type
                    );
                    all_exempt = true;
                    continue;
                }
                ReadinessGateReference::Backend {
                    ingress,
                    service,
                    port,
                } => (ingress, service, port),
            };

            let Some(ingress) = resolved.ingresses_by_name.get(&ingress_name) else {
                let message = format!(
                    "You have a pod readiness condition, but the Ingress {} doesn't exist",
                    ingress_name
                );
                error!("{}", message);
                return GuardOutcome::violation(GuardCode::IngressNotFound, message);
            };

            let Some(enabled) = gate_enabled.get_mut(ingress_name.as_str()) else {
                let message = format!(
                    "You have a pod readiness condition, but the Ingress {} doesn't have an \
                     annotation '{}' with value 'ip'",
                    ingress_name, TARGET_TYPE_ANNOTATION
                );
                error!("{}", message);
                return GuardOutcome::violation(GuardCode::UntrackedIngress, message);
            };

            if !ingress_backends(ingress)
                .iter()
                .any(|backend| backend.matches(&service, &port))
            {
                let message = format!(
                    "The service name or port [{}:{}] doesn't exist in ingress {}",
                    service, port, ingress_name
                );
                error!("{}", message);
                return GuardOutcome::violation(GuardCode::ServicePortNotFound, message);
            }

            info!(
                "{} has a pod readiness gate for Ingress {} ({}:{})",
                workload.display_name(),
                ingress_name,
                service,
                port
            );
            *enabled = true;
        }
    }

    if all_exempt {
        return GuardOutcome::Pass;
    }

    if let Some((ingress_name, _)) = gate_enabled.iter().find(|(_, enabled)| !**enabled) {
        let message = format!(
            "Ingress '{}' uses IP targets, but no pod enables a PodReadinessGate for it",
            ingress_name
        );
        error!("{}", message);
        return GuardOutcome::violation(GuardCode::MissingReadinessGate, message);
    }

    GuardOutcome::Pass
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn ingress(name: &str, ip: bool, spec: Value) -> ResourceSnapshot {
        let mut annotations = serde_json::Map::new();
        if ip {
            annotations.insert(TARGET_TYPE_ANNOTATION.to_string(), json!("ip"));
        }
        ResourceSnapshot::new("extensions", "Ingress", name).with_desired(json!({
            "metadata": { "name": name, "annotations": annotations },
            "spec": spec
        }))
    }

    fn single_backend(service: &str, port: Value) -> Value {
        json!({ "backend": { "serviceName": service, "servicePort": port } })
    }

    fn workload(name: &str, gates: &[&str]) -> ResourceSnapshot {
        let gates: Vec<Value> = gates
            .iter()
            .map(|g| json!({ "conditionType": g }))
            .collect();
        ResourceSnapshot::new("apps", "Deployment", name).with_desired(json!({
            "spec": { "template": { "spec": { "readinessGates": gates } } }
        }))
    }

    fn gate(suffix: &str) -> String {
        format!("{}{}", ALB_CONDITION_PREFIX, suffix)
    }

    #[test]
    fn test_parse_condition_type() {
        assert_eq!(parse_condition_type("example.com/ready"), Ok(None));
        assert_eq!(
            parse_condition_type(&gate("ing-a_svc-a_80")),
            Ok(Some(ReadinessGateReference::Backend {
                ingress: "ing-a".to_string(),
                service: "svc-a".to_string(),
                port: "80".to_string(),
            }))
        );
        for suffix in STATIC_CONDITION_SUFFIXES {
            assert_eq!(
                parse_condition_type(&gate(suffix)),
                Ok(Some(ReadinessGateReference::AllIngresses))
            );
        }
        assert_eq!(
            parse_condition_type(&gate("")).unwrap_err().code,
            GuardCode::MalformedConditionType
        );
        assert_eq!(
            parse_condition_type(&gate("ing-a_svc-a")).unwrap_err().code,
            GuardCode::BadGateSyntax
        );
        assert_eq!(
            parse_condition_type(&gate("a_b_c_d")).unwrap_err().code,
            GuardCode::BadGateSyntax
        );
    }

    #[test]
    fn test_suffix_length_boundary() {
        let ok = format!("{}_s_80", "i".repeat(MAX_CONDITION_SUFFIX_LEN - 5));
        assert_eq!(ok.len(), 63);
        assert!(matches!(parse_condition_type(&gate(&ok)), Ok(Some(_))));

        let long = format!("{}_s_80", "i".repeat(MAX_CONDITION_SUFFIX_LEN - 4));
        assert_eq!(long.len(), 64);
        assert_eq!(
            parse_condition_type(&gate(&long)).unwrap_err().code,
            GuardCode::ConditionTypeTooLong
        );
    }

    #[test]
    fn test_no_ingresses_passes() {
        let outcome = evaluate_ingress(&[workload("dep-a", &[])]);
        assert!(outcome.is_passing());
        assert_eq!(outcome.exit_status(), 0);
    }

    #[test]
    fn test_instance_mode_ingress_is_exempt() {
        let outcome = evaluate_ingress(&[
            ingress("ing-a", false, single_backend("svc-a", json!(80))),
            workload("dep-a", &[]),
        ]);
        assert!(outcome.is_passing());
    }

    #[test]
    fn test_matching_single_backend_passes() {
        let outcome = evaluate_ingress(&[
            ingress("ing-a", true, single_backend("svc-a", json!(80))),
            workload("dep-a", &[&gate("ing-a_svc-a_80")]),
        ]);
        assert_eq!(outcome, GuardOutcome::Pass);
    }

    #[test]
    fn test_autoscalers_do_not_affect_ingress_check() {
        let dangling = ResourceSnapshot::new("autoscaling", "HorizontalPodAutoscaler", "hpa-a")
            .with_desired(json!({
                "spec": { "scaleTargetRef": { "kind": "Deployment", "name": "missing" } }
            }));
        let outcome = evaluate_ingress(&[
            dangling,
            ingress("ing-a", true, single_backend("svc-a", json!(80))),
            workload("dep-a", &[&gate("ing-a_svc-a_80")]),
        ]);
        assert_eq!(outcome, GuardOutcome::Pass);
    }

    #[test]
    fn test_port_mismatch_is_305() {
        let outcome = evaluate_ingress(&[
            ingress("ing-a", true, single_backend("svc-a", json!(8080))),
            workload("dep-a", &[&gate("ing-a_svc-a_80")]),
        ]);
        assert_eq!(outcome.exit_status(), 305);
    }

    #[test]
    fn test_service_name_is_case_insensitive() {
        let outcome = evaluate_ingress(&[
            ingress("ing-a", true, single_backend("SVC-A", json!("80"))),
            workload("dep-a", &[&gate("ing-a_svc-a_80")]),
        ]);
        assert_eq!(outcome, GuardOutcome::Pass);
    }

    #[test]
    fn test_static_suffix_exempts_everything() {
        let outcome = evaluate_ingress(&[
            ingress("ing-a", true, single_backend("svc-a", json!(80))),
            ingress("ing-b", true, single_backend("svc-b", json!(80))),
            workload("dep-a", &[&gate("load-balancer-any-tg-ready")]),
        ]);
        assert_eq!(outcome, GuardOutcome::Pass);
    }

    #[test]
    fn test_missing_gate_is_500() {
        let outcome = evaluate_ingress(&[
            ingress("ing-a", true, single_backend("svc-a", json!(80))),
            ingress("ing-b", true, single_backend("svc-b", json!(80))),
            workload("dep-a", &[&gate("ing-a_svc-a_80")]),
        ]);
        assert_eq!(outcome.exit_status(), 500);
        assert!(outcome.finding().unwrap().message.contains("ing-b"));
    }

    #[test]
    fn test_unknown_ingress_is_304() {
        let outcome = evaluate_ingress(&[
            ingress("ing-a", true, single_backend("svc-a", json!(80))),
            workload("dep-a", &[&gate("ing-z_svc-a_80")]),
        ]);
        assert_eq!(outcome.code(), Some(GuardCode::IngressNotFound));
    }

    #[test]
    fn test_untracked_ingress_is_302() {
        let outcome = evaluate_ingress(&[
            ingress("ing-a", true, single_backend("svc-a", json!(80))),
            ingress("ing-b", false, single_backend("svc-b", json!(80))),
            workload("dep-a", &[&gate("ing-b_svc-b_80")]),
        ]);
        assert_eq!(outcome.code(), Some(GuardCode::UntrackedIngress));
        assert_eq!(outcome.exit_status(), 302);
    }

    #[test]
    fn test_syntax_errors_halt() {
        let base = ingress("ing-a", true, single_backend("svc-a", json!(80)));
        let cases = [
            (gate(""), 300),
            (gate("ing-a-svc-a-80"), 301),
            (gate(&"x".repeat(64)), 306),
        ];
        for (condition, status) in cases {
            let outcome = evaluate_ingress(&[base.clone(), workload("dep-a", &[&condition])]);
            assert_eq!(outcome.exit_status(), status, "{}", condition);
        }
    }

    #[test]
    fn test_non_alb_gates_are_ignored() {
        let outcome = evaluate_ingress(&[
            ingress("ing-a", true, single_backend("svc-a", json!(80))),
            workload("dep-a", &["example.com/feature-ready", &gate("ing-a_svc-a_80")]),
        ]);
        assert_eq!(outcome, GuardOutcome::Pass);
    }

    #[test]
    fn test_workload_without_desired_state_is_data_error() {
        let outcome = evaluate_ingress(&[
            ingress("ing-a", true, single_backend("svc-a", json!(80))),
            ResourceSnapshot::new("apps", "Deployment", "dep-a"),
        ]);
        assert_eq!(outcome.code(), Some(GuardCode::TargetUnreadable));
    }

    #[test]
    fn test_fanout_rules_match() {
        let spec = json!({
            "rules": [
                { "host": "a.example.com", "http": { "paths": [
                    { "path": "/", "backend": { "serviceName": "svc-a", "servicePort": 80 } }
                ] } },
                { "http": { "paths": [
                    { "path": "/api", "backend": { "serviceName": "svc-b", "servicePort": 8443 } }
                ] } }
            ]
        });
        let outcome = evaluate_ingress(&[
            ingress("ing-a", true, spec),
            workload("dep-b", &[&gate("ing-a_svc-b_8443")]),
        ]);
        assert_eq!(outcome, GuardOutcome::Pass);
    }

    #[test]
    fn test_default_backend_mismatch_falls_through_to_rules() {
        let spec = json!({
            "backend": { "serviceName": "default-svc", "servicePort": 80 },
            "rules": [ { "http": { "paths": [
                { "backend": { "serviceName": "svc-a", "servicePort": 80 } }
            ] } } ]
        });
        let outcome = evaluate_ingress(&[
            ingress("ing-a", true, spec),
            workload("dep-a", &[&gate("ing-a_svc-a_80")]),
        ]);
        assert_eq!(outcome, GuardOutcome::Pass);
    }

    #[test]
    fn test_networking_v1_backends() {
        let ing = json!({
            "spec": {
                "defaultBackend": { "service": { "name": "svc-d", "port": { "number": 80 } } },
                "rules": [ { "http": { "paths": [
                    { "path": "/", "pathType": "Prefix",
                      "backend": { "service": { "name": "svc-a", "port": { "name": "http" } } } }
                ] } } ]
            }
        });
        let backends = ingress_backends(&ing);
        assert_eq!(
            backends,
            vec![
                IngressBackend { service: "svc-d".to_string(), port: BackendPort::Number(80) },
                IngressBackend {
                    service: "svc-a".to_string(),
                    port: BackendPort::Name("http".to_string())
                },
            ]
        );
        assert!(backends[1].matches("svc-a", "http"));
        assert!(!backends[1].matches("svc-a", "80"));
    }

    #[test]
    fn test_backend_port_normalization() {
        assert_eq!(BackendPort::from_value(&json!(80)), Some(BackendPort::Number(80)));
        assert_eq!(BackendPort::from_value(&json!("80")), Some(BackendPort::Number(80)));
        assert_eq!(
            BackendPort::from_value(&json!("https")),
            Some(BackendPort::Name("https".to_string()))
        );
        assert_eq!(BackendPort::from_value(&json!(-1)), None);
        assert_eq!(BackendPort::from_value(&json!(true)), None);
        assert_eq!(BackendPort::parse("080"), BackendPort::Number(80));
    }

    proptest! {
        #[test]
        fn prop_overlong_suffix_is_306(extra in 1usize..40, body in "[a-z]{1,3}") {
            let suffix: String = body.chars().cycle().take(MAX_CONDITION_SUFFIX_LEN + extra).collect();
            let err = parse_condition_type(&gate(&suffix)).unwrap_err();
            prop_assert_eq!(err.code, GuardCode::ConditionTypeTooLong);
        }

        #[test]
        fn prop_three_part_suffix_within_limit_parses(
            ingress in "[a-z][a-z0-9-]{0,20}",
            service in "[a-z][a-z0-9-]{0,20}",
            port in 1u32..65536,
        ) {
            let suffix = format!("{}_{}_{}", ingress, service, port);
            prop_assume!(suffix.len() <= MAX_CONDITION_SUFFIX_LEN);
            prop_assume!(!STATIC_CONDITION_SUFFIXES.contains(&suffix.as_str()));
            let parsed = parse_condition_type(&gate(&suffix)).unwrap();
            prop_assert_eq!(parsed, Some(ReadinessGateReference::Backend {
                ingress,
                service,
                port: port.to_string(),
            }));
        }
    }
}
