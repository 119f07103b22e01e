//! Cross-resource reference discovery.

use super::document::{Document, DocumentExt};
use super::snapshot::{ResourceKind, ResourceSnapshot, WorkloadKind};
use log::info;
use std::collections::BTreeMap;

/// An autoscaler's `spec.scaleTargetRef` pointing at a workload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoscalerReference {
    pub autoscaler_name: String,
    pub target_kind: WorkloadKind,
    pub target_name: String,
}

/// References discovered in one application's resources.
#[derive(Debug, Clone, Default)]
pub struct ResolvedReferences {
    /// In snapshot order.
    pub autoscaler_refs: Vec<AutoscalerReference>,
    pub workloads_by_name: BTreeMap<String, ResourceSnapshot>,
    /// Desired bodies of ingresses.
    pub ingresses_by_name: BTreeMap<String, Document>,
}

/// Single pass over the snapshots building every association the guards use.
pub fn resolve(snapshots: &[ResourceSnapshot]) -> ResolvedReferences {
    let mut resolved = partition(snapshots);

    for snapshot in snapshots {
        if snapshot.kind != ResourceKind::Autoscaler {
            continue;
        }
        if let Some(reference) = autoscaler_reference(snapshot) {
            info!(
                "The HorizontalPodAutoscaler:{} is associated with {}:{}",
                reference.autoscaler_name, reference.target_kind, reference.target_name
            );
            resolved.autoscaler_refs.push(reference);
        }
    }

    resolved
}

/// Bucket workloads and ingresses by name, leaving autoscalers alone.
pub fn partition(snapshots: &[ResourceSnapshot]) -> ResolvedReferences {
    let mut resolved = ResolvedReferences::default();

    for snapshot in snapshots {
        match snapshot.kind {
            ResourceKind::Workload(_) => {
                resolved
                    .workloads_by_name
                    .insert(snapshot.name.clone(), snapshot.clone());
            }
            ResourceKind::Ingress => {
                if let Some(desired) = &snapshot.desired {
                    resolved
                        .ingresses_by_name
                        .insert(snapshot.name.clone(), desired.clone());
                }
            }
            ResourceKind::Autoscaler | ResourceKind::Other => {}
        }
    }

    resolved
}

/// Read the scale target of an autoscaler, if it is a Deployment or Rollout.
fn autoscaler_reference(snapshot: &ResourceSnapshot) -> Option<AutoscalerReference> {
    let desired = snapshot.desired.as_ref()?;
    let target = desired.mapping_at(&["spec", "scaleTargetRef"])?;
    let target_kind = WorkloadKind::from_kind(target.get("kind")?.as_str()?)?;
    let target_name = target.get("name")?.as_str()?;

    Some(AutoscalerReference {
        autoscaler_name: desired.name().unwrap_or(&snapshot.name).to_string(),
        target_kind,
        target_name: target_name.to_string(),
    })
}
