//! Post-sync policy guards.
//!
//! Guards work on one snapshot of an application's managed resources:
//!
//! - [`hpa`]: workloads scaled by a HorizontalPodAutoscaler must not pin
//!   `spec.replicas`; stale last-applied annotations get a corrective
//!   merge patch from [`patch`].
//! - [`ingress`]: every IP-mode ALB ingress must be covered by a pod
//!   readiness gate.
//!
//! Evaluators are pure functions returning a [`GuardOutcome`]; fetching
//! resources and submitting patches is the caller's business.

pub mod document;
pub mod hpa;
pub mod ingress;
pub mod outcome;
pub mod patch;
pub mod resolver;
pub mod snapshot;

pub use document::{Document, DocumentExt, LAST_APPLIED_ANNOTATION};
pub use hpa::{HpaEvaluation, evaluate_hpa};
pub use ingress::{ReadinessGateReference, evaluate_ingress, parse_condition_type};
pub use outcome::{Finding, GuardCode, GuardOutcome};
pub use patch::{MERGE_PATCH_TYPE, PatchTarget, RemediationPatch, synthesize_patch};
pub use resolver::{AutoscalerReference, ResolvedReferences, partition, resolve};
pub use snapshot::{
    ResourceKind, ResourceSnapshot, SnapshotSet, UnreadableResource, WorkloadKind, build_snapshots,
};

use serde::{Deserialize, Serialize};
use std::fmt;

/// The guards this tool knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuardKind {
    Hpa,
    Ingress,
}

impl GuardKind {
    /// Every guard, in the order `all` runs them.
    pub const ALL: [GuardKind; 2] = [GuardKind::Hpa, GuardKind::Ingress];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hpa => "hpa",
            Self::Ingress => "ingress",
        }
    }

    /// Whether this guard reads resources of `kind`.
    pub fn inspects(&self, kind: ResourceKind) -> bool {
        match kind {
            ResourceKind::Workload(_) => true,
            ResourceKind::Autoscaler => *self == Self::Hpa,
            ResourceKind::Ingress => *self == Self::Ingress,
            ResourceKind::Other => false,
        }
    }
}

impl fmt::Display for GuardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
