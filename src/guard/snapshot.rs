//! Per-resource snapshots of desired, live and last-applied state.

use super::document::{Document, DocumentExt, last_applied_of, parse_embedded};
use crate::platform::api::types::ResourceDiff;
use log::warn;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Workload kinds that own pod replicas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WorkloadKind {
    Deployment,
    Rollout,
}

impl WorkloadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deployment => "Deployment",
            Self::Rollout => "Rollout",
        }
    }

    /// Parse a `scaleTargetRef.kind`-style kind name.
    pub fn from_kind(kind: &str) -> Option<Self> {
        match kind {
            "Deployment" => Some(Self::Deployment),
            "Rollout" => Some(Self::Rollout),
            _ => None,
        }
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a managed resource is, as far as the guards care.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ResourceKind {
    Workload(WorkloadKind),
    Autoscaler,
    Ingress,
    Other,
}

impl ResourceKind {
    /// Classify a resource by API group and kind.
    ///
    /// Rollouts only count in the `argoproj.io` group and autoscalers only in
    /// `autoscaling`; Deployments and Ingresses are accepted from any group.
    pub fn classify(group: &str, kind: &str) -> Self {
        match (group, kind) {
            ("autoscaling", "HorizontalPodAutoscaler") => Self::Autoscaler,
            (_, "Deployment") => Self::Workload(WorkloadKind::Deployment),
            ("argoproj.io", "Rollout") => Self::Workload(WorkloadKind::Rollout),
            (_, "Ingress") => Self::Ingress,
            _ => Self::Other,
        }
    }

    pub fn workload(&self) -> Option<WorkloadKind> {
        match self {
            Self::Workload(kind) => Some(*kind),
            _ => None,
        }
    }
}

/// Errors decoding a managed resource record.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("target state of {kind}:{name} is not valid JSON: {source}")]
    InvalidTargetState {
        kind: String,
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("live state of {kind}:{name} is not valid JSON: {source}")]
    InvalidLiveState {
        kind: String,
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// One tracked resource of an application.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSnapshot {
    pub kind: ResourceKind,
    /// Raw Kubernetes kind, e.g. `HorizontalPodAutoscaler`.
    pub kind_name: String,
    pub group: String,
    pub name: String,
    pub namespace: String,
    /// Target manifest from Git.
    pub desired: Option<Document>,
    /// Object as observed in the cluster; absent on first rollout.
    pub live: Option<Document>,
    /// Decoded last-applied annotation of `live`.
    pub last_applied: Option<Document>,
}

impl ResourceSnapshot {
    pub fn new(group: impl Into<String>, kind: impl Into<String>, name: impl Into<String>) -> Self {
        let group = group.into();
        let kind_name = kind.into();
        Self {
            kind: ResourceKind::classify(&group, &kind_name),
            kind_name,
            group,
            name: name.into(),
            namespace: String::new(),
            desired: None,
            live: None,
            last_applied: None,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_desired(mut self, desired: Document) -> Self {
        self.desired = Some(desired);
        self
    }

    /// Attach the live object, decoding its last-applied annotation.
    ///
    /// An undecodable annotation is logged and treated as absent.
    pub fn with_live(mut self, live: Document) -> Self {
        self.last_applied = match last_applied_of(&live) {
            Ok(applied) => applied,
            Err(e) => {
                warn!(
                    "Ignoring unreadable last-applied-configuration on {}: {}",
                    self.display_name(),
                    e
                );
                None
            }
        };
        self.live = Some(live);
        self
    }

    /// Build a snapshot from a managed resource record.
    pub fn from_diff(diff: &ResourceDiff) -> Result<Self, SnapshotError> {
        let mut snapshot =
            Self::new(&diff.group, &diff.kind, &diff.name).with_namespace(&diff.namespace);

        let desired =
            parse_embedded(&diff.target_state).map_err(|source| SnapshotError::InvalidTargetState {
                kind: diff.kind.clone(),
                name: diff.name.clone(),
                source,
            })?;
        let live =
            parse_embedded(&diff.live_state).map_err(|source| SnapshotError::InvalidLiveState {
                kind: diff.kind.clone(),
                name: diff.name.clone(),
                source,
            })?;

        snapshot.desired = desired;
        if let Some(live) = live {
            snapshot = snapshot.with_live(live);
        }
        Ok(snapshot)
    }

    /// `Kind:name`, the form used in every log line.
    pub fn display_name(&self) -> String {
        format!("{}:{}", self.kind_name, self.name)
    }

    /// Namespace from the record, falling back to the live object's metadata.
    pub fn effective_namespace(&self) -> Option<&str> {
        if !self.namespace.is_empty() {
            return Some(&self.namespace);
        }
        self.live.as_ref().and_then(|live| live.namespace())
    }
}

/// A managed resource whose target or live state could not be decoded.
#[derive(Debug)]
pub struct UnreadableResource {
    pub kind: ResourceKind,
    pub error: SnapshotError,
}

/// Decoded resources of one application.
#[derive(Debug, Default)]
pub struct SnapshotSet {
    pub resources: Vec<ResourceSnapshot>,
    /// In record order.
    pub unreadable: Vec<UnreadableResource>,
}

impl SnapshotSet {
    /// First unreadable resource whose kind matches `relevant`.
    pub fn first_unreadable<F>(&self, relevant: F) -> Option<&UnreadableResource>
    where
        F: Fn(ResourceKind) -> bool,
    {
        self.unreadable.iter().find(|resource| relevant(resource.kind))
    }
}

/// Decode the records of an application.
///
/// Kinds no guard reads are skipped without decoding. A record that fails to
/// decode is kept aside so only the guards reading its kind fail on it.
pub fn build_snapshots(diffs: &[ResourceDiff]) -> SnapshotSet {
    let mut set = SnapshotSet::default();

    for diff in diffs {
        let kind = ResourceKind::classify(&diff.group, &diff.kind);
        if kind == ResourceKind::Other {
            continue;
        }
        match ResourceSnapshot::from_diff(diff) {
            Ok(snapshot) => set.resources.push(snapshot),
            Err(error) => set.unreadable.push(UnreadableResource { kind, error }),
        }
    }

    set
}
