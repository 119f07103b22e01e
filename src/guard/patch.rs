//! Merge patches that drop `spec.replicas` from a workload's recorded intent.

use super::document::{Document, DocumentExt, LAST_APPLIED_ANNOTATION};
use super::snapshot::ResourceSnapshot;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Patch type understood by the platform's resource patch endpoint.
pub const MERGE_PATCH_TYPE: &str = "application/merge-patch+json";

#[derive(Debug, Error)]
pub enum PatchError {
    #[error("{0} has no live object to patch")]
    NoLiveObject(String),

    #[error("failed to serialize patch for {resource}: {source}")]
    Serialize {
        resource: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Coordinates of the resource a patch applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchTarget {
    pub namespace: String,
    pub name: String,
    /// Version part of the API version, e.g. `v1` for `apps/v1`.
    pub version: String,
    pub group: String,
    pub kind: String,
}

/// A synthesized merge patch and where it goes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemediationPatch {
    pub target: PatchTarget,
    pub patch: Document,
}

impl RemediationPatch {
    /// JSON text submitted as the patch body.
    pub fn body(&self) -> String {
        self.patch.to_string()
    }
}

/// Build the merge patch that rewrites the last-applied annotation of
/// `workload` without `spec.replicas`.
///
/// The recorded last-applied manifest is preferred as the basis because it
/// carries the user's intent rather than controller-injected defaults; the live
/// object is used when there is none. The basis loses its own last-applied
/// annotation, `spec.replicas` and `status` before being re-encoded.
pub fn synthesize_patch(workload: &ResourceSnapshot) -> Result<RemediationPatch, PatchError> {
    let live = workload
        .live
        .as_ref()
        .ok_or_else(|| PatchError::NoLiveObject(workload.display_name()))?;

    let mut basis = workload.last_applied.clone().unwrap_or_else(|| live.clone());
    basis.remove_path(&["metadata", "annotations", LAST_APPLIED_ANNOTATION]);
    basis.remove_path(&["spec", "replicas"]);
    basis.remove_path(&["status"]);

    let encoded = serde_json::to_string(&basis).map_err(|source| PatchError::Serialize {
        resource: workload.display_name(),
        source,
    })?;

    let api_version = basis.api_version().or_else(|| live.api_version()).unwrap_or("");

    Ok(RemediationPatch {
        target: PatchTarget {
            namespace: workload.effective_namespace().unwrap_or_default().to_string(),
            name: workload.name.clone(),
            version: version_of(api_version).to_string(),
            group: workload.group.clone(),
            kind: workload.kind_name.clone(),
        },
        patch: json!({
            "metadata": {
                "annotations": {
                    LAST_APPLIED_ANNOTATION: encoded
                }
            }
        }),
    })
}

/// `apps/v1` -> `v1`, `v1` -> `v1`.
fn version_of(api_version: &str) -> &str {
    api_version.rsplit('/').next().unwrap_or(api_version)
}
