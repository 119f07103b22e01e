//! API request and response types for the Argo CD Application Service
//!
//! These mirror the JSON produced by the Argo CD API server's REST gateway.
//! Only the fields the guards read are modeled; everything else is ignored.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error body returned by the REST gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Error message
    pub error: Option<String>,
    /// Detailed error message
    pub message: Option<String>,
}

impl ApiErrorResponse {
    /// Get the error message, preferring `message` over `error`
    pub fn get_message(&self) -> String {
        self.message
            .clone()
            .or_else(|| self.error.clone())
            .unwrap_or_else(|| "Unknown error".to_string())
    }
}

/// How hard the API server should refresh an application before answering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshMode {
    /// Return cached state
    None,
    /// Re-compare against the cached manifests
    #[default]
    Normal,
    /// Regenerate manifests from Git, then compare
    Hard,
}

impl RefreshMode {
    /// Value of the `refresh` query parameter, if any
    pub fn as_query(&self) -> Option<&'static str> {
        match self {
            RefreshMode::None => None,
            RefreshMode::Normal => Some("normal"),
            RefreshMode::Hard => Some("hard"),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RefreshMode::None => "none",
            RefreshMode::Normal => "normal",
            RefreshMode::Hard => "hard",
        }
    }
}

impl fmt::Display for RefreshMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RefreshMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "" => Ok(RefreshMode::None),
            "normal" => Ok(RefreshMode::Normal),
            "hard" => Ok(RefreshMode::Hard),
            _ => Err(format!("Unknown refresh mode: {}", s)),
        }
    }
}

/// Application as returned by `GET /api/v1/applications/{name}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Application {
    pub metadata: ApplicationMetadata,
    #[serde(default)]
    pub status: ApplicationStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicationMetadata {
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicationStatus {
    #[serde(default)]
    pub sync: Option<SyncStatus>,
    #[serde(default)]
    pub health: Option<HealthStatus>,
}

/// Sync state, e.g. `Synced` or `OutOfSync`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub revision: Option<String>,
}

/// Health state, e.g. `Healthy` or `Progressing`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthStatus {
    #[serde(default)]
    pub status: String,
}

/// Response of `GET /api/v1/applications/{name}/managed-resources`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManagedResourcesResponse {
    #[serde(default)]
    pub items: Vec<ResourceDiff>,
}

/// One managed resource with its target and live state
///
/// `target_state` and `live_state` are JSON documents encoded as strings;
/// `"null"` or an empty string mean the object does not exist on that side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDiff {
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub target_state: String,
    #[serde(default)]
    pub live_state: String,
}

/// Arguments of a resource patch call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchResourceRequest {
    /// Application that manages the resource
    pub app_name: String,
    pub namespace: String,
    pub resource_name: String,
    pub version: String,
    pub group: String,
    pub kind: String,
    /// Patch document as JSON text
    pub patch: String,
    pub patch_type: String,
}
