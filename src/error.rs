use crate::guard::patch::PatchError;
use crate::platform::api::ArgoApiError;
use std::path::PathBuf;
use thiserror::Error;

/// Process-level failures. Guard findings are not errors; they travel as
/// [`crate::guard::GuardOutcome`] values.
#[derive(Debug, Error)]
pub enum GuardError {
    #[error("Argo CD API error: {0}")]
    Api(#[from] ArgoApiError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Patch synthesis failed: {0}")]
    Patch(#[from] PatchError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("No Argo CD server given; use --server, ARGOCD_SERVER or `argocd login`")]
    MissingServer,
}

pub type Result<T> = std::result::Result<T, GuardError>;
