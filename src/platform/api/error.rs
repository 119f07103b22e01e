//! Error types for the Argo CD API client
//!
//! Provides structured error types for all API operations.

use thiserror::Error;

/// Errors that can occur when talking to the Argo CD API server
#[derive(Debug, Error)]
pub enum ArgoApiError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Server certificate file could not be read
    #[error("Failed to read server certificate {path}: {message}")]
    Certificate {
        path: String,
        message: String,
    },

    /// API returned an error response
    #[error("API error ({status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Failed to parse the API response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// No usable auth token - pass `--auth-token` or run `argocd login`
    #[error("Not authenticated - pass --auth-token or run `argocd login` first")]
    Unauthorized,

    /// Requested application or resource was not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// The token does not grant the requested operation
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Server error
    #[error("Server error ({status}): {message}")]
    ServerError {
        /// HTTP status code (5xx)
        status: u16,
        /// Error message
        message: String,
    },
}

/// Result type alias for Argo CD API operations
pub type Result<T> = std::result::Result<T, ArgoApiError>;
