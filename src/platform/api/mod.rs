//! Argo CD API client module
//!
//! Provides authenticated access to the Argo CD Application Service: refresh an
//! application, list its managed resources, patch a resource.
//!
//! # Example
//!
//! ```rust,ignore
//! use cd_guard::platform::api::{ApplicationService, ArgoCdClient, RefreshMode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ArgoCdClient::with_url("https://argocd.example.com", Some(token))?;
//!     client.get_application("shop", RefreshMode::Normal).await?;
//!     for resource in client.managed_resources("shop").await? {
//!         println!("{}/{}", resource.kind, resource.name);
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod types;

// Re-export commonly used items
pub use client::{ApplicationService, ArgoCdClient};
pub use error::{ArgoApiError, Result};
pub use types::{
    Application, ManagedResourcesResponse, PatchResourceRequest, RefreshMode, ResourceDiff,
};
