//! Argo CD platform integration
//!
//! This module provides the API client for the Argo CD Application Service the
//! guards read resources from and submit remediation patches to.

pub mod api;

pub use api::{ApplicationService, ArgoCdClient};
