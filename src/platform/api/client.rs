//! Argo CD API client
//!
//! Talks to the Argo CD API server's REST gateway to refresh an application,
//! read its managed resources and patch a single resource.

use super::error::{ArgoApiError, Result};
use super::types::{
    ApiErrorResponse, Application, ManagedResourcesResponse, PatchResourceRequest, RefreshMode,
    ResourceDiff,
};
use crate::config::types::ConnectionSettings;
use log::debug;
use reqwest::{Certificate, Client};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use urlencoding::encode;

/// User agent for API requests
const USER_AGENT: &str = concat!("cd-guard/", env!("CARGO_PKG_VERSION"));

/// The slice of the Argo CD Application Service the guards need
pub trait ApplicationService {
    /// Fetch an application, asking the server to refresh it first
    fn get_application(
        &self,
        name: &str,
        refresh: RefreshMode,
    ) -> impl Future<Output = Result<Application>> + Send;

    /// List the application's managed resources with target and live state
    fn managed_resources(
        &self,
        app_name: &str,
    ) -> impl Future<Output = Result<Vec<ResourceDiff>>> + Send;

    /// Patch one managed resource
    fn patch_resource(
        &self,
        request: &PatchResourceRequest,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Client for the Argo CD API server
pub struct ArgoCdClient {
    /// HTTP client with configured timeout and headers
    http_client: Client,
    /// Base URL, e.g. `https://argocd.example.com`
    api_url: String,
    /// Bearer token
    auth_token: Option<String>,
}

impl ArgoCdClient {
    /// Create a client from resolved connection settings
    pub fn new(settings: &ConnectionSettings) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(settings.insecure);

        if let Some(path) = &settings.server_cert {
            let pem = std::fs::read(path).map_err(|e| ArgoApiError::Certificate {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
            builder = builder.add_root_certificate(Certificate::from_pem(&pem)?);
        }

        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }

        let http_client = builder.build().map_err(ArgoApiError::HttpError)?;

        Ok(Self {
            http_client,
            api_url: settings.server_url(),
            auth_token: settings.auth_token.clone(),
        })
    }

    /// Create a client with a custom API URL
    pub fn with_url(api_url: impl Into<String>, auth_token: Option<String>) -> Result<Self> {
        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(ArgoApiError::HttpError)?;

        Ok(Self {
            http_client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            auth_token,
        })
    }

    /// Get the configured API URL
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn auth_token(&self) -> Result<&str> {
        self.auth_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(ArgoApiError::Unauthorized)
    }

    /// Make an authenticated GET request
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let token = self.auth_token()?;
        let url = format!("{}{}", self.api_url, path);
        debug!("GET {}", url);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Make an authenticated POST request with a JSON body
    async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let token = self.auth_token()?;
        let url = format!("{}{}", self.api_url, path);
        debug!("POST {}", url);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Handle the HTTP response, converting errors appropriately
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();

        if status.is_success() {
            response
                .json::<T>()
                .await
                .map_err(|e| ArgoApiError::ParseError(e.to_string()))
        } else {
            let status_code = status.as_u16();
            let error_body = response.text().await.unwrap_or_default();
            Err(status_error(status_code, &error_body))
        }
    }
}

impl ApplicationService for ArgoCdClient {
    /// Endpoint: GET /api/v1/applications/:name?refresh=normal
    async fn get_application(&self, name: &str, refresh: RefreshMode) -> Result<Application> {
        self.get(&application_path(name, refresh)).await
    }

    /// Endpoint: GET /api/v1/applications/:name/managed-resources
    async fn managed_resources(&self, app_name: &str) -> Result<Vec<ResourceDiff>> {
        let response: ManagedResourcesResponse =
            self.get(&managed_resources_path(app_name)).await?;
        Ok(response.items)
    }

    /// Endpoint: POST /api/v1/applications/:name/resource
    ///
    /// The body is the patch text encoded as a JSON string.
    async fn patch_resource(&self, request: &PatchResourceRequest) -> Result<()> {
        let _: serde_json::Value = self
            .post(&patch_resource_path(request), &request.patch)
            .await?;
        Ok(())
    }
}

/// Map a non-success status and body to an error
fn status_error(status_code: u16, error_body: &str) -> ArgoApiError {
    let error_message = serde_json::from_str::<ApiErrorResponse>(error_body)
        .map(|e| e.get_message())
        .unwrap_or_else(|_| error_body.to_string());

    match status_code {
        401 => ArgoApiError::Unauthorized,
        403 => ArgoApiError::PermissionDenied(error_message),
        404 => ArgoApiError::NotFound(error_message),
        500..=599 => ArgoApiError::ServerError {
            status: status_code,
            message: error_message,
        },
        _ => ArgoApiError::ApiError {
            status: status_code,
            message: error_message,
        },
    }
}

fn application_path(name: &str, refresh: RefreshMode) -> String {
    match refresh.as_query() {
        Some(mode) => format!("/api/v1/applications/{}?refresh={}", encode(name), mode),
        None => format!("/api/v1/applications/{}", encode(name)),
    }
}

fn managed_resources_path(app_name: &str) -> String {
    format!("/api/v1/applications/{}/managed-resources", encode(app_name))
}

fn patch_resource_path(request: &PatchResourceRequest) -> String {
    let query_params = [
        ("namespace", request.namespace.as_str()),
        ("resourceName", request.resource_name.as_str()),
        ("version", request.version.as_str()),
        ("group", request.group.as_str()),
        ("kind", request.kind.as_str()),
        ("patchType", request.patch_type.as_str()),
    ]
    .iter()
    .map(|(key, value)| format!("{}={}", key, encode(value)))
    .collect::<Vec<_>>();

    format!(
        "/api/v1/applications/{}/resource?{}",
        encode(&request.app_name),
        query_params.join("&")
    )
}
