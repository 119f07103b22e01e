use crate::formatter::OutputFormat;
use crate::guard::GuardKind;
use crate::platform::api::RefreshMode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Guard settings read from `.cd-guard.toml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardSettings {
    /// Refresh requested from the API server before reading resources
    pub refresh: RefreshMode,
    /// Guards run by `all`, in order
    pub guards: Vec<GuardKind>,
    /// Never submit patches
    pub dry_run: bool,
    /// Report format
    pub output: OutputFormat,
}

impl Default for GuardSettings {
    fn default() -> Self {
        Self {
            refresh: RefreshMode::Normal,
            guards: GuardKind::ALL.to_vec(),
            dry_run: false,
            output: OutputFormat::Plain,
        }
    }
}

/// Connection values given on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConnectionOverrides {
    pub server: Option<String>,
    pub auth_token: Option<String>,
    pub insecure: bool,
    pub plaintext: bool,
    /// PEM file with the server's certificate authority
    pub server_cert: Option<PathBuf>,
    /// Per-request timeout in seconds; 0 disables it
    pub timeout_secs: u64,
}

/// Fully resolved settings for talking to the Argo CD API server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// `host[:port]`, optionally with a scheme
    pub server: String,
    pub auth_token: Option<String>,
    pub plaintext: bool,
    /// Skip TLS certificate verification
    pub insecure: bool,
    pub server_cert: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

impl ConnectionSettings {
    /// Base URL of the API server
    pub fn server_url(&self) -> String {
        let server = self.server.trim_end_matches('/');
        if server.starts_with("http://") || server.starts_with("https://") {
            return server.to_string();
        }
        let scheme = if self.plaintext { "http" } else { "https" };
        format!("{}://{}", scheme, server)
    }
}
