pub mod argocd;
pub mod types;

use crate::error::ConfigError;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE_NAME: &str = ".cd-guard.toml";

/// Get the global config file path (~/.cd-guard.toml)
pub fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(CONFIG_FILE_NAME))
}

/// Get the local config file path (./.cd-guard.toml)
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE_NAME)
}

/// Default location of the file `argocd login` writes
///
/// `$ARGOCD_CONFIG_DIR/config` when set, else `~/.config/argocd/config`,
/// falling back to the legacy `~/.argocd/config` when only that one exists.
pub fn argocd_config_path() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os("ARGOCD_CONFIG_DIR") {
        return Some(PathBuf::from(dir).join("config"));
    }
    let home = dirs::home_dir()?;
    let xdg = home.join(".config").join("argocd").join("config");
    let legacy = home.join(".argocd").join("config");
    if !xdg.exists() && legacy.exists() {
        Some(legacy)
    } else {
        Some(xdg)
    }
}

/// Load guard settings
///
/// An explicit path must exist and parse. Otherwise checks the local config
/// first, then the global config, then falls back to defaults.
pub fn load_guard_settings(explicit: Option<&Path>) -> Result<types::GuardSettings, ConfigError> {
    if let Some(path) = explicit {
        return read_toml(path);
    }

    let candidates = std::env::current_dir()
        .ok()
        .map(|dir| local_config_path(&dir))
        .into_iter()
        .chain(global_config_path());

    for path in candidates {
        if !path.exists() {
            continue;
        }
        match read_toml(&path) {
            Ok(settings) => {
                debug!("Loaded guard settings from {}", path.display());
                return Ok(settings);
            }
            Err(e) => warn!("Ignoring {}", e),
        }
    }

    Ok(types::GuardSettings::default())
}

/// Load the Argo CD local config
///
/// Returns `None` when the default file does not exist.
pub fn load_argocd_config(
    explicit: Option<&Path>,
) -> Result<Option<argocd::LocalConfig>, ConfigError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match argocd_config_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(None),
        },
    };

    let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    let config = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.clone(),
        message: e.to_string(),
    })?;
    Ok(Some(config))
}

/// Resolve connection settings: overrides, then the current context of the
/// Argo CD local config
pub fn resolve_connection(
    overrides: &types::ConnectionOverrides,
    local: Option<&argocd::LocalConfig>,
) -> Result<types::ConnectionSettings, ConfigError> {
    let context = local.and_then(|config| config.current());

    let server = overrides
        .server
        .clone()
        .filter(|s| !s.is_empty())
        .or_else(|| context.as_ref().map(|c| c.server.clone()))
        .ok_or(ConfigError::MissingServer)?;

    // Context TLS flags only apply to the context's own server
    let context = context.filter(|c| c.server == server || overrides.server.is_none());

    let auth_token = overrides
        .auth_token
        .clone()
        .filter(|t| !t.is_empty())
        .or_else(|| context.as_ref().and_then(|c| c.auth_token.clone()));

    let timeout = (overrides.timeout_secs > 0).then(|| Duration::from_secs(overrides.timeout_secs));

    Ok(types::ConnectionSettings {
        server,
        auth_token,
        plaintext: overrides.plaintext || context.as_ref().is_some_and(|c| c.plaintext),
        insecure: overrides.insecure || context.as_ref().is_some_and(|c| c.insecure),
        server_cert: overrides.server_cert.clone(),
        timeout,
    })
}

fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
