//! Argo CD local config (`argocd login` writes it).

use serde::Deserialize;

/// Subset of the file `argocd login` maintains.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LocalConfig {
    #[serde(default)]
    pub current_context: String,
    #[serde(default)]
    pub contexts: Vec<ContextRef>,
    #[serde(default)]
    pub servers: Vec<Server>,
    #[serde(default)]
    pub users: Vec<User>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContextRef {
    pub name: String,
    #[serde(default)]
    pub server: String,
    #[serde(default)]
    pub user: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Server {
    pub server: String,
    #[serde(default)]
    pub insecure: bool,
    #[serde(default)]
    pub plain_text: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct User {
    pub name: String,
    #[serde(default)]
    pub auth_token: Option<String>,
}

/// Server and user of the current context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentContext {
    pub server: String,
    pub auth_token: Option<String>,
    pub insecure: bool,
    pub plaintext: bool,
}

impl LocalConfig {
    /// Resolve the current context; `None` if it is unset or dangling.
    pub fn current(&self) -> Option<CurrentContext> {
        let context = self
            .contexts
            .iter()
            .find(|c| c.name == self.current_context)?;
        let server = self.servers.iter().find(|s| s.server == context.server)?;
        let auth_token = self
            .users
            .iter()
            .find(|u| u.name == context.user)
            .and_then(|u| u.auth_token.clone());

        Some(CurrentContext {
            server: server.server.clone(),
            auth_token,
            insecure: server.insecure,
            plaintext: server.plain_text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
contexts:
- name: prod
  server: argocd.example.com
  user: prod-user
- name: dev
  server: localhost:8080
  user: dev-user
current-context: dev
prompts-enabled: false
servers:
- grpc-web-root-path: ""
  server: argocd.example.com
- server: localhost:8080
  insecure: true
  plain-text: true
users:
- auth-token: prod-token
  name: prod-user
- auth-token: dev-token
  name: dev-user
"#;

    #[test]
    fn test_current_context() {
        let config: LocalConfig = serde_yaml::from_str(CONFIG).unwrap();
        assert_eq!(
            config.current(),
            Some(CurrentContext {
                server: "localhost:8080".to_string(),
                auth_token: Some("dev-token".to_string()),
                insecure: true,
                plaintext: true,
            })
        );
    }

    #[test]
    fn test_dangling_context() {
        let mut config: LocalConfig = serde_yaml::from_str(CONFIG).unwrap();
        config.current_context = "staging".to_string();
        assert_eq!(config.current(), None);
    }

    #[test]
    fn test_empty_config() {
        let config: LocalConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.current(), None);
    }
}
