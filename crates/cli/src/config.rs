//! Process configuration: one YAML document plus `SIG_WELCOME_*` overrides.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;

use anyhow::{ensure, Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use welcome::{RepoConfig, SettingsTable};

pub const ENV_PREFIX: &str = "SIG_WELCOME_";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub gitee: GiteeSection,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Enables the newcomer lookup when present.
    #[serde(default)]
    pub newcomer: Option<NewcomerConfig>,
    #[serde(default)]
    pub repos: Vec<RepoConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub address: SocketAddr,
    #[serde(default)]
    pub webhook_secret: String,
    /// Seconds to wait for in-flight deliveries after a shutdown signal.
    pub drain_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8888)),
            webhook_secret: String::new(),
            drain_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiteeSection {
    pub api_base: String,
    #[serde(default)]
    pub token: String,
    pub timeout_secs: u64,
}

impl Default for GiteeSection {
    fn default() -> Self {
        Self {
            api_base: gitee::DEFAULT_API_BASE.to_string(),
            token: String::new(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive; `RUST_LOG` overrides it.
    pub level: String,
    pub format: LogFormat,
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Json,
            otlp_endpoint: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewcomerConfig {
    pub endpoint: String,
}

impl AppConfig {
    /// Defaults, then `path`, then the environment.
    pub fn load(path: &Path) -> Result<Self> {
        Self::extract(
            Figment::new()
                .merge(Serialized::defaults(Self::default()))
                .merge(Yaml::file(path))
                .merge(Env::prefixed(ENV_PREFIX).split("__")),
        )
        .with_context(|| format!("failed to load configuration from {}", path.display()))
    }

    fn extract(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            !self.gitee.token.trim().is_empty(),
            "gitee.token must be set (or {ENV_PREFIX}GITEE__TOKEN)"
        );
        ensure!(self.gitee.timeout_secs > 0, "gitee.timeout_secs must be positive");
        ensure!(!self.repos.is_empty(), "at least one repos entry is required");
        Ok(())
    }

    /// Validates every repository entry.
    pub fn settings(&self) -> Result<SettingsTable> {
        SettingsTable::from_configs(&self.repos).context("invalid repos entry")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
gitee:
  token: abc
logging:
  format: pretty
newcomer:
  endpoint: https://ipb.osinfra.cn
repos:
  - repos: ["openeuler", "src-openeuler/kernel"]
    excluded_repos: ["openeuler/blog"]
    community_name: openEuler
    command_link: https://example.org/commands
    sig_file_path: "openeuler/community/master:sig/sigs.yaml"
"#;

    fn from_yaml(yaml: &str) -> Result<AppConfig> {
        AppConfig::extract(
            Figment::new()
                .merge(Serialized::defaults(AppConfig::default()))
                .merge(Yaml::string(yaml)),
        )
    }

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config = from_yaml(SAMPLE).unwrap();
        assert_eq!(config.server.address.port(), 8888);
        assert_eq!(config.server.drain_timeout_secs, 30);
        assert_eq!(config.gitee.api_base, gitee::DEFAULT_API_BASE);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(
            config.newcomer.as_ref().map(|n| n.endpoint.as_str()),
            Some("https://ipb.osinfra.cn")
        );
        assert_eq!(config.settings().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_token_rejected() {
        let yaml = SAMPLE.replace("token: abc", "token: \"\"");
        assert!(from_yaml(&yaml).is_err());
    }

    #[test]
    fn test_bad_repo_entry_rejected_by_settings() {
        let yaml = SAMPLE.replace("openeuler/community/master:sig/sigs.yaml", "sigs.yaml");
        let config = from_yaml(&yaml).unwrap();
        assert!(config.settings().is_err());
    }
}
