//! Server configuration: TOML file, then environment overrides
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:3030"
//! cors_permissive = false
//!
//! [database]
//! url = "postgres://localhost/pipetgo"
//! max_connections = 10
//!
//! [auth]
//! session_secret = "change-me"
//! session_ttl_days = 30
//! allow_legacy_email_login = true
//!
//! [rate_limit]
//! enabled = true
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::auth::session::DEFAULT_SESSION_TTL_DAYS;
use crate::db::pool::DEFAULT_MAX_CONNECTIONS;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid TOML in {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: {value}")]
    InvalidEnv { key: &'static str, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipetgoConfig {
    pub server: ServerSection,
    pub database: DatabaseSection,
    pub auth: AuthSection,
    pub rate_limit: RateLimitSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: SocketAddr,
    /// Allow any CORS origin (default: localhost only)
    pub cors_permissive: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3030)),
            cors_permissive: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    /// HMAC key for session tokens; a random one is generated when unset
    pub session_secret: Option<String>,
    pub session_ttl_days: i64,
    /// Accounts created before passwords existed may sign in by email alone
    pub allow_legacy_email_login: bool,
}

impl std::fmt::Debug for AuthSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSection")
            .field("session_secret", &self.session_secret.as_ref().map(|_| "<redacted>"))
            .field("session_ttl_days", &self.session_ttl_days)
            .field("allow_legacy_email_login", &self.allow_legacy_email_login)
            .finish()
    }
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            session_secret: None,
            session_ttl_days: DEFAULT_SESSION_TTL_DAYS,
            allow_legacy_email_login: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSection {
    pub enabled: bool,
}

impl Default for RateLimitSection {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl PipetgoConfig {
    /// Load an optional TOML file, then apply process environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Override fields from `DATABASE_URL`, `PIPETGO_BIND`,
    /// `PIPETGO_SESSION_SECRET` and `PIPETGO_RATE_LIMIT`.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty("DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Some(bind) = non_empty("PIPETGO_BIND") {
            self.server.bind = bind.parse().map_err(|_| ConfigError::InvalidEnv {
                key: "PIPETGO_BIND",
                value: bind.clone(),
            })?;
        }
        if let Some(secret) = non_empty("PIPETGO_SESSION_SECRET") {
            self.auth.session_secret = Some(secret);
        }
        if let Some(flag) = non_empty("PIPETGO_RATE_LIMIT") {
            self.rate_limit.enabled = match flag.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "on" | "yes" => true,
                "0" | "false" | "off" | "no" => false,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        key: "PIPETGO_RATE_LIMIT",
                        value: flag,
                    })
                }
            };
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults() {
        let config = PipetgoConfig::default();
        assert_eq!(config.server.bind.port(), 3030);
        assert!(!config.server.cors_permissive);
        assert_eq!(config.auth.session_ttl_days, 30);
        assert!(config.auth.allow_legacy_email_login);
        assert!(config.rate_limit.enabled);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = PipetgoConfig::from_toml(
            r#"
            [server]
            bind = "0.0.0.0:8080"

            [rate_limit]
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(config.server.bind.port(), 8080);
        assert!(!config.rate_limit.enabled);
        assert_eq!(config.database.max_connections, 10);
    }

    #[test]
    fn env_overrides_file() {
        let mut config = PipetgoConfig::default();
        let env: HashMap<&str, &str> = [
            ("DATABASE_URL", "postgres://db/pipetgo"),
            ("PIPETGO_BIND", "127.0.0.1:9000"),
            ("PIPETGO_RATE_LIMIT", "off"),
            ("PIPETGO_SESSION_SECRET", ""),
        ]
        .into_iter()
        .collect();

        config
            .apply_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.database.url.as_deref(), Some("postgres://db/pipetgo"));
        assert_eq!(config.server.bind.port(), 9000);
        assert!(!config.rate_limit.enabled);
        // blank values are ignored
        assert!(config.auth.session_secret.is_none());
    }

    #[test]
    fn bad_env_value() {
        let mut config = PipetgoConfig::default();
        let err = config
            .apply_env(|k| (k == "PIPETGO_BIND").then(|| "nope".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { key: "PIPETGO_BIND", .. }));
    }

    #[test]
    fn reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[auth]\nsession_ttl_days = 7").unwrap();
        let config = PipetgoConfig::from_file(file.path()).unwrap();
        assert_eq!(config.auth.session_ttl_days, 7);
    }

    #[test]
    fn secret_is_redacted_in_debug() {
        let mut config = PipetgoConfig::default();
        config.auth.session_secret = Some("hunter2".into());
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
