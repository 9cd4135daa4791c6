//! Configuration loading.
//!
//! Settings come from a YAML secrets file, then environment variables, then
//! command-line flags, each overriding the previous. `database.path` and
//! `auth.remember_secret` are required; a missing one stops startup.

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Secrets file used when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = ".project-tracker/secrets.yaml";

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8501;
pub const DEFAULT_REMEMBER_DAYS: u32 = 30;
/// Minimum signup password length when `auth.min_password_len` is unset.
pub const DEFAULT_MIN_PASSWORD_LEN: usize = 6;

const ENV_DB_PATH: &str = "PROJECT_TRACKER_DB_PATH";
const ENV_REMEMBER_SECRET: &str = "PROJECT_TRACKER_REMEMBER_SECRET";
const ENV_PORT: &str = "PROJECT_TRACKER_PORT";

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthConfig {
    /// Key mixed into remember-me tokens.
    pub remember_secret: String,
    /// Lifetime of the remember-me cookies.
    pub remember_days: u32,
    pub min_password_len: usize,
}

impl AuthConfig {
    pub fn remember_max_age_secs(&self) -> u64 {
        u64::from(self.remember_days) * 24 * 60 * 60
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

/// Values from the command line that take precedence over file and environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub database: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

// File layout; every key is optional until validated.

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
    server: RawServer,
    database: RawDatabase,
    auth: RawAuth,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawServer {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawDatabase {
    path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawAuth {
    remember_secret: Option<String>,
    remember_days: Option<u32>,
    min_password_len: Option<usize>,
}

impl Config {
    /// Load from `path` (or the default secrets file), the process environment
    /// and `overrides`.
    pub fn load(path: Option<&Path>, overrides: &Overrides) -> Result<Self, ConfigError> {
        Self::load_with_env(path, overrides, |key| std::env::var(key).ok())
    }

    /// Like [`Config::load`] with a custom environment lookup.
    ///
    /// An explicitly given file must exist; the default file may be absent.
    pub fn load_with_env<F>(
        path: Option<&Path>,
        overrides: &Overrides,
        env: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut raw = match path {
            Some(path) => read_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    read_file(default_path)?
                } else {
                    RawConfig::default()
                }
            }
        };

        apply_env_overrides(&mut raw, env)?;

        if let Some(ref database) = overrides.database {
            raw.database.path = Some(database.clone());
        }
        if let Some(ref host) = overrides.host {
            raw.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.port {
            raw.server.port = Some(port);
        }

        Self::from_raw(raw)
    }

    /// Parse a YAML document and validate it, without environment or overrides.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let path = raw
            .database
            .path
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or(ConfigError::MissingKey("database.path"))?;
        let remember_secret = raw
            .auth
            .remember_secret
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::MissingKey("auth.remember_secret"))?;

        let min_password_len = raw
            .auth
            .min_password_len
            .unwrap_or(DEFAULT_MIN_PASSWORD_LEN);
        if min_password_len == 0 {
            return Err(ConfigError::InvalidValue {
                key: "auth.min_password_len",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            server: ServerConfig {
                host: raw.server.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
                port: raw.server.port.unwrap_or(DEFAULT_PORT),
            },
            database: DatabaseConfig { path },
            auth: AuthConfig {
                remember_secret,
                remember_days: raw.auth.remember_days.unwrap_or(DEFAULT_REMEMBER_DAYS),
                min_password_len,
            },
        })
    }

    /// `host:port` for binding the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Ensure the database directory exists.
    pub fn ensure_db_dir(&self) -> std::io::Result<()> {
        if let Some(parent) = self.database.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

fn read_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn apply_env_overrides<F>(raw: &mut RawConfig, env: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(db_path) = env(ENV_DB_PATH) {
        raw.database.path = Some(PathBuf::from(db_path));
    }

    if let Some(secret) = env(ENV_REMEMBER_SECRET) {
        raw.auth.remember_secret = Some(secret);
    }

    if let Some(port) = env(ENV_PORT) {
        let port = port.parse().map_err(|_| ConfigError::InvalidValue {
            key: ENV_PORT,
            reason: format!("'{}' is not a port number", port),
        })?;
        raw.server.port = Some(port);
    }

    Ok(())
}
