use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "config.toml";
pub const DEFAULT_MYSQL_PORT: u16 = 3306;

/// Connections older than this are recycled by the pool.
pub const CONNECTION_MAX_LIFETIME: Duration = Duration::from_secs(3 * 60);
pub const POOL_MAX_OPEN: usize = 1;
pub const POOL_MAX_IDLE: usize = 1;

const DEFAULT_LOG_FILE: &str = "warden.log";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Tcp,
    Unix,
}

impl Transport {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "tcp" => Some(Self::Tcp),
            "unix" => Some(Self::Unix),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config file at {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}

#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct DatabaseConfig {
    #[serde(rename = "Username")]
    pub username: String,
    #[serde(rename = "Password")]
    pub password: String,
    #[serde(rename = "Protocol")]
    pub protocol: String,
    pub database_url: String,
    pub database_name: String,
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_file() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_FILE)
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("username", &self.username)
            .field("password", &"***")
            .field("protocol", &self.protocol)
            .field("database_url", &self.database_url)
            .field("database_name", &self.database_name)
            .field("log_file", &self.log_file)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl DatabaseConfig {
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load_from_path(DEFAULT_CONFIG_FILE)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        config
            .validate()
            .map_err(|reason| ConfigError::Invalid {
                path: path.to_path_buf(),
                reason,
            })?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if Transport::parse(&self.protocol).is_none() {
            return Err(format!(
                "unsupported Protocol `{}` (expected `tcp` or `unix`)",
                self.protocol
            ));
        }
        if self.database_url.trim().is_empty() {
            return Err("database_url cannot be empty".to_string());
        }
        if self.database_name.trim().is_empty() {
            return Err("database_name cannot be empty".to_string());
        }
        Ok(())
    }

    /// Falls back to TCP when the protocol was never validated.
    #[must_use]
    pub fn transport(&self) -> Transport {
        Transport::parse(&self.protocol).unwrap_or(Transport::Tcp)
    }

    /// Splits `database_url` into host and port for TCP connections.
    #[must_use]
    pub fn tcp_endpoint(&self) -> (String, u16) {
        let raw = self.database_url.trim();
        if let Some(rest) = raw.strip_prefix('[') {
            // [v6-address]:port
            if let Some((host, tail)) = rest.split_once(']') {
                let port = tail
                    .strip_prefix(':')
                    .and_then(|port| port.parse::<u16>().ok())
                    .unwrap_or(DEFAULT_MYSQL_PORT);
                return (host.to_string(), port);
            }
        }

        match raw.rsplit_once(':') {
            Some((host, port)) if !host.contains(':') => match port.parse::<u16>() {
                Ok(port) => (host.to_string(), port),
                Err(_) => (raw.to_string(), DEFAULT_MYSQL_PORT),
            },
            _ => (raw.to_string(), DEFAULT_MYSQL_PORT),
        }
    }

    #[must_use]
    pub fn dsn(&self) -> String {
        format!(
            "{}:{}@{}({})/{}",
            self.username, self.password, self.protocol, self.database_url, self.database_name
        )
    }

    #[must_use]
    pub fn redacted_dsn(&self) -> String {
        format!(
            "{}:***@{}({})/{}",
            self.username, self.protocol, self.database_url, self.database_name
        )
    }
}
