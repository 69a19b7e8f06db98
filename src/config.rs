use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 5432;
const DEFAULT_USER: &str = "user";
const DEFAULT_DATABASE: &str = "football.sqlite";

/// How a write behaves when the target table already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    Fail,
    #[default]
    Replace,
    Append,
}

impl WriteMode {
    pub fn as_str(self) -> &'static str {
        match self {
            WriteMode::Fail => "fail",
            WriteMode::Replace => "replace",
            WriteMode::Append => "append",
        }
    }
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WriteMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" => Ok(WriteMode::Fail),
            "replace" => Ok(WriteMode::Replace),
            "append" => Ok(WriteMode::Append),
            _ => Err(ConfigError::InvalidWriteMode(s.to_string())),
        }
    }
}

/// Connection settings for the persistence sink.
///
/// The SQLite sink treats `database` as the database file path; host, port and
/// credentials are kept for remote sinks and only reported in summaries.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct SinkConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    #[serde(default)]
    pub password: String,
    pub database: String,
    #[serde(default)]
    pub write_mode: WriteMode,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            user: DEFAULT_USER.to_string(),
            password: String::new(),
            database: DEFAULT_DATABASE.to_string(),
            write_mode: WriteMode::default(),
        }
    }
}

impl SinkConfig {
    /// Load `.env.local` / `.env` if present, then read settings from the
    /// process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Settings are looked up by field name (`host`, `port`, ...) and then by
    /// the prefixed upper-case form (`DB_HOST`, ...). Unset fields keep their
    /// defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            lookup(name)
                .or_else(|| lookup(&format!("DB_{}", name.to_ascii_uppercase())))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::default();
        if let Some(host) = get("host") {
            config.host = host;
        }
        if let Some(port) = get("port") {
            config.port = port
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(port.clone()))?;
        }
        if let Some(user) = get("user") {
            config.user = user;
        }
        if let Some(password) = get("password") {
            config.password = password;
        }
        if let Some(database) = get("database") {
            config.database = database;
        }
        if let Some(mode) = get("write_mode") {
            config.write_mode = mode.parse()?;
        }
        Ok(config)
    }

    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.database)
    }

    /// One-line description safe to log.
    pub fn summary(&self) -> String {
        format!(
            "{}@{}:{}/{} (mode={})",
            self.user, self.host, self.port, self.database, self.write_mode
        )
    }
}

impl fmt::Debug for SinkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("write_mode", &self.write_mode)
            .finish()
    }
}
