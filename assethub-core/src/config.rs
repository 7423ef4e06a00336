//! Configuration loading and management
//!
//! The server reads a single TOML file whose sections mirror the deployment
//! schema: `server`, `log`, `database`, `data`, `https`, `authentication`
//! and `orm`. Every field has a default so a minimal deployment can run
//! from an empty file.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Listener host and port
    #[serde(default)]
    pub server: ServerConfig,

    /// Session log database settings
    #[serde(default)]
    pub log: LogConfig,

    /// Main (asset/ORM/task) database settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Blob storage settings
    #[serde(default)]
    pub data: DataConfig,

    /// TLS termination settings
    #[serde(default)]
    pub https: HttpsConfig,

    /// Authentication settings
    #[serde(default)]
    pub authentication: AuthenticationConfig,

    /// ORM schema descriptor settings
    #[serde(default)]
    pub orm: OrmConfig,
}

/// Listener configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Host to bind
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    8650
}

/// Session log database configuration
#[derive(Debug, Deserialize)]
pub struct LogConfig {
    /// Filename prefix for the per-process log database
    #[serde(default = "default_log_prefix")]
    pub prefix: String,

    /// Diagnostic log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            prefix: default_log_prefix(),
            level: default_log_level(),
        }
    }
}

fn default_log_prefix() -> String {
    "./logs/log_".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Main database configuration
#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver type; only "sqlite" is supported
    #[serde(rename = "type", default = "default_database_type")]
    pub db_type: String,

    /// Database file path
    #[serde(default = "default_database_filename")]
    pub filename: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_type: default_database_type(),
            filename: default_database_filename(),
        }
    }
}

fn default_database_type() -> String {
    "sqlite".to_string()
}

fn default_database_filename() -> String {
    "./assethub.db".to_string()
}

/// Blob storage configuration
#[derive(Debug, Deserialize)]
pub struct DataConfig {
    /// Directory holding entity blob files
    #[serde(default = "default_data_directory")]
    pub directory: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            directory: default_data_directory(),
        }
    }
}

fn default_data_directory() -> PathBuf {
    PathBuf::from("./data/")
}

/// TLS termination configuration
#[derive(Debug, Deserialize, Default)]
pub struct HttpsConfig {
    /// "tls" to terminate TLS, "none" or "" for plain HTTP
    #[serde(rename = "type", default)]
    pub https_type: String,

    /// PEM certificate chain path
    #[serde(default)]
    pub certificate: String,

    /// PEM private key path
    #[serde(rename = "privatekey", default)]
    pub private_key: String,
}

/// A passphrase/salt pair
#[derive(Debug, Deserialize, Default, Clone)]
pub struct CredentialsConfig {
    /// Challenge passphrase
    #[serde(default)]
    pub passphrase: String,

    /// Salt string (hashed before it goes on the wire)
    #[serde(default)]
    pub salt: String,
}

/// Credentials for a single named user
#[derive(Debug, Deserialize, Clone)]
pub struct NamedUserConfig {
    /// User id
    pub id: String,

    /// Challenge passphrase
    #[serde(default)]
    pub passphrase: String,

    /// Salt string
    #[serde(default)]
    pub salt: String,
}

/// Authentication configuration
#[derive(Debug, Deserialize)]
pub struct AuthenticationConfig {
    /// Authentication scheme; only "passphrase" is supported
    #[serde(rename = "type", default = "default_authentication_type")]
    pub auth_type: String,

    /// Lifetime of an accepted session, in seconds
    #[serde(rename = "sessionduration", default = "default_session_duration")]
    pub session_duration: i64,

    /// Fallback credentials for unknown users
    #[serde(default)]
    pub global: CredentialsConfig,

    /// Per-user credential overrides
    #[serde(rename = "nameduser", default)]
    pub named_users: Vec<NamedUserConfig>,
}

impl Default for AuthenticationConfig {
    fn default() -> Self {
        Self {
            auth_type: default_authentication_type(),
            session_duration: default_session_duration(),
            global: CredentialsConfig::default(),
            named_users: Vec::new(),
        }
    }
}

fn default_authentication_type() -> String {
    "passphrase".to_string()
}

fn default_session_duration() -> i64 {
    3600
}

impl AuthenticationConfig {
    /// Resolve the `(passphrase, salt)` pair for a user id.
    ///
    /// A named-user entry wins over the global pair; the last matching
    /// entry applies when the same id is configured twice.
    pub fn credentials_for(&self, user_id: &str) -> (&str, &str) {
        let mut passphrase = self.global.passphrase.as_str();
        let mut salt = self.global.salt.as_str();
        for user in &self.named_users {
            if user.id == user_id {
                passphrase = user.passphrase.as_str();
                salt = user.salt.as_str();
            }
        }
        (passphrase, salt)
    }
}

/// ORM schema descriptor configuration
#[derive(Debug, Deserialize)]
pub struct OrmConfig {
    /// Path to the JSON schema descriptor
    #[serde(rename = "schemafile", default = "default_orm_schema_file")]
    pub schema_file: PathBuf,
}

impl Default for OrmConfig {
    fn default() -> Self {
        Self {
            schema_file: default_orm_schema_file(),
        }
    }
}

fn default_orm_schema_file() -> PathBuf {
    PathBuf::from("./ormschemas.json")
}

impl Config {
    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Returns the `host:port` string the listener binds to
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
