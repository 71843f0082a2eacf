//! TOML-based configuration for the telemetry console.
//!
//! The default location is platform specific:
//! - Windows:  `%APPDATA%\TelemetryConsole\config.toml`
//! - Linux:    `$XDG_CONFIG_HOME/telemetry-console/config.toml` (or `~/.config/...`)
//! - macOS:    `~/Library/Application Support/TelemetryConsole/config.toml`
//!
//! Example:
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 9000
//! connect_timeout_ms = 5000
//!
//! [console]
//! operator_name = "Ana"
//! goodbye_grace_ms = 150
//! log_level = "info"
//! ```
//!
//! Every field has a serde default, so a missing file, a missing section or
//! a missing key all fall back to the values above (with an empty operator
//! name, which means no automatic `HELLO`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::infrastructure::network::ClientConnectionConfig;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level console configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub console: ConsoleConfig,
}

/// Where and how to connect.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bound on the TCP connect phase, in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Optional clamp on inbound line length in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_line_len: Option<usize>,
}

/// Operator console behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsoleConfig {
    /// Sent as `HELLO <name>` right after connecting when non-empty.
    #[serde(default)]
    pub operator_name: String,
    /// Pause between `BYE` and closing the socket, in milliseconds.
    #[serde(default = "default_goodbye_grace_ms")]
    pub goodbye_grace_ms: u64,
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    9000
}
fn default_connect_timeout_ms() -> u64 {
    5000
}
fn default_goodbye_grace_ms() -> u64 {
    150
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            connect_timeout_ms: default_connect_timeout_ms(),
            max_line_len: None,
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            operator_name: String::new(),
            goodbye_grace_ms: default_goodbye_grace_ms(),
            log_level: default_log_level(),
        }
    }
}

impl ClientConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Connection-manager settings derived from this configuration.
    pub fn connection_config(&self) -> ClientConnectionConfig {
        ClientConnectionConfig {
            host: self.server.host.clone(),
            port: self.server.port,
            connect_timeout: Duration::from_millis(self.server.connect_timeout_ms),
            max_line_len: self.server.max_line_len,
            ..ClientConnectionConfig::default()
        }
    }

    pub fn goodbye_grace(&self) -> Duration {
        Duration::from_millis(self.console.goodbye_grace_ms)
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the full path to the default config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    platform_config_dir()
        .map(|dir| dir.join("config.toml"))
        .ok_or(ConfigError::NoPlatformConfigDir)
}

/// Loads the config from `path`, returning defaults if the file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<ClientConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => ClientConfig::from_toml_str(&content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ClientConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(path: &Path, config: &ClientConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("TelemetryConsole"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("TelemetryConsole")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("telemetry-console"))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config_path(tag: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("telemetry-console-test-{tag}-{}", uuid::Uuid::new_v4()))
            .join("config.toml")
    }

    #[test]
    fn test_default_config_values() {
        let cfg = ClientConfig::default();

        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.server.connect_timeout_ms, 5000);
        assert_eq!(cfg.console.goodbye_grace_ms, 150);
        assert_eq!(cfg.console.log_level, "info");
        assert!(cfg.console.operator_name.is_empty());
    }

    #[test]
    fn test_empty_toml_yields_defaults() {
        let cfg = ClientConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, ClientConfig::default());
    }

    #[test]
    fn test_partial_toml_fills_missing_fields() {
        let cfg = ClientConfig::from_toml_str(
            r#"
            [server]
            host = "telemetry.local"

            [console]
            operator_name = "Ana"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.server.host, "telemetry.local");
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.console.operator_name, "Ana");
        assert_eq!(cfg.console.goodbye_grace_ms, 150);
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let result = ClientConfig::from_toml_str("[server\nport = ");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_connection_config_conversion() {
        let mut cfg = ClientConfig::default();
        cfg.server.port = 9100;
        cfg.server.connect_timeout_ms = 250;
        cfg.server.max_line_len = Some(1024);

        let conn = cfg.connection_config();

        assert_eq!(conn.port, 9100);
        assert_eq!(conn.connect_timeout, Duration::from_millis(250));
        assert_eq!(conn.max_line_len, Some(1024));
        assert_eq!(cfg.goodbye_grace(), Duration::from_millis(150));
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let path = temp_config_path("missing");

        let cfg = load_config_from(&path).unwrap();

        assert_eq!(cfg, ClientConfig::default());
    }

    #[test]
    fn test_save_then_load_preserves_values() {
        let path = temp_config_path("save");
        let mut cfg = ClientConfig::default();
        cfg.server.host = "10.0.0.5".to_string();
        cfg.console.operator_name = "Ana".to_string();

        save_config_to(&path, &cfg).unwrap();
        let loaded = load_config_from(&path).unwrap();

        assert_eq!(loaded, cfg);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
