//! Broker address and agent configuration.
//!
//! The broker is located by a URL of the form `scheme://host:port`, e.g.
//! `tcp://localhost:61613`.  It can come from three places:
//!
//! - the `AMQBROKER_URL` environment variable ([`BrokerConfig::from_env`]),
//! - an explicit string ([`BrokerConfig::from_url`]),
//! - a TOML file ([`AgentConfig::load`]):
//!
//! ```toml
//! [broker]
//! host = "mq.internal"
//! port = 61613
//! buffer_capacity = 262144
//! ```
//!
//! # Serde default values
//!
//! Every field carries a `#[serde(default = "...")]`, so a file only needs the
//! keys it wants to change.  An empty file yields the same configuration as
//! [`BrokerConfig::default`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::infrastructure::network::DEFAULT_BUFFER_CAPACITY;

/// Environment variable holding the broker URL.
pub const BROKER_URL_ENV: &str = "AMQBROKER_URL";

/// Broker URL used when [`BROKER_URL_ENV`] is unset.
pub const DEFAULT_BROKER_URL: &str = "tcp://localhost:61613";

/// Error type for configuration parsing and loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The URL has no `scheme:` part.
    #[error("invalid broker URL {0:?}: expected scheme://host:port")]
    InvalidUrl(String),

    /// The port is not a number in `0..=65535`.
    #[error("invalid broker port {0:?}")]
    InvalidPort(String),

    /// A file system I/O error occurred.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Where the broker lives and how large the receive buffer is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BrokerConfig {
    /// URL scheme; informational only, the transport is always TCP.
    #[serde(default = "default_scheme")]
    pub scheme: String,
    /// Host name or IP address.
    #[serde(default = "default_host")]
    pub host: String,
    /// STOMP port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Receive buffer size in bytes; bounds the largest inbound frame.
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentConfig {
    #[serde(default)]
    pub broker: BrokerConfig,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_scheme() -> String {
    "tcp".to_string()
}
fn default_host() -> String {
    "localhost".to_string()
}
fn default_port() -> u16 {
    61613
}
fn default_buffer_capacity() -> usize {
    DEFAULT_BUFFER_CAPACITY
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            scheme: default_scheme(),
            host: default_host(),
            port: default_port(),
            buffer_capacity: default_buffer_capacity(),
        }
    }
}

impl BrokerConfig {
    /// Parses `scheme://host:port`.
    ///
    /// The `//` is optional (`tcp:host:port` is accepted), and a missing port
    /// means the default STOMP port.  An empty string yields the default
    /// configuration.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidUrl`] if there is no scheme or no host, and
    /// [`ConfigError::InvalidPort`] if the port is not a valid number.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use stomp_client::domain::config::BrokerConfig;
    ///
    /// let cfg = BrokerConfig::from_url("tcp://mq.internal:61614").unwrap();
    /// assert_eq!(cfg.host, "mq.internal");
    /// assert_eq!(cfg.port, 61614);
    /// ```
    pub fn from_url(url: &str) -> Result<Self, ConfigError> {
        let url = url.trim();
        if url.is_empty() {
            return Ok(Self::default());
        }

        let (scheme, rest) = url
            .split_once(':')
            .ok_or_else(|| ConfigError::InvalidUrl(url.to_string()))?;
        let rest = rest.strip_prefix("//").unwrap_or(rest);

        let (host, port) = match rest.split_once(':') {
            Some((host, port)) => {
                let port = port
                    .trim_end_matches('/')
                    .parse::<u16>()
                    .map_err(|_| ConfigError::InvalidPort(port.to_string()))?;
                (host, port)
            }
            None => (rest.trim_end_matches('/'), default_port()),
        };

        if scheme.is_empty() || host.is_empty() {
            return Err(ConfigError::InvalidUrl(url.to_string()));
        }

        Ok(Self {
            scheme: scheme.to_string(),
            host: host.to_string(),
            port,
            ..Self::default()
        })
    }

    /// Reads the broker URL from `AMQBROKER_URL`, falling back to
    /// [`DEFAULT_BROKER_URL`].
    ///
    /// # Errors
    ///
    /// Same as [`BrokerConfig::from_url`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = std::env::var(BROKER_URL_ENV).unwrap_or_else(|_| DEFAULT_BROKER_URL.to_string());
        Self::from_url(&url)
    }

    /// `host:port`, as used in log lines and error messages.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl AgentConfig {
    /// Loads the configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Parse`] if the TOML is malformed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── URL parsing ───────────────────────────────────────────────────────────

    #[test]
    fn test_from_url_parses_scheme_host_and_port() {
        // Arrange / Act
        let cfg = BrokerConfig::from_url("tcp://mq.example.com:61614").unwrap();

        // Assert
        assert_eq!(cfg.scheme, "tcp");
        assert_eq!(cfg.host, "mq.example.com");
        assert_eq!(cfg.port, 61614);
        assert_eq!(cfg.buffer_capacity, DEFAULT_BUFFER_CAPACITY);
    }

    #[test]
    fn test_from_url_accepts_missing_slashes() {
        let cfg = BrokerConfig::from_url("tcp:10.0.0.5:7000").unwrap();
        assert_eq!(cfg.host, "10.0.0.5");
        assert_eq!(cfg.port, 7000);
    }

    #[test]
    fn test_from_url_defaults_missing_port() {
        let cfg = BrokerConfig::from_url("stomp://broker").unwrap();
        assert_eq!(cfg.host, "broker");
        assert_eq!(cfg.port, 61613);
    }

    #[test]
    fn test_from_url_empty_is_default() {
        assert_eq!(BrokerConfig::from_url("").unwrap(), BrokerConfig::default());
    }

    #[test]
    fn test_default_url_matches_default_config() {
        assert_eq!(
            BrokerConfig::from_url(DEFAULT_BROKER_URL).unwrap(),
            BrokerConfig::default()
        );
    }

    #[test]
    fn test_from_url_without_scheme_is_invalid() {
        let result = BrokerConfig::from_url("localhost");
        assert!(matches!(result, Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_from_url_with_bad_port_is_invalid_port() {
        let result = BrokerConfig::from_url("tcp://localhost:stomp");
        assert!(matches!(result, Err(ConfigError::InvalidPort(p)) if p == "stomp"));
    }

    #[test]
    fn test_from_url_with_port_out_of_range_is_invalid_port() {
        let result = BrokerConfig::from_url("tcp://localhost:70000");
        assert!(matches!(result, Err(ConfigError::InvalidPort(_))));
    }

    #[test]
    fn test_address_joins_host_and_port() {
        assert_eq!(BrokerConfig::default().address(), "localhost:61613");
    }

    // ── TOML ──────────────────────────────────────────────────────────────────

    #[test]
    fn test_partial_toml_takes_defaults() {
        // Arrange
        let text = "[broker]\nhost = \"mq.internal\"\n";

        // Act
        let cfg: AgentConfig = toml::from_str(text).unwrap();

        // Assert
        assert_eq!(cfg.broker.host, "mq.internal");
        assert_eq!(cfg.broker.port, 61613);
        assert_eq!(cfg.broker.scheme, "tcp");
    }

    #[test]
    fn test_empty_toml_is_default() {
        let cfg: AgentConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, AgentConfig::default());
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let result = AgentConfig::load(Path::new("/nonexistent/stomp-agent.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_load_reads_file() {
        // Arrange
        let path = std::env::temp_dir().join(format!("stomp-agent-{}.toml", std::process::id()));
        std::fs::write(&path, "[broker]\nport = 61999\nbuffer_capacity = 4096\n").unwrap();

        // Act
        let cfg = AgentConfig::load(&path);
        let _ = std::fs::remove_file(&path);

        // Assert
        let cfg = cfg.unwrap();
        assert_eq!(cfg.broker.port, 61999);
        assert_eq!(cfg.broker.buffer_capacity, 4096);
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let result: Result<AgentConfig, ConfigError> =
            toml::from_str::<AgentConfig>("[broker\n").map_err(ConfigError::from);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
