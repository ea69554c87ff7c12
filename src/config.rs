use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::logger::Level;

/// Top-level configuration, normally read from YAML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Reactor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port for both listeners. 0 picks an ephemeral port.
    pub port: u16,
    /// Capacity of the connection table.
    pub max_connections: usize,
    /// Readiness-wait timeout; bounds how long `stop` waits for the loop.
    pub poll_interval_ms: u16,
    /// Size of the fixed receive buffer.
    pub recv_buffer_size: usize,
    pub backlog: i32,
    /// Upper bound on a single blocking response write. 0 disables it.
    pub write_timeout_ms: u64,
    /// Attempt an IPv6 listener next to the IPv4 one.
    pub ipv6: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            max_connections: 10,
            poll_interval_ms: 50,
            recv_buffer_size: 1024,
            backlog: 5,
            write_timeout_ms: 5000,
            ipv6: true,
        }
    }
}

impl ServerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(u64::from(self.poll_interval_ms))
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        (self.write_timeout_ms > 0).then(|| Duration::from_millis(self.write_timeout_ms))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: Level,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: Level::Info }
    }
}

impl Config {
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(yaml).context("invalid configuration")
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Reads `HTTPD_CONFIG` if set, then applies `PORT` and `LOG_LEVEL`.
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var("HTTPD_CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };

        if let Ok(port) = std::env::var("PORT") {
            cfg.server.port = port
                .parse()
                .with_context(|| format!("invalid PORT `{}`", port))?;
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            cfg.logging.level = level.parse()?;
        }

        Ok(cfg)
    }
}
