//! Configuration for services built with sprig.

use std::net::SocketAddr;

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;

use crate::app::Options;

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Passed untouched to the application at activation.
    #[serde(default)]
    pub app: Options,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
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

impl ServerConfig {
    pub fn addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ConfigError::Message(format!("invalid listen address: {}", e)))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from `sprig.toml` and environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("sprig", false)
    }

    /// Load configuration from `path` and environment variables.
    ///
    /// Configuration sources (in order of precedence):
    /// 1. Environment variables (SPRIG__SECTION__KEY format)
    /// 2. The config file (if present, or always when `required`)
    /// 3. Built-in defaults
    pub fn load_from(path: &str, required: bool) -> Result<Self, ConfigError> {
        let config = ConfigLoader::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port() as i64)?
            .set_default("logging.level", default_level())?
            .add_source(File::with_name(path).required(required))
            .add_source(
                Environment::with_prefix("SPRIG")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
