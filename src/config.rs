//! Configuration management for StarChain

use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_api_port(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LoggingConfig {
    pub fn tracing_level(&self) -> Result<tracing::Level, Box<dyn std::error::Error>> {
        self.level
            .parse::<tracing::Level>()
            .map_err(|_| format!("logging.level '{}' is not a valid level", self.level).into())
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Parse and validate configuration text.
pub fn parse_config(config_str: &str) -> Result<Config, Box<dyn std::error::Error>> {
    let config: Config = toml::from_str(config_str)?;

    if config.api.host.is_empty() {
        return Err("api.host must not be empty".into());
    }
    config.logging.tracing_level()?;

    Ok(config)
}

/// Load configuration from `path`, falling back to defaults when the file is
/// absent. The `PORT` environment variable overrides the API port.
pub fn load_config(path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    let config_str = fs::read_to_string(path).unwrap_or_default();
    let mut config = if config_str.trim().is_empty() {
        Config::default()
    } else {
        parse_config(&config_str)?
    };

    if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
        config.api.port = port;
    }

    Ok(config)
}
