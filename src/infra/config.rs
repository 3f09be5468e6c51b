//! Configuration loading from TOML files
//!
//! The binaries pick the file with `--config <path>`, falling back to the
//! `CONFIG_FILE` environment variable and then `config/dev.toml`.
//!
//! Every section and key is optional; anything missing takes its default.

use crate::services::bookings::BookingField;
use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Jsonl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Largest accepted request body
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_backend")]
    pub backend: StoreBackend,
    /// File path for the JSONL backend
    #[serde(default = "default_store_file")]
    pub file: String,
}

fn default_store_backend() -> StoreBackend {
    StoreBackend::Memory
}

fn default_store_file() -> String {
    "data/bookings.jsonl".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { backend: default_store_backend(), file: default_store_file() }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct BookingsConfig {
    /// Fields a booking must carry to be stored (none by default)
    #[serde(default)]
    pub required_fields: Vec<BookingField>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackingConfig {
    /// Artificial delay before the fixture answers
    #[serde(default = "default_tracking_latency_ms")]
    pub latency_ms: u64,
}

fn default_tracking_latency_ms() -> u64 {
    1500
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self { latency_ms: default_tracking_latency_ms() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_interval")]
    pub interval_secs: u64,
}

fn default_metrics_interval() -> u64 {
    60
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { format: default_log_format() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the booking server, used by the terminal front-end
    #[serde(default = "default_client_base_url")]
    pub base_url: String,
    #[serde(default = "default_client_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_client_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_client_timeout_ms() -> u64 {
    5000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { base_url: default_client_base_url(), timeout_ms: default_client_timeout_ms() }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub bookings: BookingsConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    bind_address: String,
    port: u16,
    max_body_bytes: usize,
    store_backend: StoreBackend,
    store_file: String,
    required_fields: Vec<BookingField>,
    tracking_latency_ms: u64,
    metrics_interval_secs: u64,
    log_format: LogFormat,
    client_base_url: String,
    client_timeout_ms: u64,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default".to_string())
    }
}

impl Config {
    fn from_toml(toml_config: TomlConfig, config_file: String) -> Self {
        Self {
            bind_address: toml_config.server.bind_address,
            port: toml_config.server.port,
            max_body_bytes: toml_config.server.max_body_bytes,
            store_backend: toml_config.store.backend,
            store_file: toml_config.store.file,
            required_fields: toml_config.bookings.required_fields,
            tracking_latency_ms: toml_config.tracking.latency_ms,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            log_format: toml_config.logging.format,
            client_base_url: toml_config.client.base_url,
            client_timeout_ms: toml_config.client.timeout_ms,
            config_file,
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self::from_toml(toml_config, path.display().to_string()))
    }

    /// Load configuration from a path, falling back to defaults on error
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {:#}. Using defaults.", e);
                Self::default()
            }
        }
    }

    // Getters for all config fields
    pub fn bind_address(&self) -> &str {
        &self.bind_address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    pub fn store_backend(&self) -> StoreBackend {
        self.store_backend
    }

    pub fn store_file(&self) -> &str {
        &self.store_file
    }

    pub fn required_fields(&self) -> &[BookingField] {
        &self.required_fields
    }

    pub fn tracking_latency_ms(&self) -> u64 {
        self.tracking_latency_ms
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    pub fn client_base_url(&self) -> &str {
        &self.client_base_url
    }

    pub fn client_timeout_ms(&self) -> u64 {
        self.client_timeout_ms
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.bind_address(), "0.0.0.0");
        assert_eq!(config.port(), 3000);
        assert_eq!(config.max_body_bytes(), 65536);
        assert_eq!(config.store_backend(), StoreBackend::Memory);
        assert_eq!(config.store_file(), "data/bookings.jsonl");
        assert!(config.required_fields().is_empty());
        assert_eq!(config.tracking_latency_ms(), 1500);
        assert_eq!(config.log_format(), LogFormat::Pretty);
        assert_eq!(config.client_base_url(), "http://localhost:3000");
        assert_eq!(config.config_file(), "default");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let toml_config: TomlConfig = toml::from_str(
            r#"
[server]
port = 8080

[bookings]
required_fields = ["name", "email"]
"#,
        )
        .unwrap();
        let config = Config::from_toml(toml_config, "inline".to_string());
        assert_eq!(config.port(), 8080);
        assert_eq!(config.bind_address(), "0.0.0.0");
        assert_eq!(config.required_fields(), &[BookingField::Name, BookingField::Email]);
        assert_eq!(config.tracking_latency_ms(), 1500);
    }

    #[test]
    fn test_unknown_required_field_is_rejected() {
        let result: Result<TomlConfig, _> =
            toml::from_str("[bookings]\nrequired_fields = [\"shoe_size\"]\n");
        assert!(result.is_err());
    }
}
