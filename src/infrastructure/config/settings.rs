use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::queue::{DEFAULT_STORAGE_KEY, MAX_RETRIES};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub connectivity: ConnectivityConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Directory holding one JSON file per store key
    #[serde(default = "default_store_dir")]
    pub dir: PathBuf,
    /// Fixed device id; generated and remembered in the store when unset
    #[serde(default)]
    pub device_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    /// Store key holding the serialized queue
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    /// Failed attempts after which an item is evicted
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Window in which queue writes are coalesced (0 = write on every mutation)
    #[serde(default = "default_persist_debounce_ms")]
    pub persist_debounce_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    /// Delay between a became-online edge and the drain it schedules
    #[serde(default = "default_stabilization_delay_ms")]
    pub stabilization_delay_ms: u64,
    /// Per-request timeout applied by the HTTP transport
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivityMode {
    /// Reachability is probed over HTTP
    Probe,
    /// Reachability is set through the API
    Manual,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectivityConfig {
    #[serde(default = "default_connectivity_mode")]
    pub mode: ConnectivityMode,
    #[serde(default = "default_probe_url")]
    pub probe_url: String,
    #[serde(default = "default_probe_interval")]
    pub probe_interval_seconds: u64,
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_seconds: u64,
    /// Connectivity assumed before the first probe (or in manual mode)
    #[serde(default = "default_initially_online")]
    pub initially_online: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8090
}

fn default_store_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

fn default_max_retries() -> u32 {
    MAX_RETRIES
}

fn default_persist_debounce_ms() -> u64 {
    250
}

fn default_stabilization_delay_ms() -> u64 {
    1000
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connectivity_mode() -> ConnectivityMode {
    ConnectivityMode::Probe
}

fn default_probe_url() -> String {
    "https://www.google.com/generate_204".to_string()
}

fn default_probe_interval() -> u64 {
    15
}

fn default_probe_timeout() -> u64 {
    5
}

fn default_initially_online() -> bool {
    true
}

fn default_log_format() -> LogFormat {
    LogFormat::Text
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", i64::from(default_port()))?
            .set_default("queue.storage_key", DEFAULT_STORAGE_KEY)?
            .set_default("queue.max_retries", i64::from(MAX_RETRIES))?
            .set_default("delivery.stabilization_delay_ms", 1000)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // EXPORTQ_SERVER__PORT, EXPORTQ_QUEUE__MAX_RETRIES, EXPORTQ_CONNECTIVITY__MODE, ...
            .add_source(
                Environment::with_prefix("EXPORTQ")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let settings: Self = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the queue cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue.max_retries == 0 {
            return Err(ConfigError::Message(
                "queue.max_retries must be at least 1".into(),
            ));
        }
        if self.queue.storage_key.trim().is_empty() {
            return Err(ConfigError::Message(
                "queue.storage_key must not be empty".into(),
            ));
        }
        Ok(())
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl QueueConfig {
    pub fn persist_debounce(&self) -> Duration {
        Duration::from_millis(self.persist_debounce_ms)
    }
}

impl DeliveryConfig {
    pub fn stabilization_delay(&self) -> Duration {
        Duration::from_millis(self.stabilization_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl ConnectivityConfig {
    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_seconds)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_seconds)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: default_store_dir(),
            device_id: None,
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            storage_key: default_storage_key(),
            max_retries: default_max_retries(),
            persist_debounce_ms: default_persist_debounce_ms(),
        }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            stabilization_delay_ms: default_stabilization_delay_ms(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            mode: default_connectivity_mode(),
            probe_url: default_probe_url(),
            probe_interval_seconds: default_probe_interval(),
            probe_timeout_seconds: default_probe_timeout(),
            initially_online: default_initially_online(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
        }
    }
}
