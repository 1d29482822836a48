//! Configuration for the bridge.

use std::path::Path;
use std::time::Duration;

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;

/// Legacy variable holding the engine URL, honoured for drop-in compatibility.
pub const LEGACY_URL_VAR: &str = "COMFYUI_URL";

/// Main configuration structure for the bridge.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub server: ServerConfig,
    /// Listen address for the http transport.
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the ComfyUI engine lives and how long a single request may take.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_engine_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl EngineConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: default_engine_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Polling behaviour of `wait_for_completion`.
#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    /// Fixed delay between status queries.
    #[serde(default = "default_poll_interval")]
    pub interval_ms: u64,
    /// Deadline used when the caller does not pass one.
    #[serde(default = "default_wait_timeout")]
    pub default_timeout_secs: u64,
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval(),
            default_timeout_secs: default_wait_timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Newline-delimited JSON-RPC on stdin/stdout.
    #[default]
    Stdio,
    /// JSON-RPC over `POST /mcp`.
    Http,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server name reported in `initialize`.
    #[serde(default = "default_server_name")]
    pub name: String,
    /// Client tag attached to submissions when the caller supplies none.
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default)]
    pub transport: Transport,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            client_id: default_client_id(),
            transport: Transport::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when RUST_LOG is unset.
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

// Default values
fn default_engine_url() -> String {
    "http://127.0.0.1:8188".to_string()
}
fn default_request_timeout() -> u64 {
    30
}
fn default_poll_interval() -> u64 {
    2000
}
fn default_wait_timeout() -> u64 {
    300
}
fn default_server_name() -> String {
    "comfyui-dynamic".to_string()
}
fn default_client_id() -> String {
    "claude-agent".to_string()
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8189
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration sources (in order of precedence):
    /// 1. `COMFYUI_URL` (engine base URL only)
    /// 2. Environment variables (COMFY_BRIDGE__SECTION__KEY format)
    /// 3. comfy-bridge.toml file (if present)
    /// 4. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new("comfy-bridge.toml"))
    }

    /// Same as [`Config::load`] with an explicit config file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let config = ConfigLoader::builder()
            .set_default("engine.base_url", default_engine_url())?
            .set_default("engine.request_timeout_secs", default_request_timeout() as i64)?
            .set_default("polling.interval_ms", default_poll_interval() as i64)?
            .set_default("polling.default_timeout_secs", default_wait_timeout() as i64)?
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix("COMFY_BRIDGE")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("engine.base_url", std::env::var(LEGACY_URL_VAR).ok())?
            .build()?;

        let mut config: Config = config.try_deserialize()?;
        config.normalize();
        Ok(config)
    }

    fn normalize(&mut self) {
        let trimmed = self.engine.base_url.trim_end_matches('/').len();
        self.engine.base_url.truncate(trimmed);
    }
}
