use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// HTTP listener settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Streaming relay settings
    #[serde(default)]
    pub relay: RelayConfig,

    /// Hosted backend credentials and endpoints
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Translation record storage
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// HTTP listener configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    // @field: Interface to bind
    #[serde(default = "default_host")]
    pub host: String,

    // @field: TCP port
    #[serde(default = "default_port")]
    pub port: u16,

    // @field: Answer CORS preflights from any origin
    #[serde(default)]
    pub allow_any_origin: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allow_any_origin: false,
        }
    }
}

/// Streaming relay configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RelayConfig {
    // @field: Longest accepted input, in characters
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,

    // @field: Seconds without a backend event before the stream fails (0 disables)
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    // @field: User id recorded when the caller supplies none
    #[serde(default = "default_user_id")]
    pub default_user_id: String,
}

impl RelayConfig {
    /// Idle timeout as a duration, `None` when disabled
    pub fn idle_timeout(&self) -> Option<Duration> {
        if self.idle_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.idle_timeout_secs))
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_input_chars: default_max_input_chars(),
            idle_timeout_secs: default_idle_timeout_secs(),
            default_user_id: default_user_id(),
        }
    }
}

/// Settings for one hosted backend
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BackendConfig {
    // @field: API key or token
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: API base URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Connect timeout seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl BackendConfig {
    // @param endpoint: API base URL
    // @returns: Backend config without credentials
    pub fn new(endpoint: &str) -> Self {
        Self {
            api_key: String::new(),
            endpoint: endpoint.to_string(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }

    /// Whether an API key is configured
    pub fn has_credentials(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

/// Hosted backend configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProvidersConfig {
    /// Chat completion backend
    #[serde(default = "default_openai_config")]
    pub openai: BackendConfig,

    /// Raw completion backend
    #[serde(default = "default_replicate_config")]
    pub replicate: BackendConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            openai: default_openai_config(),
            replicate: default_replicate_config(),
        }
    }
}

/// Database configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct DatabaseConfig {
    // @field: SQLite file path, empty for the platform data directory
    #[serde(default = "String::new")]
    pub path: String,
}

impl DatabaseConfig {
    /// Explicit database path, if one is configured
    pub fn custom_path(&self) -> Option<PathBuf> {
        let trimmed = self.path.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(PathBuf::from(trimmed))
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Matching `log` filter
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Environment variable holding the chat completion API key
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Environment variable holding the raw completion API token
pub const REPLICATE_API_KEY_ENV: &str = "REPLICATE_API_KEY";

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_max_input_chars() -> usize {
    8000 // roughly 2000 tokens
}

fn default_idle_timeout_secs() -> u64 {
    120
}

fn default_user_id() -> String {
    "anonymous".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_openai_config() -> BackendConfig {
    BackendConfig::new(crate::providers::openai::DEFAULT_ENDPOINT)
}

fn default_replicate_config() -> BackendConfig {
    BackendConfig::new(crate::providers::replicate::DEFAULT_ENDPOINT)
}

impl Config {
    /// Load the configuration file, creating it with defaults when missing
    pub fn load_or_create<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        if config_path.exists() {
            let file = File::open(config_path)
                .with_context(|| format!("Failed to open config file: {}", config_path.display()))?;
            let reader = BufReader::new(file);
            let config: Config = serde_json::from_reader(reader)
                .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
            Ok(config)
        } else {
            warn!("Config file not found at '{}', creating default config.", config_path.display());
            let config = Config::default();

            let config_json = serde_json::to_string_pretty(&config)
                .context("Failed to serialize default config to JSON")?;
            std::fs::write(config_path, config_json)
                .with_context(|| format!("Failed to write default config to file: {}", config_path.display()))?;

            Ok(config)
        }
    }

    /// Replace credentials with non-empty values from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    /// Replace credentials with non-empty values returned by `lookup`
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(key) = non_empty(OPENAI_API_KEY_ENV) {
            self.providers.openai.api_key = key;
        }
        if let Some(key) = non_empty(REPLICATE_API_KEY_ENV) {
            self.providers.replicate.api_key = key;
        }
    }

    /// Validate the configuration for consistency and required values
    ///
    /// Missing credentials only produce a warning: models behind that
    /// backend are rejected at request time.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow!("Server port must be greater than 0"));
        }

        if self.relay.max_input_chars == 0 {
            return Err(anyhow!("relay.max_input_chars must be greater than 0"));
        }

        for (name, backend) in [("openai", &self.providers.openai), ("replicate", &self.providers.replicate)] {
            if !backend.endpoint.is_empty() {
                Url::parse(&backend.endpoint)
                    .with_context(|| format!("Invalid endpoint URL for {}: {}", name, backend.endpoint))?;
            }
            if !backend.has_credentials() {
                warn!("No API key configured for {}; its models will be unavailable", name);
            }
        }

        Ok(())
    }
}
