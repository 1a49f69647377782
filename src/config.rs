//! Configuration management for pocketchat
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{PocketchatError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Provider types understood by [`crate::providers::create_provider`]
pub const PROVIDER_TYPES: [&str; 2] = ["data_stream", "ollama"];

/// Main configuration structure for pocketchat
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Chat completion provider settings
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Local history storage settings
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Provider configuration
///
/// Specifies which chat endpoint to stream replies from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Type of provider to use (`data_stream` or `ollama`)
    #[serde(rename = "type", default = "default_provider_type")]
    pub provider_type: String,

    /// Request timeout covering the whole streamed reply (seconds)
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Chat API speaking the line-oriented data stream protocol
    #[serde(default)]
    pub data_stream: DataStreamConfig,

    /// Ollama configuration
    #[serde(default)]
    pub ollama: OllamaConfig,
}

fn default_provider_type() -> String {
    "data_stream".to_string()
}

fn default_timeout() -> u64 {
    120
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: default_provider_type(),
            timeout_seconds: default_timeout(),
            data_stream: DataStreamConfig::default(),
            ollama: OllamaConfig::default(),
        }
    }
}

/// Data stream chat API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataStreamConfig {
    /// Origin of the chat API server
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path of the chat endpoint on that server
    #[serde(default = "default_api_path")]
    pub api_path: String,
}

fn default_base_url() -> String {
    "http://localhost:8081".to_string()
}

fn default_api_path() -> String {
    "/api/chat".to_string()
}

impl Default for DataStreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_path: default_api_path(),
        }
    }
}

impl DataStreamConfig {
    /// Full chat endpoint URL
    ///
    /// # Examples
    ///
    /// ```
    /// use pocketchat::config::DataStreamConfig;
    ///
    /// let config = DataStreamConfig {
    ///     base_url: "https://chat.example.com/app/".to_string(),
    ///     api_path: "/api/chat".to_string(),
    /// };
    /// assert_eq!(
    ///     config.endpoint().unwrap().as_str(),
    ///     "https://chat.example.com/app/api/chat"
    /// );
    /// ```
    pub fn endpoint(&self) -> Result<Url> {
        let base = self.base_url.trim_end_matches('/');
        let path = self.api_path.trim_start_matches('/');
        Url::parse(&format!("{}/{}", base, path)).map_err(|e| {
            PocketchatError::Config(format!("Invalid chat endpoint {}: {}", self.base_url, e))
                .into()
        })
    }
}

/// Ollama provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Ollama server host
    #[serde(default = "default_ollama_host")]
    pub host: String,

    /// Model to use for Ollama
    #[serde(default = "default_ollama_model")]
    pub model: String,
}

fn default_ollama_host() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2:latest".to_string()
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: default_ollama_host(),
            model: default_ollama_model(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory of the history database; platform data dir when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| PocketchatError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| PocketchatError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(provider_type) = std::env::var("POCKETCHAT_PROVIDER") {
            self.provider.provider_type = provider_type;
        }

        if let Ok(base_url) = std::env::var("POCKETCHAT_API_BASE") {
            self.provider.data_stream.base_url = base_url;
        }

        if let Ok(api_path) = std::env::var("POCKETCHAT_API_PATH") {
            self.provider.data_stream.api_path = api_path;
        }

        if let Ok(ollama_host) = std::env::var("POCKETCHAT_OLLAMA_HOST") {
            self.provider.ollama.host = ollama_host;
        }

        if let Ok(ollama_model) = std::env::var("POCKETCHAT_OLLAMA_MODEL") {
            self.provider.ollama.model = ollama_model;
        }

        if let Ok(timeout) = std::env::var("POCKETCHAT_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.provider.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid POCKETCHAT_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(store_path) = std::env::var(crate::storage::sled_store::STORE_PATH_ENV) {
            self.storage.path = Some(PathBuf::from(store_path));
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }

        if let Some(path) = &cli.storage_path {
            tracing::debug!("Using storage path override from CLI: {}", path.display());
            self.storage.path = Some(path.clone());
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `PocketchatError::Config` describing the first invalid setting
    pub fn validate(&self) -> Result<()> {
        if !PROVIDER_TYPES.contains(&self.provider.provider_type.as_str()) {
            return Err(PocketchatError::Config(format!(
                "Invalid provider type: {}. Must be one of: {}",
                self.provider.provider_type,
                PROVIDER_TYPES.join(", ")
            ))
            .into());
        }

        if self.provider.timeout_seconds == 0 {
            return Err(PocketchatError::Config(
                "provider.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        match self.provider.provider_type.as_str() {
            "data_stream" => {
                self.provider.data_stream.endpoint()?;
            }
            "ollama" => {
                Url::parse(&self.provider.ollama.host).map_err(|e| {
                    PocketchatError::Config(format!(
                        "Invalid Ollama host {}: {}",
                        self.provider.ollama.host, e
                    ))
                })?;
                if self.provider.ollama.model.trim().is_empty() {
                    return Err(PocketchatError::Config(
                        "provider.ollama.model cannot be empty".to_string(),
                    )
                    .into());
                }
            }
            _ => {}
        }

        Ok(())
    }
}
