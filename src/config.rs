//! Configuration management for Cir
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{CirError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for Cir
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Language-model service settings
    pub provider: ProviderConfig,
    /// Session file settings
    #[serde(default)]
    pub session: SessionConfig,
    /// External file picker settings
    #[serde(default)]
    pub picker: PickerConfig,
    /// Log file settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Provider configuration
///
/// Specifies which language-model service to stream replies from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Type of provider to use
    #[serde(rename = "type")]
    pub provider_type: String,

    /// OpenAI-compatible chat completions configuration
    #[serde(default)]
    pub openai: OpenAiConfig,
}

/// OpenAI-compatible provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Base URL of the API; `/chat/completions` is appended
    #[serde(default = "default_openai_api_base")]
    pub api_base: String,

    /// Model to request completions from
    #[serde(default = "default_openai_model")]
    pub model: String,

    /// Name of the environment variable holding the API key
    ///
    /// The key is read when a question is submitted, never at startup.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Upper bound for a whole streamed request (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_openai_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-2024-08-06".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_request_timeout() -> u64 {
    300
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_base: default_openai_api_base(),
            model: default_openai_model(),
            api_key_env: default_api_key_env(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

/// Session file configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Path of the session file; a leading `~/` is expanded
    #[serde(default = "default_session_path")]
    pub path: String,
}

fn default_session_path() -> String {
    "~/.cir/default-session.yaml".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            path: default_session_path(),
        }
    }
}

impl SessionConfig {
    /// Resolved session file path with `~/` expanded
    pub fn resolved_path(&self) -> PathBuf {
        expand_home(&self.path)
    }
}

/// External file picker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickerConfig {
    /// Shell command printing one selected path per line
    #[serde(default = "default_picker_command")]
    pub command: String,
}

fn default_picker_command() -> String {
    "find . -type f -not -path '*/.*' | fzf-tmux -h -m".to_string()
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self {
            command: default_picker_command(),
        }
    }
}

/// Log output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// File that receives tracing output (keeps the terminal clean)
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_file() -> String {
    "cir.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
        }
    }
}

/// Expand a leading `~/` to the user's home directory
///
/// Paths without the prefix, or hosts without a discoverable home
/// directory, are returned unchanged.
///
/// # Examples
///
/// ```
/// use cir::config::expand_home;
///
/// assert_eq!(expand_home("/tmp/s.yaml"), std::path::PathBuf::from("/tmp/s.yaml"));
/// ```
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(dirs) = directories::BaseDirs::new() {
            return dirs.home_dir().join(rest);
        }
    }
    PathBuf::from(path)
}

/// Default location of the configuration file
pub fn default_config_path() -> PathBuf {
    expand_home("~/.cir/config.yaml")
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
    /// Returns error if file exists but cannot be read or parsed
    pub fn load(path: &Path, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path.display());
            Self::default_config()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn default_config() -> Self {
        Self {
            provider: ProviderConfig {
                provider_type: "openai".to_string(),
                openai: OpenAiConfig::default(),
            },
            session: SessionConfig::default(),
            picker: PickerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| CirError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| CirError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(provider_type) = std::env::var("CIR_PROVIDER") {
            self.provider.provider_type = provider_type;
        }

        if let Ok(api_base) = std::env::var("CIR_OPENAI_API_BASE") {
            tracing::debug!(api_base = %api_base, "Env override: CIR_OPENAI_API_BASE");
            self.provider.openai.api_base = api_base;
        }

        if let Ok(model) = std::env::var("CIR_OPENAI_MODEL") {
            self.provider.openai.model = model;
        }

        if let Ok(timeout) = std::env::var("CIR_REQUEST_TIMEOUT_SECONDS") {
            match timeout.parse::<u64>() {
                Ok(value) => self.provider.openai.request_timeout_seconds = value,
                Err(_) => tracing::warn!("Invalid CIR_REQUEST_TIMEOUT_SECONDS: {}", timeout),
            }
        }

        if let Ok(command) = std::env::var("CIR_PICKER_COMMAND") {
            self.picker.command = command;
        }

        if let Ok(log_file) = std::env::var("CIR_LOG_FILE") {
            self.logging.file = log_file;
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(session) = &cli.session {
            tracing::debug!("Session path override from CLI: {}", session.display());
            self.session.path = session.to_string_lossy().to_string();
        }
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `CirError::Config` describing the first invalid value
    pub fn validate(&self) -> Result<()> {
        let valid_providers = ["openai"];
        if !valid_providers.contains(&self.provider.provider_type.as_str()) {
            return Err(CirError::Config(format!(
                "Invalid provider type: {}. Must be one of: {}",
                self.provider.provider_type,
                valid_providers.join(", ")
            ))
            .into());
        }

        let openai = &self.provider.openai;
        if openai.model.trim().is_empty() {
            return Err(CirError::Config("openai.model cannot be empty".to_string()).into());
        }

        match url::Url::parse(&openai.api_base) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(url) => {
                return Err(CirError::Config(format!(
                    "openai.api_base must use http or https, got {}",
                    url.scheme()
                ))
                .into());
            }
            Err(e) => {
                return Err(CirError::Config(format!(
                    "openai.api_base is not a valid URL ({}): {}",
                    openai.api_base, e
                ))
                .into());
            }
        }

        if openai.api_key_env.trim().is_empty() {
            return Err(
                CirError::Config("openai.api_key_env cannot be empty".to_string()).into(),
            );
        }

        if openai.request_timeout_seconds == 0 {
            return Err(CirError::Config(
                "openai.request_timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.session.path.trim().is_empty() {
            return Err(CirError::Config("session.path cannot be empty".to_string()).into());
        }

        if self.picker.command.trim().is_empty() {
            return Err(CirError::Config("picker.command cannot be empty".to_string()).into());
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}
