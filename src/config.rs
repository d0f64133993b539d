use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ai: AiConfig,
    pub export: ExportConfig,
    pub tui: TuiConfig,
}

/// AI service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Base URL of the OpenAI-compatible API.
    pub base_url: String,
    pub text_model: String,
    pub image_model: String,
    /// Portrait size, e.g. "1024x1024".
    pub image_size: String,
    /// Injected API key. Prefer the environment over writing it here.
    pub api_key: Option<String>,
    /// Helper endpoint returning `{"apiKey": "..."}` when no key is injected.
    pub credential_endpoint: Option<String>,
    /// Vector store searched during bio generation.
    pub knowledge_base_id: Option<String>,
    /// Uploaded file ids attached to bio requests.
    pub reference_document_ids: Vec<String>,
    /// Total attempts for a bio request, including the first.
    pub max_attempts: u32,
    /// Fixed delay between attempts, in milliseconds.
    pub retry_delay_ms: u64,
    /// HTTP timeout in seconds.
    pub timeout_secs: u64,
}

/// Document export configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Override the output directory (defaults to the documents dir).
    pub output_dir: Option<PathBuf>,
    pub line_width: usize,
    pub lines_per_page: usize,
}

/// TUI-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TuiConfig {
    /// Tick interval in milliseconds for the event loop.
    pub tick_rate_ms: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            text_model: "gpt-4.1-mini".to_string(),
            image_model: "gpt-image-1".to_string(),
            image_size: "1024x1024".to_string(),
            api_key: None,
            credential_endpoint: None,
            knowledge_base_id: None,
            reference_document_ids: Vec::new(),
            max_attempts: 3,
            retry_delay_ms: 1000,
            timeout_secs: 120,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            line_width: 80,
            lines_per_page: 54,
        }
    }
}

impl Default for TuiConfig {
    fn default() -> Self {
        Self { tick_rate_ms: 100 }
    }
}

impl AppConfig {
    /// Load configuration from `~/.config/bioforge/config.toml`, then apply
    /// environment overrides. Returns defaults if the file is missing or
    /// unparseable.
    pub fn load() -> Self {
        let mut config = Self::load_file(&Self::config_path());
        config.apply_env(|name| std::env::var(name).ok());
        config
    }

    fn load_file(config_path: &std::path::Path) -> Self {
        match Self::read_file(config_path) {
            Ok(config) => {
                log::info!("Loaded config from {}", config_path.display());
                config
            }
            Err(ConfigError::Io(_)) => {
                log::debug!(
                    "No config file at {}, using defaults",
                    config_path.display()
                );
                Self::default()
            }
            Err(e) => {
                log::warn!(
                    "Failed to parse config at {}: {e}, using defaults",
                    config_path.display()
                );
                Self::default()
            }
        }
    }

    /// Read and parse a config file without falling back.
    pub fn read_file(config_path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(config_path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Environment overrides: `BIOFORGE_API_KEY`, `BIOFORGE_CREDENTIAL_ENDPOINT`,
    /// `BIOFORGE_BASE_URL`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("BIOFORGE_API_KEY") {
            self.ai.api_key = Some(key);
        }
        if let Some(endpoint) = non_empty("BIOFORGE_CREDENTIAL_ENDPOINT") {
            self.ai.credential_endpoint = Some(endpoint);
        }
        if let Some(url) = non_empty("BIOFORGE_BASE_URL") {
            self.ai.base_url = url;
        }
    }

    /// Resolved export directory (override, documents dir, or cwd).
    pub fn export_dir(&self) -> PathBuf {
        self.export
            .output_dir
            .clone()
            .unwrap_or_else(|| {
                dirs::document_dir()
                    .map(|d| d.join("bioforge"))
                    .unwrap_or_else(|| PathBuf::from("."))
            })
    }

    /// Directory for rolling log files.
    pub fn log_dir() -> PathBuf {
        dirs::data_dir()
            .map(|d| d.join("bioforge").join("logs"))
            .unwrap_or_else(|| PathBuf::from("logs"))
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("bioforge").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }
}
