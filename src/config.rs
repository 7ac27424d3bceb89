//! Configuration types for the streaming speech front-end.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable consulted when `correction.api_key` is empty.
pub const CORRECTION_API_KEY_ENV: &str = "SPEAKSTREAM_CORRECTION_API_KEY";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Reply stream segmentation and finalization.
    pub stream: StreamConfig,
    /// Chat request construction.
    pub chat: ChatConfig,
    /// Periodic transcription correction.
    pub correction: CorrectionConfig,
    /// Key-value persistence.
    pub store: StoreConfig,
}

/// Reply stream settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Minimum characters before a comma-class break may end a sentence.
    pub clause_min_chars: usize,
    /// Delay after the stream ends before the reply log is finalized.
    ///
    /// Gives in-flight audio a chance to start before the popup is computed.
    pub finalize_delay_ms: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            clause_min_chars: 20,
            finalize_delay_ms: 500,
        }
    }
}

/// Chat request settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// System prompt prepended to every model request.
    pub system_prompt: String,
    /// Number of most recent chat-log messages sent with each request.
    pub max_history_messages: usize,
    /// Send structured text+image content to the model.
    ///
    /// When false, image references are dropped and only text is sent.
    pub vision_enabled: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            system_prompt: "You are a friendly assistant. Start every reply with an emotion tag \
                            such as [neutral], [happy], [sad], [angry] or [relaxed]."
                .to_owned(),
            max_history_messages: 10,
            vision_enabled: false,
        }
    }
}

/// Correction service and scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionConfig {
    /// Correction endpoint (chat-messages style, blocking response mode).
    pub api_url: String,
    /// Bearer token. Falls back to [`CORRECTION_API_KEY_ENV`] when empty.
    pub api_key: String,
    /// User identifier sent with each request.
    pub user: String,
    /// Seconds between correction ticks.
    pub interval_secs: u64,
    /// Total attempts per cycle. `1` means a single attempt, then fallback.
    pub max_attempts: u32,
    /// Base delay for exponential backoff between attempts.
    pub retry_base_delay_ms: u64,
    /// Cap for the backoff delay.
    pub retry_max_delay_ms: u64,
    /// Fixed offset used when formatting fragment timestamps.
    ///
    /// `None` formats in the local time zone.
    pub display_utc_offset_minutes: Option<i32>,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.dify.ai/v1/chat-messages".to_owned(),
            api_key: String::new(),
            user: "speakstream".to_owned(),
            interval_secs: 180,
            max_attempts: 1,
            retry_base_delay_ms: 1000,
            retry_max_delay_ms: 8000,
            display_utc_offset_minutes: None,
        }
    }
}

impl CorrectionConfig {
    /// Returns the configured API key, or the environment fallback.
    ///
    /// Returns `None` when neither source provides a non-empty key.
    pub fn resolved_api_key(&self) -> Option<String> {
        let key = self.api_key.trim();
        if !key.is_empty() {
            return Some(key.to_owned());
        }
        std::env::var(CORRECTION_API_KEY_ENV)
            .ok()
            .map(|k| k.trim().to_owned())
            .filter(|k| !k.is_empty())
    }
}

/// Key-value persistence settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON store file. `None` uses [`crate::app_dirs::store_file`].
    pub path: Option<PathBuf>,
}

impl StoreConfig {
    /// Effective store path.
    pub fn effective_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(crate::app_dirs::store_file)
    }
}

impl SpeechConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::SpeechError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::SpeechError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `config_dir()/config.toml`.
    pub fn default_config_path() -> PathBuf {
        crate::app_dirs::config_dir().join("config.toml")
    }
}
