use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_PROVIDER: &str = "gemini";
pub const DEFAULT_MAX_CONTEXT_MESSAGES: usize = 10;
pub const DEFAULT_MAX_CONVERSATIONS: usize = 50;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Top-level `config.yml` contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub default_provider: String,
    pub providers: HashMap<String, ProviderSettings>,
    pub data_dir: Option<PathBuf>,
    pub max_context_messages: usize,
    pub max_conversations: usize,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_provider: DEFAULT_PROVIDER.to_string(),
            providers: HashMap::new(),
            data_dir: None,
            max_context_messages: DEFAULT_MAX_CONTEXT_MESSAGES,
            max_conversations: DEFAULT_MAX_CONVERSATIONS,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl AppConfig {
    pub fn provider(&self, id: &str) -> Option<&ProviderSettings> {
        self.providers.get(id)
    }

    /// `data_dir` from the file, else `~/.ytchat`.
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| default_base_dir().unwrap_or_else(|| PathBuf::from(".ytchat")))
    }

    /// Path of the SQLite key-value database inside the data directory.
    pub fn database_path(&self) -> PathBuf {
        self.resolved_data_dir().join("ytchat.db")
    }
}

/// Per-provider settings under `providers.<id>`.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

pub(crate) fn default_base_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".ytchat"))
}
