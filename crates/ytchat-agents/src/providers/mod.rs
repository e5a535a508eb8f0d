use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ytchat_common::{Error, Message, Result, Role};

pub mod anthropic;
pub mod gemini;
pub mod openai;

pub use anthropic::AnthropicProvider;
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

pub const DEFAULT_MAX_TOKENS: u32 = 1000;
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Returned when a provider answered but the expected text field was absent.
pub const NO_RESPONSE_RECEIVED: &str = "No response received";

/// Trait for LLM provider integrations (OpenAI, Claude, Gemini).
///
/// One call to [`LlmProvider::complete`] is exactly one HTTP request. There is
/// no retry and no timeout beyond the HTTP client's own defaults.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider identifier (e.g. "openai", "claude", "gemini").
    fn provider_id(&self) -> &str;

    /// Send the ordered history and return the reply text.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// The `(role, content)` pair sent upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

impl From<&Message> for ChatMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[serde(rename = "openai")]
    OpenAi,
    Claude,
    Gemini,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [ProviderKind::OpenAi, ProviderKind::Claude, ProviderKind::Gemini];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Claude => "claude",
            ProviderKind::Gemini => "gemini",
        }
    }

    /// Name used in user-facing error messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OpenAI",
            ProviderKind::Claude => "Claude",
            ProviderKind::Gemini => "Gemini",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => openai::DEFAULT_MODEL,
            ProviderKind::Claude => anthropic::DEFAULT_MODEL,
            ProviderKind::Gemini => gemini::DEFAULT_MODEL,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "claude" | "anthropic" => Ok(ProviderKind::Claude),
            "gemini" => Ok(ProviderKind::Gemini),
            _ => Err(Error::UnsupportedProvider(s.to_string())),
        }
    }
}

/// Per-request provider selection. Supplied by the caller, never stored.
#[derive(Clone, PartialEq, Eq)]
pub enum ProviderConfig {
    OpenAi { api_key: String, model: Option<String> },
    Claude { api_key: String, model: Option<String> },
    Gemini { api_key: String, model: Option<String> },
}

impl ProviderConfig {
    pub fn new(kind: ProviderKind, api_key: impl Into<String>, model: Option<String>) -> Self {
        let api_key = api_key.into();
        match kind {
            ProviderKind::OpenAi => ProviderConfig::OpenAi { api_key, model },
            ProviderKind::Claude => ProviderConfig::Claude { api_key, model },
            ProviderKind::Gemini => ProviderConfig::Gemini { api_key, model },
        }
    }

    /// Build from a textual provider id, rejecting anything unknown.
    pub fn parse(provider: &str, api_key: impl Into<String>, model: Option<String>) -> Result<Self> {
        Ok(Self::new(provider.parse()?, api_key, model))
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            ProviderConfig::OpenAi { .. } => ProviderKind::OpenAi,
            ProviderConfig::Claude { .. } => ProviderKind::Claude,
            ProviderConfig::Gemini { .. } => ProviderKind::Gemini,
        }
    }

    pub fn api_key(&self) -> &str {
        match self {
            ProviderConfig::OpenAi { api_key, .. }
            | ProviderConfig::Claude { api_key, .. }
            | ProviderConfig::Gemini { api_key, .. } => api_key,
        }
    }

    pub fn model(&self) -> Option<&str> {
        match self {
            ProviderConfig::OpenAi { model, .. }
            | ProviderConfig::Claude { model, .. }
            | ProviderConfig::Gemini { model, .. } => model.as_deref(),
        }
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.kind())
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model())
            .finish()
    }
}

/// Split out the first system message; the rest keep their order.
pub(crate) fn split_system(messages: &[ChatMessage]) -> (Option<&str>, Vec<&ChatMessage>) {
    let system = messages
        .iter()
        .find(|m| m.role == Role::System)
        .map(|m| m.content.as_str());
    let rest = messages.iter().filter(|m| m.role != Role::System).collect();
    (system, rest)
}

pub(crate) fn http_error(kind: ProviderKind, status: reqwest::StatusCode) -> Error {
    Error::Http {
        provider: kind.display_name().to_string(),
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or_default().to_string(),
    }
}

pub(crate) fn no_response(kind: ProviderKind) -> Error {
    Error::NoResponse {
        provider: kind.as_str().to_string(),
    }
}
