use reqwest::Client;
use tracing::{info, instrument, warn};
use ytchat_common::Result;

use crate::providers::{
    AnthropicProvider, ChatMessage, GeminiProvider, LlmProvider, OpenAiProvider, ProviderConfig,
    anthropic::ANTHROPIC_API_URL, gemini::GEMINI_API_URL, openai::OPENAI_API_URL,
};

/// Upstream base URLs, one per provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Base of the OpenAI API; `/chat/completions` is appended.
    pub openai: String,
    /// Full Claude Messages endpoint.
    pub claude: String,
    /// Base of the Gemini API; `/models/{model}:generateContent` is appended.
    pub gemini: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            openai: OPENAI_API_URL.to_string(),
            claude: ANTHROPIC_API_URL.to_string(),
            gemini: GEMINI_API_URL.to_string(),
        }
    }
}

/// Stateless translation of one abstract request into one provider call.
#[derive(Clone)]
pub struct Dispatcher {
    client: Client,
    endpoints: Endpoints,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::with_endpoints(Endpoints::default())
    }

    pub fn with_endpoints(endpoints: Endpoints) -> Self {
        Self {
            client: Client::new(),
            endpoints,
        }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Build the adapter for `config`.
    pub fn provider_for(&self, config: &ProviderConfig) -> Box<dyn LlmProvider> {
        match config {
            ProviderConfig::OpenAi { api_key, model } => Box::new(
                OpenAiProvider::new(api_key.clone(), Some(self.endpoints.openai.clone()))
                    .with_model(model.clone())
                    .with_client(self.client.clone()),
            ),
            ProviderConfig::Claude { api_key, model } => Box::new(
                AnthropicProvider::new(api_key.clone())
                    .with_base_url(self.endpoints.claude.clone())
                    .with_model(model.clone())
                    .with_client(self.client.clone()),
            ),
            ProviderConfig::Gemini { api_key, model } => Box::new(
                GeminiProvider::new(api_key.clone())
                    .with_base_url(self.endpoints.gemini.clone())
                    .with_model(model.clone())
                    .with_client(self.client.clone()),
            ),
        }
    }

    /// Send `messages` to the provider named by `config` and return the reply text.
    #[instrument(skip(self, messages, config), fields(provider = %config.kind(), messages = messages.len()))]
    pub async fn dispatch(&self, messages: &[ChatMessage], config: &ProviderConfig) -> Result<String> {
        let provider = self.provider_for(config);
        match provider.complete(messages).await {
            Ok(text) => {
                info!("received {} chars from {}", text.len(), provider.provider_id());
                Ok(text)
            }
            Err(e) => {
                warn!("{} request failed: {}", provider.provider_id(), e);
                Err(e)
            }
        }
    }
}
