use super::{
    ChatMessage, DEFAULT_MAX_TOKENS, LlmProvider, NO_RESPONSE_RECEIVED, ProviderKind, http_error,
    no_response, split_system,
};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};
use ytchat_common::{Error, Result};

pub const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_MODEL: &str = "claude-3-sonnet-20240229";

/// Claude Messages API adapter.
pub struct AnthropicProvider {
    api_key: String,
    client: Client,
    base_url: String,
    model: String,
}

impl AnthropicProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: Client::new(),
            base_url: ANTHROPIC_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        if let Some(model) = model {
            self.model = model;
        }
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// The system prompt moves to the top-level `system` field; only user
    /// and assistant turns remain in `messages`.
    pub fn build_request_body(&self, messages: &[ChatMessage]) -> serde_json::Value {
        let (system, rest) = split_system(messages);

        let messages: Vec<serde_json::Value> = rest
            .iter()
            .map(|msg| {
                json!({
                    "role": msg.role.as_str(),
                    "content": msg.content,
                })
            })
            .collect();

        let mut body = json!({
            "model": self.model,
            "max_tokens": DEFAULT_MAX_TOKENS,
            "messages": messages,
        });

        if let Some(system) = system {
            body["system"] = json!(system);
        }

        body
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn provider_id(&self) -> &str {
        "claude"
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let body = self.build_request_body(messages);

        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e: reqwest::Error| Error::Agent(format!("Network error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            debug!("Claude error body: {}", error_text);
            return Err(http_error(ProviderKind::Claude, status));
        }

        let raw_response: serde_json::Value = response.json().await.map_err(|e| {
            warn!("failed to parse Claude response: {}", e);
            no_response(ProviderKind::Claude)
        })?;

        extract_text(&raw_response)
    }
}

fn extract_text(raw_response: &serde_json::Value) -> Result<String> {
    let content_blocks = raw_response["content"]
        .as_array()
        .ok_or_else(|| no_response(ProviderKind::Claude))?;

    Ok(content_blocks
        .first()
        .and_then(|block| block["text"].as_str())
        .filter(|text| !text.is_empty())
        .unwrap_or(NO_RESPONSE_RECEIVED)
        .to_string())
}
