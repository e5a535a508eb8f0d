use super::{
    ChatMessage, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, LlmProvider, NO_RESPONSE_RECEIVED,
    ProviderKind, http_error, no_response,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use ytchat_common::{Error, Result};

pub const OPENAI_API_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

#[derive(Clone)]
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.unwrap_or_else(|| OPENAI_API_URL.to_string()),
            model: DEFAULT_MODEL.to_string(),
        }
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

    /// System messages stay inline; the list is passed through verbatim.
    pub fn build_request_body(&self, messages: &[ChatMessage]) -> Result<serde_json::Value> {
        let request = OpenAiRequest {
            model: &self.model,
            messages,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        };
        Ok(serde_json::to_value(request)?)
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn provider_id(&self) -> &str {
        "openai"
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_request_body(messages)?;

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Agent(format!("OpenAI request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            debug!("OpenAI error body: {}", error_text);
            return Err(http_error(ProviderKind::OpenAi, status));
        }

        let openai_response: OpenAiResponse = response.json().await.map_err(|e| {
            warn!("failed to parse OpenAI response: {}", e);
            no_response(ProviderKind::OpenAi)
        })?;

        Ok(extract_text(openai_response))
    }
}

fn extract_text(response: OpenAiResponse) -> String {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| NO_RESPONSE_RECEIVED.to_string())
}

// Request Types
#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f64,
}

// Response Types
#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    #[serde(default)]
    message: Option<OpenAiResponseMessage>,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    #[serde(default)]
    content: Option<String>,
}
