use super::{
    ChatMessage, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, LlmProvider, NO_RESPONSE_RECEIVED,
    ProviderKind, http_error, no_response, split_system,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use ytchat_common::{Error, Result, Role};

pub const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-pro";

/// Google Generative Language `generateContent` adapter.
///
/// The API key travels as the `key` query parameter, so request URLs must
/// never reach the logs.
#[derive(Clone)]
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: GEMINI_API_URL.to_string(),
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

    pub fn build_request_body(&self, messages: &[ChatMessage]) -> Result<serde_json::Value> {
        let (system, rest) = split_system(messages);

        let request = GeminiRequest {
            contents: rest
                .into_iter()
                .map(|msg| GeminiContent {
                    role: match msg.role {
                        Role::Assistant => "model",
                        _ => "user",
                    },
                    parts: vec![GeminiPart {
                        text: msg.content.as_str(),
                    }],
                })
                .collect(),
            generation_config: GenerationConfig {
                max_output_tokens: DEFAULT_MAX_TOKENS,
                temperature: DEFAULT_TEMPERATURE,
            },
            system_instruction: system.map(|text| SystemInstruction {
                parts: vec![GeminiPart { text }],
            }),
        };

        Ok(serde_json::to_value(request)?)
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn provider_id(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = self.build_request_body(messages)?;

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Agent(format!("Gemini request failed: {}", e.without_url())))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            debug!("Gemini error body: {}", error_text);
            return Err(http_error(ProviderKind::Gemini, status));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            warn!("failed to parse Gemini response: {}", e.without_url());
            no_response(ProviderKind::Gemini)
        })?;

        Ok(extract_text(gemini_response))
    }
}

fn extract_text(response: GeminiResponse) -> String {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.text)
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| NO_RESPONSE_RECEIVED.to_string())
}

// Request Types
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction<'a>>,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    role: &'static str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f64,
}

#[derive(Serialize)]
struct SystemInstruction<'a> {
    parts: Vec<GeminiPart<'a>>,
}

// Response Types
#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiResponseContent>,
}

#[derive(Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: Option<String>,
}
