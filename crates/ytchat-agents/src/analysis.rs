use serde::{Deserialize, Serialize};
use tracing::debug;
use ytchat_common::Result;

use crate::context::ContextManager;
use crate::providers::ProviderConfig;

const ANALYSIS_PROMPT: &str = "Please analyze this YouTube video and respond with only a JSON object \
of the form {\"summary\": \"<a concise summary>\", \"keyPoints\": [\"<main point>\", ...]}.";

pub const SUMMARY_UNAVAILABLE: &str = "Summary not available";
pub const UNPARSEABLE_RESPONSE: &str = "Could not parse structured response";

/// Structured summary of a video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoAnalysis {
    pub summary: String,
    pub key_points: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnalysis {
    summary: Option<String>,
    #[serde(default)]
    key_points: Vec<String>,
}

/// Ask the current conversation's provider for a summary and key points.
pub async fn analyze_video(
    manager: &mut ContextManager,
    config: &ProviderConfig,
) -> Result<VideoAnalysis> {
    let reply = manager.make_ai_request(ANALYSIS_PROMPT, config).await?;
    Ok(parse_analysis(&reply))
}

/// Parse a reply into [`VideoAnalysis`]; anything that is not the expected
/// JSON object comes back verbatim as the summary.
pub fn parse_analysis(reply: &str) -> VideoAnalysis {
    match serde_json::from_str::<RawAnalysis>(strip_code_fence(reply)) {
        Ok(raw) => VideoAnalysis {
            summary: raw
                .summary
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| SUMMARY_UNAVAILABLE.to_string()),
            key_points: raw.key_points,
            error: None,
        },
        Err(e) => {
            debug!("reply is not structured analysis: {}", e);
            VideoAnalysis {
                summary: reply.to_string(),
                key_points: Vec::new(),
                error: Some(UNPARSEABLE_RESPONSE.to_string()),
            }
        }
    }
}

// Models often wrap JSON in ```json fences.
fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}
