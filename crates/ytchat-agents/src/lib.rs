pub mod analysis;
pub mod context;
pub mod dispatcher;
pub mod providers;

pub use analysis::{VideoAnalysis, analyze_video, parse_analysis};
pub use context::{ContextManager, MAX_CONTEXT_MESSAGES, build_system_message, trim_context};
pub use dispatcher::{Dispatcher, Endpoints};
pub use providers::{
    AnthropicProvider, ChatMessage, GeminiProvider, LlmProvider, NO_RESPONSE_RECEIVED,
    OpenAiProvider, ProviderConfig, ProviderKind,
};
