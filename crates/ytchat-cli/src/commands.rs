use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use tracing::{debug, info};
use ytchat_agents::{
    ContextManager, Dispatcher, Endpoints, ProviderConfig, ProviderKind, analyze_video,
};
use ytchat_common::{Role, VideoContext, extract_video_id};
use ytchat_config::AppConfig;
use ytchat_db::{ApiKeyStore, Conversation, ConversationStore, KeyValueStore, SqliteKvStore};

/// Everything a subcommand needs, opened once per invocation.
pub struct App {
    config: AppConfig,
    provider: Option<String>,
    model: Option<String>,
    manager: ContextManager,
    keys: ApiKeyStore,
}

impl App {
    pub fn open(config: AppConfig, provider: Option<String>, model: Option<String>) -> Result<Self> {
        let db_path = config.database_path();
        let kv: Arc<dyn KeyValueStore> = Arc::new(
            SqliteKvStore::open(&db_path)
                .with_context(|| format!("failed to open {}", db_path.display()))?,
        );
        debug!("storage at {}", db_path.display());

        let store = ConversationStore::new(kv.clone()).with_max_conversations(config.max_conversations);
        let dispatcher = Dispatcher::with_endpoints(endpoints_from(&config));
        let manager =
            ContextManager::new(store, dispatcher).with_max_context(config.max_context_messages);

        Ok(Self {
            config,
            provider,
            model,
            manager,
            keys: ApiKeyStore::new(kv),
        })
    }

    pub async fn ask(&mut self, video: VideoContext, question: &str, fresh: bool) -> Result<()> {
        let provider = self.provider_config().await?;
        self.open_conversation(&video, fresh).await?;

        let reply = self.manager.make_ai_request(question, &provider).await?;
        println!("{reply}");
        Ok(())
    }

    pub async fn summarize(&mut self, video: VideoContext, json: bool) -> Result<()> {
        let provider = self.provider_config().await?;
        self.open_conversation(&video, false).await?;

        let analysis = analyze_video(&mut self.manager, &provider).await?;
        if json {
            println!("{}", serde_json::to_string_pretty(&analysis)?);
            return Ok(());
        }

        println!("{}", analysis.summary);
        if !analysis.key_points.is_empty() {
            println!();
            for point in &analysis.key_points {
                println!("  - {point}");
            }
        }
        if let Some(error) = analysis.error {
            eprintln!("note: {error}");
        }
        Ok(())
    }

    /// Read-only: the active conversation id is left alone.
    pub async fn history(&self, video: &str, include_system: bool) -> Result<()> {
        let video_id = resolve_video_id(video)?;
        let Some(conversation) = self.manager.store().find_latest_for_video(&video_id).await?
        else {
            println!("No conversation for video {video_id}");
            return Ok(());
        };

        println!("{}", describe(&conversation));
        for message in &conversation.messages {
            if message.role == Role::System && !include_system {
                continue;
            }
            println!("\n[{}] {}", message.role, message.content);
        }
        Ok(())
    }

    pub async fn list(&self) -> Result<()> {
        let conversations = self.manager.store().list().await?;
        if conversations.is_empty() {
            println!("No stored conversations");
            return Ok(());
        }

        let active = self.manager.store().active_id().await?;
        for conversation in &conversations {
            let marker = if active.as_deref() == Some(conversation.id.as_str()) {
                "*"
            } else {
                " "
            };
            println!("{marker} {}", describe(conversation));
        }
        Ok(())
    }

    pub async fn delete(&mut self, id: &str) -> Result<()> {
        if self.manager.store().get(id).await?.is_none() {
            bail!("no conversation with id {id}");
        }
        self.manager.delete_conversation(id).await?;
        println!("Deleted {id}");
        Ok(())
    }

    pub async fn clear_all(&mut self) -> Result<()> {
        self.manager.store().clear_all().await?;
        self.manager.clear_current_context();
        println!("All conversations removed");
        Ok(())
    }

    pub async fn set_key(&self, provider: &str, api_key: &str) -> Result<()> {
        let kind: ProviderKind = provider.parse()?;
        self.keys.save(kind.as_str(), api_key).await?;
        println!("Saved {} API key", kind.display_name());
        Ok(())
    }

    pub async fn clear_key(&self, provider: &str) -> Result<()> {
        let kind: ProviderKind = provider.parse()?;
        self.keys.clear(kind.as_str()).await?;
        println!("Cleared {} API key", kind.display_name());
        Ok(())
    }

    pub async fn key_status(&self, provider: &str) -> Result<()> {
        let kind: ProviderKind = provider.parse()?;
        let source = if self.configured_key(kind).is_some() {
            "set in config or environment"
        } else if self.keys.is_configured(kind.as_str()).await? {
            "stored"
        } else {
            "not configured"
        };
        println!(
            "{}: {source} (model {})",
            kind.display_name(),
            self.model_for(kind)
        );
        Ok(())
    }

    /// Continue the latest conversation for the video unless `fresh`.
    async fn open_conversation(&mut self, video: &VideoContext, fresh: bool) -> Result<()> {
        if !fresh && self.manager.load_conversation(&video.video_id).await?.is_some() {
            return Ok(());
        }
        let conversation = self.manager.initialize_conversation(video).await?;
        info!(conversation_id = %conversation.id, "started new conversation");
        Ok(())
    }

    async fn provider_config(&self) -> Result<ProviderConfig> {
        let id = self
            .provider
            .as_deref()
            .unwrap_or(self.config.default_provider.as_str());
        let kind: ProviderKind = id.parse()?;

        let api_key = match self.configured_key(kind) {
            Some(key) => key.to_string(),
            None => self.keys.get(kind.as_str()).await?.ok_or_else(|| {
                anyhow!(
                    "no {} API key configured; run `ytchat key set {} <key>`",
                    kind.display_name(),
                    kind.as_str()
                )
            })?,
        };

        let model = self.model.clone().or_else(|| {
            self.config
                .provider(kind.as_str())
                .and_then(|settings| settings.model.clone())
        });

        Ok(ProviderConfig::new(kind, api_key, model))
    }

    /// Model a request would use: `--model`, then config, then the provider default.
    fn model_for(&self, kind: ProviderKind) -> &str {
        self.model
            .as_deref()
            .or_else(|| {
                self.config
                    .provider(kind.as_str())
                    .and_then(|settings| settings.model.as_deref())
            })
            .unwrap_or(kind.default_model())
    }

    fn configured_key(&self, kind: ProviderKind) -> Option<&str> {
        self.config
            .provider(kind.as_str())
            .and_then(|settings| settings.api_key.as_deref())
            .filter(|key| !key.trim().is_empty())
    }
}

/// Accept either a YouTube URL or a bare video id.
pub fn resolve_video_id(input: &str) -> Result<String> {
    if let Some(id) = extract_video_id(input) {
        return Ok(id);
    }

    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed.contains('/') || trimmed.contains(char::is_whitespace) {
        bail!("not a YouTube URL or video id: {input}");
    }
    Ok(trimmed.to_string())
}

pub fn video_context(
    video: &str,
    title: Option<String>,
    transcript: Option<&Path>,
) -> Result<VideoContext> {
    let mut context = VideoContext::new(resolve_video_id(video)?);
    if let Some(title) = title {
        context = context.with_title(title);
    }
    if let Some(path) = transcript {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read transcript {}", path.display()))?;
        context = context.with_transcript(text);
    }
    Ok(context)
}

fn endpoints_from(config: &AppConfig) -> Endpoints {
    let mut endpoints = Endpoints::default();
    let base_url = |kind: ProviderKind| {
        config
            .provider(kind.as_str())
            .and_then(|settings| settings.base_url.clone())
    };

    if let Some(url) = base_url(ProviderKind::OpenAi) {
        endpoints.openai = url;
    }
    if let Some(url) = base_url(ProviderKind::Claude) {
        endpoints.claude = url;
    }
    if let Some(url) = base_url(ProviderKind::Gemini) {
        endpoints.gemini = url;
    }
    endpoints
}

fn describe(conversation: &Conversation) -> String {
    let updated = chrono::DateTime::from_timestamp_millis(conversation.last_updated)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    format!(
        "{}  {}  ({} messages, {})",
        conversation.id,
        conversation
            .video_title
            .as_deref()
            .unwrap_or(&conversation.video_id),
        conversation.messages.len(),
        updated
    )
}
