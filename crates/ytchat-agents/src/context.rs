//! Conversation context for one video at a time.
//!
//! [`ContextManager`] owns the in-memory "current" conversation and writes it
//! through to a [`ConversationStore`] after every change. Callers hold the
//! manager and pass it around explicitly; `&mut self` on every mutating call
//! means one request at a time per manager.

use tracing::{debug, error, info, instrument};
use ytchat_common::{Error, Message, Result, Role, VideoContext};
use ytchat_db::{Conversation, ConversationStore};

use crate::dispatcher::Dispatcher;
use crate::providers::{ChatMessage, ProviderConfig};

/// Number of messages kept per conversation. System messages always survive.
pub const MAX_CONTEXT_MESSAGES: usize = 10;

pub struct ContextManager {
    store: ConversationStore,
    dispatcher: Dispatcher,
    current: Option<Conversation>,
    max_context: usize,
}

impl ContextManager {
    pub fn new(store: ConversationStore, dispatcher: Dispatcher) -> Self {
        Self {
            store,
            dispatcher,
            current: None,
            max_context: MAX_CONTEXT_MESSAGES,
        }
    }

    pub fn with_max_context(mut self, max_context: usize) -> Self {
        self.max_context = max_context;
        self
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Start a fresh conversation for `video` and make it current.
    ///
    /// A system message embedding the title and transcript is written first
    /// when either is present.
    #[instrument(skip(self, video), fields(video_id = %video.video_id))]
    pub async fn initialize_conversation(&mut self, video: &VideoContext) -> Result<&Conversation> {
        let mut conversation = Conversation::new(
            video.video_id.clone(),
            video.title.clone(),
            video.transcript.clone(),
        );

        if video.title.is_some() || video.transcript.is_some() {
            let content = build_system_message(video.title.as_deref(), video.transcript.as_deref());
            push_message(&mut conversation, Role::System, content, self.max_context);
        }

        self.store.save(&conversation).await?;
        self.store.set_active(&conversation.id).await?;
        info!(conversation_id = %conversation.id, "conversation initialized");

        Ok(&*self.current.insert(conversation))
    }

    /// Make the most recent persisted conversation for `video_id` current.
    /// Returns `None` without creating anything when there is none.
    pub async fn load_conversation(&mut self, video_id: &str) -> Result<Option<&Conversation>> {
        let Some(conversation) = self.store.find_latest_for_video(video_id).await? else {
            debug!(video_id, "no persisted conversation for video");
            return Ok(None);
        };

        self.store.set_active(&conversation.id).await?;
        info!(conversation_id = %conversation.id, "conversation loaded");
        Ok(Some(&*self.current.insert(conversation)))
    }

    /// Append to the current conversation, trim it, and persist it.
    pub async fn add_message(&mut self, role: Role, content: impl Into<String>) -> Result<()> {
        let max_context = self.max_context;
        let conversation = self.current.as_mut().ok_or(Error::NoActiveContext)?;

        push_message(conversation, role, content.into(), max_context);
        self.store.save(conversation).await
    }

    /// The current conversation's trimmed history, or nothing.
    pub fn context_messages(&self) -> &[Message] {
        self.current
            .as_ref()
            .map(|c| c.messages.as_slice())
            .unwrap_or_default()
    }

    pub fn current_conversation(&self) -> Option<&Conversation> {
        self.current.as_ref()
    }

    /// Run one user turn through the configured provider.
    ///
    /// The user message is recorded before dispatch and stays recorded when
    /// dispatch fails; calling again after a failure repeats the user turn.
    #[instrument(skip(self, user_text, config), fields(provider = %config.kind()))]
    pub async fn make_ai_request(&mut self, user_text: &str, config: &ProviderConfig) -> Result<String> {
        if self.current.is_none() {
            return Err(Error::NoActiveContext);
        }

        self.add_message(Role::User, user_text).await?;

        let messages: Vec<ChatMessage> = self
            .context_messages()
            .iter()
            .map(ChatMessage::from)
            .collect();

        let response = match self.dispatcher.dispatch(&messages, config).await {
            Ok(response) => response,
            Err(e) => {
                error!("AI request failed: {}", e);
                return Err(e);
            }
        };

        self.add_message(Role::Assistant, response.clone()).await?;
        Ok(response)
    }

    /// Forget the current conversation. Persisted data is untouched.
    pub fn clear_current_context(&mut self) {
        self.current = None;
    }

    pub async fn delete_conversation(&mut self, id: &str) -> Result<()> {
        self.store.delete(id).await?;
        if self.current.as_ref().is_some_and(|c| c.id == id) {
            self.current = None;
        }
        Ok(())
    }
}

fn push_message(conversation: &mut Conversation, role: Role, content: String, max_context: usize) {
    let video = VideoContext {
        video_id: conversation.video_id.clone(),
        title: conversation.video_title.clone(),
        transcript: conversation.video_transcript.clone(),
    };
    conversation
        .messages
        .push(Message::new(role, content).with_video(&video));
    conversation.touch();
    trim_context(&mut conversation.messages, max_context);
}

/// Keep every system message plus the newest `max - systems` others.
///
/// Only applies once `messages` exceeds `max`. Result order is the system
/// messages followed by the kept others, each in original order. Dropped
/// messages are gone.
pub fn trim_context(messages: &mut Vec<Message>, max: usize) {
    if messages.len() <= max {
        return;
    }

    let (system, other): (Vec<Message>, Vec<Message>) =
        messages.drain(..).partition(Message::is_system);
    let keep = max.saturating_sub(system.len());
    let skip = other.len().saturating_sub(keep);

    messages.extend(system);
    messages.extend(other.into_iter().skip(skip));
}

/// Context prompt written once when a conversation starts.
pub fn build_system_message(title: Option<&str>, transcript: Option<&str>) -> String {
    let mut content = String::from("You are an AI assistant helping users analyze YouTube videos. ");

    if let Some(title) = title {
        content.push_str(&format!("The current video is titled: \"{title}\". "));
    }

    if let Some(transcript) = transcript {
        content.push_str(&format!("Here is the video transcript:\n\n{transcript}\n\n"));
    }

    content.push_str("Please provide helpful analysis and answers based on the video content.");
    content
}
