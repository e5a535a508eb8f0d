use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::video::VideoContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a conversation thread. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_transcript: Option<String>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: now_millis(),
            video_id: None,
            video_title: None,
            video_transcript: None,
        }
    }

    /// Attach a snapshot of the video the message was written about.
    pub fn with_video(mut self, video: &VideoContext) -> Self {
        self.video_id = Some(video.video_id.clone());
        self.video_title = video.title.clone();
        self.video_transcript = video.transcript.clone();
        self
    }

    pub fn is_system(&self) -> bool {
        self.role == Role::System
    }
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
