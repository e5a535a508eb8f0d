use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Video metadata handed over by whatever scraped the page.
///
/// All fields are opaque text; nothing here is validated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoContext {
    pub video_id: String,
    pub title: Option<String>,
    pub transcript: Option<String>,
}

impl VideoContext {
    pub fn new(video_id: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            title: None,
            transcript: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_transcript(mut self, transcript: impl Into<String>) -> Self {
        self.transcript = Some(transcript.into());
        self
    }
}

static VIDEO_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:youtube\.com/watch\?v=|youtu\.be/)([^&\n?#]+)")
        .expect("video id regex should compile")
});

/// Pull the video id out of a `youtube.com/watch?v=` or `youtu.be/` URL.
pub fn extract_video_id(url: &str) -> Option<String> {
    VIDEO_ID
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
