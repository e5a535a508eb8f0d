use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use ytchat_common::{Error, Message, Result, now_millis};

use crate::kv::KeyValueStore;

/// Storage key holding the map of conversation id to conversation.
pub const CONVERSATIONS_KEY: &str = "youtube-ai-conversations";
/// Storage key holding the id of the active conversation.
pub const ACTIVE_CONVERSATION_KEY: &str = "youtube-ai-active-conversation-id";
/// Upper bound on persisted conversations; the least recently updated are dropped.
pub const MAX_PERSISTED_CONVERSATIONS: usize = 50;

/// One video's message thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub video_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_transcript: Option<String>,
    #[serde(default)]
    pub messages: Vec<Message>,
    pub created_at: i64,
    pub last_updated: i64,
}

impl Conversation {
    /// Start an empty thread. The id is `{video_id}_{created_at}`.
    pub fn new(
        video_id: impl Into<String>,
        video_title: Option<String>,
        video_transcript: Option<String>,
    ) -> Self {
        let video_id = video_id.into();
        let now = now_millis();
        Self {
            id: format!("{video_id}_{now}"),
            video_id,
            video_title,
            video_transcript,
            messages: Vec::new(),
            created_at: now,
            last_updated: now,
        }
    }

    /// Bump `last_updated`, never letting it fall behind `created_at`.
    pub fn touch(&mut self) {
        self.last_updated = now_millis().max(self.created_at);
    }
}

/// Persisted conversation collection on top of a [`KeyValueStore`].
///
/// Every write replaces the whole collection. Concurrent writers race on
/// that value and the last write wins.
#[derive(Clone)]
pub struct ConversationStore {
    kv: Arc<dyn KeyValueStore>,
    max_conversations: usize,
}

impl ConversationStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            max_conversations: MAX_PERSISTED_CONVERSATIONS,
        }
    }

    /// Cap the collection. At least one conversation is always kept.
    pub fn with_max_conversations(mut self, max: usize) -> Self {
        self.max_conversations = max.max(1);
        self
    }

    pub fn max_conversations(&self) -> usize {
        self.max_conversations
    }

    async fn load_map(&self) -> Result<HashMap<String, Conversation>> {
        match self.kv.get_one(CONVERSATIONS_KEY).await? {
            Some(Value::Null) | None => Ok(HashMap::new()),
            Some(value) => Ok(serde_json::from_value(value)?),
        }
    }

    async fn write_map(&self, map: &HashMap<String, Conversation>) -> Result<()> {
        self.kv
            .set_one(CONVERSATIONS_KEY, serde_json::to_value(map)?)
            .await
    }

    /// All persisted conversations, most recently updated first.
    pub async fn list(&self) -> Result<Vec<Conversation>> {
        let mut conversations: Vec<Conversation> = self.load_map().await?.into_values().collect();
        sort_by_recency(&mut conversations);
        Ok(conversations)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Conversation>> {
        Ok(self.load_map().await?.remove(id))
    }

    /// The most recently updated conversation for `video_id`, if any.
    pub async fn find_latest_for_video(&self, video_id: &str) -> Result<Option<Conversation>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .find(|c| c.video_id == video_id))
    }

    /// Insert or replace `conversation`, then prune the collection down to
    /// the most recently updated `max_conversations` entries.
    pub async fn save(&self, conversation: &Conversation) -> Result<()> {
        let mut map = self.load_map().await?;
        map.insert(conversation.id.clone(), conversation.clone());

        let mut conversations: Vec<Conversation> = map.into_values().collect();
        sort_by_recency(&mut conversations);
        if conversations.len() > self.max_conversations {
            let dropped = conversations.split_off(self.max_conversations);
            info!(
                "pruned {} conversation(s) past the {} entry cap",
                dropped.len(),
                self.max_conversations
            );
        }

        let map: HashMap<String, Conversation> = conversations
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();
        self.write_map(&map).await?;
        debug!(conversation_id = %conversation.id, "conversation saved");
        Ok(())
    }

    /// Remove a conversation. Clears the active id when it pointed at it.
    /// Returns `true` if the conversation existed.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let mut map = self.load_map().await?;
        let existed = map.remove(id).is_some();

        let mut updates = HashMap::from([(CONVERSATIONS_KEY.to_string(), serde_json::to_value(&map)?)]);
        if self.active_id().await?.as_deref() == Some(id) {
            updates.insert(ACTIVE_CONVERSATION_KEY.to_string(), Value::Null);
        }
        self.kv.set(updates).await?;

        if existed {
            info!(conversation_id = %id, "conversation deleted");
        }
        Ok(existed)
    }

    pub async fn update_title(&self, id: &str, title: impl Into<String>) -> Result<Conversation> {
        let mut conversation = self
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("conversation with id {id} not found")))?;
        conversation.video_title = Some(title.into());
        conversation.touch();
        self.save(&conversation).await?;
        Ok(conversation)
    }

    pub async fn set_active(&self, id: &str) -> Result<()> {
        self.kv
            .set_one(ACTIVE_CONVERSATION_KEY, Value::String(id.to_string()))
            .await
    }

    pub async fn active_id(&self) -> Result<Option<String>> {
        Ok(self
            .kv
            .get_one(ACTIVE_CONVERSATION_KEY)
            .await?
            .and_then(|v| v.as_str().map(str::to_string)))
    }

    pub async fn active_conversation(&self) -> Result<Option<Conversation>> {
        match self.active_id().await? {
            Some(id) => self.get(&id).await,
            None => Ok(None),
        }
    }

    /// Drop every persisted conversation and the active id.
    pub async fn clear_all(&self) -> Result<()> {
        self.kv
            .remove(&[CONVERSATIONS_KEY, ACTIVE_CONVERSATION_KEY])
            .await?;
        info!("cleared all conversations");
        Ok(())
    }
}

fn sort_by_recency(conversations: &mut [Conversation]) {
    conversations.sort_by(|a, b| {
        b.last_updated
            .cmp(&a.last_updated)
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKvStore;
    use ytchat_common::Role;

    fn store() -> ConversationStore {
        ConversationStore::new(Arc::new(MemoryKvStore::new()))
    }

    fn conversation(id: &str, video_id: &str, last_updated: i64) -> Conversation {
        Conversation {
            id: id.to_string(),
            video_id: video_id.to_string(),
            video_title: None,
            video_transcript: None,
            messages: Vec::new(),
            created_at: 0,
            last_updated,
        }
    }

    #[test]
    fn new_conversation_id_embeds_video_and_timestamp() {
        let c = Conversation::new("abc", Some("title".into()), None);
        assert_eq!(c.id, format!("abc_{}", c.created_at));
        assert_eq!(c.created_at, c.last_updated);
        assert!(c.messages.is_empty());
    }

    #[tokio::test]
    async fn save_and_get_round_trip() {
        let store = store();
        let mut c = conversation("v1_1", "v1", 10);
        c.messages.push(Message::new(Role::User, "hello"));

        store.save(&c).await.unwrap();

        assert_eq!(store.get("v1_1").await.unwrap(), Some(c));
        assert!(store.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_caps_collection_dropping_least_recently_updated() {
        let store = store();
        for i in 0..51 {
            store
                .save(&conversation(&format!("v{i}_{i}"), &format!("v{i}"), 1_000 + i))
                .await
                .unwrap();
        }

        let all = store.list().await.unwrap();
        assert_eq!(all.len(), MAX_PERSISTED_CONVERSATIONS);
        assert!(all.iter().all(|c| c.id != "v0_0"));
        assert_eq!(all[0].id, "v50_50");
    }

    #[tokio::test]
    async fn updated_conversation_survives_pruning() {
        let store = store().with_max_conversations(2);
        store.save(&conversation("a", "va", 1)).await.unwrap();
        store.save(&conversation("b", "vb", 2)).await.unwrap();
        store.save(&conversation("a", "va", 3)).await.unwrap();
        store.save(&conversation("c", "vc", 4)).await.unwrap();

        let ids: Vec<String> = store.list().await.unwrap().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["c", "a"]);
    }

    #[tokio::test]
    async fn find_latest_for_video_prefers_most_recent() {
        let store = store();
        store.save(&conversation("v_1", "v", 1)).await.unwrap();
        store.save(&conversation("v_2", "v", 5)).await.unwrap();
        store.save(&conversation("w_3", "w", 9)).await.unwrap();

        let found = store.find_latest_for_video("v").await.unwrap().unwrap();
        assert_eq!(found.id, "v_2");
        assert!(store.find_latest_for_video("x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_clears_matching_active_id() {
        let store = store();
        store.save(&conversation("a", "va", 1)).await.unwrap();
        store.save(&conversation("b", "vb", 2)).await.unwrap();
        store.set_active("a").await.unwrap();

        assert!(store.delete("b").await.unwrap());
        assert_eq!(store.active_id().await.unwrap().as_deref(), Some("a"));

        assert!(store.delete("a").await.unwrap());
        assert!(store.active_id().await.unwrap().is_none());
        assert!(store.list().await.unwrap().is_empty());
        assert!(!store.delete("a").await.unwrap());
    }

    #[tokio::test]
    async fn update_title_bumps_last_updated() {
        let store = store();
        store.save(&conversation("a", "va", 1)).await.unwrap();

        let updated = store.update_title("a", "New title").await.unwrap();
        assert_eq!(updated.video_title.as_deref(), Some("New title"));
        assert!(updated.last_updated > 1);

        let err = store.update_title("missing", "x").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn active_conversation_and_clear_all() {
        let store = store();
        store.save(&conversation("a", "va", 1)).await.unwrap();
        store.set_active("a").await.unwrap();
        assert_eq!(store.active_conversation().await.unwrap().unwrap().id, "a");

        store.clear_all().await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
        assert!(store.active_conversation().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn zero_cap_still_keeps_latest_conversation() {
        let store = store().with_max_conversations(0);
        assert_eq!(store.max_conversations(), 1);

        store.save(&conversation("old", "v", 1)).await.unwrap();
        store.save(&conversation("new", "v", 2)).await.unwrap();

        let ids: Vec<String> = store.list().await.unwrap().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["new"]);
    }

    #[tokio::test]
    async fn corrupt_collection_fails_instead_of_resetting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ytchat.db");
        let store = ConversationStore::new(Arc::new(crate::SqliteKvStore::open(&path).unwrap()));
        for (i, id) in ["a", "b", "c"].iter().enumerate() {
            store.save(&conversation(id, "v", i as i64)).await.unwrap();
        }

        let raw = rusqlite::Connection::open(&path).unwrap();
        raw.execute(
            "UPDATE kv_entries SET value = '{\"truncated' WHERE key = ?1",
            [CONVERSATIONS_KEY],
        )
        .unwrap();

        assert!(matches!(store.list().await, Err(Error::Database(_))));
        assert!(matches!(
            store.save(&conversation("d", "v", 10)).await,
            Err(Error::Database(_))
        ));
        assert!(store.delete("a").await.is_err());

        let stored: String = raw
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1",
                [CONVERSATIONS_KEY],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(stored, "{\"truncated");
    }
}
