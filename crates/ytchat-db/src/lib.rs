pub mod api_keys;
pub mod conversation_store;
pub mod kv;
pub mod sqlite_store;

pub use api_keys::ApiKeyStore;
pub use conversation_store::{
    ACTIVE_CONVERSATION_KEY, CONVERSATIONS_KEY, Conversation, ConversationStore,
    MAX_PERSISTED_CONVERSATIONS,
};
pub use kv::{KeyValueStore, MemoryKvStore};
pub use sqlite_store::SqliteKvStore;
