use serde_json::Value;
use std::sync::Arc;
use tracing::info;
use ytchat_common::{Error, Result};

use crate::kv::KeyValueStore;

const API_KEY_PREFIX: &str = "youtube-ai-api-key";

/// Per-provider API keys kept in the key-value store as plain text.
#[derive(Clone)]
pub struct ApiKeyStore {
    kv: Arc<dyn KeyValueStore>,
}

impl ApiKeyStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    fn storage_key(provider: &str) -> String {
        format!("{API_KEY_PREFIX}:{provider}")
    }

    pub async fn save(&self, provider: &str, api_key: &str) -> Result<()> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(Error::Config("Please enter a valid API key".to_string()));
        }
        self.kv
            .set_one(&Self::storage_key(provider), Value::String(api_key.to_string()))
            .await?;
        info!("API key saved for provider '{}'", provider);
        Ok(())
    }

    pub async fn get(&self, provider: &str) -> Result<Option<String>> {
        Ok(self
            .kv
            .get_one(&Self::storage_key(provider))
            .await?
            .and_then(|v| v.as_str().map(str::to_string)))
    }

    pub async fn clear(&self, provider: &str) -> Result<()> {
        let key = Self::storage_key(provider);
        self.kv.remove(&[key.as_str()]).await?;
        info!("API key removed for provider '{}'", provider);
        Ok(())
    }

    pub async fn is_configured(&self, provider: &str) -> Result<bool> {
        Ok(self.get(provider).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKvStore;

    #[tokio::test]
    async fn save_get_clear() {
        let keys = ApiKeyStore::new(Arc::new(MemoryKvStore::new()));
        assert!(!keys.is_configured("gemini").await.unwrap());

        keys.save("gemini", "  AIza-test-key \n").await.unwrap();
        assert_eq!(keys.get("gemini").await.unwrap().as_deref(), Some("AIza-test-key"));
        assert!(keys.get("openai").await.unwrap().is_none());

        keys.clear("gemini").await.unwrap();
        assert!(!keys.is_configured("gemini").await.unwrap());
    }

    #[tokio::test]
    async fn rejects_blank_key() {
        let keys = ApiKeyStore::new(Arc::new(MemoryKvStore::new()));
        let err = keys.save("openai", "   ").await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
