use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::document::SessionDocument;
use super::TokenStore;
use crate::models::TokenPair;

/// A process-local store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    document: RwLock<SessionDocument>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// A store that starts out signed in, handy for tests and for handing over tokens.
    pub fn with_tokens(pair: &TokenPair) -> Self {
        let mut document = SessionDocument::default();
        document.set_tokens(pair);
        MemoryStore {
            document: RwLock::new(document),
        }
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn get(&self) -> Result<Option<TokenPair>, String> {
        Ok(self.document.read().await.tokens())
    }

    async fn set(&self, pair: &TokenPair) -> Result<(), String> {
        if !pair.is_complete() {
            return Err("refusing to store an incomplete token pair".into());
        }
        self.document.write().await.set_tokens(pair);
        Ok(())
    }

    async fn clear(&self) -> Result<(), String> {
        self.document.write().await.clear();
        Ok(())
    }

    async fn replace_session(&self, pair: &TokenPair) -> Result<(), String> {
        if !pair.is_complete() {
            return Err("refusing to store an incomplete token pair".into());
        }
        self.document.write().await.replace_session(pair);
        Ok(())
    }

    async fn set_if_current(
        &self,
        expected_access: &str,
        next: Option<&TokenPair>,
    ) -> Result<bool, String> {
        if next.is_some_and(|pair| !pair.is_complete()) {
            return Err("refusing to store an incomplete token pair".into());
        }
        Ok(self
            .document
            .write()
            .await
            .set_if_current(expected_access, next))
    }

    async fn is_authenticated(&self) -> Result<bool, String> {
        Ok(self.document.read().await.is_authenticated())
    }

    async fn cache_get(&self, key: &str) -> Result<Option<Value>, String> {
        Ok(self.document.read().await.cache_get(key))
    }

    async fn cache_set(&self, key: &str, value: Value) -> Result<(), String> {
        self.document.write().await.cache_set(key, value);
        Ok(())
    }

    fn get_name(&self) -> &str {
        "memory"
    }
}
