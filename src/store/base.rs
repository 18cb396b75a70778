use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use super::{file_store::FileStore, memory_store::MemoryStore};
use crate::config::{StoreBackend, StoreConfig};
use crate::error::{Error, Result};
use crate::models::TokenPair;

/// The TokenStore trait is the only way to read or mutate the session's credentials.
///
/// Implementations must never expose a half-written pair to a concurrent `get`.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self) -> Result<Option<TokenPair>, String>;
    /// Replaces both tokens as one unit.
    async fn set(&self, pair: &TokenPair) -> Result<(), String>;
    /// Removes the tokens and every piece of session-scoped cached data.
    async fn clear(&self) -> Result<(), String>;
    /// Starts a new session in one write: stores `pair` and drops the previous cache.
    async fn replace_session(&self, pair: &TokenPair) -> Result<(), String>;
    /// Rotates the pair, or clears the session when `next` is `None`, only while the
    /// store still holds `expected_access`. Returns `false` when the session moved on.
    async fn set_if_current(
        &self,
        expected_access: &str,
        next: Option<&TokenPair>,
    ) -> Result<bool, String>;
    async fn is_authenticated(&self) -> Result<bool, String>;
    async fn cache_get(&self, key: &str) -> Result<Option<Value>, String>;
    async fn cache_set(&self, key: &str, value: Value) -> Result<(), String>;
    fn get_name(&self) -> &str;
}

/// Creates a concrete store implementation based on the StoreConfig.
/// If `store.persist = false`, returns a MemoryStore. Otherwise, opens the configured backend.
pub async fn create_store(config: &StoreConfig) -> Result<Arc<dyn TokenStore>> {
    if !config.persist {
        info!("Token persistence is disabled. Using MemoryStore.");
        return Ok(Arc::new(MemoryStore::new()));
    }

    match &config.backend {
        Some(StoreBackend::File(file_config)) => {
            let store = FileStore::open(&file_config.path)
                .await
                .map_err(Error::Store)?;
            info!(
                "Opened file token store at '{}'",
                file_config.path.display()
            );
            Ok(Arc::new(store))
        }
        None => Err(Error::Config(
            "store.persist is set, but no store backend is configured".into(),
        )),
    }
}
