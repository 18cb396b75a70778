use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::document::SessionDocument;
use super::TokenStore;
use crate::models::TokenPair;

/// Persists the session as a JSON document so a restart keeps the user signed in.
///
/// The in-memory copy is the source for reads. Every write replaces the file through a
/// temporary sibling and a rename, so another reader of the file never sees a torn document.
pub struct FileStore {
    path: PathBuf,
    document: RwLock<SessionDocument>,
}

impl FileStore {
    /// Opens the store at `path`, loading any session a previous run left behind.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref().to_path_buf();
        let document = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<SessionDocument>(&bytes) {
                Ok(doc) => doc.normalized(),
                Err(e) => {
                    warn!(
                        "Ignoring unreadable session file '{}': {}",
                        path.display(),
                        e
                    );
                    SessionDocument::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => SessionDocument::default(),
            Err(e) => {
                return Err(format!(
                    "Failed to read session file '{}': {}",
                    path.display(),
                    e
                ))
            }
        };

        Ok(FileStore {
            path,
            document: RwLock::new(document),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, document: &SessionDocument) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| format!("Failed to create '{}': {}", parent.display(), e))?;
            }
        }

        let bytes = serde_json::to_vec_pretty(document)
            .map_err(|e| format!("Failed to serialize session: {}", e))?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| format!("Failed to write '{}': {}", tmp.display(), e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| format!("Failed to replace '{}': {}", self.path.display(), e))?;

        debug!("Persisted session to '{}'", self.path.display());
        Ok(())
    }

    /// Applies `change` to a copy, persists it, and only then publishes it to readers.
    /// Nothing is written when `change` reports that it left the document alone.
    async fn update(
        &self,
        change: impl FnOnce(&mut SessionDocument) -> bool,
    ) -> Result<bool, String> {
        let mut guard = self.document.write().await;
        let mut next = guard.clone();
        if !change(&mut next) {
            return Ok(false);
        }
        self.persist(&next).await?;
        *guard = next;
        Ok(true)
    }
}

#[async_trait]
impl TokenStore for FileStore {
    async fn get(&self) -> Result<Option<TokenPair>, String> {
        Ok(self.document.read().await.tokens())
    }

    async fn set(&self, pair: &TokenPair) -> Result<(), String> {
        if !pair.is_complete() {
            return Err("refusing to store an incomplete token pair".into());
        }
        self.update(|doc| {
            doc.set_tokens(pair);
            true
        })
        .await
        .map(drop)
    }

    async fn clear(&self) -> Result<(), String> {
        self.update(|doc| {
            doc.clear();
            true
        })
        .await
        .map(drop)
    }

    async fn replace_session(&self, pair: &TokenPair) -> Result<(), String> {
        if !pair.is_complete() {
            return Err("refusing to store an incomplete token pair".into());
        }
        self.update(|doc| {
            doc.replace_session(pair);
            true
        })
        .await
        .map(drop)
    }

    async fn set_if_current(
        &self,
        expected_access: &str,
        next: Option<&TokenPair>,
    ) -> Result<bool, String> {
        if next.is_some_and(|pair| !pair.is_complete()) {
            return Err("refusing to store an incomplete token pair".into());
        }
        self.update(|doc| doc.set_if_current(expected_access, next))
            .await
    }

    async fn is_authenticated(&self) -> Result<bool, String> {
        Ok(self.document.read().await.is_authenticated())
    }

    async fn cache_get(&self, key: &str) -> Result<Option<Value>, String> {
        Ok(self.document.read().await.cache_get(key))
    }

    async fn cache_set(&self, key: &str, value: Value) -> Result<(), String> {
        self.update(|doc| {
            doc.cache_set(key, value);
            true
        })
        .await
        .map(drop)
    }

    fn get_name(&self) -> &str {
        "file"
    }
}
