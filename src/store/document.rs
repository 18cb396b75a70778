use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::TokenPair;

/// Everything the client keeps between runs. Serialized as-is by the file store.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionDocument {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    /// Route-guard flag. Mirrors token presence and is only written alongside the tokens.
    #[serde(default)]
    is_authenticated: bool,
    /// Data only meaningful while signed in (profile, user, app data).
    #[serde(default)]
    cache: BTreeMap<String, Value>,
}

impl SessionDocument {
    pub fn tokens(&self) -> Option<TokenPair> {
        match (&self.access_token, &self.refresh_token) {
            (Some(access), Some(refresh)) => {
                let pair = TokenPair::new(access.clone(), refresh.clone());
                pair.is_complete().then_some(pair)
            }
            _ => None,
        }
    }

    pub fn set_tokens(&mut self, pair: &TokenPair) {
        self.access_token = Some(pair.access_token.clone());
        self.refresh_token = Some(pair.refresh_token.clone());
        self.is_authenticated = true;
    }

    pub fn clear(&mut self) {
        *self = SessionDocument::default();
    }

    /// Starts a new session: the pair is stored and the previous cache dropped.
    pub fn replace_session(&mut self, pair: &TokenPair) {
        self.clear();
        self.set_tokens(pair);
    }

    /// Rotates the pair (or clears the session for `None`) only while `expected_access`
    /// is still the stored access token. Returns whether anything changed.
    pub fn set_if_current(&mut self, expected_access: &str, next: Option<&TokenPair>) -> bool {
        if self.access_token.as_deref() != Some(expected_access) {
            return false;
        }
        match next {
            Some(pair) => self.set_tokens(pair),
            None => self.clear(),
        }
        true
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    pub fn cache_get(&self, key: &str) -> Option<Value> {
        self.cache.get(key).cloned()
    }

    pub fn cache_set(&mut self, key: &str, value: Value) {
        self.cache.insert(key.to_string(), value);
    }

    /// Drops a half-present pair left behind by an older writer.
    pub fn normalized(mut self) -> Self {
        if self.tokens().is_none() {
            self.clear();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clear_drops_tokens_flag_and_cache() {
        let mut doc = SessionDocument::default();
        doc.set_tokens(&TokenPair::new("T1", "R1"));
        doc.cache_set("profile", json!({"fullName": "Ada"}));
        assert!(doc.is_authenticated());

        doc.clear();
        assert_eq!(doc, SessionDocument::default());
    }

    #[test]
    fn replace_session_drops_previous_cache() {
        let mut doc = SessionDocument::default();
        doc.set_tokens(&TokenPair::new("T1", "R1"));
        doc.cache_set("profile", json!({"fullName": "Ada"}));

        doc.replace_session(&TokenPair::new("T9", "R9"));
        assert_eq!(doc.tokens(), Some(TokenPair::new("T9", "R9")));
        assert!(doc.cache_get("profile").is_none());
    }

    #[test]
    fn set_if_current_ignores_a_superseded_session() {
        let mut doc = SessionDocument::default();
        doc.set_tokens(&TokenPair::new("T9", "R9"));
        doc.cache_set("profile", json!({"fullName": "Grace"}));

        assert!(!doc.set_if_current("T1", Some(&TokenPair::new("T2", "R2"))));
        assert!(!doc.set_if_current("T1", None));
        assert_eq!(doc.tokens(), Some(TokenPair::new("T9", "R9")));

        assert!(doc.set_if_current("T9", Some(&TokenPair::new("T10", "R10"))));
        assert_eq!(doc.tokens(), Some(TokenPair::new("T10", "R10")));
        assert!(doc.cache_get("profile").is_some());

        assert!(doc.set_if_current("T10", None));
        assert_eq!(doc, SessionDocument::default());
    }

    #[test]
    fn dangling_access_token_is_normalized_away() {
        let doc: SessionDocument = serde_json::from_value(json!({
            "accessToken": "T1",
            "isAuthenticated": true,
            "cache": {"user": {"id": 1}}
        }))
        .unwrap();
        let doc = doc.normalized();
        assert!(doc.tokens().is_none());
        assert!(!doc.is_authenticated());
        assert!(doc.cache_get("user").is_none());
    }
}
