#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use renaltrack::auth::AuthService;
use renaltrack::config::ApiConfig;
use renaltrack::metrics::Metrics;
use renaltrack::models::TokenPair;
use renaltrack::session::Subscription;
use renaltrack::store::{MemoryStore, TokenStore};
use renaltrack::{AuthenticatedClient, SessionEvent, SessionSignal};
use serde_json::json;

/// A client wired to an in-memory store, counting expiry notifications.
pub struct Harness {
    pub client: AuthenticatedClient,
    pub auth: AuthService,
    pub store: Arc<dyn TokenStore>,
    pub signal: SessionSignal,
    pub metrics: Metrics,
    expiries: Arc<AtomicUsize>,
    _subscription: Subscription,
}

impl Harness {
    pub fn expiry_notifications(&self) -> usize {
        self.expiries.load(Ordering::SeqCst)
    }

    pub async fn tokens(&self) -> Option<TokenPair> {
        self.store.get().await.expect("memory store never fails")
    }
}

pub fn api(base_url: &str) -> ApiConfig {
    ApiConfig {
        base_url: base_url.to_string(),
        timeout_in_ms: 2_000,
        refresh_timeout_in_ms: 2_000,
    }
}

pub fn harness(base_url: &str, tokens: Option<TokenPair>) -> Harness {
    harness_with_api(api(base_url), tokens)
}

pub fn harness_with_api(api: ApiConfig, tokens: Option<TokenPair>) -> Harness {
    let store: Arc<dyn TokenStore> = match &tokens {
        Some(pair) => Arc::new(MemoryStore::with_tokens(pair)),
        None => Arc::new(MemoryStore::new()),
    };
    let signal = SessionSignal::new();
    let metrics = Metrics::new();
    let client = AuthenticatedClient::new(api, store.clone(), signal.clone(), metrics.clone())
        .expect("failed to build client");

    let expiries = Arc::new(AtomicUsize::new(0));
    let counter = expiries.clone();
    let subscription = signal.subscribe(move |event| {
        if let SessionEvent::Expired { .. } = event {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    Harness {
        auth: AuthService::new(client.clone()),
        client,
        store,
        signal,
        metrics,
        expiries,
        _subscription: subscription,
    }
}

pub fn signed_in() -> Option<TokenPair> {
    Some(TokenPair::new("T1", "R1"))
}

/// A refresh response in the API's envelope.
pub fn tokens_body(access: &str, refresh: &str) -> String {
    json!({
        "success": true,
        "data": { "tokens": { "accessToken": access, "refreshToken": refresh } }
    })
    .to_string()
}

pub fn ok_body(data: serde_json::Value) -> String {
    json!({ "success": true, "data": data }).to_string()
}

/// An address that refuses connections.
pub const UNREACHABLE: &str = "http://127.0.0.1:1";
