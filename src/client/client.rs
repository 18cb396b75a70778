use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::classify::{classify, Classification};
use super::request::RequestOptions;
use super::transport::exchange;
use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::metrics::{Metrics, MetricsRecorder};
use crate::models::envelope::payload;
use crate::refresh::RefreshCoordinator;
use crate::session::{Session, SessionSignal};
use crate::store::TokenStore;
use crate::utils::log_throttle::should_emit;

const UNAUTHENTICATED_LOG_WINDOW: Duration = Duration::from_secs(30);

/// The two attempts a request may make. There is no third.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    Initial,
    Retry,
}

struct ClientInner {
    http: reqwest::Client,
    api: ApiConfig,
    store: Arc<dyn TokenStore>,
    signal: SessionSignal,
    coordinator: RefreshCoordinator,
    metrics: Metrics,
}

/// The request-execution entry point every domain service goes through.
///
/// Attaches the current access token, classifies the response, and on an auth failure
/// refreshes once and retries once. Cloning is cheap and shares all state.
#[derive(Clone)]
pub struct AuthenticatedClient {
    inner: Arc<ClientInner>,
}

impl AuthenticatedClient {
    /// Builds a client with its own connection pool.
    pub fn new(
        api: ApiConfig,
        store: Arc<dyn TokenStore>,
        signal: SessionSignal,
        metrics: Metrics,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self::with_http_client(http, api, store, signal, metrics))
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    pub fn with_http_client(
        http: reqwest::Client,
        api: ApiConfig,
        store: Arc<dyn TokenStore>,
        signal: SessionSignal,
        metrics: Metrics,
    ) -> Self {
        let coordinator = RefreshCoordinator::new(
            http.clone(),
            &api,
            store.clone(),
            signal.clone(),
            metrics.clone(),
        );
        AuthenticatedClient {
            inner: Arc::new(ClientInner {
                http,
                api,
                store,
                signal,
                coordinator,
                metrics,
            }),
        }
    }

    /// Executes `endpoint` with the session's bearer token and returns the parsed body.
    ///
    /// # Errors
    ///
    /// [`Error::Unauthenticated`] without sending anything when no tokens are stored,
    /// [`Error::Network`] on transport failure or timeout, [`Error::SessionExpired`] once
    /// refresh or the single retry is exhausted, and [`Error::Business`] for everything
    /// else the server rejects.
    pub async fn request(&self, endpoint: &str, options: RequestOptions) -> Result<Value> {
        let started = Instant::now();
        let result = self.execute(endpoint, &options).await;
        let outcome = outcome_label(&result);
        self.inner
            .metrics
            .record_request(outcome, started.elapsed().as_secs_f64());
        debug!(
            event_name = "client.request.finished",
            event_domain = "client",
            endpoint,
            method = options.method().as_str(),
            outcome,
            "request finished"
        );
        result
    }

    /// Like [`request`](Self::request), deserializing the envelope's `data` member.
    pub async fn request_data<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<T> {
        let body = self.request(endpoint, options).await?;
        serde_json::from_value(payload(&body).clone())
            .map_err(|e| Error::Decode(format!("unexpected payload from '{}': {}", endpoint, e)))
    }

    pub async fn get(&self, endpoint: &str) -> Result<Value> {
        self.request(endpoint, RequestOptions::get()).await
    }

    pub async fn post(&self, endpoint: &str, body: Value) -> Result<Value> {
        self.request(endpoint, RequestOptions::post(body)).await
    }

    pub async fn put(&self, endpoint: &str, body: Value) -> Result<Value> {
        self.request(endpoint, RequestOptions::put(body)).await
    }

    pub async fn delete(&self, endpoint: &str) -> Result<Value> {
        self.request(endpoint, RequestOptions::delete()).await
    }

    /// The session as the rest of the application should see it right now.
    pub async fn session(&self) -> Result<Session> {
        let has_tokens = self.inner.store.get().await.map_err(Error::Store)?.is_some();
        Ok(Session::derive(has_tokens, self.inner.signal.is_raised()))
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.inner.store
    }

    pub fn signal(&self) -> &SessionSignal {
        &self.inner.signal
    }

    pub fn metrics(&self) -> &Metrics {
        &self.inner.metrics
    }

    pub fn api(&self) -> &ApiConfig {
        &self.inner.api
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    async fn execute(&self, endpoint: &str, options: &RequestOptions) -> Result<Value> {
        let Some(tokens) = self.inner.store.get().await.map_err(Error::Store)? else {
            if let Some(suppressed_count) =
                should_emit("client.request.unauthenticated", UNAUTHENTICATED_LOG_WINDOW)
            {
                warn!(
                    event_name = "client.request.unauthenticated",
                    event_domain = "client",
                    endpoint,
                    suppressed_count,
                    "request refused: no session tokens"
                );
            }
            return Err(Error::Unauthenticated);
        };

        let mut access_token = tokens.access_token;
        let mut attempt = Attempt::Initial;
        loop {
            match (self.send(endpoint, options, &access_token).await?, attempt) {
                (Classification::Success(body), _) => return Ok(body),
                (Classification::Rejected(err), _) => return Err(err),
                (Classification::TokenInvalid, Attempt::Initial) => {
                    debug!("Token rejected for '{}'; refreshing before retry", endpoint);
                    access_token = self
                        .inner
                        .coordinator
                        .ensure_fresh_token(&access_token)
                        .await?;
                    attempt = Attempt::Retry;
                }
                (Classification::TokenInvalid, Attempt::Retry) => {
                    info!(
                        event_name = "client.request.retry_rejected",
                        event_domain = "client",
                        endpoint,
                        "retry rejected the refreshed token; ending session"
                    );
                    self.inner.coordinator.expire_session(&access_token).await;
                    return Err(Error::SessionExpired);
                }
            }
        }
    }

    /// One HTTP exchange. Only transport failures come back as `Err`.
    async fn send(
        &self,
        endpoint: &str,
        options: &RequestOptions,
        access_token: &str,
    ) -> Result<Classification> {
        let mut builder = self
            .inner
            .http
            .request(options.method.clone(), self.inner.api.url(endpoint));
        if !options.query.is_empty() {
            builder = builder.query(&options.query);
        }
        for (name, value) in &options.headers {
            if name.eq_ignore_ascii_case("authorization") {
                continue;
            }
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &options.body {
            builder = builder.json(body);
        }
        let builder = builder.bearer_auth(access_token);

        let (status, body) = exchange(builder, self.inner.api.timeout(), endpoint).await?;
        Ok(classify(status, &body))
    }
}

fn outcome_label(result: &Result<Value>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(Error::Unauthenticated) => "unauthenticated",
        Err(Error::SessionExpired) => "session_expired",
        Err(Error::Network(_)) => "network_error",
        Err(Error::Business { .. }) => "business_error",
        Err(Error::Decode(_)) => "decode_error",
        Err(Error::Store(_)) => "store_error",
        Err(_) => "error",
    }
}
