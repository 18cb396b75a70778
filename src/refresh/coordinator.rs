use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::client::transport::exchange;
use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::metrics::{Metrics, MetricsRecorder};
use crate::models::auth::RefreshRequest;
use crate::models::{ApiEnvelope, AuthPayload, TokenPair};
use crate::routes;
use crate::session::SessionSignal;
use crate::store::TokenStore;

/// Why a refresh could not produce new tokens. Cloned out to every waiter.
#[derive(Debug, Clone)]
struct RefreshFailure(String);

type SharedRefresh = Shared<BoxFuture<'static, std::result::Result<String, RefreshFailure>>>;

struct CoordinatorInner {
    http: reqwest::Client,
    refresh_url: String,
    refresh_timeout: Duration,
    store: Arc<dyn TokenStore>,
    signal: SessionSignal,
    metrics: Metrics,
    /// The one outstanding refresh, if any. Emptied as soon as it settles.
    in_flight: Mutex<Option<SharedRefresh>>,
}

/// Collapses concurrent refresh requests into one call to the refresh endpoint.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl RefreshCoordinator {
    pub fn new(
        http: reqwest::Client,
        api: &ApiConfig,
        store: Arc<dyn TokenStore>,
        signal: SessionSignal,
        metrics: Metrics,
    ) -> Self {
        RefreshCoordinator {
            inner: Arc::new(CoordinatorInner {
                http,
                refresh_url: api.url(routes::REFRESH),
                refresh_timeout: api.refresh_timeout(),
                store,
                signal,
                metrics,
                in_flight: Mutex::new(None),
            }),
        }
    }

    /// Returns an access token newer than `stale_access_token`.
    ///
    /// Joins the refresh already in flight when there is one. When the store already holds a
    /// different token, that token is returned without any network call. Every failure maps to
    /// [`Error::SessionExpired`]. By then the store is cleared and the signal raised, unless a
    /// logout or a new sign-in replaced the session while the refresh was running; that newer
    /// session is left untouched.
    pub async fn ensure_fresh_token(&self, stale_access_token: &str) -> Result<String> {
        let refresh = {
            let mut slot = self.inner.in_flight.lock().await;
            match slot.as_ref() {
                Some(pending) => {
                    debug!("Joining refresh already in flight");
                    pending.clone()
                }
                None => match self.inner.store.get().await.map_err(Error::Store)? {
                    None => {
                        debug!("No tokens left to refresh; session already ended");
                        return Err(Error::SessionExpired);
                    }
                    Some(current) if current.access_token != stale_access_token => {
                        debug!("Access token was rotated since the request was issued");
                        return Ok(current.access_token);
                    }
                    Some(current) => {
                        let pending = self.start(current);
                        *slot = Some(pending.clone());
                        pending
                    }
                },
            }
        };

        refresh.await.map_err(|RefreshFailure(reason)| {
            debug!("Refresh waiter released with failure: {}", reason);
            Error::SessionExpired
        })
    }

    /// Ends the session that issued `stale_access_token`: clears the tokens and raises the
    /// session signal. Does nothing when a logout or a new sign-in already replaced it.
    pub async fn expire_session(&self, stale_access_token: &str) {
        self.inner.expire_session(stale_access_token).await
    }

    /// Spawns the refresh so it settles even if every waiter is cancelled.
    fn start(&self, current: TokenPair) -> SharedRefresh {
        info!(
            event_name = "auth.refresh.started",
            event_domain = "auth",
            "starting token refresh"
        );
        let inner = self.inner.clone();
        let task = tokio::spawn(async move {
            let worker = {
                let inner = inner.clone();
                let current = current.clone();
                tokio::spawn(async move { inner.run_refresh(&current).await })
            };
            let outcome = match worker.await {
                Ok(outcome) => outcome,
                Err(e) => inner.abandon(&current.access_token, e).await,
            };
            // Store and signal are settled before the slot opens, so a later caller sees the result.
            inner.in_flight.lock().await.take();
            outcome
        });
        async move {
            task.await
                .unwrap_or_else(|e| Err(RefreshFailure(format!("refresh task failed: {}", e))))
        }
        .boxed()
        .shared()
    }
}

impl CoordinatorInner {
    async fn run_refresh(&self, current: &TokenPair) -> std::result::Result<String, RefreshFailure> {
        let pair = match self.call_refresh_endpoint(&current.refresh_token).await {
            Ok(pair) => pair,
            Err(RefreshFailure(reason)) => {
                self.metrics.record_refresh("failure");
                warn!(
                    event_name = "auth.refresh.failed",
                    event_domain = "auth",
                    reason = reason.as_str(),
                    "token refresh failed; ending session"
                );
                self.expire_session(&current.access_token).await;
                return Err(RefreshFailure(reason));
            }
        };

        match self
            .store
            .set_if_current(&current.access_token, Some(&pair))
            .await
        {
            Ok(true) => {
                self.metrics.record_refresh("success");
                info!(
                    event_name = "auth.refresh.succeeded",
                    event_domain = "auth",
                    "token refresh succeeded"
                );
                Ok(pair.access_token)
            }
            Ok(false) => {
                self.metrics.record_refresh("superseded");
                info!(
                    event_name = "auth.refresh.superseded",
                    event_domain = "auth",
                    "session changed during refresh; discarding refreshed tokens"
                );
                Err(RefreshFailure("session changed during refresh".into()))
            }
            Err(e) => {
                self.metrics.record_refresh("failure");
                error!("Failed to store refreshed tokens: {}", e);
                self.expire_session(&current.access_token).await;
                Err(RefreshFailure(format!("failed to store refreshed tokens: {}", e)))
            }
        }
    }

    /// The refresh task died before settling; end its session as a failed refresh would.
    async fn abandon(
        &self,
        stale_access_token: &str,
        e: tokio::task::JoinError,
    ) -> std::result::Result<String, RefreshFailure> {
        self.metrics.record_refresh("failure");
        error!(
            event_name = "auth.refresh.aborted",
            event_domain = "auth",
            "refresh task failed: {}",
            e
        );
        self.expire_session(stale_access_token).await;
        Err(RefreshFailure(format!("refresh task failed: {}", e)))
    }

    async fn call_refresh_endpoint(
        &self,
        refresh_token: &str,
    ) -> std::result::Result<TokenPair, RefreshFailure> {
        let request = self
            .http
            .post(&self.refresh_url)
            .json(&RefreshRequest { refresh_token });
        let (status, bytes) = exchange(request, self.refresh_timeout, routes::REFRESH)
            .await
            .map_err(|e| RefreshFailure(format!("refresh call failed: {}", e)))?;

        let body: serde_json::Value = serde_json::from_slice(&bytes)
            .map_err(|e| RefreshFailure(format!("malformed refresh response: {}", e)))?;
        let envelope = ApiEnvelope::from_body(&body);
        if !(200..300).contains(&status) || envelope.is_failure() {
            return Err(RefreshFailure(format!(
                "refresh rejected with status {}: {}",
                status,
                envelope.message_or("no message")
            )));
        }

        AuthPayload::from_body(&body)
            .map(|auth| auth.tokens)
            .map_err(|e| RefreshFailure(e.to_string()))
    }

    async fn expire_session(&self, stale_access_token: &str) {
        match self.store.set_if_current(stale_access_token, None).await {
            Ok(true) => {}
            Ok(false) => {
                debug!("Session already replaced or signed out; not raising expiry");
                return;
            }
            Err(e) => error!("Failed to clear token store on session expiry: {}", e),
        }
        if self.signal.raise() {
            self.metrics.record_session_expired();
        }
    }
}
