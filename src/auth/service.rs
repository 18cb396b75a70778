use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::client::transport::exchange;
use crate::client::AuthenticatedClient;
use crate::error::{Error, Result};
use crate::models::auth::{GoogleRequest, LoginRequest, RefreshRequest, RegisterRequest};
use crate::models::envelope::payload;
use crate::models::{ApiEnvelope, AuthPayload};
use crate::routes;
use crate::session::Session;

/// Session-scoped cache keys written after a credential exchange or `/auth/me`.
pub const CACHE_USER: &str = "user";
pub const CACHE_PROFILE: &str = "profile";

/// Credential exchanges and session transitions on top of an [`AuthenticatedClient`].
#[derive(Clone)]
pub struct AuthService {
    client: AuthenticatedClient,
}

impl AuthService {
    pub fn new(client: AuthenticatedClient) -> Self {
        AuthService { client }
    }

    pub fn client(&self) -> &AuthenticatedClient {
        &self.client
    }

    /// Exchanges email and password for a token pair and stores it.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthPayload> {
        self.exchange_credentials(routes::LOGIN, &LoginRequest { email, password })
            .await
    }

    pub async fn register(&self, email: &str, password: &str, full_name: &str) -> Result<AuthPayload> {
        self.exchange_credentials(
            routes::REGISTER,
            &RegisterRequest {
                email,
                password,
                full_name,
            },
        )
        .await
    }

    /// Exchanges a Google ID token obtained by the front end.
    pub async fn login_with_google(&self, id_token: &str) -> Result<AuthPayload> {
        self.exchange_credentials(routes::GOOGLE, &GoogleRequest { id_token })
            .await
    }

    /// Ends the session. The server call is best effort; local state is cleared regardless.
    pub async fn logout(&self) -> Result<()> {
        let store = self.client.store();
        if let Some(tokens) = store.get().await.map_err(Error::Store)? {
            let request = self
                .client
                .http()
                .post(self.client.api().url(routes::LOGOUT))
                .bearer_auth(&tokens.access_token)
                .json(&RefreshRequest {
                    refresh_token: &tokens.refresh_token,
                });
            match exchange(request, self.client.api().timeout(), routes::LOGOUT).await {
                Ok((status, _)) if (200..300).contains(&status) => {}
                Ok((status, _)) => warn!("Server logout returned status {}; continuing", status),
                Err(e) => warn!("Server logout failed: {}; continuing", e),
            }
        }

        store.clear().await.map_err(Error::Store)?;
        self.client.signal().acknowledge();
        info!(
            event_name = "auth.logout",
            event_domain = "auth",
            "signed out; local session cleared"
        );
        Ok(())
    }

    /// Fetches the current user through the authenticated path and caches it.
    pub async fn me(&self) -> Result<Value> {
        let body = self.client.get(routes::ME).await?;
        let me = payload(&body).clone();
        self.client
            .store()
            .cache_set(CACHE_PROFILE, me.clone())
            .await
            .map_err(Error::Store)?;
        Ok(me)
    }

    pub async fn cached_profile(&self) -> Result<Option<Value>> {
        self.client
            .store()
            .cache_get(CACHE_PROFILE)
            .await
            .map_err(Error::Store)
    }

    pub async fn session(&self) -> Result<Session> {
        self.client.session().await
    }

    /// Called once a person has seen the expiry prompt. Leaves the session signed out.
    pub async fn acknowledge_expiry(&self) -> Result<()> {
        self.client.store().clear().await.map_err(Error::Store)?;
        self.client.signal().acknowledge();
        Ok(())
    }

    async fn exchange_credentials<B: Serialize>(&self, endpoint: &str, body: &B) -> Result<AuthPayload> {
        let request = self
            .client
            .http()
            .post(self.client.api().url(endpoint))
            .json(body);
        let (status, raw) = exchange(request, self.client.api().timeout(), endpoint).await?;

        let body: Value = if raw.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&raw).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&raw).trim().to_string())
            })
        };
        let envelope = ApiEnvelope::from_body(&body);
        if !(200..300).contains(&status) || envelope.is_failure() {
            // Bad credentials are a business failure here, never a reason to refresh.
            let message = match (&envelope.message, &body) {
                (Some(message), _) => message.clone(),
                (None, Value::String(text)) if !text.is_empty() => text.clone(),
                _ => "authentication failed".to_string(),
            };
            return Err(Error::Business {
                status,
                code: envelope.code,
                message,
                body,
            });
        }

        let auth = AuthPayload::from_body(&body)?;
        let store = self.client.store();
        // One write: the new pair lands together with an empty session cache.
        store
            .replace_session(&auth.tokens)
            .await
            .map_err(Error::Store)?;
        if let Some(user) = &auth.user {
            store
                .cache_set(CACHE_USER, user.clone())
                .await
                .map_err(Error::Store)?;
        }
        if let Some(profile) = &auth.profile {
            store
                .cache_set(CACHE_PROFILE, profile.clone())
                .await
                .map_err(Error::Store)?;
        }
        // A fresh sign-in closes out any expiry episode nobody acknowledged.
        self.client.signal().acknowledge();

        info!(
            event_name = "auth.signed_in",
            event_domain = "auth",
            endpoint,
            "credential exchange succeeded"
        );
        Ok(auth)
    }
}
