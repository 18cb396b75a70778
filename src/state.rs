//! Shared application context.
//!
//! Everything a front end needs to talk to the API: the request entry point,
//! the auth operations, and the expiry signal to subscribe to.

use crate::auth::AuthService;
use crate::client::AuthenticatedClient;
use crate::config::ConfigV1;
use crate::metrics::Metrics;
use crate::session::SessionSignal;
use crate::store::TokenStore;
use std::sync::Arc;

/// Application context shared by every consumer of the client.
///
/// Cloning is cheap; all clones share the same store, signal and refresh state.
#[derive(Clone)]
pub struct AppContext {
    /// Configuration loaded at startup.
    pub config: Arc<ConfigV1>,
    /// The single request-execution entry point.
    pub client: AuthenticatedClient,
    /// Login, logout and session transitions.
    pub auth: AuthService,
    /// Token store backing the session.
    pub store: Arc<dyn TokenStore>,
    /// Broadcast raised once per session-expiry episode.
    pub signal: SessionSignal,
    pub metrics: Metrics,
}
