//! Application startup and wiring.
//!
//! Builds the token store from configuration and connects it to the session
//! signal, refresh coordinator, client and auth service.

use std::sync::Arc;
use tracing::info;

use crate::auth::AuthService;
use crate::client::AuthenticatedClient;
use crate::config::ConfigV1;
use crate::error::Result;
use crate::metrics::Metrics;
use crate::session::SessionSignal;
use crate::state::AppContext;
use crate::store::create_store;

/// Builds the application context from a loaded configuration.
///
/// # Errors
///
/// Returns an error if the configured token store cannot be opened or the
/// HTTP client cannot be constructed.
pub async fn build(config: Arc<ConfigV1>) -> Result<AppContext> {
    let store = create_store(&config.store).await?;
    let signal = SessionSignal::new();
    let metrics = Metrics::new();
    let client = AuthenticatedClient::new(
        config.api.clone(),
        store.clone(),
        signal.clone(),
        metrics.clone(),
    )?;
    let auth = AuthService::new(client.clone());

    info!(
        "Client ready for '{}' using the {} token store",
        config.api.base_url,
        store.get_name()
    );

    Ok(AppContext {
        config,
        client,
        auth,
        store,
        signal,
        metrics,
    })
}
