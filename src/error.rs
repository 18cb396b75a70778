//! Error taxonomy surfaced to callers of the client.

use serde_json::Value;

/// Convenience alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// No token context exists; the request was never sent.
    #[error("not authenticated")]
    Unauthenticated,

    /// Refresh or retry was exhausted. The session signal has been raised.
    #[error("session expired")]
    SessionExpired,

    /// Transport failure or timeout. Never triggers a refresh.
    #[error("network error: {0}")]
    Network(String),

    /// A well-formed failure unrelated to authentication.
    #[error("request failed with status {status}: {message}")]
    Business {
        status: u16,
        code: Option<String>,
        message: String,
        body: Value,
    },

    #[error("invalid response: {0}")]
    Decode(String),

    #[error("token store error: {0}")]
    Store(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether this error ends the current session for the caller.
    pub fn is_session_terminal(&self) -> bool {
        matches!(self, Error::SessionExpired | Error::Unauthenticated)
    }

    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Network(format!("request timed out: {}", err))
        } else {
            Error::Network(err.to_string())
        }
    }
}
