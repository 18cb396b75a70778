//! Session state and the expiry broadcast every consumer listens to.

mod signal;

pub use signal::{ExpiryGuard, SessionEvent, SessionSignal, Subscription};

/// The logical session state, derived from token presence and the expiry signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Session {
    Authenticated,
    Unauthenticated,
    Expired,
}

impl Session {
    pub fn derive(has_tokens: bool, expired: bool) -> Self {
        match (expired, has_tokens) {
            (true, _) => Session::Expired,
            (false, true) => Session::Authenticated,
            (false, false) => Session::Unauthenticated,
        }
    }
}
