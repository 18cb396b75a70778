//! Sign-in, sign-out and session-state operations.

mod service;

pub use service::{AuthService, CACHE_PROFILE, CACHE_USER};
