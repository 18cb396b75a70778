//! Library exports for renaltrack, shared between the binary and tests.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod refresh;
pub mod routes;
pub mod session;
pub mod startup;
pub mod state;
pub mod store;
pub mod utils;

pub use client::{AuthenticatedClient, RequestOptions};
pub use error::{Error, Result};
pub use session::{Session, SessionEvent, SessionSignal};
