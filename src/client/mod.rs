pub mod classify;
#[allow(clippy::module_inception)]
mod client;
mod request;
pub(crate) mod transport;

pub use client::AuthenticatedClient;
pub use request::RequestOptions;
