//! Single-flight access-token refresh.

mod coordinator;

pub use coordinator::RefreshCoordinator;
