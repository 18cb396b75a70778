pub mod auth;
pub mod envelope;
pub mod token;

pub use auth::AuthPayload;
pub use envelope::ApiEnvelope;
pub use token::TokenPair;
