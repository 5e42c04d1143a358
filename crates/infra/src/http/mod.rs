//! HTTP adapters
//!
//! Network-facing implementations of the core ports: the token-endpoint
//! client lives here, the failure webhook under [`crate::recorder`].

pub mod token;

// Re-export commonly used items
pub use token::TokenExchangeClient;
