//! Error types used throughout the application
//!
//! Every fatal condition of an authentication attempt maps to one variant
//! here. The orchestrator converts these to a uniform failure outcome at its
//! boundary; nothing in this taxonomy is expected to cross the API layer as
//! a panic.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Schulgate
#[derive(Error, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum SchulgateError {
    /// A login form field or button never became visible within its timeout.
    #[error("Form interaction failed: {0}")]
    FormInteraction(String),

    /// No one-time code arrived on the attempt's 2FA channel in time.
    #[error("Two-factor timeout: {0}")]
    TwoFactorTimeout(String),

    /// The 2FA hand-off registry rejected a submit or wait.
    #[error("Two-factor channel error: {0}")]
    TwoFactorChannel(String),

    /// The identity provider never redirected where the flow expected.
    #[error("No redirect: {0}")]
    NoRedirect(String),

    /// Both capture strategies and the current-URL fallback came up empty.
    #[error("Authorization code not found: {0}")]
    AuthCodeNotFound(String),

    /// Token endpoint rejected the exchange or returned an unusable body.
    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    /// Received state did not match the expected value (strict policy only).
    #[error("State mismatch: {0}")]
    StateMismatch(String),

    /// Browser session failed outside of a specific form interaction.
    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Schulgate operations
pub type Result<T> = std::result::Result<T, SchulgateError>;
