//! Modular common utilities shared across Schulgate crates.
//!
//! Pure, side-effect-free building blocks for the login flow: PKCE challenge
//! material, authorization-request assembly, redirect parsing, state
//! validation, and privacy redaction. Nothing here touches the network or a
//! browser; those live in `schulgate-infra`.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod auth;
pub mod privacy;

// Re-export commonly used types and functions for convenience
pub use auth::authorize::{build_authorization_query, build_authorization_url};
pub use auth::challenge::{generate_random_string, ChallengeSet};
pub use auth::redirect::extract_auth_code;
pub use auth::state::validate_state;
pub use privacy::redact_email;
