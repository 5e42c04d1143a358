//! OAuth 2.0 + PKCE primitives for the Schulnetz login flow
//!
//! This module provides the pure pieces of the Authorization-Code-with-PKCE
//! flow. The provider deviates from stock OAuth in small, load-bearing ways
//! that these functions preserve exactly:
//!
//! - the `scope` value carries a trailing space (`"openid "`)
//! - the registered `redirect_uri` is the empty string
//! - the echoed `state` may come back wrapped in a composite value, an
//!   opaque hash prefix followed by base64-encoded original parameters
//!
//! # Module Organization
//!
//! - **[`challenge`]**: verifier/challenge/state/nonce generation
//! - **[`authorize`]**: authorization-endpoint query assembly
//! - **[`redirect`]**: `code=` extraction from redirect URLs
//! - **[`state`]**: direct and composite state validation

pub mod authorize;
pub mod challenge;
pub mod redirect;
pub mod state;

// Re-export commonly used types and functions
pub use authorize::{build_authorization_query, build_authorization_url};
pub use challenge::{generate_random_string, ChallengeSet};
pub use redirect::extract_auth_code;
pub use state::validate_state;
