//! Interactive login flow against the Schulnetz identity provider
//!
//! The flow is a strict sequence per attempt: build the authorization URL,
//! drive the provider's login screens, resolve whatever post-login prompts
//! appear, capture the redirect carrying the authorization code, and
//! exchange it for tokens. Everything that touches the outside world goes
//! through the port traits in [`ports`]; the orchestrator in [`service`]
//! wires the pieces together and collapses every fatal condition into a
//! uniform outcome.

pub mod capture;
pub mod login;
pub mod ports;
pub mod resolver;
pub mod service;
pub mod two_factor;
