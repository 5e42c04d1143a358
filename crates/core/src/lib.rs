//! # Schulgate Core
//!
//! Pure authentication flow logic - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (traits) for the browser, token endpoint, and
//!   failure reporting
//! - The login form driver and post-login step resolver
//! - The authorization-code capture strategies
//! - The keyed two-factor hand-off gateway
//! - The authentication orchestrator service
//!
//! ## Architecture Principles
//! - Only depends on `schulgate-common` and `schulgate-domain`
//! - No browser, HTTP, or filesystem code
//! - All external dependencies via traits
//! - Pure, testable flow logic

pub mod auth;

// Re-export specific items to avoid ambiguity
pub use auth::capture::CaptureStrategy;
pub use auth::ports::{
    BrowserProvider, BrowserSession, FailureReport, FailureReporter, TokenExchanger, UrlStream,
};
pub use auth::resolver::PostLoginPrompt;
pub use auth::service::AuthenticationService;
pub use auth::two_factor::TwoFactorGateway;
