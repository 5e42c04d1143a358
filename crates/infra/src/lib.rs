//! # Schulgate Infrastructure
//!
//! Infrastructure implementations of core authentication ports.
//!
//! This crate contains:
//! - The Chromium-backed browser session (chromiumoxide / CDP)
//! - The token-endpoint HTTP client
//! - Configuration loading from environment and files
//! - Debug recording, video assembly, and the failure webhook
//!
//! ## Architecture
//! - Implements traits defined in `schulgate-core`
//! - Depends on `schulgate-common`, `schulgate-domain`, `schulgate-core`
//! - Contains all "impure" code (browser, network, filesystem)

pub mod browser;
pub mod config;
pub mod http;
pub mod observability;
pub mod recorder;
pub mod service;

// Re-export commonly used items
pub use browser::ChromiumProvider;
pub use config::{load, load_from_env, load_from_file};
pub use http::TokenExchangeClient;
pub use observability::init_tracing;
pub use recorder::DebugWebhookReporter;
pub use service::build_service;
