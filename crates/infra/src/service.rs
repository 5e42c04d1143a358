//! Service composition
//!
//! Wires the concrete adapters into a ready [`AuthenticationService`] from a
//! validated [`Config`]. Construction is cheap; no browser is launched until
//! the first attempt runs.

use std::sync::Arc;

use schulgate_core::AuthenticationService;
use schulgate_domain::{Config, Result};

use crate::browser::ChromiumProvider;
use crate::http::TokenExchangeClient;
use crate::recorder::DebugWebhookReporter;

/// Build the orchestrator with the Chromium, token-endpoint, and webhook
/// adapters.
///
/// # Errors
/// Returns `SchulgateError::Config` for an invalid configuration and
/// `SchulgateError::Internal` when an HTTP client cannot be constructed.
pub fn build_service(config: &Config) -> Result<AuthenticationService> {
    config.validate()?;

    let provider =
        ChromiumProvider::new(config.browser.clone(), config.recording.clone());
    let tokens = TokenExchangeClient::new(
        config.oauth.token_url.clone(),
        config.oauth.client_id.clone(),
        config.oauth.redirect_uri.clone(),
    )?;

    let mut service =
        AuthenticationService::new(Arc::new(provider), Arc::new(tokens), config.oauth.clone());
    if let Some(webhook_url) = &config.recording.webhook_url {
        service = service.with_reporter(Arc::new(DebugWebhookReporter::new(webhook_url)?));
    }
    Ok(service)
}
