//! Login form driver
//!
//! Drives the identity provider's two-step credential screens: email first,
//! then password. Selectors pair the semantic input type with the provider's
//! field name so either rendering of the form matches.

use std::time::Duration;

use schulgate_domain::constants::{
    FIELD_VISIBILITY_TIMEOUT_SECS, PAGE_SNIPPET_LENGTH, SUBMIT_VISIBILITY_TIMEOUT_SECS,
};
use schulgate_domain::{Result, SchulgateError};
use tracing::debug;

use crate::auth::ports::BrowserSession;

pub const EMAIL_INPUT: &str = "input[type=\"email\"], input[name=\"loginfmt\"]";
pub const PASSWORD_INPUT: &str = "input[type=\"password\"], input[name=\"passwd\"]";
pub const SUBMIT_BUTTON: &str = "#idSIButton9";

/// Submit email and password on the provider's login screens.
///
/// Submit clicks on both screens are best-effort: some sessions land on a
/// combined form, and some advance as soon as the password is filled. Only a
/// credential field that never appears is fatal; that error carries the page
/// URL plus a content snippet for diagnosis.
pub async fn run(session: &dyn BrowserSession, email: &str, password: &str) -> Result<()> {
    let field_timeout = Duration::from_secs(FIELD_VISIBILITY_TIMEOUT_SECS);
    let submit_timeout = Duration::from_secs(SUBMIT_VISIBILITY_TIMEOUT_SECS);

    if !session.is_visible(EMAIL_INPUT, field_timeout).await {
        return Err(stuck_on_form(session, "email field never became visible").await);
    }
    session.fill(EMAIL_INPUT, email).await?;
    debug!("email entered");

    if session.is_visible(SUBMIT_BUTTON, submit_timeout).await {
        session.click(SUBMIT_BUTTON).await?;
    }

    if !session.is_visible(PASSWORD_INPUT, field_timeout).await {
        return Err(stuck_on_form(session, "password field never became visible").await);
    }
    session.fill(PASSWORD_INPUT, password).await?;
    debug!("password entered");

    if session.is_visible(SUBMIT_BUTTON, submit_timeout).await {
        session.click(SUBMIT_BUTTON).await?;
    } else {
        debug!("no submit button after password; provider may advance on its own");
    }

    Ok(())
}

/// Build a form-interaction error enriched with where the page got stuck.
async fn stuck_on_form(session: &dyn BrowserSession, what: &str) -> SchulgateError {
    let url = session.current_url().await.unwrap_or_else(|_| "<unavailable>".to_string());
    let snippet = match session.content().await {
        Ok(html) => truncate_chars(&html, PAGE_SNIPPET_LENGTH),
        Err(_) => "<unavailable>".to_string(),
    };
    SchulgateError::FormInteraction(format!("{what}; url={url}; page starts with: {snippet}"))
}

/// Truncate on a character boundary; byte-indexed slicing would panic on
/// multi-byte provider markup.
fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
