//! Post-login step resolver
//!
//! After the credential screens, the identity provider interjects a varying
//! sequence of prompts: proof-up nags, authenticator number matching, OTP
//! entry, security-info registration, and the stay-signed-in question. The
//! resolver probes for each known prompt in a fixed priority order and
//! handles whichever appears, looping until the stay-signed-in screen is
//! dismissed or the loop bound trips.

use std::sync::Arc;
use std::time::Duration;

use schulgate_domain::constants::{
    AUTHENTICATOR_CONFIRM_TIMEOUT_SECS, MAX_RESOLVER_ITERATIONS, PROMPT_PROBE_FAST_MS,
    PROMPT_PROBE_RETRY_MS, TWO_FACTOR_TIMEOUT_SECS,
};
use schulgate_domain::{AttemptId, Result, SchulgateError};
use tracing::{debug, info, warn};

use crate::auth::ports::BrowserSession;
use crate::auth::two_factor::TwoFactorGateway;

/// Continue button on the OTP entry screen
const TWO_FACTOR_CONTINUE: &str = "#idSubmit_SAOTCC_Continue";

/// A recognized interstitial screen between login and redirect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostLoginPrompt {
    /// "Protect your account" proof-up nag; skipped via its redirect link
    AccountProtection,
    /// Authenticator number-match screen; waits for approval on the phone
    AuthenticatorDisplay,
    /// One-time code entry field
    TwoFactorInput,
    /// Security-info registration wall; detected but not automatable
    SecurityInfoUpdate,
    /// "Stay signed in?" question; answering it ends the sequence
    StaySignedIn,
}

impl PostLoginPrompt {
    /// Probe order: a prompt earlier in this list shadows any later one
    /// that happens to match the same page.
    pub const PROBE_ORDER: [Self; 5] = [
        Self::AccountProtection,
        Self::AuthenticatorDisplay,
        Self::TwoFactorInput,
        Self::SecurityInfoUpdate,
        Self::StaySignedIn,
    ];

    /// CSS selector identifying this prompt on the page.
    #[must_use]
    pub const fn selector(self) -> &'static str {
        match self {
            Self::AccountProtection => "#idSubmit_ProofUp_Redirect",
            Self::AuthenticatorDisplay => "#idRichContext_DisplaySign",
            Self::TwoFactorInput => "input[type=\"tel\"], input[name=\"otc\"]",
            Self::SecurityInfoUpdate => "[data-automation-id=\"SecurityInfoRegister\"]",
            Self::StaySignedIn => "#idSIButton9",
        }
    }
}

/// What a handled prompt means for the resolver loop
enum Resolution {
    /// Keep probing; the provider may show further prompts
    Continue,
    /// The sequence is complete
    Done,
}

/// Walks the provider's post-login prompt sequence for one attempt
pub struct StepResolver {
    two_factor: Arc<TwoFactorGateway>,
    attempt_id: AttemptId,
}

impl StepResolver {
    pub fn new(two_factor: Arc<TwoFactorGateway>, attempt_id: AttemptId) -> Self {
        Self { two_factor, attempt_id }
    }

    /// Resolve prompts until the sequence completes.
    ///
    /// Each iteration probes all known prompts with a fast timeout, then
    /// once more with a longer one before concluding that no prompt is
    /// shown. An empty retry pass means the provider moved on without the
    /// stay-signed-in screen, which is a valid end of the sequence.
    pub async fn resolve_all(&self, session: &dyn BrowserSession) -> Result<()> {
        for iteration in 1..=MAX_RESOLVER_ITERATIONS {
            let prompt = match self.detect(session).await {
                Some(prompt) => prompt,
                None => {
                    debug!(iteration, "no post-login prompt shown");
                    return Ok(());
                }
            };

            info!(iteration, ?prompt, "resolving post-login prompt");
            match self.handle(session, prompt).await? {
                Resolution::Continue => {}
                Resolution::Done => return Ok(()),
            }
        }

        Err(SchulgateError::FormInteraction(format!(
            "post-login prompt loop exceeded {MAX_RESOLVER_ITERATIONS} iterations"
        )))
    }

    /// Probe for the highest-priority visible prompt.
    async fn detect(&self, session: &dyn BrowserSession) -> Option<PostLoginPrompt> {
        for timeout_ms in [PROMPT_PROBE_FAST_MS, PROMPT_PROBE_RETRY_MS] {
            let timeout = Duration::from_millis(timeout_ms);
            for prompt in PostLoginPrompt::PROBE_ORDER {
                if session.is_visible(prompt.selector(), timeout).await {
                    return Some(prompt);
                }
            }
        }
        None
    }

    async fn handle(
        &self,
        session: &dyn BrowserSession,
        prompt: PostLoginPrompt,
    ) -> Result<Resolution> {
        match prompt {
            PostLoginPrompt::AccountProtection => {
                session.click(prompt.selector()).await?;
                Ok(Resolution::Continue)
            }
            PostLoginPrompt::AuthenticatorDisplay => {
                if let Some(number) = session.inner_text(prompt.selector()).await {
                    info!(number = %number.trim(), "approve the sign-in in the authenticator app");
                }
                session
                    .wait_hidden(
                        prompt.selector(),
                        Duration::from_secs(AUTHENTICATOR_CONFIRM_TIMEOUT_SECS),
                    )
                    .await?;
                Ok(Resolution::Continue)
            }
            PostLoginPrompt::TwoFactorInput => {
                let code = self
                    .two_factor
                    .wait(self.attempt_id, Duration::from_secs(TWO_FACTOR_TIMEOUT_SECS))
                    .await?;
                session.fill(prompt.selector(), &code).await?;
                if session
                    .is_visible(TWO_FACTOR_CONTINUE, Duration::from_millis(PROMPT_PROBE_RETRY_MS))
                    .await
                {
                    session.click(TWO_FACTOR_CONTINUE).await?;
                }
                Ok(Resolution::Continue)
            }
            PostLoginPrompt::SecurityInfoUpdate => {
                // No automatable dismissal is known for this wall; the
                // provider sometimes lets the flow proceed regardless.
                warn!("security-info registration wall shown; continuing without action");
                Ok(Resolution::Continue)
            }
            PostLoginPrompt::StaySignedIn => {
                session.click(prompt.selector()).await?;
                Ok(Resolution::Done)
            }
        }
    }
}
