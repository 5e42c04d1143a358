//! Authentication orchestrator
//!
//! `AuthenticationService` owns one complete attempt: challenge material,
//! authorization URL, capture flow, state validation, token exchange, and
//! cookie extraction, depending on the requested mode. Every fatal error
//! collapses into a uniform failure outcome at this boundary, after the
//! failure reporter has fired; the browser session is closed on every exit
//! path.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::StreamExt;
use schulgate_common::auth::state::{check_state, StateOutcome};
use schulgate_common::{build_authorization_url, ChallengeSet};
use schulgate_domain::constants::{
    IDENTITY_PROVIDER_HOST, NAVIGATION_TIMEOUT_SECS, PORTAL_HOST, REDIRECT_POLL_INTERVAL_MS,
    REDIRECT_POLL_TIMEOUT_SECS,
};
use schulgate_domain::{
    AttemptId, AuthOutcome, AuthType, AuthorizationRequest, DebugRecording, NavigationEntry,
    OAuthConfig, Result, SchulgateError, StatePolicy, WebSessionCookies,
};
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use crate::auth::capture::{CaptureOutcome, CodeCaptureFlow};
use crate::auth::login;
use crate::auth::ports::{
    BrowserProvider, BrowserSession, FailureReport, FailureReporter, TokenExchanger,
};
use crate::auth::resolver::StepResolver;
use crate::auth::two_factor::TwoFactorGateway;

/// Everything a failed attempt carries to the reporter
struct AttemptFailure {
    error: SchulgateError,
    recording: Option<DebugRecording>,
    navigation_urls: Vec<String>,
}

impl AttemptFailure {
    fn bare(error: SchulgateError) -> Self {
        Self { error, recording: None, navigation_urls: Vec::new() }
    }
}

type AttemptResult = std::result::Result<AuthOutcome, AttemptFailure>;

/// Orchestrates authentication attempts against the Schulnetz portal
pub struct AuthenticationService {
    browser: Arc<dyn BrowserProvider>,
    tokens: Arc<dyn TokenExchanger>,
    reporter: Option<Arc<dyn FailureReporter>>,
    two_factor: Arc<TwoFactorGateway>,
    oauth: OAuthConfig,
    poll_interval: Duration,
    poll_timeout: Duration,
}

impl AuthenticationService {
    pub fn new(
        browser: Arc<dyn BrowserProvider>,
        tokens: Arc<dyn TokenExchanger>,
        oauth: OAuthConfig,
    ) -> Self {
        Self {
            browser,
            tokens,
            reporter: None,
            two_factor: Arc::new(TwoFactorGateway::new()),
            oauth,
            poll_interval: Duration::from_millis(REDIRECT_POLL_INTERVAL_MS),
            poll_timeout: Duration::from_secs(REDIRECT_POLL_TIMEOUT_SECS),
        }
    }

    /// Attach a failure reporter (builder pattern).
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn FailureReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Share an externally owned 2FA gateway (builder pattern).
    ///
    /// The API layer holds the same gateway to route submitted codes.
    #[must_use]
    pub fn with_two_factor(mut self, two_factor: Arc<TwoFactorGateway>) -> Self {
        self.two_factor = two_factor;
        self
    }

    /// Override redirect-poll timing (builder pattern, for tests).
    #[must_use]
    pub fn with_capture_timing(mut self, interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = interval;
        self.poll_timeout = timeout;
        self
    }

    /// The gateway attempts use to wait for two-factor codes.
    #[must_use]
    pub fn two_factor(&self) -> Arc<TwoFactorGateway> {
        Arc::clone(&self.two_factor)
    }

    /// Mint fresh challenge material and the authorization URL it belongs
    /// to, without driving a browser.
    ///
    /// Callers completing the flow themselves need the challenge set to
    /// exchange the code later.
    #[must_use]
    pub fn authorize_url(&self) -> (String, ChallengeSet) {
        let challenge = ChallengeSet::generate();
        let url = build_authorization_url(
            &self.oauth.authorize_url,
            &challenge,
            &self.oauth.client_id,
            &self.oauth.redirect_uri,
        );
        (url, challenge)
    }

    /// Run one authentication attempt end to end.
    ///
    /// Never returns an error: every fatal condition becomes
    /// `AuthOutcome { success: false, .. }` after the reporter has fired.
    pub async fn authenticate(&self, request: AuthorizationRequest) -> AuthOutcome {
        let attempt_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "authenticate",
            %attempt_id,
            auth_type = %request.auth_type,
        );

        async {
            info!("authentication attempt started");
            let started = Instant::now();

            match self.run_attempt(attempt_id, &request).await {
                Ok(outcome) => {
                    info!(elapsed_secs = started.elapsed().as_secs_f64(), "attempt succeeded");
                    outcome
                }
                Err(failure) => {
                    warn!(error = %failure.error, "attempt failed");
                    self.report_failure(attempt_id, &request.email, failure, started.elapsed())
                        .await
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run_attempt(
        &self,
        attempt_id: AttemptId,
        request: &AuthorizationRequest,
    ) -> AttemptResult {
        match request.auth_type {
            AuthType::Web => self.web_flow(attempt_id, request).await,
            AuthType::Mobile | AuthType::Unified => {
                self.oauth_flow(attempt_id, request, request.auth_type == AuthType::Unified).await
            }
        }
    }

    /// Mobile and unified modes: capture a code, optionally extract cookies,
    /// exchange for tokens.
    async fn oauth_flow(
        &self,
        attempt_id: AttemptId,
        request: &AuthorizationRequest,
        unified: bool,
    ) -> AttemptResult {
        let challenge = ChallengeSet::generate();
        let auth_url = build_authorization_url(
            &self.oauth.authorize_url,
            &challenge,
            &self.oauth.client_id,
            &self.oauth.redirect_uri,
        );

        let mut flow = CodeCaptureFlow::new(
            Arc::clone(&self.browser),
            Arc::clone(&self.two_factor),
            attempt_id,
            self.poll_interval,
            self.poll_timeout,
        );

        let capture = match flow.run(&auth_url, &request.email, &request.password).await {
            Ok(capture) => capture,
            Err(error) => {
                return Err(AttemptFailure {
                    error,
                    recording: flow.take_failure_recording(),
                    navigation_urls: flow.take_failure_navigation_urls(),
                });
            }
        };
        let CaptureOutcome { result, session, navigation_urls } = capture;

        if let Err(error) = self.enforce_state_policy(&challenge, result.received_state.as_deref())
        {
            return Err(Self::fail_with_session(session, error, navigation_urls).await);
        }

        let cookies = if unified {
            match self.portal_cookies(session.as_ref()).await {
                Ok(cookies) => Some(cookies),
                Err(error) => {
                    return Err(Self::fail_with_session(session, error, navigation_urls).await);
                }
            }
        } else {
            None
        };

        let tokens = match self.tokens.exchange(&result.auth_code, &challenge.code_verifier).await
        {
            Ok(tokens) => tokens,
            Err(error) => {
                return Err(Self::fail_with_session(session, error, navigation_urls).await);
            }
        };

        if let Err(err) = session.close().await {
            warn!(error = %err, "failed to close browser after successful attempt");
        }

        let mut outcome = AuthOutcome::succeeded();
        outcome.tokens = Some(tokens);
        outcome.auth_code = Some(result.auth_code);
        if unified {
            outcome.cookies = cookies;
            outcome.navigation_urls = Some(navigation_urls);
        }
        Ok(outcome)
    }

    /// Web mode: drive the login from the portal root and keep only the
    /// session cookies.
    async fn web_flow(
        &self,
        attempt_id: AttemptId,
        request: &AuthorizationRequest,
    ) -> AttemptResult {
        let session = self.browser.launch().await.map_err(AttemptFailure::bare)?;
        let log: Arc<Mutex<Vec<NavigationEntry>>> = Arc::new(Mutex::new(Vec::new()));

        let collector = match session.navigation_events().await {
            Ok(mut events) => {
                let log = Arc::clone(&log);
                Some(tokio::spawn(async move {
                    while let Some(url) = events.next().await {
                        if let Ok(mut guard) = log.lock() {
                            guard.push(NavigationEntry::now(url));
                        }
                    }
                }))
            }
            Err(err) => {
                warn!(error = %err, "navigation log unavailable for web session");
                None
            }
        };

        let outcome = self.drive_web_session(attempt_id, session.as_ref(), request).await;
        if let Some(collector) = collector {
            collector.abort();
        }
        let navigation_urls: Vec<String> = log
            .lock()
            .map(|guard| guard.iter().map(|entry| entry.url.clone()).collect())
            .unwrap_or_default();

        match outcome {
            Ok(cookies) => {
                if let Err(err) = session.close().await {
                    warn!(error = %err, "failed to close browser after successful attempt");
                }
                let mut outcome = AuthOutcome::succeeded();
                outcome.cookies = Some(cookies);
                Ok(outcome)
            }
            Err(error) => Err(Self::fail_with_session(session, error, navigation_urls).await),
        }
    }

    async fn drive_web_session(
        &self,
        attempt_id: AttemptId,
        session: &dyn BrowserSession,
        request: &AuthorizationRequest,
    ) -> Result<WebSessionCookies> {
        session
            .navigate(&self.oauth.portal_url, Duration::from_secs(NAVIGATION_TIMEOUT_SECS))
            .await?;

        let landing = session.current_url().await?;
        if landing.contains(IDENTITY_PROVIDER_HOST) {
            login::run(session, &request.email, &request.password).await?;
            StepResolver::new(Arc::clone(&self.two_factor), attempt_id)
                .resolve_all(session)
                .await?;
        } else {
            debug!(url = %landing, "portal reached without provider login");
        }

        self.wait_for_portal(session).await?;
        session.cookies().await
    }

    /// Poll until the browser lands back on the portal host.
    async fn wait_for_portal(&self, session: &dyn BrowserSession) -> Result<()> {
        let deadline = tokio::time::Instant::now() + self.poll_timeout;
        let mut current = session.current_url().await?;
        loop {
            if current.contains(PORTAL_HOST) && !current.contains(IDENTITY_PROVIDER_HOST) {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(SchulgateError::NoRedirect(format!(
                    "browser never returned to {PORTAL_HOST} within {}s; final URL {current}",
                    self.poll_timeout.as_secs()
                )));
            }
            tokio::time::sleep(self.poll_interval).await;
            current = session.current_url().await?;
        }
    }

    /// Navigate to the portal root and merge its cookies over the ones
    /// captured during the OAuth leg, last-write-wins.
    ///
    /// A failing portal navigation downgrades to the pre-navigation cookies;
    /// tokens were already earned by the capture.
    async fn portal_cookies(&self, session: &dyn BrowserSession) -> Result<WebSessionCookies> {
        let mut cookies = session.cookies().await?;

        match session
            .navigate(&self.oauth.portal_url, Duration::from_secs(NAVIGATION_TIMEOUT_SECS))
            .await
        {
            Ok(()) => {
                if let Err(err) = self.wait_for_portal(session).await {
                    warn!(error = %err, "portal session not established; keeping OAuth cookies");
                    return Ok(cookies);
                }
                cookies.extend(session.cookies().await?);
            }
            Err(err) => {
                warn!(error = %err, "portal navigation failed; keeping OAuth cookies");
            }
        }

        Ok(cookies)
    }

    /// Apply the configured state policy to the received value.
    fn enforce_state_policy(&self, challenge: &ChallengeSet, received: Option<&str>) -> Result<()> {
        match check_state(&challenge.state, received) {
            StateOutcome::DirectMatch => debug!("state matched directly"),
            StateOutcome::CompositeMatch => debug!("state recovered from composite value"),
            StateOutcome::Missing => warn!("provider returned no state parameter"),
            StateOutcome::Mismatch => {
                if self.oauth.state_policy == StatePolicy::Strict {
                    return Err(SchulgateError::StateMismatch(
                        "received state does not match the issued value".to_string(),
                    ));
                }
                warn!("state mismatch tolerated under lenient policy");
            }
        }
        Ok(())
    }

    /// Collect artifacts from a session that failed after capture, then
    /// close it.
    async fn fail_with_session(
        session: Box<dyn BrowserSession>,
        error: SchulgateError,
        navigation_urls: Vec<String>,
    ) -> AttemptFailure {
        let recording = session.finalize_recording(true).await;
        if let Err(err) = session.close().await {
            warn!(error = %err, "failed to close browser after attempt failure");
        }
        AttemptFailure { error, recording, navigation_urls }
    }

    async fn report_failure(
        &self,
        attempt_id: AttemptId,
        email: &str,
        failure: AttemptFailure,
        elapsed: Duration,
    ) -> AuthOutcome {
        let message = failure.error.to_string();

        if let Some(reporter) = &self.reporter {
            reporter
                .report(FailureReport {
                    attempt_id,
                    email: email.to_string(),
                    failed_step: step_label(&failure.error).to_string(),
                    error: failure.error,
                    elapsed,
                    navigation_urls: failure.navigation_urls,
                    recording: failure.recording,
                })
                .await;
        }

        AuthOutcome::failed(message)
    }
}

/// Stable label of the flow step an error belongs to, for failure reports.
fn step_label(error: &SchulgateError) -> &'static str {
    match error {
        SchulgateError::FormInteraction(_) => "login_form",
        SchulgateError::TwoFactorTimeout(_) | SchulgateError::TwoFactorChannel(_) => "two_factor",
        SchulgateError::NoRedirect(_) => "provider_redirect",
        SchulgateError::AuthCodeNotFound(_) => "code_capture",
        SchulgateError::TokenExchange(_) => "token_exchange",
        SchulgateError::StateMismatch(_) => "state_validation",
        SchulgateError::Browser(_) => "browser_session",
        SchulgateError::Config(_) => "configuration",
        SchulgateError::Internal(_) => "internal",
    }
}
