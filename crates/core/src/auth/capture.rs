//! Authorization-code capture
//!
//! The provider delivers the authorization code as a query parameter on a
//! redirect back to the portal. Two strategies observe that redirect: a
//! frame-navigation listener and a network-response listener. The
//! navigation listener runs first end-to-end; only when its whole session
//! fails does a fresh session retry with the response listener. The losing
//! strategy of an attempt is never invoked.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::StreamExt;
use schulgate_common::auth::redirect::extract_auth_code;
use schulgate_domain::constants::{IDENTITY_PROVIDER_HOST, NAVIGATION_TIMEOUT_SECS, PORTAL_HOST};
use schulgate_domain::{
    AttemptId, AuthorizationResult, DebugRecording, NavigationEntry, RedirectDomain, Result,
    SchulgateError,
};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::auth::login;
use crate::auth::ports::{BrowserProvider, BrowserSession};
use crate::auth::resolver::StepResolver;
use crate::auth::two_factor::TwoFactorGateway;

/// How a strategy observes the code-bearing redirect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStrategy {
    /// Watch frame-navigation events for a portal URL carrying `code=`
    NavigationListener,
    /// Watch network responses for the callback URL carrying `code=`
    ResponseListener,
}

impl CaptureStrategy {
    /// Whether a URL observed by this strategy carries the redirect.
    #[must_use]
    pub fn matches(self, url: &str) -> bool {
        if !url.contains("code=") {
            return false;
        }
        match self {
            Self::NavigationListener => url.contains("schulnetz"),
            Self::ResponseListener => {
                url.contains("schulnetz.web.app/callback") || url.contains(PORTAL_HOST)
            }
        }
    }
}

/// Shared scratchpad between the event tasks and the polling loop
#[derive(Default)]
struct CaptureState {
    result: Option<AuthorizationResult>,
    log: Vec<NavigationEntry>,
}

/// Successful capture: the code plus the still-open session it came from
pub struct CaptureOutcome {
    pub result: AuthorizationResult,
    pub session: Box<dyn BrowserSession>,
    pub navigation_urls: Vec<String>,
}

/// Runs the capture strategies for one attempt
///
/// After a failed [`run`](Self::run), the recording and navigation log of
/// the last session can be taken for the failure report.
pub struct CodeCaptureFlow {
    provider: Arc<dyn BrowserProvider>,
    two_factor: Arc<TwoFactorGateway>,
    attempt_id: AttemptId,
    poll_interval: Duration,
    poll_timeout: Duration,
    failure_recording: Option<DebugRecording>,
    failure_navigation_urls: Vec<String>,
}

impl CodeCaptureFlow {
    pub fn new(
        provider: Arc<dyn BrowserProvider>,
        two_factor: Arc<TwoFactorGateway>,
        attempt_id: AttemptId,
        poll_interval: Duration,
        poll_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            two_factor,
            attempt_id,
            poll_interval,
            poll_timeout,
            failure_recording: None,
            failure_navigation_urls: Vec::new(),
        }
    }

    /// Debug artifacts of the last failed session, if any.
    pub fn take_failure_recording(&mut self) -> Option<DebugRecording> {
        self.failure_recording.take()
    }

    /// Navigation log of the last failed session.
    pub fn take_failure_navigation_urls(&mut self) -> Vec<String> {
        std::mem::take(&mut self.failure_navigation_urls)
    }

    /// Capture the authorization code, trying both strategies in order.
    ///
    /// The second strategy starts from a completely fresh browser session;
    /// nothing of the failed first session is reused.
    pub async fn run(
        &mut self,
        auth_url: &str,
        email: &str,
        password: &str,
    ) -> Result<CaptureOutcome> {
        match self
            .run_strategy(CaptureStrategy::NavigationListener, auth_url, email, password)
            .await
        {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                warn!(error = %err, "navigation-listener capture failed; retrying with response listener");
                self.run_strategy(CaptureStrategy::ResponseListener, auth_url, email, password)
                    .await
            }
        }
    }

    async fn run_strategy(
        &mut self,
        strategy: CaptureStrategy,
        auth_url: &str,
        email: &str,
        password: &str,
    ) -> Result<CaptureOutcome> {
        info!(?strategy, "starting capture session");
        let session = self.provider.launch().await?;
        let state = Arc::new(Mutex::new(CaptureState::default()));
        let mut tasks = Vec::new();

        match self.attach_listeners(session.as_ref(), strategy, &state, &mut tasks).await {
            Ok(()) => {}
            Err(err) => {
                self.abandon_session(session, &state, tasks).await;
                return Err(err);
            }
        }

        let drive = self.drive_session(session.as_ref(), strategy, &state, auth_url, email, password);
        match drive.await {
            Ok(result) => {
                for task in tasks {
                    task.abort();
                }
                let navigation_urls = Self::drain_log(&state);
                Ok(CaptureOutcome { result, session, navigation_urls })
            }
            Err(err) => {
                for task in tasks {
                    task.abort();
                }
                self.abandon_session(session, &state, Vec::new()).await;
                Err(err)
            }
        }
    }

    /// Subscribe the navigation log and the strategy's matcher.
    ///
    /// The navigation listener is always attached for the log; whether its
    /// matches count depends on the strategy.
    async fn attach_listeners(
        &self,
        session: &dyn BrowserSession,
        strategy: CaptureStrategy,
        state: &Arc<Mutex<CaptureState>>,
        tasks: &mut Vec<JoinHandle<()>>,
    ) -> Result<()> {
        let mut navigations = session.navigation_events().await?;
        let nav_state = Arc::clone(state);
        tasks.push(tokio::spawn(async move {
            while let Some(url) = navigations.next().await {
                if let Ok(mut guard) = nav_state.lock() {
                    guard.log.push(NavigationEntry::now(&url));
                    if strategy == CaptureStrategy::NavigationListener
                        && guard.result.is_none()
                        && strategy.matches(&url)
                    {
                        guard.result = redirect_result(&url);
                    }
                }
            }
        }));

        if strategy == CaptureStrategy::ResponseListener {
            let mut responses = session.response_events().await?;
            let resp_state = Arc::clone(state);
            tasks.push(tokio::spawn(async move {
                while let Some(url) = responses.next().await {
                    if let Ok(mut guard) = resp_state.lock() {
                        if guard.result.is_none() && strategy.matches(&url) {
                            guard.result = redirect_result(&url);
                        }
                    }
                }
            }));
        }

        Ok(())
    }

    /// Walk one session from the authorize URL to a captured code.
    async fn drive_session(
        &self,
        session: &dyn BrowserSession,
        strategy: CaptureStrategy,
        state: &Arc<Mutex<CaptureState>>,
        auth_url: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthorizationResult> {
        session.navigate(auth_url, Duration::from_secs(NAVIGATION_TIMEOUT_SECS)).await?;

        let landing = session.current_url().await?;
        if !landing.contains(IDENTITY_PROVIDER_HOST) {
            return Err(SchulgateError::NoRedirect(format!(
                "authorize endpoint did not hand off to the identity provider; landed on {landing}"
            )));
        }

        login::run(session, email, password).await?;
        StepResolver::new(Arc::clone(&self.two_factor), self.attempt_id)
            .resolve_all(session)
            .await?;

        let deadline = tokio::time::Instant::now() + self.poll_timeout;
        while tokio::time::Instant::now() < deadline {
            if let Some(result) = Self::captured(state) {
                debug!(?strategy, "redirect captured by listener");
                return Ok(result);
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        // Listener may have missed an in-page redirect; the address bar is
        // the last word.
        let current = session.current_url().await?;
        if let Some(result) = redirect_result(&current) {
            debug!("redirect captured from current URL");
            return Ok(result);
        }

        Err(SchulgateError::AuthCodeNotFound(format!(
            "no code-bearing redirect within {}s; final URL {current}",
            self.poll_timeout.as_secs()
        )))
    }

    fn captured(state: &Arc<Mutex<CaptureState>>) -> Option<AuthorizationResult> {
        state.lock().ok().and_then(|guard| guard.result.clone())
    }

    fn drain_log(state: &Arc<Mutex<CaptureState>>) -> Vec<String> {
        state
            .lock()
            .map(|guard| guard.log.iter().map(|entry| entry.url.clone()).collect())
            .unwrap_or_default()
    }

    /// Tear down a failed session, keeping its artifacts for the report.
    async fn abandon_session(
        &mut self,
        session: Box<dyn BrowserSession>,
        state: &Arc<Mutex<CaptureState>>,
        tasks: Vec<JoinHandle<()>>,
    ) {
        for task in tasks {
            task.abort();
        }
        self.failure_navigation_urls = Self::drain_log(state);
        if let Some(recording) = session.finalize_recording(true).await {
            self.failure_recording = Some(recording);
        }
        if let Err(err) = session.close().await {
            warn!(error = %err, "failed to close browser after capture failure");
        }
    }
}

/// Build an [`AuthorizationResult`] from a code-bearing URL, if it has one.
fn redirect_result(url: &str) -> Option<AuthorizationResult> {
    let (code, state) = extract_auth_code(url);
    code.map(|auth_code| AuthorizationResult {
        auth_code,
        received_state: state,
        redirect_domain: RedirectDomain::classify(url),
    })
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::capture.
    use super::*;

    /// Validates `CaptureStrategy::matches` behavior for the navigation
    /// listener scenario.
    ///
    /// Assertions:
    /// - Confirms any schulnetz URL with `code=` matches.
    /// - Confirms provider-internal URLs without a code do not.
    #[test]
    fn test_navigation_listener_matching() {
        let strategy = CaptureStrategy::NavigationListener;
        assert!(strategy.matches("https://schulnetz.bbbaden.ch/?code=abc&state=s"));
        assert!(strategy.matches("https://schulnetz.web.app/callback?code=abc"));
        assert!(!strategy.matches("https://schulnetz.bbbaden.ch/loginto.php"));
        assert!(!strategy.matches("https://login.microsoftonline.com/?code=abc"));
    }

    /// Validates `CaptureStrategy::matches` behavior for the response
    /// listener scenario.
    ///
    /// Assertions:
    /// - Confirms only the callback URL or the portal host match.
    #[test]
    fn test_response_listener_matching() {
        let strategy = CaptureStrategy::ResponseListener;
        assert!(strategy.matches("https://schulnetz.web.app/callback?code=abc"));
        assert!(strategy.matches("https://schulnetz.bbbaden.ch/index.php?code=abc"));
        assert!(!strategy.matches("https://login.microsoftonline.com/common?code=abc"));
        assert!(!strategy.matches("https://schulnetz.web.app/callback"));
    }

    /// Validates `redirect_result` behavior for the classification scenario.
    ///
    /// Assertions:
    /// - Confirms code, state, and redirect domain are extracted together.
    #[test]
    fn test_redirect_result_shape() {
        let result = redirect_result("https://schulnetz.web.app/callback?code=XYZ&state=s1")
            .expect("code-bearing URL");
        assert_eq!(result.auth_code, "XYZ");
        assert_eq!(result.received_state.as_deref(), Some("s1"));
        assert_eq!(result.redirect_domain, RedirectDomain::WebApp);

        assert!(redirect_result("https://schulnetz.bbbaden.ch/home").is_none());
    }
}
