//! Scripted browser doubles for flow-level tests
//!
//! `SessionScript` models the provider's screen sequence as a small state
//! machine: email screen, password screen, optional OTP screen, the
//! stay-signed-in question, done. Selector visibility and click transitions
//! follow the stage, and the code-bearing redirect is emitted into the
//! session's event channels when the final screen is dismissed.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use schulgate_core::auth::ports::{
    BrowserProvider, BrowserSession, FailureReport, FailureReporter, TokenExchanger, UrlStream,
};
use schulgate_domain::{DebugRecording, Result, SchulgateError, TokenPair, WebSessionCookies};
use tokio::sync::mpsc;

const EMAIL_INPUT: &str = "input[type=\"email\"], input[name=\"loginfmt\"]";
const PASSWORD_INPUT: &str = "input[type=\"password\"], input[name=\"passwd\"]";
const SUBMIT_BUTTON: &str = "#idSIButton9";
const OTP_INPUT: &str = "input[type=\"tel\"], input[name=\"otc\"]";
const OTP_CONTINUE: &str = "#idSubmit_SAOTCC_Continue";

fn channel_stream(rx: mpsc::UnboundedReceiver<String>) -> UrlStream {
    futures::stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|url| (url, rx)) })
        .boxed()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Email,
    Password,
    TwoFactor,
    StaySignedIn,
    Done,
}

/// One scripted browser session shared between the provider and the test
pub struct SessionScript {
    stage: Mutex<Stage>,
    current_url: Mutex<String>,
    /// prefix → landing URL applied on `navigate`
    redirects: Vec<(String, String)>,
    /// URLs emitted into the event channels when stay-signed-in is clicked
    post_login_redirects: Vec<String>,
    /// current URL after the final screen is dismissed
    final_url: String,
    two_factor: bool,
    /// Filling the password completes the flow without any further screen
    auto_advance: bool,
    cookie_snapshots: Mutex<VecDeque<WebSessionCookies>>,
    fills: Mutex<Vec<(String, String)>>,
    clicks: Mutex<Vec<String>>,
    nav_tx: Mutex<Option<mpsc::UnboundedSender<String>>>,
    resp_tx: Mutex<Option<mpsc::UnboundedSender<String>>>,
    response_subscriptions: AtomicUsize,
    closed: AtomicUsize,
}

impl SessionScript {
    pub fn new() -> Self {
        Self {
            stage: Mutex::new(Stage::Email),
            current_url: Mutex::new(String::from("about:blank")),
            redirects: Vec::new(),
            post_login_redirects: Vec::new(),
            final_url: String::from("about:blank"),
            two_factor: false,
            auto_advance: false,
            cookie_snapshots: Mutex::new(VecDeque::new()),
            fills: Mutex::new(Vec::new()),
            clicks: Mutex::new(Vec::new()),
            nav_tx: Mutex::new(None),
            resp_tx: Mutex::new(None),
            response_subscriptions: AtomicUsize::new(0),
            closed: AtomicUsize::new(0),
        }
    }

    /// Map any navigation with this prefix onto a landing URL.
    pub fn redirect(mut self, prefix: &str, landing: &str) -> Self {
        self.redirects.push((prefix.to_string(), landing.to_string()));
        self
    }

    /// URL emitted through both event channels after the last screen.
    pub fn post_login_redirect(mut self, url: &str) -> Self {
        self.post_login_redirects.push(url.to_string());
        self
    }

    /// Where the address bar points once the flow completed.
    pub fn final_url(mut self, url: &str) -> Self {
        self.final_url = url.to_string();
        self
    }

    /// Insert the OTP screen between password and stay-signed-in.
    pub fn with_two_factor(mut self) -> Self {
        self.two_factor = true;
        self
    }

    /// Redirect as soon as the password is filled; no submit button or
    /// follow-up screen ever shows.
    pub fn auto_advance(mut self) -> Self {
        self.auto_advance = true;
        self
    }

    /// Queue a cookie snapshot; each `cookies()` call consumes one.
    pub fn cookie_snapshot(self, pairs: &[(&str, &str)]) -> Self {
        let map: WebSessionCookies =
            pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        self.cookie_snapshots.lock().unwrap().push_back(map);
        self
    }

    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn fills(&self) -> Vec<(String, String)> {
        self.fills.lock().unwrap().clone()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.clicks.lock().unwrap().clone()
    }

    pub fn response_subscriptions(&self) -> usize {
        self.response_subscriptions.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    fn emit(&self, url: &str) {
        if let Some(tx) = self.nav_tx.lock().unwrap().as_ref() {
            let _ = tx.send(url.to_string());
        }
        if let Some(tx) = self.resp_tx.lock().unwrap().as_ref() {
            let _ = tx.send(url.to_string());
        }
    }

    fn complete(&self) {
        for url in &self.post_login_redirects {
            self.emit(url);
        }
        *self.current_url.lock().unwrap() = self.final_url.clone();
    }
}

/// Session handle implementing the browser port over a shared script
pub struct ScriptedSession {
    script: Arc<SessionScript>,
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn navigate(&self, url: &str, _timeout: Duration) -> Result<()> {
        let landing = self
            .script
            .redirects
            .iter()
            .find(|(prefix, _)| url.starts_with(prefix))
            .map_or_else(|| url.to_string(), |(_, landing)| landing.clone());
        *self.script.current_url.lock().unwrap() = landing.clone();
        self.script.emit(&landing);
        Ok(())
    }

    async fn is_visible(&self, selector: &str, _timeout: Duration) -> bool {
        let stage = *self.script.stage.lock().unwrap();
        match stage {
            Stage::Email => selector == EMAIL_INPUT || selector == SUBMIT_BUTTON,
            Stage::Password => selector == PASSWORD_INPUT || selector == SUBMIT_BUTTON,
            Stage::TwoFactor => selector == OTP_INPUT || selector == OTP_CONTINUE,
            Stage::StaySignedIn => selector == SUBMIT_BUTTON,
            Stage::Done => false,
        }
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        self.script.fills.lock().unwrap().push((selector.to_string(), value.to_string()));
        if self.script.auto_advance && selector == PASSWORD_INPUT {
            let mut stage = self.script.stage.lock().unwrap();
            if *stage == Stage::Password {
                *stage = Stage::Done;
                drop(stage);
                self.script.complete();
            }
        }
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.script.clicks.lock().unwrap().push(selector.to_string());
        let mut stage = self.script.stage.lock().unwrap();
        match (*stage, selector) {
            (Stage::Email, SUBMIT_BUTTON) => *stage = Stage::Password,
            (Stage::Password, SUBMIT_BUTTON) => {
                *stage =
                    if self.script.two_factor { Stage::TwoFactor } else { Stage::StaySignedIn };
            }
            (Stage::TwoFactor, OTP_CONTINUE) => *stage = Stage::StaySignedIn,
            (Stage::StaySignedIn, SUBMIT_BUTTON) => {
                *stage = Stage::Done;
                drop(stage);
                self.script.complete();
            }
            _ => {}
        }
        Ok(())
    }

    async fn wait_hidden(&self, _selector: &str, _timeout: Duration) -> Result<()> {
        Ok(())
    }

    async fn inner_text(&self, _selector: &str) -> Option<String> {
        None
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.script.current_url.lock().unwrap().clone())
    }

    async fn content(&self) -> Result<String> {
        Ok("<html><body>scripted</body></html>".to_string())
    }

    async fn cookies(&self) -> Result<WebSessionCookies> {
        Ok(self.script.cookie_snapshots.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn navigation_events(&self) -> Result<UrlStream> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.script.nav_tx.lock().unwrap() = Some(tx);
        Ok(channel_stream(rx))
    }

    async fn response_events(&self) -> Result<UrlStream> {
        self.script.response_subscriptions.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::unbounded_channel();
        *self.script.resp_tx.lock().unwrap() = Some(tx);
        Ok(channel_stream(rx))
    }

    async fn finalize_recording(&self, _failed: bool) -> Option<DebugRecording> {
        None
    }

    async fn close(&self) -> Result<()> {
        self.script.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out scripted sessions in order
pub struct ScriptedProvider {
    sessions: Mutex<VecDeque<Arc<SessionScript>>>,
    launches: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(sessions: Vec<Arc<SessionScript>>) -> Arc<Self> {
        Arc::new(Self { sessions: Mutex::new(sessions.into()), launches: AtomicUsize::new(0) })
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserProvider for ScriptedProvider {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        let script = self
            .sessions
            .lock()
            .map_err(|_| SchulgateError::Internal("script queue lock poisoned".into()))?
            .pop_front()
            .ok_or_else(|| SchulgateError::Browser("no scripted session remaining".into()))?;
        Ok(Box::new(ScriptedSession { script }))
    }
}

/// Token exchanger recording every call
pub struct MockExchanger {
    tokens: Option<TokenPair>,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockExchanger {
    /// Succeeds with the given pair on every call.
    pub fn succeeding(access: &str, refresh: &str) -> Arc<Self> {
        Arc::new(Self {
            tokens: Some(TokenPair {
                access_token: access.to_string(),
                refresh_token: Some(refresh.to_string()),
                expires_in: Some(3600),
            }),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Fails every call with a token-exchange error.
    pub fn failing() -> Arc<Self> {
        Arc::new(Self { tokens: None, calls: Mutex::new(Vec::new()) })
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TokenExchanger for MockExchanger {
    async fn exchange(&self, auth_code: &str, code_verifier: &str) -> Result<TokenPair> {
        self.calls.lock().unwrap().push((auth_code.to_string(), code_verifier.to_string()));
        self.tokens.clone().ok_or_else(|| {
            SchulgateError::TokenExchange("scripted token endpoint failure".to_string())
        })
    }
}

/// Failure reporter capturing every report for assertions
#[derive(Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<FailureReport>>,
}

impl RecordingReporter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn take(&self) -> Vec<FailureReport> {
        std::mem::take(&mut self.reports.lock().unwrap())
    }
}

#[async_trait]
impl FailureReporter for RecordingReporter {
    async fn report(&self, report: FailureReport) {
        self.reports.lock().unwrap().push(report);
    }
}
