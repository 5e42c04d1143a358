//! Port interfaces for authentication flows
//!
//! These traits define the contract between the flow logic and the
//! infrastructure layer. Implementations live in `schulgate-infra`.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use schulgate_domain::{
    AttemptId, DebugRecording, Result, SchulgateError, TokenPair, WebSessionCookies,
};

/// Stream of URLs observed by a browser event listener
pub type UrlStream = BoxStream<'static, String>;

/// One live browser page the flow drives
///
/// Every selector-based method takes a timeout: the page is rendered by the
/// identity provider and elements appear asynchronously. `is_visible` waits
/// up to the timeout and answers whether the element became visible, so
/// callers branch on presence without treating absence as an error.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Navigate the page and wait for the load to settle.
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()>;

    /// Wait up to `timeout` for a selector to become visible.
    async fn is_visible(&self, selector: &str, timeout: Duration) -> bool;

    /// Type a value into the first visible element matching the selector.
    async fn fill(&self, selector: &str, value: &str) -> Result<()>;

    /// Click the first element matching the selector.
    async fn click(&self, selector: &str) -> Result<()>;

    /// Wait up to `timeout` for a currently visible element to disappear.
    async fn wait_hidden(&self, selector: &str, timeout: Duration) -> Result<()>;

    /// Text content of the first matching element, if present.
    async fn inner_text(&self, selector: &str) -> Option<String>;

    /// URL the page currently shows.
    async fn current_url(&self) -> Result<String>;

    /// Full HTML of the current page.
    async fn content(&self) -> Result<String>;

    /// Cookies of the browser context, name to value.
    async fn cookies(&self) -> Result<WebSessionCookies>;

    /// Subscribe to frame-navigation events; yields each navigated URL.
    async fn navigation_events(&self) -> Result<UrlStream>;

    /// Subscribe to network-response events; yields each response URL.
    async fn response_events(&self) -> Result<UrlStream>;

    /// Stop an attached debug recording and hand back its artifacts.
    ///
    /// Returns `None` when recording was never enabled or was already
    /// finalized. Must be called before [`close`](Self::close) when the
    /// artifacts are needed.
    async fn finalize_recording(&self, failed: bool) -> Option<DebugRecording>;

    /// Close the page and tear down the browser process.
    async fn close(&self) -> Result<()>;
}

/// Launches isolated browser sessions
///
/// Each call produces a fresh browser context with no cookies or storage
/// carried over from previous sessions.
#[async_trait]
pub trait BrowserProvider: Send + Sync {
    /// Start a new browser and return a driveable session.
    async fn launch(&self) -> Result<Box<dyn BrowserSession>>;
}

/// Exchanges an authorization code for tokens
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    /// Redeem `auth_code` at the token endpoint using the PKCE verifier
    /// minted for the same attempt.
    async fn exchange(&self, auth_code: &str, code_verifier: &str) -> Result<TokenPair>;
}

/// Everything a failure report needs to be rendered and delivered
#[derive(Debug)]
pub struct FailureReport {
    pub attempt_id: AttemptId,
    /// Raw email of the attempt; reporters redact before emission.
    pub email: String,
    pub error: SchulgateError,
    /// Stable label of the flow step that failed
    pub failed_step: String,
    /// Wall-clock duration of the attempt up to the failure
    pub elapsed: Duration,
    /// URLs visited during the attempt, in order
    pub navigation_urls: Vec<String>,
    /// Debug artifacts, when recording was active
    pub recording: Option<DebugRecording>,
}

/// Delivers failure reports to an external sink
///
/// Reporting is strictly best-effort: implementations log their own
/// delivery problems and never surface them, so a broken sink can never
/// turn a diagnosed failure into a different one.
#[async_trait]
pub trait FailureReporter: Send + Sync {
    async fn report(&self, report: FailureReport);
}
