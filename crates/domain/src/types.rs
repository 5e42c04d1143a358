//! Common data types used throughout the application

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::WEB_APP_HOST;
use crate::impl_domain_status_conversions;

/// Identifier of one authentication attempt
///
/// Minted by the orchestrator, keys the 2FA hand-off registry and tags
/// every log line of the attempt.
pub type AttemptId = Uuid;

/// Which artifacts one login should yield
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    /// OAuth2 tokens only (API access)
    Mobile,
    /// Browser session cookies only (web interface access)
    Web,
    /// Tokens and cookies from one login
    Unified,
}

impl_domain_status_conversions!(AuthType {
    Mobile => "mobile",
    Web => "web",
    Unified => "unified",
});

/// Caller-supplied credentials for one attempt
///
/// The password is forwarded to the browser form and never persisted.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub email: String,
    pub password: String,
    pub auth_type: AuthType,
}

/// Which recognized host the provider redirected back to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RedirectDomain {
    /// `schulnetz.bbbaden.ch`
    Portal,
    /// `schulnetz.web.app`
    WebApp,
}

impl RedirectDomain {
    /// Label a redirect URL by host.
    ///
    /// Any URL containing the `web.app` host is the hosted web client; every
    /// other recognized redirect belongs to the portal itself.
    pub fn classify(url: &str) -> Self {
        if url.contains("web.app") {
            Self::WebApp
        } else {
            Self::Portal
        }
    }

    /// Host name this variant stands for.
    pub const fn host(self) -> &'static str {
        match self {
            Self::Portal => crate::constants::PORTAL_HOST,
            Self::WebApp => WEB_APP_HOST,
        }
    }
}

/// Outcome of the authorization-code capture race
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationResult {
    pub auth_code: String,
    pub received_state: Option<String>,
    pub redirect_domain: RedirectDomain,
}

/// Access/refresh token pair from the token endpoint
///
/// The provider omits `refresh_token` and `expires_in` in some responses;
/// both are tolerated as absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
}

/// Cookies captured from the browser context, name to value
pub type WebSessionCookies = HashMap<String, String>;

/// One observed navigation during a browser session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationEntry {
    pub timestamp: DateTime<Utc>,
    pub url: String,
}

impl NavigationEntry {
    /// Record a URL as visited now.
    pub fn now(url: impl Into<String>) -> Self {
        Self { timestamp: Utc::now(), url: url.into() }
    }
}

/// Artifacts of one debug-recording session
///
/// Created when recording is enabled, finalized at session end. The files
/// live in an isolated temporary directory that is deleted unconditionally
/// once the failure report has been handled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugRecording {
    /// Assembled session video, when frame capture produced one
    pub video_path: Option<PathBuf>,
    /// Plain-text log attachments, file name to path
    pub log_files: HashMap<String, PathBuf>,
    /// Whether the owning attempt failed
    pub failed: bool,
}

impl DebugRecording {
    /// Directory holding all recording artifacts, derived from any of the
    /// contained paths.
    #[must_use]
    pub fn directory(&self) -> Option<&std::path::Path> {
        self.video_path
            .as_deref()
            .and_then(std::path::Path::parent)
            .or_else(|| self.log_files.values().next().and_then(|p| p.parent()))
    }
}

/// Uniform result of one authentication attempt
///
/// Fatal errors never escape the orchestrator as panics or raw errors; they
/// collapse into `success: false` with a message here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<TokenPair>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookies: Option<WebSessionCookies>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub navigation_urls: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuthOutcome {
    /// Failure outcome carrying only the error message.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            tokens: None,
            cookies: None,
            navigation_urls: None,
            auth_code: None,
            error: Some(error.into()),
        }
    }

    /// Success outcome; artifact fields are filled in by the caller.
    pub fn succeeded() -> Self {
        Self {
            success: true,
            tokens: None,
            cookies: None,
            navigation_urls: None,
            auth_code: None,
            error: None,
        }
    }
}
