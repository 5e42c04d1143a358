//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Provider endpoints (overridable through configuration)
pub const DEFAULT_AUTHORIZE_URL: &str = "https://schulnetz.bbbaden.ch/authorize.php";
pub const DEFAULT_TOKEN_URL: &str = "https://schulnetz.bbbaden.ch/token.php";
pub const DEFAULT_PORTAL_URL: &str = "https://schulnetz.bbbaden.ch/";
pub const PORTAL_HOST: &str = "schulnetz.bbbaden.ch";
pub const WEB_APP_HOST: &str = "schulnetz.web.app";
pub const IDENTITY_PROVIDER_HOST: &str = "login.microsoftonline.com";

// Login flow timeouts
pub const FIELD_VISIBILITY_TIMEOUT_SECS: u64 = 20;
pub const SUBMIT_VISIBILITY_TIMEOUT_SECS: u64 = 5;
pub const PROMPT_PROBE_FAST_MS: u64 = 100;
pub const PROMPT_PROBE_RETRY_MS: u64 = 750;
pub const AUTHENTICATOR_CONFIRM_TIMEOUT_SECS: u64 = 60;
pub const TWO_FACTOR_TIMEOUT_SECS: u64 = 120;
pub const REDIRECT_POLL_TIMEOUT_SECS: u64 = 30;
pub const REDIRECT_POLL_INTERVAL_MS: u64 = 500;
pub const NAVIGATION_TIMEOUT_SECS: u64 = 60;
pub const MAX_RESOLVER_ITERATIONS: usize = 10;

// Failure reporting
pub const VIDEO_SOFT_LIMIT_BYTES: u64 = 4_500_000;
pub const VIDEO_HARD_LIMIT_BYTES: u64 = 5_000_000;
pub const MAX_REPORT_LOG_FILES: usize = 9;
pub const PAGE_SNIPPET_LENGTH: usize = 500;
