//! Configuration structures
//!
//! Loaded by the infra config loader from environment variables or a
//! `config.{json,toml}` file. Endpoint fields default to the production
//! Schulnetz URLs; only the client identifier has no default.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_AUTHORIZE_URL, DEFAULT_PORTAL_URL, DEFAULT_TOKEN_URL};
use crate::errors::{Result, SchulgateError};
use crate::impl_domain_status_conversions;

/// How a CSRF state mismatch is treated
///
/// The reference behavior is lenient: log a warning and keep going. Strict
/// turns a mismatch into a fatal attempt error.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StatePolicy {
    #[default]
    Lenient,
    Strict,
}

impl_domain_status_conversions!(StatePolicy {
    Lenient => "lenient",
    Strict => "strict",
});

/// OAuth2 provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    /// Client identifier registered with the provider
    pub client_id: String,
    #[serde(default = "default_authorize_url")]
    pub authorize_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_portal_url")]
    pub portal_url: String,
    /// The provider accepts and expects an empty redirect URI
    #[serde(default)]
    pub redirect_uri: String,
    #[serde(default)]
    pub state_policy: StatePolicy,
}

/// Headless browser settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_true")]
    pub headless: bool,
    /// Explicit Chrome/Chromium binary; discovered on PATH when unset
    #[serde(default)]
    pub executable: Option<String>,
}

/// Debug recording and failure reporting settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordingConfig {
    #[serde(default)]
    pub video_enabled: bool,
    #[serde(default)]
    pub console_logs: bool,
    /// Webhook receiving failure reports; reporting is skipped when unset
    #[serde(default)]
    pub webhook_url: Option<String>,
}

/// Top-level application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub oauth: OAuthConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub recording: RecordingConfig,
}

impl Config {
    /// Check invariants that serde defaults cannot express.
    ///
    /// # Errors
    /// Returns `SchulgateError::Config` when the client id is empty or an
    /// endpoint URL is not absolute.
    pub fn validate(&self) -> Result<()> {
        if self.oauth.client_id.trim().is_empty() {
            return Err(SchulgateError::Config("client_id must not be empty".to_string()));
        }
        for (name, value) in [
            ("authorize_url", &self.oauth.authorize_url),
            ("token_url", &self.oauth.token_url),
            ("portal_url", &self.oauth.portal_url),
        ] {
            if !value.starts_with("http://") && !value.starts_with("https://") {
                return Err(SchulgateError::Config(format!(
                    "{name} must be an absolute URL, got: {value}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self { headless: true, executable: None }
    }
}

fn default_authorize_url() -> String {
    DEFAULT_AUTHORIZE_URL.to_string()
}

fn default_token_url() -> String {
    DEFAULT_TOKEN_URL.to_string()
}

fn default_portal_url() -> String {
    DEFAULT_PORTAL_URL.to_string()
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn minimal_config() -> Config {
        Config {
            oauth: OAuthConfig {
                client_id: "client-1".to_string(),
                authorize_url: default_authorize_url(),
                token_url: default_token_url(),
                portal_url: default_portal_url(),
                redirect_uri: String::new(),
                state_policy: StatePolicy::default(),
            },
            browser: BrowserConfig::default(),
            recording: RecordingConfig::default(),
        }
    }

    #[test]
    fn validate_accepts_defaults() {
        assert!(minimal_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_client_id() {
        let mut config = minimal_config();
        config.oauth.client_id = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_relative_endpoint() {
        let mut config = minimal_config();
        config.oauth.token_url = "token.php".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn state_policy_parses_and_defaults() {
        assert_eq!(StatePolicy::from_str("lenient").unwrap(), StatePolicy::Lenient);
        assert_eq!(StatePolicy::from_str("STRICT").unwrap(), StatePolicy::Strict);
        assert_eq!(StatePolicy::default(), StatePolicy::Lenient);
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let json = r#"{ "oauth": { "client_id": "abc" } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.oauth.authorize_url, DEFAULT_AUTHORIZE_URL);
        assert_eq!(config.oauth.redirect_uri, "");
        assert!(config.browser.headless);
        assert!(!config.recording.video_enabled);
    }
}
