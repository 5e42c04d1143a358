//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Reads a `.env` file into the environment if one exists
//! 2. First, attempts to load from environment variables
//! 3. If the required variables are missing, falls back to a config file
//! 4. Probes multiple paths for config files
//! 5. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `SCHULNETZ_CLIENT_ID`: OAuth client identifier (required)
//! - `SCHULNETZ_AUTHORIZE_URL`: Authorization endpoint (defaults to production)
//! - `SCHULNETZ_TOKEN_URL`: Token endpoint (defaults to production)
//! - `SCHULNETZ_PORTAL_URL`: Portal root URL (defaults to production)
//! - `SCHULGATE_STATE_POLICY`: `lenient` (default) or `strict`
//! - `SCHULGATE_HEADLESS`: Run the browser headless (default true)
//! - `CHROME_EXECUTABLE`: Explicit Chrome/Chromium binary path
//! - `DEBUG_VIDEO_RECORDING`: Record session video on each attempt
//! - `DEBUG_CONSOLE_LOGS`: Capture browser console output
//! - `DISCORD_WEBHOOK_URL`: Failure-report webhook; reporting off when unset
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./schulgate.json` or `./schulgate.toml` (current working directory)
//! 3. `./config/schulgate.json` or `./config/schulgate.toml`
//! 4. Relative to the executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use schulgate_domain::{
    BrowserConfig, Config, OAuthConfig, RecordingConfig, Result, SchulgateError, StatePolicy,
};
use schulgate_domain::constants::{DEFAULT_AUTHORIZE_URL, DEFAULT_PORTAL_URL, DEFAULT_TOKEN_URL};

/// Load configuration with automatic fallback strategy
///
/// Reads a `.env` file when present, then attempts to load from environment
/// variables. If the required variables are missing, falls back to loading
/// from a config file.
///
/// # Errors
/// Returns `SchulgateError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - Required fields are missing or invalid
pub fn load() -> Result<Config> {
    // Populate the process environment from .env; a missing file is fine.
    dotenvy::dotenv().ok();

    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// Only `SCHULNETZ_CLIENT_ID` is required; every other value has a default.
///
/// # Errors
/// Returns `SchulgateError::Config` if the client id is missing or a value
/// fails to parse or validate.
pub fn load_from_env() -> Result<Config> {
    let client_id = env_var("SCHULNETZ_CLIENT_ID")?;

    let state_policy = match std::env::var("SCHULGATE_STATE_POLICY") {
        Ok(value) => StatePolicy::from_str(&value)
            .map_err(|e| SchulgateError::Config(format!("Invalid state policy: {e}")))?,
        Err(_) => StatePolicy::default(),
    };

    let config = Config {
        oauth: OAuthConfig {
            client_id,
            authorize_url: env_or("SCHULNETZ_AUTHORIZE_URL", DEFAULT_AUTHORIZE_URL),
            token_url: env_or("SCHULNETZ_TOKEN_URL", DEFAULT_TOKEN_URL),
            portal_url: env_or("SCHULNETZ_PORTAL_URL", DEFAULT_PORTAL_URL),
            redirect_uri: std::env::var("SCHULNETZ_REDIRECT_URI").unwrap_or_default(),
            state_policy,
        },
        browser: BrowserConfig {
            headless: env_bool("SCHULGATE_HEADLESS", true),
            executable: std::env::var("CHROME_EXECUTABLE").ok().filter(|s| !s.is_empty()),
        },
        recording: RecordingConfig {
            video_enabled: env_bool("DEBUG_VIDEO_RECORDING", false),
            console_logs: env_bool("DEBUG_CONSOLE_LOGS", false),
            webhook_url: std::env::var("DISCORD_WEBHOOK_URL").ok().filter(|s| !s.is_empty()),
        },
    };

    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `SchulgateError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - Required fields are missing or invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(SchulgateError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            SchulgateError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| SchulgateError::Config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| SchulgateError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| SchulgateError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(SchulgateError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(vec![
            cwd.join("config.json"),
            cwd.join("config.toml"),
            cwd.join("schulgate.json"),
            cwd.join("schulgate.toml"),
            cwd.join("config/schulgate.json"),
            cwd.join("config/schulgate.toml"),
        ]);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(vec![
                exe_dir.join("config.json"),
                exe_dir.join("config.toml"),
                exe_dir.join("schulgate.json"),
                exe_dir.join("schulgate.toml"),
            ]);
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

/// Get required environment variable
fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| {
            SchulgateError::Config(format!("Missing required environment variable: {key}"))
        })
}

/// Environment variable with a default when unset or empty
fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).ok().filter(|s| !s.is_empty()).unwrap_or_else(|| default.to_string())
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use once_cell::sync::Lazy;
    use tempfile::NamedTempFile;

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const ENV_KEYS: &[&str] = &[
        "SCHULNETZ_CLIENT_ID",
        "SCHULNETZ_AUTHORIZE_URL",
        "SCHULNETZ_TOKEN_URL",
        "SCHULNETZ_PORTAL_URL",
        "SCHULNETZ_REDIRECT_URI",
        "SCHULGATE_STATE_POLICY",
        "SCHULGATE_HEADLESS",
        "CHROME_EXECUTABLE",
        "DEBUG_VIDEO_RECORDING",
        "DEBUG_CONSOLE_LOGS",
        "DISCORD_WEBHOOK_URL",
    ];

    fn clear_env() {
        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    /// Validates `env_bool` behavior for the parsing scenario.
    ///
    /// Assertions:
    /// - Confirms `1`, `true`, `yes`, `on` parse as true (case-insensitive).
    /// - Confirms everything else parses as false.
    /// - Confirms unset variables take the default.
    #[test]
    fn test_env_bool_parsing() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        std::env::set_var("TEST_BOOL_TRUE", "YES");
        std::env::set_var("TEST_BOOL_FALSE", "off");

        assert!(env_bool("TEST_BOOL_TRUE", false));
        assert!(!env_bool("TEST_BOOL_FALSE", true));

        std::env::remove_var("TEST_BOOL_MISSING");
        assert!(env_bool("TEST_BOOL_MISSING", true));
        assert!(!env_bool("TEST_BOOL_MISSING", false));

        std::env::remove_var("TEST_BOOL_TRUE");
        std::env::remove_var("TEST_BOOL_FALSE");
    }

    /// Validates `load_from_env` behavior for the fully specified scenario.
    ///
    /// Assertions:
    /// - Confirms every variable lands in its config field.
    #[test]
    fn test_load_from_env_all_vars_set() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("SCHULNETZ_CLIENT_ID", "client-1");
        std::env::set_var("SCHULNETZ_TOKEN_URL", "https://example.test/token.php");
        std::env::set_var("SCHULGATE_STATE_POLICY", "strict");
        std::env::set_var("SCHULGATE_HEADLESS", "false");
        std::env::set_var("CHROME_EXECUTABLE", "/usr/bin/chromium");
        std::env::set_var("DEBUG_VIDEO_RECORDING", "true");
        std::env::set_var("DISCORD_WEBHOOK_URL", "https://discord.test/hook");

        let config = load_from_env().expect("config loads");

        assert_eq!(config.oauth.client_id, "client-1");
        assert_eq!(config.oauth.token_url, "https://example.test/token.php");
        assert_eq!(config.oauth.authorize_url, DEFAULT_AUTHORIZE_URL);
        assert_eq!(config.oauth.state_policy, StatePolicy::Strict);
        assert!(!config.browser.headless);
        assert_eq!(config.browser.executable.as_deref(), Some("/usr/bin/chromium"));
        assert!(config.recording.video_enabled);
        assert!(!config.recording.console_logs);
        assert_eq!(config.recording.webhook_url.as_deref(), Some("https://discord.test/hook"));

        clear_env();
    }

    /// Validates `load_from_env` behavior for the defaults scenario.
    ///
    /// Assertions:
    /// - Confirms only the client id is required.
    /// - Confirms endpoint defaults point at production Schulnetz.
    #[test]
    fn test_load_from_env_defaults() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("SCHULNETZ_CLIENT_ID", "client-1");

        let config = load_from_env().expect("config loads");

        assert_eq!(config.oauth.authorize_url, DEFAULT_AUTHORIZE_URL);
        assert_eq!(config.oauth.token_url, DEFAULT_TOKEN_URL);
        assert_eq!(config.oauth.portal_url, DEFAULT_PORTAL_URL);
        assert_eq!(config.oauth.redirect_uri, "");
        assert_eq!(config.oauth.state_policy, StatePolicy::Lenient);
        assert!(config.browser.headless);
        assert!(config.browser.executable.is_none());
        assert!(config.recording.webhook_url.is_none());

        clear_env();
    }

    /// Validates `load_from_env` behavior for the missing client id
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms the error is a `Config` error naming the variable.
    #[test]
    fn test_load_from_env_missing_client_id() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        let err = load_from_env().unwrap_err();
        assert!(matches!(err, SchulgateError::Config(_)));
        assert!(err.to_string().contains("SCHULNETZ_CLIENT_ID"));
    }

    /// Validates `load_from_env` behavior for the invalid policy scenario.
    ///
    /// Assertions:
    /// - Confirms an unknown state policy is rejected.
    #[test]
    fn test_load_from_env_invalid_policy() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("SCHULNETZ_CLIENT_ID", "client-1");
        std::env::set_var("SCHULGATE_STATE_POLICY", "paranoid");

        let err = load_from_env().unwrap_err();
        assert!(matches!(err, SchulgateError::Config(_)));

        clear_env();
    }

    /// Validates `load_from_file` behavior for the JSON scenario.
    ///
    /// Assertions:
    /// - Confirms the file parses and unspecified sections default.
    #[test]
    fn test_load_from_file_json() {
        let json_content = r#"{
            "oauth": {
                "client_id": "file-client",
                "state_policy": "strict"
            },
            "recording": {
                "video_enabled": true
            }
        }"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(json_content.as_bytes()).unwrap();
        let path = temp_file.path().with_extension("json");
        std::fs::copy(temp_file.path(), &path).unwrap();

        let config = load_from_file(Some(path.clone())).expect("config loads");
        assert_eq!(config.oauth.client_id, "file-client");
        assert_eq!(config.oauth.state_policy, StatePolicy::Strict);
        assert_eq!(config.oauth.token_url, DEFAULT_TOKEN_URL);
        assert!(config.recording.video_enabled);

        std::fs::remove_file(path).ok();
    }

    /// Validates `load_from_file` behavior for the TOML scenario.
    ///
    /// Assertions:
    /// - Confirms TOML sections map onto the config structure.
    #[test]
    fn test_load_from_file_toml() {
        let toml_content = r#"
[oauth]
client_id = "toml-client"
portal_url = "https://example.test/"

[browser]
headless = false
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        let path = temp_file.path().with_extension("toml");
        std::fs::copy(temp_file.path(), &path).unwrap();

        let config = load_from_file(Some(path.clone())).expect("config loads");
        assert_eq!(config.oauth.client_id, "toml-client");
        assert_eq!(config.oauth.portal_url, "https://example.test/");
        assert!(!config.browser.headless);

        std::fs::remove_file(path).ok();
    }

    /// Validates `load_from_file` behavior for the missing file scenario.
    ///
    /// Assertions:
    /// - Confirms a nonexistent path is a `Config` error.
    #[test]
    fn test_load_from_file_not_found() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/config.json")));
        assert!(matches!(result, Err(SchulgateError::Config(_))));
    }

    /// Validates `load_from_file` behavior for the invalid content
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms malformed JSON fails to parse.
    /// - Confirms a valid file with an empty client id fails validation.
    #[test]
    fn test_load_from_file_invalid() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(br#"{ "oauth": { "client_id": "#).unwrap();
        let path = temp_file.path().with_extension("json");
        std::fs::copy(temp_file.path(), &path).unwrap();
        assert!(load_from_file(Some(path.clone())).is_err());
        std::fs::remove_file(path).ok();

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(br#"{ "oauth": { "client_id": "  " } }"#).unwrap();
        let path = temp_file.path().with_extension("json");
        std::fs::copy(temp_file.path(), &path).unwrap();
        assert!(load_from_file(Some(path.clone())).is_err());
        std::fs::remove_file(path).ok();
    }

    /// Validates `parse_config` behavior for the unsupported format
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms a `.yaml` extension is rejected.
    #[test]
    fn test_parse_config_unsupported_format() {
        let result = parse_config("some content", &PathBuf::from("test.yaml"));
        assert!(matches!(result, Err(SchulgateError::Config(_))));
    }
}
