//! Chrome discovery and process launch
//!
//! The identity provider fingerprints automated browsers, so the launch
//! arguments strip the obvious automation markers. A configured executable
//! wins over PATH discovery; discovery shells out to `which` before probing
//! well-known install locations.

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::handler::Handler;
use schulgate_domain::{BrowserConfig as BrowserSettings, Result, SchulgateError};
use tracing::debug;

use super::browser_err;

const LAUNCH_ARGS: &[&str] = &[
    "--disable-blink-features=AutomationControlled",
    "--disable-infobars",
    "--no-first-run",
    "--no-default-browser-check",
    "--disable-dev-shm-usage",
];

/// Launch a fresh browser process for one session.
///
/// # Errors
/// Returns `SchulgateError::Browser` when no Chrome/Chromium binary can be
/// found or the process fails to start.
pub async fn launch(settings: &BrowserSettings) -> Result<(Browser, Handler)> {
    let executable = match &settings.executable {
        Some(path) => path.clone(),
        None => find_chrome().ok_or_else(|| {
            SchulgateError::Browser(
                "Chrome/Chromium not found; install it or set CHROME_EXECUTABLE".to_string(),
            )
        })?,
    };
    debug!(executable, headless = settings.headless, "launching browser");

    let mut builder = BrowserConfig::builder().chrome_executable(&executable).viewport(None);
    for arg in LAUNCH_ARGS {
        builder = builder.arg(*arg);
    }
    if !settings.headless {
        builder = builder.with_head();
    }
    let config = builder
        .build()
        .map_err(|e| SchulgateError::Browser(format!("failed to configure browser: {e}")))?;

    Browser::launch(config).await.map_err(browser_err)
}

/// Find a Chrome/Chromium executable.
pub fn find_chrome() -> Option<String> {
    for name in ["google-chrome", "chromium"] {
        if let Ok(output) = std::process::Command::new("which").arg(name).output() {
            if output.status.success() {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path.is_empty() {
                    return Some(path);
                }
            }
        }
    }

    let candidates = [
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
    ];

    candidates.iter().find(|candidate| std::path::Path::new(candidate).exists()).map(|c| (*c).to_string())
}
