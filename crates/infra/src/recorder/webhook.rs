//! Failure-report webhook
//!
//! Delivers one Discord-style multipart message per failed attempt: a
//! human-readable summary in `payload_json`, the session video when one
//! exists, and up to nine log attachments. Delivery is best-effort; every
//! failure is logged and swallowed, and the recording directory is deleted
//! unconditionally afterwards.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use schulgate_common::redact_email;
use schulgate_core::{FailureReport, FailureReporter};
use schulgate_domain::constants::MAX_REPORT_LOG_FILES;
use schulgate_domain::{Result, SchulgateError};
use tracing::{info, warn};

use super::{video, NAVIGATION_LOG};

const BOT_USERNAME: &str = "Schulgate Debug Bot";
const BOT_AVATAR: &str = "https://cdn.discordapp.com/embed/avatars/0.png";
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// [`FailureReporter`] posting to a Discord-compatible webhook
pub struct DebugWebhookReporter {
    client: reqwest::Client,
    webhook_url: String,
}

impl DebugWebhookReporter {
    /// # Errors
    /// Returns `SchulgateError::Internal` when the HTTP client cannot be
    /// constructed.
    pub fn new(webhook_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .build()
            .map_err(|e| SchulgateError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, webhook_url: webhook_url.into() })
    }

    async fn deliver(&self, report: &FailureReport) {
        let video_part = match &report.recording {
            Some(recording) => match &recording.video_path {
                Some(path) => video_attachment(path).await,
                None => None,
            },
            None => None,
        };

        let summary = format_summary(report, video_part.is_some());
        let payload = serde_json::json!({
            "content": summary,
            "username": BOT_USERNAME,
            "avatar_url": BOT_AVATAR,
        });

        let mut form = Form::new().text("payload_json", payload.to_string());
        let mut attachment_index = 0;

        if let Some(part) = video_part {
            form = form.part(format!("files[{attachment_index}]"), part);
            attachment_index += 1;
        }

        let mut navigation_attached = false;
        if let Some(recording) = &report.recording {
            let mut names: Vec<&String> = recording.log_files.keys().collect();
            names.sort();
            for name in names.into_iter().take(MAX_REPORT_LOG_FILES) {
                match tokio::fs::read(&recording.log_files[name]).await {
                    Ok(bytes) => {
                        if name == NAVIGATION_LOG {
                            navigation_attached = true;
                        }
                        let part = Part::bytes(bytes).file_name(name.clone());
                        form = form.part(format!("files[{attachment_index}]"), part);
                        attachment_index += 1;
                    }
                    Err(err) => warn!(error = %err, file = %name, "skipping unreadable log file"),
                }
            }
        }
        if !navigation_attached && !report.navigation_urls.is_empty() {
            // The recording carried no navigation log (or none ran); ship the
            // in-memory list so the report still shows where the attempt went.
            let body = report.navigation_urls.join("\n");
            let part = Part::bytes(body.into_bytes()).file_name(NAVIGATION_LOG);
            form = form.part(format!("files[{attachment_index}]"), part);
        }

        match self.client.post(&self.webhook_url).multipart(form).send().await {
            Ok(response) if matches!(response.status().as_u16(), 200 | 204) => {
                info!("failure report delivered");
            }
            Ok(response) => {
                warn!(status = %response.status(), "webhook rejected the failure report");
            }
            Err(err) => {
                warn!(error = %err, "failed to deliver failure report");
            }
        }
    }
}

#[async_trait]
impl FailureReporter for DebugWebhookReporter {
    async fn report(&self, report: FailureReport) {
        self.deliver(&report).await;

        // The recording directory holds raw frames and logs; nothing may
        // outlive the report.
        if let Some(dir) = report.recording.as_ref().and_then(|r| r.directory()) {
            if let Err(err) = std::fs::remove_dir_all(dir) {
                warn!(error = %err, dir = %dir.display(), "could not remove recording directory");
            }
        }
    }
}

async fn video_attachment(path: &Path) -> Option<Part> {
    let upload_path = video::prepare_for_upload(path).await;
    match tokio::fs::read(&upload_path).await {
        Ok(bytes) => {
            let part = Part::bytes(bytes).file_name("session.webm");
            match part.mime_str("video/webm") {
                Ok(part) => Some(part),
                Err(_) => None,
            }
        }
        Err(err) => {
            warn!(error = %err, "could not read session video for upload");
            None
        }
    }
}

/// Render the human-readable summary carried in `payload_json`.
fn format_summary(report: &FailureReport, video_attached: bool) -> String {
    let mut message = String::from("🚨 **Authentication Error Report** 🚨\n\n");
    message.push_str(&format!("**Time:** {}\n", Utc::now().format("%Y-%m-%d %H:%M:%S UTC")));
    message.push_str(&format!("**Error:** {}\n", report.error));
    message.push_str(&format!("**User:** {}\n", redact_email(&report.email)));
    message.push_str(&format!("**Failed Step:** {}\n", report.failed_step));
    message.push_str(&format!("**Duration:** {:.2}s\n", report.elapsed.as_secs_f64()));
    message.push_str(&format!(
        "\n**Video Recording:** {}",
        if video_attached { "Attached" } else { "Not available" }
    ));
    message
}
