//! Debug recording
//!
//! One recording session per attempt, living in an isolated temporary
//! directory: periodic page screenshots (later assembled into a video), a
//! navigation log, and optionally a browser console log. The directory is
//! deleted unconditionally once the attempt's failure report has been
//! handled, or on session close for successful attempts.

pub mod video;
pub mod webhook;

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Utc;
use schulgate_domain::{AttemptId, DebugRecording, RecordingConfig};
use tracing::{debug, warn};

pub use webhook::DebugWebhookReporter;

const NAVIGATION_LOG: &str = "navigation.log";
const CONSOLE_LOG: &str = "console.log";
const FRAMES_DIR: &str = "frames";

/// Artifact collector for one attempt
pub struct RecordingSession {
    dir: PathBuf,
    video_enabled: bool,
    console_enabled: bool,
    frame_index: AtomicUsize,
}

impl RecordingSession {
    /// Start a session when any capture is enabled; `None` otherwise.
    ///
    /// Directory creation failures disable recording for the attempt rather
    /// than failing it.
    pub fn start(config: &RecordingConfig, attempt_id: AttemptId) -> Option<Self> {
        if !config.video_enabled && !config.console_logs {
            return None;
        }

        let dir = std::env::temp_dir().join(format!("schulgate-debug-{attempt_id}"));
        if let Err(err) = std::fs::create_dir_all(dir.join(FRAMES_DIR)) {
            warn!(error = %err, "could not create recording directory; recording disabled");
            return None;
        }

        debug!(dir = %dir.display(), "debug recording started");
        Some(Self {
            dir,
            video_enabled: config.video_enabled,
            console_enabled: config.console_logs,
            frame_index: AtomicUsize::new(0),
        })
    }

    /// Whether page frames should be sampled for this session.
    #[must_use]
    pub fn video_enabled(&self) -> bool {
        self.video_enabled
    }

    /// Append a navigated URL to the navigation log.
    pub fn log_navigation(&self, url: &str) {
        self.append_line(NAVIGATION_LOG, url);
    }

    /// Append a console message, when console capture is enabled.
    pub fn log_console(&self, message: &str) {
        if self.console_enabled {
            self.append_line(CONSOLE_LOG, message);
        }
    }

    /// Store one JPEG frame of the session screencast.
    pub fn save_frame(&self, bytes: &[u8]) {
        if !self.video_enabled {
            return;
        }
        let index = self.frame_index.fetch_add(1, Ordering::SeqCst);
        let path = self.dir.join(FRAMES_DIR).join(format!("frame_{index:06}.jpg"));
        if let Err(err) = std::fs::write(&path, bytes) {
            warn!(error = %err, "could not store screencast frame");
        }
    }

    /// Stop the session and assemble its artifacts.
    ///
    /// Always safe to call once per session; the video is only assembled
    /// when frames were captured.
    pub async fn finalize(&self, failed: bool) -> DebugRecording {
        let video_path = if self.video_enabled && self.frame_index.load(Ordering::SeqCst) > 0 {
            video::assemble(&self.dir.join(FRAMES_DIR), &self.dir.join("session.webm")).await
        } else {
            None
        };

        let mut log_files = HashMap::new();
        for name in [NAVIGATION_LOG, CONSOLE_LOG] {
            let path = self.dir.join(name);
            if path.exists() {
                log_files.insert(name.to_string(), path);
            }
        }

        debug!(failed, has_video = video_path.is_some(), "debug recording finalized");
        DebugRecording { video_path, log_files, failed }
    }

    /// Delete the session directory and everything in it.
    pub fn remove_dir(&self) {
        if let Err(err) = std::fs::remove_dir_all(&self.dir) {
            warn!(error = %err, dir = %self.dir.display(), "could not remove recording directory");
        }
    }

    fn append_line(&self, file: &str, line: &str) {
        let path = self.dir.join(file);
        let result = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut f| writeln!(f, "[{}] {line}", Utc::now().format("%H:%M:%S%.3f")));
        if let Err(err) = result {
            warn!(error = %err, file, "could not append to recording log");
        }
    }
}
