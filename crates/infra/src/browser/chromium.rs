//! Chromiumoxide session adapter
//!
//! Drives one Chrome page over CDP. Selector interactions go through
//! injected JavaScript rather than CDP element handles: the provider's
//! login pages swap DOM nodes between polls, and a querySelector at
//! interaction time is immune to stale handles.

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::network::EventResponseReceived;
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, EventFrameNavigated};
use chromiumoxide::cdp::js_protocol::runtime::EventConsoleApiCalled;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use schulgate_core::{BrowserProvider, BrowserSession, UrlStream};
use schulgate_domain::{
    BrowserConfig as BrowserSettings, DebugRecording, RecordingConfig, Result, SchulgateError,
    WebSessionCookies,
};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{browser_err, launcher};
use crate::recorder::RecordingSession;

/// How often selector polls re-probe the page
const PROBE_INTERVAL: Duration = Duration::from_millis(100);
/// Screencast sampling interval (4 fps)
const FRAME_INTERVAL: Duration = Duration::from_millis(250);

/// [`BrowserProvider`] launching one Chromium process per session
pub struct ChromiumProvider {
    settings: BrowserSettings,
    recording: RecordingConfig,
}

impl ChromiumProvider {
    #[must_use]
    pub fn new(settings: BrowserSettings, recording: RecordingConfig) -> Self {
        Self { settings, recording }
    }
}

#[async_trait]
impl BrowserProvider for ChromiumProvider {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        let (browser, mut handler) = launcher::launch(&self.settings).await?;
        let handler_task = tokio::spawn(async move { while (handler.next().await).is_some() {} });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(err) => {
                handler_task.abort();
                return Err(browser_err(err));
            }
        };

        let recorder = RecordingSession::start(&self.recording, Uuid::new_v4()).map(Arc::new);
        let mut aux_tasks = Vec::new();
        if let Some(recorder) = &recorder {
            aux_tasks.extend(spawn_recording_tasks(&page, recorder).await);
        }

        Ok(Box::new(ChromiumSession {
            browser: tokio::sync::Mutex::new(browser),
            page,
            handler_task,
            aux_tasks,
            recorder: StdMutex::new(recorder),
        }))
    }
}

/// One live Chromium page implementing the session port
pub struct ChromiumSession {
    browser: tokio::sync::Mutex<Browser>,
    page: Page,
    handler_task: JoinHandle<()>,
    aux_tasks: Vec<JoinHandle<()>>,
    recorder: StdMutex<Option<Arc<RecordingSession>>>,
}

impl ChromiumSession {
    async fn eval_bool(&self, js: String) -> Result<bool> {
        self.page
            .evaluate(js)
            .await
            .map_err(browser_err)?
            .into_value::<bool>()
            .map_err(browser_err)
    }

    async fn visible_now(&self, selector: &str) -> bool {
        let sel = js_escape(selector);
        let js = format!(
            "!!(document.querySelector('{sel}') && \
             document.querySelector('{sel}').offsetParent !== null)"
        );
        self.eval_bool(js).await.unwrap_or(false)
    }

    fn take_recorder(&self) -> Option<Arc<RecordingSession>> {
        match self.recorder.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        }
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
        debug!(url, "navigating");
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(result) => {
                result.map_err(browser_err)?;
                Ok(())
            }
            Err(_) => Err(SchulgateError::Browser(format!(
                "navigation to {url} timed out after {}s",
                timeout.as_secs()
            ))),
        }
    }

    async fn is_visible(&self, selector: &str, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.visible_now(selector).await {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(PROBE_INTERVAL).await;
        }
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        let sel = js_escape(selector);
        let val = js_escape(value);
        let js = format!(
            "(function() {{ \
               var el = document.querySelector('{sel}'); \
               if (!el) return false; \
               el.focus(); \
               el.value = '{val}'; \
               el.dispatchEvent(new Event('input', {{bubbles: true}})); \
               el.dispatchEvent(new Event('change', {{bubbles: true}})); \
               return true; \
             }})()"
        );
        if self.eval_bool(js).await? {
            Ok(())
        } else {
            Err(SchulgateError::Browser(format!("no element matches {selector} to fill")))
        }
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let sel = js_escape(selector);
        let js = format!(
            "(function() {{ \
               var el = document.querySelector('{sel}'); \
               if (!el) return false; \
               el.focus(); \
               el.click(); \
               return true; \
             }})()"
        );
        if self.eval_bool(js).await? {
            Ok(())
        } else {
            Err(SchulgateError::Browser(format!("no element matches {selector} to click")))
        }
    }

    async fn wait_hidden(&self, selector: &str, timeout: Duration) -> Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if !self.visible_now(selector).await {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(SchulgateError::FormInteraction(format!(
                    "element {selector} still visible after {}s",
                    timeout.as_secs()
                )));
            }
            tokio::time::sleep(PROBE_INTERVAL).await;
        }
    }

    async fn inner_text(&self, selector: &str) -> Option<String> {
        let sel = js_escape(selector);
        let js = format!(
            "(function() {{ \
               var el = document.querySelector('{sel}'); \
               return el ? el.innerText : ''; \
             }})()"
        );
        let text = self
            .page
            .evaluate(js)
            .await
            .ok()?
            .into_value::<String>()
            .ok()?;
        let trimmed = text.trim();
        if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
    }

    async fn current_url(&self) -> Result<String> {
        self.page
            .url()
            .await
            .map_err(browser_err)?
            .ok_or_else(|| SchulgateError::Browser("page reports no URL".to_string()))
    }

    async fn content(&self) -> Result<String> {
        self.page.content().await.map_err(browser_err)
    }

    async fn cookies(&self) -> Result<WebSessionCookies> {
        let cookies = self.page.get_cookies().await.map_err(browser_err)?;
        Ok(cookies.into_iter().map(|c| (c.name, c.value)).collect())
    }

    async fn navigation_events(&self) -> Result<UrlStream> {
        let events =
            self.page.event_listener::<EventFrameNavigated>().await.map_err(browser_err)?;
        Ok(events.map(|ev| ev.frame.url.clone()).boxed())
    }

    async fn response_events(&self) -> Result<UrlStream> {
        let events =
            self.page.event_listener::<EventResponseReceived>().await.map_err(browser_err)?;
        Ok(events.map(|ev| ev.response.url.clone()).boxed())
    }

    async fn finalize_recording(&self, failed: bool) -> Option<DebugRecording> {
        let recorder = self.take_recorder()?;
        // Recording tasks only feed the recorder; stop them before the
        // frames are assembled.
        for task in &self.aux_tasks {
            task.abort();
        }
        Some(recorder.finalize(failed).await)
    }

    async fn close(&self) -> Result<()> {
        for task in &self.aux_tasks {
            task.abort();
        }

        // A session closed without finalize_recording succeeded; its
        // artifacts are not needed.
        if let Some(recorder) = self.take_recorder() {
            let _ = recorder.finalize(false).await;
            recorder.remove_dir();
        }

        let mut browser = self.browser.lock().await;
        if let Err(err) = browser.close().await {
            warn!(error = %err, "browser did not close cleanly");
        }
        let _ = browser.wait().await;
        self.handler_task.abort();
        Ok(())
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        self.handler_task.abort();
        for task in &self.aux_tasks {
            task.abort();
        }
    }
}

/// Spawn the navigation, console, and screencast collectors for a recorded
/// session.
async fn spawn_recording_tasks(
    page: &Page,
    recorder: &Arc<RecordingSession>,
) -> Vec<JoinHandle<()>> {
    let mut tasks = Vec::new();

    match page.event_listener::<EventFrameNavigated>().await {
        Ok(mut events) => {
            let recorder = Arc::clone(recorder);
            tasks.push(tokio::spawn(async move {
                while let Some(ev) = events.next().await {
                    recorder.log_navigation(&ev.frame.url);
                }
            }));
        }
        Err(err) => warn!(error = %err, "could not subscribe to navigation events"),
    }

    match page.event_listener::<EventConsoleApiCalled>().await {
        Ok(mut events) => {
            let recorder = Arc::clone(recorder);
            tasks.push(tokio::spawn(async move {
                while let Some(ev) = events.next().await {
                    recorder.log_console(&format_console_event(&ev));
                }
            }));
        }
        Err(err) => warn!(error = %err, "could not subscribe to console events"),
    }

    if recorder.video_enabled() {
        let page = page.clone();
        let recorder = Arc::clone(recorder);
        tasks.push(tokio::spawn(async move {
            loop {
                let params = ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Jpeg)
                    .quality(60)
                    .build();
                match page.screenshot(params).await {
                    Ok(bytes) => recorder.save_frame(&bytes),
                    Err(err) => debug!(error = %err, "screencast frame skipped"),
                }
                tokio::time::sleep(FRAME_INTERVAL).await;
            }
        }));
    }

    tasks
}

fn format_console_event(ev: &EventConsoleApiCalled) -> String {
    let body = ev
        .args
        .iter()
        .map(|arg| match (&arg.value, &arg.description) {
            (Some(value), _) => value.to_string(),
            (None, Some(description)) => description.clone(),
            (None, None) => String::from("<object>"),
        })
        .collect::<Vec<_>>()
        .join(" ");
    format!("[{:?}] {body}", ev.r#type)
}

/// Escape a string for embedding in a single-quoted JS literal.
fn js_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}
