//! Chromium-backed [`BrowserSession`] via chromiumoxide
//!
//! Each session owns one browser process with its own throwaway profile
//! directory and one page. The CDP event handler runs on a tracked task that
//! is aborted when the session goes away; the profile directory is removed
//! on `close()`, or in `Drop` if the session is dropped without closing.

use std::path::PathBuf;
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::future::Future;
use tokio::task::{self, JoinHandle};
use tracing::{debug, info, trace, warn};

use super::{BrowserSession, SessionFactory};
use crate::error::{SessionError, SessionResult};
use crate::utils::constants::{CHROME_USER_AGENT, DEFAULT_NAVIGATION_TIMEOUT_SECS};

/// Distinguishes profile directories of sessions opened by one process
static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// `CHROMIUM_PATH` wins over every other lookup, but only if it exists.
fn env_override(value: Option<String>) -> Option<PathBuf> {
    let path = PathBuf::from(value?);
    if path.exists() {
        info!(
            target: "job_harvest::session",
            "Using browser from CHROMIUM_PATH environment variable: {}",
            path.display()
        );
        return Some(path);
    }
    warn!(
        target: "job_harvest::session",
        "CHROMIUM_PATH environment variable points to non-existent file: {}",
        path.display()
    );
    None
}

/// Find Chrome/Chromium executable on the system with platform-specific search paths.
pub fn find_browser_executable() -> Result<PathBuf> {
    if let Some(path) = env_override(std::env::var("CHROMIUM_PATH").ok()) {
        return Ok(path);
    }

    let paths: &[&str] = if cfg!(target_os = "windows") {
        &[
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files\Chromium\Application\chrome.exe",
        ]
    } else if cfg!(target_os = "macos") {
        &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "~/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/opt/homebrew/bin/chromium",
        ]
    } else {
        &[
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
            "/usr/local/bin/chromium",
            "/opt/google/chrome/chrome",
        ]
    };

    for path_str in paths {
        let path = if let Some(rest) = path_str.strip_prefix("~/") {
            match dirs::home_dir() {
                Some(home) => home.join(rest),
                None => continue,
            }
        } else {
            PathBuf::from(path_str)
        };

        if path.exists() {
            info!(target: "job_harvest::session", "Found browser at: {}", path.display());
            return Ok(path);
        }
    }

    if !cfg!(target_os = "windows") {
        for cmd in &["chromium", "chromium-browser", "google-chrome", "chrome"] {
            let output = Command::new("which").arg(cmd).output();

            if let Ok(output) = output
                && output.status.success()
            {
                let path_str = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path_str.is_empty() {
                    let path = PathBuf::from(path_str);
                    info!(
                        target: "job_harvest::session",
                        "Found browser using 'which' command: {}",
                        path.display()
                    );
                    return Ok(path);
                }
            }
        }
    }

    Err(anyhow::anyhow!(
        "Chrome/Chromium executable not found; set CHROMIUM_PATH or chrome_path in the config"
    ))
}

/// Wrap a session operation with an explicit timeout.
async fn with_page_timeout<F, T>(operation: F, timeout_secs: u64, operation_name: &str) -> SessionResult<T>
where
    F: Future<Output = SessionResult<T>>,
{
    match tokio::time::timeout(Duration::from_secs(timeout_secs), operation).await {
        Ok(result) => result,
        Err(_) => Err(SessionError::Other(format!(
            "{operation_name} timeout after {timeout_secs} seconds"
        ))),
    }
}

/// Map a CDP failure, keeping "the browser is gone" distinguishable.
fn cdp_error(error: CdpError, context: &str) -> SessionError {
    match error {
        CdpError::NoResponse | CdpError::ChannelSendError(_) => {
            SessionError::Closed(format!("{context}: {error}"))
        }
        other => SessionError::Other(format!("{context}: {other}")),
    }
}

/// Launches one Chromium process per opened session
#[derive(Debug, Clone)]
pub struct ChromiumSessionFactory {
    headless: bool,
    chrome_path: Option<PathBuf>,
    navigation_timeout_secs: u64,
}

impl Default for ChromiumSessionFactory {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
            navigation_timeout_secs: DEFAULT_NAVIGATION_TIMEOUT_SECS,
        }
    }
}

impl ChromiumSessionFactory {
    #[must_use]
    pub fn new(headless: bool, chrome_path: Option<PathBuf>) -> Self {
        Self {
            headless,
            chrome_path,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn navigation_timeout_secs(mut self, secs: u64) -> Self {
        self.navigation_timeout_secs = secs;
        self
    }

    async fn launch(&self) -> Result<ChromiumSession> {
        let chrome_path = match &self.chrome_path {
            Some(path) => path.clone(),
            None => find_browser_executable()?,
        };

        let user_data_dir = std::env::temp_dir().join(format!(
            "job_harvest_chrome_{}_{}",
            std::process::id(),
            SESSION_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::create_dir_all(&user_data_dir).context("Failed to create user data directory")?;

        let builder = BrowserConfigBuilder::default()
            .request_timeout(Duration::from_secs(self.navigation_timeout_secs))
            .window_size(1920, 1080)
            .user_data_dir(user_data_dir.clone())
            .chrome_executable(chrome_path);
        let builder = if self.headless {
            builder.headless_mode(HeadlessMode::New)
        } else {
            builder.with_head()
        };

        let browser_config = builder
            .arg(format!("--user-agent={CHROME_USER_AGENT}"))
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--disable-notifications")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .arg("--password-store=basic")
            .arg("--use-mock-keychain")
            .arg("--mute-audio")
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .context("Failed to launch browser")?;

        let handler_task = task::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    // Unknown CDP messages from newer Chrome builds are harmless
                    let msg = e.to_string();
                    if msg.contains("data did not match any variant") {
                        trace!(target: "job_harvest::session", "Ignoring unknown CDP message: {msg}");
                    } else {
                        debug!(target: "job_harvest::session", "Browser handler error: {msg}");
                    }
                }
            }
            debug!(target: "job_harvest::session", "Browser event handler task completed");
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler_task.abort();
                let _ = std::fs::remove_dir_all(&user_data_dir);
                return Err(anyhow::anyhow!("Failed to open page: {e}"));
            }
        };

        Ok(ChromiumSession {
            browser,
            page,
            handler: handler_task,
            user_data_dir: Some(user_data_dir),
            navigation_timeout_secs: self.navigation_timeout_secs,
        })
    }
}

#[async_trait]
impl SessionFactory for ChromiumSessionFactory {
    async fn open(&self) -> SessionResult<Box<dyn BrowserSession>> {
        let session = self
            .launch()
            .await
            .map_err(|e| SessionError::Launch(format!("{e:#}")))?;
        info!(target: "job_harvest::session", "Browser session opened");
        Ok(Box::new(session))
    }
}

/// Browser process, its CDP handler task and the page being driven
pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    user_data_dir: Option<PathBuf>,
    navigation_timeout_secs: u64,
}

impl ChromiumSession {
    /// Remove the profile directory.
    ///
    /// Must run after `browser.wait()` so Chrome has released its file
    /// handles.
    fn cleanup_temp_dir(&mut self) {
        if let Some(path) = self.user_data_dir.take() {
            debug!(target: "job_harvest::session", "Cleaning up temp directory: {}", path.display());
            if let Err(e) = std::fs::remove_dir_all(&path) {
                warn!(
                    target: "job_harvest::session",
                    "Failed to clean up temp directory {}: {}. Manual cleanup may be required.",
                    path.display(),
                    e
                );
            }
        }
    }

    async fn eval<T: serde::de::DeserializeOwned>(&self, js: String, context: &str) -> SessionResult<T> {
        let result = self
            .page
            .evaluate(js)
            .await
            .map_err(|e| cdp_error(e, context))?;
        result
            .into_value::<T>()
            .map_err(|e| SessionError::Script(format!("{context}: {e}")))
    }
}

/// JS string literal for `selector`.
fn js_str(selector: &str) -> String {
    serde_json::to_string(selector).unwrap_or_else(|_| "\"\"".to_string())
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn goto(&mut self, url: &str) -> SessionResult<()> {
        let page = &self.page;
        with_page_timeout(
            async {
                page.goto(url).await.map_err(|e| match cdp_error(e, url) {
                    SessionError::Other(message) => SessionError::Navigation {
                        url: url.to_string(),
                        message,
                    },
                    other => other,
                })?;
                page.wait_for_navigation()
                    .await
                    .map_err(|e| cdp_error(e, "wait_for_navigation"))?;
                Ok(())
            },
            self.navigation_timeout_secs,
            "Page navigation",
        )
        .await
    }

    async fn current_url(&mut self) -> SessionResult<String> {
        let url = self
            .page
            .url()
            .await
            .map_err(|e| cdp_error(e, "current url"))?;
        Ok(url.unwrap_or_default())
    }

    async fn html(&mut self) -> SessionResult<String> {
        self.page
            .content()
            .await
            .map_err(|e| cdp_error(e, "page content"))
    }

    async fn is_present(&mut self, selector: &str) -> SessionResult<bool> {
        self.eval(
            format!("document.querySelector({}) !== null", js_str(selector)),
            "presence check",
        )
        .await
    }

    async fn click(&mut self, selector: &str) -> SessionResult<()> {
        let native = match self.page.find_element(selector).await {
            Ok(element) => element.click().await.map(|_| ()),
            Err(CdpError::NoResponse) => {
                return Err(SessionError::Closed(format!("click {selector}")));
            }
            Err(e) => Err(e),
        };

        if let Err(e) = native {
            // Overlays intercept synthesized mouse events; fall back to a DOM click
            debug!(target: "job_harvest::session", "Native click on '{selector}' failed ({e}), using script click");
            let clicked: bool = self
                .eval(
                    format!(
                        "(() => {{ const el = document.querySelector({}); if (!el) return false; el.click(); return true; }})()",
                        js_str(selector)
                    ),
                    "script click",
                )
                .await?;
            if !clicked {
                return Err(SessionError::ElementNotFound(selector.to_string()));
            }
        }
        Ok(())
    }

    async fn hide(&mut self, selector: &str) -> SessionResult<usize> {
        self.eval(
            format!(
                "(() => {{ const els = document.querySelectorAll({}); els.forEach(e => e.style.setProperty('display', 'none', 'important')); return els.length; }})()",
                js_str(selector)
            ),
            "hide overlay",
        )
        .await
    }

    async fn close(self: Box<Self>) -> SessionResult<()> {
        let mut this = self;
        let mut errors = Vec::new();

        if let Err(e) = this.browser.close().await {
            errors.push(format!("Browser close failed: {e}"));
        }
        // Wait for the process to exit before touching its profile directory
        if let Err(e) = this.browser.wait().await {
            errors.push(format!("Browser wait failed: {e}"));
        }
        this.cleanup_temp_dir();
        this.handler.abort();

        if errors.is_empty() {
            debug!(target: "job_harvest::session", "Browser session closed");
            Ok(())
        } else {
            Err(SessionError::Other(errors.join("; ")))
        }
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        self.handler.abort();
        // Browser::drop kills the Chrome process
        if self.user_data_dir.is_some() {
            warn!(
                target: "job_harvest::session",
                "ChromiumSession dropped without close() - removing temp dir in Drop"
            );
            self.cleanup_temp_dir();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;
    use tracing::Subscriber;
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    use super::*;

    /// Records the target of every event it sees.
    #[derive(Clone, Default)]
    struct Targets(Arc<Mutex<Vec<String>>>);

    impl<S: Subscriber> Layer<S> for Targets {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            self.0.lock().push(event.metadata().target().to_string());
        }
    }

    fn with_targets<T>(f: impl FnOnce() -> T) -> (T, Vec<String>) {
        let targets = Targets::default();
        let subscriber = tracing_subscriber::registry().with(targets.clone());
        let out = tracing::subscriber::with_default(subscriber, f);
        let seen = targets.0.lock().clone();
        (out, seen)
    }

    #[test]
    fn existing_override_is_used_and_logged_under_session() -> anyhow::Result<()> {
        let file = tempfile::NamedTempFile::new()?;
        let value = file.path().display().to_string();

        let (found, targets) = with_targets(|| env_override(Some(value)));

        assert_eq!(found.as_deref(), Some(file.path()));
        assert_eq!(targets, vec!["job_harvest::session".to_string()]);
        Ok(())
    }

    #[test]
    fn missing_override_falls_through_with_a_warning() {
        let (found, targets) =
            with_targets(|| env_override(Some("/nonexistent/chromium-binary".into())));

        assert_eq!(found, None);
        assert_eq!(targets, vec!["job_harvest::session".to_string()]);
        assert_eq!(env_override(None), None);
    }
}
