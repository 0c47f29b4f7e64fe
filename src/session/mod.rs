//! Browser session capability
//!
//! The pipeline never talks to a browser directly. It drives a
//! [`BrowserSession`]: navigate, snapshot the DOM as HTML, wait for and
//! click elements, hide overlays. Extraction happens on the snapshot, so
//! everything past the session boundary is plain, testable string work.
//!
//! Sessions are opened through a [`SessionFactory`] and must be released with
//! [`BrowserSession::close`] on every exit path.

pub mod chromium;

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::debug;

use crate::error::{SessionError, SessionResult};

pub use chromium::{ChromiumSession, ChromiumSessionFactory};

/// One live browser tab driven by a single pipeline run
#[async_trait]
pub trait BrowserSession: Send {
    /// Navigate and wait for the load to settle.
    async fn goto(&mut self, url: &str) -> SessionResult<()>;

    /// URL of the current document.
    async fn current_url(&mut self) -> SessionResult<String>;

    /// Serialized HTML of the current document.
    async fn html(&mut self) -> SessionResult<String>;

    /// Whether `selector` currently matches at least one element.
    async fn is_present(&mut self, selector: &str) -> SessionResult<bool>;

    /// Click the first element matching `selector`.
    async fn click(&mut self, selector: &str) -> SessionResult<()>;

    /// Hide every element matching `selector`; returns how many were hidden.
    async fn hide(&mut self, selector: &str) -> SessionResult<usize>;

    /// Release the session and everything it holds.
    async fn close(self: Box<Self>) -> SessionResult<()>;
}

/// Source of fresh sessions, one per site run
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self) -> SessionResult<Box<dyn BrowserSession>>;
}

/// Bounded wait settings shared by every session interaction in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitSettings {
    /// Wait for elements the run cannot do without
    pub required: Duration,
    /// Wait for best-effort controls (consent dialogs)
    pub optional: Duration,
    pub poll_interval: Duration,
}

impl Default for WaitSettings {
    fn default() -> Self {
        use crate::utils::constants::{
            DEFAULT_OPTIONAL_WAIT_TIMEOUT, DEFAULT_POLL_INTERVAL, DEFAULT_WAIT_TIMEOUT,
        };
        Self {
            required: DEFAULT_WAIT_TIMEOUT,
            optional: DEFAULT_OPTIONAL_WAIT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Poll until `selector` is present or `timeout` expires.
///
/// Lookup errors other than a dead session count as "not yet present".
pub async fn wait_for(
    session: &mut dyn BrowserSession,
    selector: &str,
    timeout: Duration,
    poll_interval: Duration,
) -> SessionResult<()> {
    let start = Instant::now();

    loop {
        match session.is_present(selector).await {
            Ok(true) => return Ok(()),
            Ok(false) => {}
            Err(e) if !e.is_transient() => return Err(e),
            Err(e) => debug!(target: "job_harvest::session", "Lookup of '{selector}' failed: {e}"),
        }

        if start.elapsed() >= timeout {
            return Err(SessionError::Timeout {
                selector: selector.to_string(),
                timeout,
            });
        }

        tokio::time::sleep(poll_interval).await;
    }
}

/// Best-effort wait-and-click; any failure is swallowed.
///
/// Returns whether the click happened.
pub async fn click_if_present(
    session: &mut dyn BrowserSession,
    selector: &str,
    wait: &WaitSettings,
) -> bool {
    if wait_for(session, selector, wait.optional, wait.poll_interval)
        .await
        .is_err()
    {
        return false;
    }

    match session.click(selector).await {
        Ok(()) => true,
        Err(e) => {
            debug!(target: "job_harvest::session", "Optional click on '{selector}' failed: {e}");
            false
        }
    }
}
