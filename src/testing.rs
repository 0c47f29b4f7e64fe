//! Test doubles for the browser and the geocoder.
//!
//! These let the whole pipeline run against canned HTML without a browser
//! or network access.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use scraper::{Html, Selector};

use crate::error::{GeocodeError, GeocodeResult, SessionError, SessionResult};
use crate::location::Geocoder;
use crate::session::{BrowserSession, SessionFactory};

/// Canned pages and click transitions for a [`ScriptedSession`]
#[derive(Debug, Clone, Default)]
pub struct ScriptedSite {
    pages: HashMap<String, String>,
    clicks: HashMap<(String, String), String>,
    failing: HashSet<String>,
    crashing: HashSet<String>,
}

impl ScriptedSite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `html` at `url`.
    pub fn page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }

    /// Clicking `selector` while on `from` shows the page at `to`.
    pub fn click(
        mut self,
        from: impl Into<String>,
        selector: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        self.clicks.insert((from.into(), selector.into()), to.into());
        self
    }

    /// Navigating to `url` fails; the session stays usable.
    pub fn fail(mut self, url: impl Into<String>) -> Self {
        self.failing.insert(url.into());
        self
    }

    /// Navigating to `url` kills the session.
    pub fn crash(mut self, url: impl Into<String>) -> Self {
        self.crashing.insert(url.into());
        self
    }
}

/// Everything the scripted sessions were asked to do
#[derive(Debug, Clone, Default)]
pub struct SessionLog {
    pub opened: usize,
    pub closed: usize,
    /// `goto` targets, in order, including failed ones
    pub visits: Vec<String>,
    /// Click selectors, in order
    pub clicks: Vec<String>,
    pub hidden: Vec<String>,
}

impl SessionLog {
    /// Whether `url` was navigated to.
    #[must_use]
    pub fn visited(&self, url: &str) -> bool {
        self.visits.iter().any(|v| v == url)
    }
}

fn select_count(html: &str, selector: &str) -> SessionResult<usize> {
    let parsed = Selector::parse(selector)
        .map_err(|e| SessionError::Script(format!("invalid selector '{selector}': {e:?}")))?;
    Ok(Html::parse_document(html).select(&parsed).count())
}

/// In-memory [`BrowserSession`] replaying a [`ScriptedSite`]
#[derive(Debug)]
pub struct ScriptedSession {
    site: Arc<ScriptedSite>,
    log: Arc<Mutex<SessionLog>>,
    current: Option<String>,
    dead: bool,
}

impl ScriptedSession {
    fn current_html(&self) -> &str {
        self.current
            .as_ref()
            .and_then(|url| self.site.pages.get(url))
            .map_or("<html><body></body></html>", String::as_str)
    }

    fn ensure_alive(&self) -> SessionResult<()> {
        if self.dead {
            return Err(SessionError::Closed("scripted crash".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn goto(&mut self, url: &str) -> SessionResult<()> {
        self.ensure_alive()?;
        self.log.lock().visits.push(url.to_string());

        if self.site.crashing.contains(url) {
            self.dead = true;
            return Err(SessionError::Closed(format!("crashed loading {url}")));
        }
        if self.site.failing.contains(url) {
            return Err(SessionError::Navigation {
                url: url.to_string(),
                message: "scripted failure".into(),
            });
        }
        if !self.site.pages.contains_key(url) {
            return Err(SessionError::Navigation {
                url: url.to_string(),
                message: "no scripted page".into(),
            });
        }
        self.current = Some(url.to_string());
        Ok(())
    }

    async fn current_url(&mut self) -> SessionResult<String> {
        self.ensure_alive()?;
        Ok(self.current.clone().unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn html(&mut self) -> SessionResult<String> {
        self.ensure_alive()?;
        Ok(self.current_html().to_string())
    }

    async fn is_present(&mut self, selector: &str) -> SessionResult<bool> {
        self.ensure_alive()?;
        Ok(select_count(self.current_html(), selector)? > 0)
    }

    async fn click(&mut self, selector: &str) -> SessionResult<()> {
        self.ensure_alive()?;
        self.log.lock().clicks.push(selector.to_string());

        let from = self.current.clone().unwrap_or_default();
        if let Some(to) = self.site.clicks.get(&(from, selector.to_string())) {
            self.current = Some(to.clone());
            return Ok(());
        }
        if select_count(self.current_html(), selector)? > 0 {
            return Ok(());
        }
        Err(SessionError::ElementNotFound(selector.to_string()))
    }

    async fn hide(&mut self, selector: &str) -> SessionResult<usize> {
        self.ensure_alive()?;
        self.log.lock().hidden.push(selector.to_string());
        select_count(self.current_html(), selector)
    }

    async fn close(self: Box<Self>) -> SessionResult<()> {
        self.log.lock().closed += 1;
        Ok(())
    }
}

/// Hands out [`ScriptedSession`]s sharing one [`SessionLog`]
#[derive(Debug, Clone)]
pub struct ScriptedSessionFactory {
    site: Arc<ScriptedSite>,
    log: Arc<Mutex<SessionLog>>,
    fail_open: bool,
}

impl ScriptedSessionFactory {
    pub fn new(site: ScriptedSite) -> Self {
        Self {
            site: Arc::new(site),
            log: Arc::new(Mutex::new(SessionLog::default())),
            fail_open: false,
        }
    }

    /// Every `open` fails as if the browser could not start.
    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Snapshot of the shared log.
    pub fn log(&self) -> SessionLog {
        self.log.lock().clone()
    }
}

#[async_trait]
impl SessionFactory for ScriptedSessionFactory {
    async fn open(&self) -> SessionResult<Box<dyn BrowserSession>> {
        if self.fail_open {
            return Err(SessionError::Launch("scripted launch failure".into()));
        }
        self.log.lock().opened += 1;
        Ok(Box::new(ScriptedSession {
            site: Arc::clone(&self.site),
            log: Arc::clone(&self.log),
            current: None,
            dead: false,
        }))
    }
}

/// [`Geocoder`] answering from a fixed table and counting calls
#[derive(Debug, Default)]
pub struct CountingGeocoder {
    answers: HashMap<String, String>,
    calls: AtomicUsize,
    queries: Mutex<Vec<String>>,
    failing: bool,
    delay: Option<Duration>,
}

impl CountingGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `country` for `city` (matched case-insensitively).
    pub fn with(mut self, city: &str, country: &str) -> Self {
        self.answers.insert(city.to_lowercase(), country.to_string());
        self
    }

    /// Every lookup fails with an HTTP 503.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Every lookup takes `delay` before answering.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Cities queried, in order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl Geocoder for CountingGeocoder {
    async fn country_for(&self, city: &str) -> GeocodeResult<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().push(city.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing {
            return Err(GeocodeError::Status(503));
        }
        Ok(self.answers.get(&city.to_lowercase()).cloned())
    }
}
