//! Page traversal for listing views
//!
//! `PaginationController::next_page` is called after each page has been
//! extracted and answers whether there is another page to read:
//!
//! ```text
//! Listing(n) ──▶ CheckNext ──┬──▶ Listing(n+1)   (Continue)
//!                            └──▶ Done           (Terminate(reason))
//! ```
//!
//! Termination happens when there is no next control, the control is
//! disabled, the sample-mode page budget is spent, the site's own page count
//! is reached, a page-parameter walk hits an empty page, or anything goes
//! wrong while probing. Faults never propagate: a broken paginator ends that
//! site's listing walk and nothing else.
//!
//! After clicking a next control the controller waits until the listing rows
//! it saw before the click have been replaced, so the next extraction pass
//! never re-reads the old page or a half-rendered new one.

use std::collections::HashSet;
use std::fmt;

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::ExtractResult;
use crate::extract::ListingSummary;
use crate::extract::parse_selector;
use crate::session::{BrowserSession, WaitSettings};
use crate::utils::constants::DEFAULT_SAMPLE_PAGES;
use crate::utils::url_utils::with_query_param;

/// Class fragments that mark a next control as unusable
pub const DEFAULT_DISABLED_MARKERS: &[&str] = &["disabled", "invisible", "pe-none"];

fn default_disabled_markers() -> Vec<String> {
    DEFAULT_DISABLED_MARKERS.iter().map(|m| (*m).to_string()).collect()
}

fn default_first_page() -> u32 {
    1
}

/// Full crawl or a bounded sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CrawlMode {
    /// Visit at most `pages` listing pages per site
    Sample { pages: u32 },
    /// Follow pagination to the end
    Full,
}

impl Default for CrawlMode {
    fn default() -> Self {
        CrawlMode::Sample {
            pages: DEFAULT_SAMPLE_PAGES,
        }
    }
}

impl CrawlMode {
    /// Maximum listing pages per site, `None` when unbounded.
    #[must_use]
    pub fn page_cap(&self) -> Option<u32> {
        match self {
            CrawlMode::Sample { pages } => Some(*pages),
            CrawlMode::Full => None,
        }
    }

    #[must_use]
    pub fn is_sample(&self) -> bool {
        matches!(self, CrawlMode::Sample { .. })
    }
}

/// How a site moves from one results page to the next
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaginationStrategy {
    /// Everything is on the first page
    #[default]
    None,
    /// Click a "next" control
    NextControl {
        selector: String,
        /// Class fragments meaning "disabled" on the control or its parent
        #[serde(default = "default_disabled_markers")]
        disabled_markers: Vec<String>,
        /// Page-number items; the last one's text is the site's page count
        #[serde(default)]
        page_count_selector: Option<String>,
    },
    /// Rewrite a query parameter (`?page=N`) and navigate
    PageParam {
        param: String,
        #[serde(default = "default_first_page")]
        first_page: u32,
    },
}

impl PaginationStrategy {
    pub fn next_control(selector: impl Into<String>) -> Self {
        PaginationStrategy::NextControl {
            selector: selector.into(),
            disabled_markers: default_disabled_markers(),
            page_count_selector: None,
        }
    }
}

/// Why a listing walk ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationReason {
    /// No next control on the page
    NoNextControl,
    /// Next control present but disabled
    Disabled,
    /// Sample-mode page budget spent
    BudgetExhausted,
    /// The site's own page count reached
    LastPage,
    /// Page-parameter walk reached a page with no listings
    EmptyPage,
    /// Probing or advancing failed; the walk ends quietly
    Fault(String),
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::NoNextControl => write!(f, "no next control"),
            TerminationReason::Disabled => write!(f, "next control disabled"),
            TerminationReason::BudgetExhausted => write!(f, "sample page budget exhausted"),
            TerminationReason::LastPage => write!(f, "last page reached"),
            TerminationReason::EmptyPage => write!(f, "empty page"),
            TerminationReason::Fault(e) => write!(f, "pagination fault: {e}"),
        }
    }
}

/// Outcome of one `next_page` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageStep {
    Continue,
    Terminate(TerminationReason),
}

/// Per-site walk state, owned by one pipeline run
#[derive(Debug)]
pub struct CrawlState {
    page: u32,
    cap: Option<u32>,
    listings: Vec<ListingSummary>,
    seen_links: HashSet<String>,
    terminal: Option<TerminationReason>,
}

impl CrawlState {
    #[must_use]
    pub fn new(mode: CrawlMode) -> Self {
        Self {
            page: 1,
            cap: mode.page_cap(),
            listings: Vec::new(),
            seen_links: HashSet::new(),
            terminal: None,
        }
    }

    /// 1-based number of the page currently shown.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub fn cap(&self) -> Option<u32> {
        self.cap
    }

    /// Whether a listing with this detail link is already queued.
    #[must_use]
    pub fn has_link(&self, link: &str) -> bool {
        self.seen_links.contains(link)
    }

    /// Queue a listing unless its detail link is already queued.
    pub fn accept(&mut self, listing: ListingSummary) -> bool {
        if !self.seen_links.insert(listing.link.clone()) {
            return false;
        }
        self.listings.push(listing);
        true
    }

    #[must_use]
    pub fn listings(&self) -> &[ListingSummary] {
        &self.listings
    }

    #[must_use]
    pub fn into_listings(self) -> Vec<ListingSummary> {
        self.listings
    }

    #[must_use]
    pub fn termination(&self) -> Option<&TerminationReason> {
        self.terminal.as_ref()
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.terminal.is_some()
    }
}

/// Result of inspecting a page's pagination markup
#[derive(Debug, PartialEq, Eq)]
enum ControlState {
    Advance,
    Stop(TerminationReason),
}

/// Compiled pagination strategy for one site
#[derive(Debug, Clone)]
pub struct PaginationController {
    strategy: PaginationStrategy,
    next: Option<Selector>,
    page_count: Option<Selector>,
    item: Selector,
    wait: WaitSettings,
}

impl PaginationController {
    /// `item_selector` selects listing rows; it is used to detect when a
    /// page's content has been replaced.
    pub fn new(strategy: PaginationStrategy, item_selector: &str, wait: WaitSettings) -> ExtractResult<Self> {
        let (next, page_count) = match &strategy {
            PaginationStrategy::NextControl {
                selector,
                page_count_selector,
                ..
            } => (
                Some(parse_selector(selector)?),
                page_count_selector.as_deref().map(parse_selector).transpose()?,
            ),
            _ => (None, None),
        };

        Ok(Self {
            strategy,
            next,
            page_count,
            item: parse_selector(item_selector)?,
            wait,
        })
    }

    #[must_use]
    pub fn strategy(&self) -> &PaginationStrategy {
        &self.strategy
    }

    /// Decide whether another page follows and, if so, move to it.
    ///
    /// `current_page_results` is the number of listings the page just read
    /// produced. Never returns an error: faults become
    /// `Terminate(Fault(..))`. Once terminated, the state stays terminated.
    pub async fn next_page(
        &self,
        session: &mut dyn BrowserSession,
        state: &mut CrawlState,
        current_page_results: usize,
    ) -> PageStep {
        if let Some(reason) = &state.terminal {
            return PageStep::Terminate(reason.clone());
        }

        let step = self.advance(session, state, current_page_results).await;
        match &step {
            PageStep::Continue => {
                state.page += 1;
                debug!(target: "job_harvest::pagination", "Advanced to page {}", state.page);
            }
            PageStep::Terminate(reason) => {
                match reason {
                    TerminationReason::Fault(_) => {
                        warn!(target: "job_harvest::pagination", "Stopping at page {}: {reason}", state.page)
                    }
                    _ => info!(target: "job_harvest::pagination", "Stopping at page {}: {reason}", state.page),
                }
                state.terminal = Some(reason.clone());
            }
        }
        step
    }

    async fn advance(
        &self,
        session: &mut dyn BrowserSession,
        state: &CrawlState,
        current_page_results: usize,
    ) -> PageStep {
        if let Some(cap) = state.cap
            && state.page >= cap
        {
            return PageStep::Terminate(TerminationReason::BudgetExhausted);
        }

        match &self.strategy {
            PaginationStrategy::None => PageStep::Terminate(TerminationReason::NoNextControl),
            PaginationStrategy::PageParam { param, first_page } => {
                if current_page_results == 0 {
                    return PageStep::Terminate(TerminationReason::EmptyPage);
                }
                self.goto_page(session, param, first_page + state.page).await
            }
            PaginationStrategy::NextControl {
                selector,
                disabled_markers,
                ..
            } => self.click_next(session, state, selector, disabled_markers).await,
        }
    }

    async fn goto_page(&self, session: &mut dyn BrowserSession, param: &str, number: u32) -> PageStep {
        let current = match session.current_url().await {
            Ok(url) => url,
            Err(e) => return PageStep::Terminate(TerminationReason::Fault(e.to_string())),
        };
        let url = match Url::parse(&current) {
            Ok(url) => url,
            Err(e) => return PageStep::Terminate(TerminationReason::Fault(format!("{current}: {e}"))),
        };

        let next = with_query_param(&url, param, &number.to_string());
        match session.goto(next.as_str()).await {
            Ok(()) => PageStep::Continue,
            Err(e) => PageStep::Terminate(TerminationReason::Fault(e.to_string())),
        }
    }

    async fn click_next(
        &self,
        session: &mut dyn BrowserSession,
        state: &CrawlState,
        selector: &str,
        disabled_markers: &[String],
    ) -> PageStep {
        let html = match session.html().await {
            Ok(html) => html,
            Err(e) => return PageStep::Terminate(TerminationReason::Fault(e.to_string())),
        };

        if let ControlState::Stop(reason) = self.control_state(&html, state.page, disabled_markers) {
            return PageStep::Terminate(reason);
        }
        let before = self.fingerprint(&html);

        if let Err(e) = session.click(selector).await {
            return PageStep::Terminate(TerminationReason::Fault(e.to_string()));
        }

        match self.wait_until_replaced(session, &before).await {
            Ok(()) => PageStep::Continue,
            Err(reason) => PageStep::Terminate(reason),
        }
    }

    /// Inspect pagination markup without touching the session.
    fn control_state(&self, html: &str, page: u32, disabled_markers: &[String]) -> ControlState {
        let Some(next) = &self.next else {
            return ControlState::Stop(TerminationReason::NoNextControl);
        };
        let document = Html::parse_document(html);

        if let Some(count_selector) = &self.page_count {
            let last = document
                .select(count_selector)
                .filter_map(|item| item.text().collect::<String>().trim().parse::<u32>().ok())
                .max();
            if let Some(total) = last
                && page >= total
            {
                return ControlState::Stop(TerminationReason::LastPage);
            }
        }

        let Some(control) = document.select(next).next() else {
            return ControlState::Stop(TerminationReason::NoNextControl);
        };

        if is_disabled(control, disabled_markers) {
            return ControlState::Stop(TerminationReason::Disabled);
        }
        ControlState::Advance
    }

    fn fingerprint(&self, html: &str) -> String {
        Html::parse_document(html)
            .select(&self.item)
            .map(|row| row.html())
            .collect::<Vec<_>>()
            .join("\u{1f}")
    }

    /// Poll until the listing rows differ from `before` and are non-empty.
    async fn wait_until_replaced(
        &self,
        session: &mut dyn BrowserSession,
        before: &str,
    ) -> Result<(), TerminationReason> {
        let start = Instant::now();

        loop {
            match session.html().await {
                Ok(html) => {
                    let now = self.fingerprint(&html);
                    if !now.is_empty() && now != before {
                        return Ok(());
                    }
                }
                Err(e) if !e.is_transient() => {
                    return Err(TerminationReason::Fault(e.to_string()));
                }
                Err(e) => debug!(target: "job_harvest::pagination", "Staleness check failed: {e}"),
            }

            if start.elapsed() >= self.wait.required {
                return Err(TerminationReason::Fault(format!(
                    "listing content unchanged {:?} after clicking next",
                    self.wait.required
                )));
            }
            tokio::time::sleep(self.wait.poll_interval).await;
        }
    }
}

/// `disabled` / `aria-disabled="true"` on the control, or a marker class on
/// the control or its parent element. Markers match whole class tokens.
fn is_disabled(control: ElementRef<'_>, markers: &[String]) -> bool {
    let element = control.value();
    if element.attr("disabled").is_some() || element.attr("aria-disabled") == Some("true") {
        return true;
    }

    let has_marker = |el: ElementRef<'_>| {
        el.value().attr("class").is_some_and(|class| {
            class
                .split_whitespace()
                .any(|token| markers.iter().any(|m| m.as_str() == token))
        })
    };

    has_marker(control) || control.parent().and_then(ElementRef::wrap).is_some_and(has_marker)
}
