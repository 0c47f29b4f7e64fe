//! One site, start to finish
//!
//! ```text
//! open session ─▶ start page ─▶ consent/overlays ─▶ [frame]
//!      ┌─────────────────────────────────────────────┘
//!      ▼
//!  listing page ─▶ rows ─▶ freshness ─▶ link dedup ─▶ location ─▶ queue
//!      ▲                                                            │
//!      └──────────── PaginationController::next_page ◀──────────────┘
//!
//!  queue ─▶ detail page ─▶ JobDetail ─▶ JobPosting ─▶ DeduplicatingSink
//! ```
//!
//! A broken row, page or detail page costs only itself. A dead session or a
//! failing store ends the site's run. The session is closed on every path.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{
    ExtractError, ExtractResult, PipelineError, PipelineResult, SessionError, SessionResult,
};
use crate::extract::{JobDetail, ListingSummary, split_location};
use crate::freshness::{FreshnessFilter, parse_publish_date};
use crate::location::{CountryNormalizer, LocationResolver, normalize_city};
use crate::pagination::{CrawlMode, CrawlState, PageStep, TerminationReason};
use crate::session::{BrowserSession, SessionFactory, WaitSettings, click_if_present, wait_for};
use crate::sink::{DeduplicatingSink, StoreOutcome};
use crate::site::{CompiledSite, LocationMode};
use crate::store::JobPosting;
use crate::utils::constants::UNKNOWN;
use crate::utils::string_utils::{collapse_whitespace, is_unknown};

/// Counts for one site run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub site: String,
    pub pages_visited: u32,
    /// Rows that extracted into a listing
    pub listings_seen: usize,
    /// Rows missing a title or link
    pub malformed_rows: usize,
    /// Listings queued for a detail visit
    pub admitted: usize,
    pub stale: usize,
    pub unparseable_dates: usize,
    /// Empty date cells on a site that does not admit undated listings
    pub undated_dropped: usize,
    pub duplicate_links: usize,
    pub detail_failures: usize,
    pub stored: usize,
    pub duplicates: usize,
    pub termination: Option<TerminationReason>,
}

impl RunReport {
    fn new(site: &str) -> Self {
        Self {
            site: site.to_string(),
            ..Self::default()
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} pages, {} listings, {} admitted ({} stale, {} bad dates, {} undated), \
             {} detail failures, {} stored, {} duplicates",
            self.site,
            self.pages_visited,
            self.listings_seen,
            self.admitted,
            self.stale,
            self.unparseable_dates,
            self.undated_dropped,
            self.detail_failures,
            self.stored,
            self.duplicates,
        )?;
        if let Some(reason) = &self.termination {
            write!(f, "; stopped: {reason}")?;
        }
        Ok(())
    }
}

/// Outcome of checking a publish-date text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateCheck {
    Admit(Option<NaiveDate>),
    Stale(NaiveDate),
    Unparseable,
    Undated,
}

/// Listing-phase results carried to the detail phase
#[derive(Debug)]
struct Placement {
    city: String,
    country: String,
    published: Option<NaiveDate>,
}

/// Generic crawl-and-extract run over a [`CompiledSite`]
#[derive(Clone)]
pub struct CollectionPipeline {
    factory: Arc<dyn SessionFactory>,
    resolver: Arc<LocationResolver>,
    normalizer: Arc<CountryNormalizer>,
    sink: DeduplicatingSink,
    freshness: FreshnessFilter,
    mode: CrawlMode,
    wait: WaitSettings,
}

impl fmt::Debug for CollectionPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionPipeline")
            .field("mode", &self.mode)
            .field("wait", &self.wait)
            .finish_non_exhaustive()
    }
}

impl CollectionPipeline {
    pub fn new(
        factory: Arc<dyn SessionFactory>,
        resolver: Arc<LocationResolver>,
        sink: DeduplicatingSink,
    ) -> Self {
        Self {
            factory,
            resolver,
            normalizer: Arc::new(CountryNormalizer::new()),
            sink,
            freshness: FreshnessFilter::default(),
            mode: CrawlMode::default(),
            wait: WaitSettings::default(),
        }
    }

    #[must_use]
    pub fn with_normalizer(mut self, normalizer: CountryNormalizer) -> Self {
        self.normalizer = Arc::new(normalizer);
        self
    }

    #[must_use]
    pub fn with_freshness(mut self, freshness: FreshnessFilter) -> Self {
        self.freshness = freshness;
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: CrawlMode) -> Self {
        self.mode = mode;
        self
    }

    /// Bounded waits for consent dialogs, listing rows and descriptions.
    ///
    /// Pagination waits are compiled into each site's controller.
    #[must_use]
    pub fn with_wait(mut self, wait: WaitSettings) -> Self {
        self.wait = wait;
        self
    }

    #[must_use]
    pub fn mode(&self) -> CrawlMode {
        self.mode
    }

    #[must_use]
    pub fn wait(&self) -> WaitSettings {
        self.wait
    }

    /// Crawl `site` and persist what it yields.
    pub async fn run(&self, site: &CompiledSite) -> PipelineResult<RunReport> {
        let name = site.name().to_string();
        info!(target: "job_harvest::pipeline", "Starting {name} ({:?})", self.mode);

        let mut session = self
            .factory
            .open()
            .await
            .map_err(|source| PipelineError::Session {
                site: name.clone(),
                source,
            })?;

        let mut report = RunReport::new(&name);
        let outcome = self.drive(session.as_mut(), site, &mut report).await;

        if let Err(e) = session.close().await {
            warn!(target: "job_harvest::pipeline", "Failed to close session for {name}: {e}");
        }

        match outcome {
            Ok(()) => {
                info!(target: "job_harvest::pipeline", "Finished {report}");
                Ok(report)
            }
            Err(e) => {
                warn!(target: "job_harvest::pipeline", "Abandoned {name} after {} stored: {e}", report.stored);
                Err(e)
            }
        }
    }

    async fn drive(
        &self,
        session: &mut dyn BrowserSession,
        site: &CompiledSite,
        report: &mut RunReport,
    ) -> PipelineResult<()> {
        let queue = self
            .collect_listings(session, site, report)
            .await
            .map_err(|source| PipelineError::Session {
                site: site.name().to_string(),
                source,
            })?;
        self.visit_details(session, site, queue, report).await
    }

    async fn collect_listings(
        &self,
        session: &mut dyn BrowserSession,
        site: &CompiledSite,
        report: &mut RunReport,
    ) -> SessionResult<Vec<(ListingSummary, Placement)>> {
        session.goto(site.spec.start_url_for(self.mode)).await?;
        self.dismiss_consent(session, site).await;
        self.hide_overlays(session, site).await;
        self.enter_frame(session, site).await?;

        let mut state = CrawlState::new(self.mode);
        let mut placements = Vec::new();

        loop {
            report.pages_visited += 1;
            let rows = match self.read_page(session, site).await {
                Ok(rows) => rows,
                Err(e) if e.is_transient() => {
                    warn!(
                        target: "job_harvest::pipeline",
                        "{}: skipping page {}: {e}", site.name(), state.page()
                    );
                    Vec::new()
                }
                Err(e) => return Err(e),
            };
            let found = rows.len();

            for (row, result) in rows.into_iter().enumerate() {
                let listing = match result {
                    Ok(listing) => listing,
                    Err(e) => {
                        debug!(
                            target: "job_harvest::pipeline",
                            "{}: page {} row {}: {e}", site.name(), state.page(), row + 1
                        );
                        report.malformed_rows += 1;
                        continue;
                    }
                };
                report.listings_seen += 1;

                let published = if site.listing.has_publish_date() {
                    match self.check_date(site, &listing.publish_date) {
                        DateCheck::Admit(date) => date,
                        rejected => {
                            record_rejection(rejected, &listing, report);
                            continue;
                        }
                    }
                } else {
                    None
                };

                if state.has_link(&listing.link) {
                    report.duplicate_links += 1;
                    continue;
                }

                let (city, country) = self
                    .locate(site.spec.location_mode, &listing.location, &listing.country)
                    .await;
                if state.accept(listing) {
                    placements.push(Placement {
                        city,
                        country,
                        published,
                    });
                }
            }

            self.hide_overlays(session, site).await;
            match site.pagination.next_page(session, &mut state, found).await {
                PageStep::Continue => {}
                PageStep::Terminate(reason) => {
                    report.termination = Some(reason);
                    break;
                }
            }
        }

        report.admitted = placements.len();
        info!(
            target: "job_harvest::pipeline",
            "{}: {} listings queued from {} pages", site.name(), report.admitted, report.pages_visited
        );
        Ok(state.into_listings().into_iter().zip(placements).collect())
    }

    async fn read_page(
        &self,
        session: &mut dyn BrowserSession,
        site: &CompiledSite,
    ) -> SessionResult<Vec<ExtractResult<ListingSummary>>> {
        wait_for(
            session,
            &site.spec.listing.item,
            self.wait.required,
            self.wait.poll_interval,
        )
        .await?;
        let html = session.html().await?;
        let base = current_page_url(session).await?;
        Ok(site.listing.extract_page(&html, &base))
    }

    async fn visit_details(
        &self,
        session: &mut dyn BrowserSession,
        site: &CompiledSite,
        queue: Vec<(ListingSummary, Placement)>,
        report: &mut RunReport,
    ) -> PipelineResult<()> {
        let total = queue.len();

        for (index, (listing, placement)) in queue.into_iter().enumerate() {
            let item = index + 1;

            let detail = match self.read_detail(session, site, &listing.link).await {
                Ok(detail) => detail,
                Err(DetailFailure::Session(source)) if !source.is_transient() => {
                    return Err(PipelineError::Session {
                        site: site.name().to_string(),
                        source,
                    });
                }
                Err(e) => {
                    warn!(
                        target: "job_harvest::pipeline",
                        "{}: detail {item}/{total} failed ({}): {e}", site.name(), listing.link
                    );
                    report.detail_failures += 1;
                    continue;
                }
            };

            let Some(posting) = self.assemble(site, listing, placement, detail, report).await else {
                continue;
            };

            match self.sink.store(&posting).await {
                Ok(StoreOutcome::Stored) => report.stored += 1,
                Ok(StoreOutcome::SkippedDuplicate) => report.duplicates += 1,
                Err(source) => {
                    return Err(PipelineError::Store {
                        site: site.name().to_string(),
                        source,
                    });
                }
            }
        }
        Ok(())
    }

    async fn read_detail(
        &self,
        session: &mut dyn BrowserSession,
        site: &CompiledSite,
        link: &str,
    ) -> Result<JobDetail, DetailFailure> {
        session.goto(link).await?;
        self.enter_frame(session, site).await?;
        if let Some(body) = site.spec.detail.description.first() {
            wait_for(session, body, self.wait.required, self.wait.poll_interval).await?;
        }
        let html = session.html().await?;
        let page = current_page_url(session).await?;
        site.detail.extract(&html, &page).map_err(DetailFailure::Extract)
    }

    /// Merge listing, detail and resolved location into a posting.
    ///
    /// `None` when a date read from the detail page rejects the listing.
    async fn assemble(
        &self,
        site: &CompiledSite,
        listing: ListingSummary,
        placement: Placement,
        detail: JobDetail,
        report: &mut RunReport,
    ) -> Option<JobPosting> {
        let published = if site.detail.has_publish_date() {
            let text = detail.publish_date.as_deref().unwrap_or(UNKNOWN);
            match self.check_date(site, text) {
                DateCheck::Admit(date) => date,
                rejected => {
                    record_rejection(rejected, &listing, report);
                    return None;
                }
            }
        } else {
            placement.published
        };

        let (city, country) = match detail.location.as_deref() {
            Some(location) if is_unknown(&placement.city) => {
                self.locate(site.spec.location_mode, location, UNKNOWN).await
            }
            _ => (placement.city, placement.country),
        };

        let prefer_listing = |listing_value: String, detail_value: Option<String>| {
            if is_unknown(&listing_value) {
                detail_value.unwrap_or(listing_value)
            } else {
                listing_value
            }
        };

        Some(JobPosting {
            title: listing.title,
            company: site.spec.company.clone(),
            city,
            country,
            url: detail.apply_link.unwrap_or(listing.link),
            contract_type: prefer_listing(listing.contract_type, detail.contract_type),
            work_mode: prefer_listing(listing.work_mode, detail.work_mode),
            publish_date: published
                .map_or_else(|| UNKNOWN.to_string(), |d| d.format("%Y-%m-%d").to_string()),
            description: detail.description,
        })
    }

    fn check_date(&self, site: &CompiledSite, text: &str) -> DateCheck {
        if is_unknown(text) {
            return if site.spec.admit_undated {
                DateCheck::Admit(None)
            } else {
                DateCheck::Undated
            };
        }
        match parse_publish_date(text, &site.spec.date_formats) {
            Ok(date) if self.freshness.is_admissible(date) => DateCheck::Admit(Some(date)),
            Ok(date) => DateCheck::Stale(date),
            Err(e) => {
                warn!(target: "job_harvest::pipeline", "{}: {e}", site.name());
                DateCheck::Unparseable
            }
        }
    }

    /// (city, country) for a listing; a missing country is resolved from
    /// the city, then canonicalized.
    async fn locate(&self, mode: LocationMode, location: &str, country_column: &str) -> (String, String) {
        let (city, country) = match mode {
            LocationMode::Split => split_location(location),
            LocationMode::Columns => (
                or_sentinel(collapse_whitespace(location)),
                or_sentinel(collapse_whitespace(country_column)),
            ),
            LocationMode::ResolveCity => (or_sentinel(normalize_city(location)), UNKNOWN.to_string()),
        };

        let country = if is_unknown(&country) && !is_unknown(&city) {
            self.resolver
                .resolve(&city)
                .await
                .unwrap_or_else(|| UNKNOWN.to_string())
        } else {
            country
        };

        if is_unknown(&country) {
            return (city, country);
        }
        let country = self.normalizer.canonical_or_original(&country);
        (city, country)
    }

    async fn dismiss_consent(&self, session: &mut dyn BrowserSession, site: &CompiledSite) {
        for selector in &site.spec.consent_selectors {
            if click_if_present(session, selector, &self.wait).await {
                debug!(target: "job_harvest::pipeline", "{}: dismissed consent '{selector}'", site.name());
            }
        }
    }

    async fn hide_overlays(&self, session: &mut dyn BrowserSession, site: &CompiledSite) {
        for selector in &site.spec.overlay_selectors {
            match session.hide(selector).await {
                Ok(0) => {}
                Ok(n) => debug!(target: "job_harvest::pipeline", "{}: hid {n} '{selector}'", site.name()),
                Err(e) => debug!(target: "job_harvest::pipeline", "{}: hiding '{selector}' failed: {e}", site.name()),
            }
        }
    }

    /// Navigate into the site's iframe document, if it has one.
    async fn enter_frame(&self, session: &mut dyn BrowserSession, site: &CompiledSite) -> SessionResult<()> {
        let Some(selector) = site.spec.frame_selector.as_deref() else {
            return Ok(());
        };
        wait_for(session, selector, self.wait.required, self.wait.poll_interval).await?;

        let html = session.html().await?;
        let src = match site.frame_source(&html) {
            Some(Ok(src)) => src,
            Some(Err(e)) => return Err(SessionError::ElementNotFound(format!("{selector}: {e}"))),
            None => return Ok(()),
        };

        let base = current_page_url(session).await?;
        let target = base.join(&src).map_err(|e| SessionError::Navigation {
            url: src.clone(),
            message: e.to_string(),
        })?;
        debug!(target: "job_harvest::pipeline", "{}: entering frame {target}", site.name());
        session.goto(target.as_str()).await
    }
}

/// Why a single detail page produced nothing
#[derive(Debug, thiserror::Error)]
enum DetailFailure {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Extract(ExtractError),
}

async fn current_page_url(session: &mut dyn BrowserSession) -> SessionResult<Url> {
    let url = session.current_url().await?;
    Url::parse(&url).map_err(|e| SessionError::Navigation {
        url: url.clone(),
        message: e.to_string(),
    })
}

fn or_sentinel(text: String) -> String {
    if is_unknown(&text) {
        UNKNOWN.to_string()
    } else {
        text
    }
}

fn record_rejection(check: DateCheck, listing: &ListingSummary, report: &mut RunReport) {
    match check {
        DateCheck::Stale(date) => {
            debug!(target: "job_harvest::pipeline", "Stale ({date}): {}", listing.link);
            report.stale += 1;
        }
        DateCheck::Unparseable => report.unparseable_dates += 1,
        DateCheck::Undated => report.undated_dropped += 1,
        DateCheck::Admit(_) => {}
    }
}
