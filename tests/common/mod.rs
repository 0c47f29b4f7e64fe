//! Shared fixtures for the job_harvest integration tests

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use job_harvest::extract::{DetailSelectors, FieldSelector, ListingSelectors};
use job_harvest::location::Geocoder;
use job_harvest::testing::{CountingGeocoder, ScriptedSessionFactory, ScriptedSite};
use job_harvest::{
    CollectionPipeline, CrawlMode, DeduplicatingSink, FreshnessFilter, LocationMode,
    LocationResolver, MemoryPostingStore, PaginationStrategy, RateLimiter, SiteSpec, WaitSettings,
};

pub const BOARD: &str = "https://jobs.example.com/search";

/// Waits short enough that a missing element costs milliseconds
#[allow(dead_code)]
pub fn fast_wait() -> WaitSettings {
    WaitSettings {
        required: Duration::from_millis(150),
        optional: Duration::from_millis(30),
        poll_interval: Duration::from_millis(10),
    }
}

/// Fixed "today" so freshness checks do not depend on the clock
#[allow(dead_code)]
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 5, 20).expect("valid date")
}

/// A job board with `ul.jobs li` rows and an `a.next` control
#[allow(dead_code)]
pub fn board_site(name: &str) -> SiteSpec {
    SiteSpec {
        name: name.to_string(),
        company: "Acme".to_string(),
        start_url: BOARD.to_string(),
        sample_start_url: None,
        consent_selectors: Vec::new(),
        overlay_selectors: Vec::new(),
        frame_selector: None,
        listing: ListingSelectors {
            item: "ul.jobs li".to_string(),
            title: FieldSelector::css("a.title"),
            link: FieldSelector::attr("a.title", "href"),
            location: Some(FieldSelector::css("span.location")),
            country: None,
            contract_type: Some(FieldSelector::css("span.contract")),
            work_mode: None,
            publish_date: Some(FieldSelector::css("span.date")),
        },
        date_formats: vec!["%Y-%m-%d".to_string()],
        location_mode: LocationMode::Split,
        pagination: PaginationStrategy::next_control("a.next"),
        detail: DetailSelectors {
            description: vec!["div.description".to_string()],
            apply_link: None,
            contract_type: None,
            work_mode: None,
            publish_date: None,
            location: None,
        },
        admit_undated: true,
    }
}

/// One listing row linking to `/jobs/{id}`
#[allow(dead_code)]
pub fn row(id: u32, location: &str, date: &str) -> String {
    format!(
        r#"<li><a class="title" href="/jobs/{id}">Engineer {id}</a>
            <span class="location">{location}</span>
            <span class="contract">CDI</span>
            <span class="date">{date}</span></li>"#
    )
}

/// A results page; `next` adds a pager link with that class list
#[allow(dead_code)]
pub fn listing_page(rows: &[String], next: Option<&str>) -> String {
    let pager = next
        .map(|class| format!(r##"<nav><a class="{class}" href="#">Next</a></nav>"##))
        .unwrap_or_default();
    format!(
        "<html><body><ul class=\"jobs\">{}</ul>{pager}</body></html>",
        rows.concat()
    )
}

#[allow(dead_code)]
pub fn detail_page(id: u32) -> String {
    format!(
        r#"<html><body><div class="description"><p>Build things, role {id}.</p></div></body></html>"#
    )
}

#[allow(dead_code)]
pub fn detail_url(id: u32) -> String {
    format!("https://jobs.example.com/jobs/{id}")
}

/// Serve `rows` on the board page and a detail page for each id
#[allow(dead_code)]
pub fn single_page_board(ids: impl IntoIterator<Item = u32>) -> ScriptedSite {
    let ids: Vec<u32> = ids.into_iter().collect();
    let rows: Vec<String> = ids.iter().map(|id| row(*id, "Paris - France", "2025-05-10")).collect();
    ids.iter().fold(
        ScriptedSite::new().page(BOARD, listing_page(&rows, None)),
        |site, id| site.page(detail_url(*id), detail_page(*id)),
    )
}

/// Resolver over an index file in `dir` and the given geocoder
#[allow(dead_code)]
pub fn resolver(dir: &Path, geocoder: Arc<dyn Geocoder>) -> Arc<LocationResolver> {
    Arc::new(LocationResolver::new(
        dir.join("country_cities.json"),
        geocoder,
        Arc::new(RateLimiter::new(Duration::from_millis(1))),
    ))
}

/// Everything a pipeline test needs to inspect afterwards
#[allow(dead_code)]
pub struct Harness {
    pub pipeline: CollectionPipeline,
    pub factory: ScriptedSessionFactory,
    pub store: Arc<MemoryPostingStore>,
    pub geocoder: Arc<CountingGeocoder>,
    _dir: tempfile::TempDir,
}

#[allow(dead_code)]
pub fn harness(site: ScriptedSite, geocoder: CountingGeocoder) -> anyhow::Result<Harness> {
    let dir = tempfile::TempDir::new()?;
    let factory = ScriptedSessionFactory::new(site);
    let store = Arc::new(MemoryPostingStore::new());
    let geocoder = Arc::new(geocoder);

    let pipeline = CollectionPipeline::new(
        Arc::new(factory.clone()),
        resolver(dir.path(), geocoder.clone()),
        DeduplicatingSink::new(store.clone()),
    )
    .with_mode(CrawlMode::Full)
    .with_wait(fast_wait())
    .with_freshness(FreshnessFilter::default().with_today(today()));

    Ok(Harness {
        pipeline,
        factory,
        store,
        geocoder,
        _dir: dir,
    })
}
