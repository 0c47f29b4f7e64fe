pub mod config;
pub mod error;
pub mod extract;
pub mod freshness;
pub mod harvester;
pub mod location;
pub mod logging;
pub mod pagination;
pub mod pipeline;
pub mod rate_limiter;
pub mod session;
pub mod sink;
pub mod site;
pub mod sites;
pub mod store;
pub mod testing;
pub mod utils;

pub use config::HarvestConfig;
pub use error::{
    ConfigError, ExtractError, GeocodeError, IndexError, PipelineError, SessionError, StoreError,
};
pub use extract::{DetailExtractor, JobDetail, ListingExtractor, ListingSummary};
pub use freshness::{FreshnessFilter, parse_publish_date};
pub use harvester::{HarvestSummary, Harvester, SiteOutcome};
pub use location::{
    CountryIndex, CountryNormalizer, Geocoder, GeocoderSettings, LocationResolver,
    NominatimGeocoder,
};
pub use pagination::{
    CrawlMode, CrawlState, PageStep, PaginationController, PaginationStrategy, TerminationReason,
};
pub use pipeline::{CollectionPipeline, RunReport};
pub use rate_limiter::RateLimiter;
pub use session::{BrowserSession, ChromiumSessionFactory, SessionFactory, WaitSettings};
pub use sink::{DeduplicatingSink, StoreOutcome};
pub use site::{CompiledSite, LocationMode, SiteSpec};
pub use sites::{builtin_site, builtin_sites};
pub use store::{JobPosting, MemoryPostingStore, PostingStore, SqlitePostingStore};

/// Harvest every site enabled in `config` using the production stack.
///
/// Chromium sessions, the SQLite store and the Nominatim geocoder are built
/// from `config`; the store is closed before returning.
pub async fn harvest(config: &HarvestConfig) -> anyhow::Result<HarvestSummary> {
    use std::sync::Arc;

    use anyhow::Context;

    let store = Arc::new(
        SqlitePostingStore::open(config.database_path())
            .await
            .with_context(|| format!("opening {}", config.database_path().display()))?,
    );
    let geocoder = NominatimGeocoder::new(config.geocoder()).context("building geocoder")?;
    let resolver = Arc::new(LocationResolver::new(
        config.location_index_path(),
        Arc::new(geocoder),
        Arc::new(RateLimiter::new(config.rate_limit_spacing())),
    ));
    if let Err(e) = resolver.preload().await {
        tracing::warn!(target: "job_harvest::location", "Location index not loaded: {e}");
    }
    let factory = Arc::new(ChromiumSessionFactory::new(
        config.headless(),
        config.chrome_path().cloned(),
    ));

    let harvester = Harvester::from_config(
        config,
        factory,
        resolver,
        DeduplicatingSink::new(store.clone()),
    );
    let summary = harvester.run(config.enabled_sites()).await;
    store.close().await;
    Ok(summary)
}
