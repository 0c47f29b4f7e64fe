//! Runs many sites concurrently over shared collaborators
//!
//! Every site gets its own session and `CrawlState`. The location resolver,
//! the rate limiter behind it and the sink are shared. A site that fails is
//! reported and does not affect the others.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{error, info};

use crate::config::HarvestConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::location::LocationResolver;
use crate::pipeline::{CollectionPipeline, RunReport};
use crate::session::SessionFactory;
use crate::sink::DeduplicatingSink;
use crate::site::{CompiledSite, SiteSpec};

/// Result of one site
#[derive(Debug)]
pub struct SiteOutcome {
    pub site: String,
    pub result: PipelineResult<RunReport>,
}

/// Results of every site in a harvest, in completion order
#[derive(Debug, Default)]
pub struct HarvestSummary {
    pub outcomes: Vec<SiteOutcome>,
}

impl HarvestSummary {
    pub fn reports(&self) -> impl Iterator<Item = &RunReport> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &PipelineError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.site.as_str(), e)))
    }

    #[must_use]
    pub fn stored(&self) -> usize {
        self.reports().map(|r| r.stored).sum()
    }

    #[must_use]
    pub fn duplicates(&self) -> usize {
        self.reports().map(|r| r.duplicates).sum()
    }

    #[must_use]
    pub fn outcome(&self, site: &str) -> Option<&SiteOutcome> {
        self.outcomes.iter().find(|o| o.site == site)
    }
}

#[derive(Debug, Clone)]
pub struct Harvester {
    pipeline: CollectionPipeline,
    max_concurrent_sites: usize,
}

impl Harvester {
    pub fn new(pipeline: CollectionPipeline, max_concurrent_sites: usize) -> Self {
        Self {
            pipeline,
            max_concurrent_sites: max_concurrent_sites.max(1),
        }
    }

    /// Pipeline configured from `config` around the given collaborators.
    pub fn from_config(
        config: &HarvestConfig,
        factory: Arc<dyn SessionFactory>,
        resolver: Arc<LocationResolver>,
        sink: DeduplicatingSink,
    ) -> Self {
        let pipeline = CollectionPipeline::new(factory, resolver, sink)
            .with_mode(config.mode())
            .with_wait(config.wait_settings())
            .with_normalizer(config.country_normalizer());
        Self::new(pipeline, config.max_concurrent_sites())
    }

    #[must_use]
    pub fn pipeline(&self) -> &CollectionPipeline {
        &self.pipeline
    }

    /// Crawl every site, at most `max_concurrent_sites` at a time.
    pub async fn run(&self, specs: Vec<SiteSpec>) -> HarvestSummary {
        let mut outcomes = Vec::with_capacity(specs.len());
        let mut runnable = Vec::with_capacity(specs.len());

        for spec in specs {
            let name = spec.name.clone();
            let compiled = spec
                .validate()
                .and_then(|()| {
                    CompiledSite::compile(spec, self.pipeline.wait()).map_err(|e| e.to_string())
                });
            match compiled {
                Ok(site) => runnable.push(site),
                Err(message) => {
                    error!(target: "job_harvest::harvester", "Skipping {name}: {message}");
                    outcomes.push(SiteOutcome {
                        site: name.clone(),
                        result: Err(PipelineError::InvalidSite { site: name, message }),
                    });
                }
            }
        }

        info!(
            target: "job_harvest::harvester",
            "Harvesting {} sites, {} at a time", runnable.len(), self.max_concurrent_sites
        );

        let pipeline = &self.pipeline;
        let finished: Vec<SiteOutcome> = stream::iter(runnable)
            .map(|site| async move {
                let result = pipeline.run(&site).await;
                SiteOutcome {
                    site: site.name().to_string(),
                    result,
                }
            })
            .buffer_unordered(self.max_concurrent_sites)
            .collect()
            .await;
        outcomes.extend(finished);

        let summary = HarvestSummary { outcomes };
        for (site, e) in summary.failures() {
            error!(target: "job_harvest::harvester", "{site} failed: {e}");
        }
        info!(
            target: "job_harvest::harvester",
            "Harvest done: {} stored, {} duplicates, {} failed sites",
            summary.stored(),
            summary.duplicates(),
            summary.failures().count()
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SessionError;

    fn report(site: &str, stored: usize, duplicates: usize) -> SiteOutcome {
        SiteOutcome {
            site: site.to_string(),
            result: Ok(RunReport {
                site: site.to_string(),
                stored,
                duplicates,
                ..RunReport::default()
            }),
        }
    }

    #[test]
    fn summary_totals_skip_failed_sites() {
        let summary = HarvestSummary {
            outcomes: vec![
                report("avl", 4, 1),
                SiteOutcome {
                    site: "expleo".into(),
                    result: Err(PipelineError::Session {
                        site: "expleo".into(),
                        source: SessionError::Closed("crashed".into()),
                    }),
                },
                report("sqli", 2, 0),
            ],
        };

        assert_eq!(summary.stored(), 6);
        assert_eq!(summary.duplicates(), 1);
        assert_eq!(summary.reports().count(), 2);
        let failed: Vec<&str> = summary.failures().map(|(site, _)| site).collect();
        assert_eq!(failed, vec!["expleo"]);
        assert!(summary.outcome("sqli").is_some());
    }

    #[test]
    fn concurrency_is_at_least_one() {
        use crate::location::LocationResolver;
        use crate::rate_limiter::RateLimiter;
        use crate::store::MemoryPostingStore;
        use crate::testing::{CountingGeocoder, ScriptedSessionFactory, ScriptedSite};
        use std::time::Duration;

        let pipeline = CollectionPipeline::new(
            Arc::new(ScriptedSessionFactory::new(ScriptedSite::new())),
            Arc::new(LocationResolver::new(
                "unused.json",
                Arc::new(CountingGeocoder::new()),
                Arc::new(RateLimiter::new(Duration::from_millis(1))),
            )),
            DeduplicatingSink::new(Arc::new(MemoryPostingStore::new())),
        );
        assert_eq!(Harvester::new(pipeline, 0).max_concurrent_sites, 1);
    }
}
