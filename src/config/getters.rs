//! Getter methods for `HarvestConfig`
//!
//! This module provides the accessor methods for retrieving configuration
//! values, plus the few values derived from them.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use super::types::HarvestConfig;
use crate::location::{CountryNormalizer, GeocoderSettings};
use crate::pagination::CrawlMode;
use crate::session::WaitSettings;
use crate::site::SiteSpec;

impl HarvestConfig {
    #[must_use]
    pub fn mode(&self) -> CrawlMode {
        self.mode
    }

    #[must_use]
    pub fn database_path(&self) -> &PathBuf {
        &self.database_path
    }

    #[must_use]
    pub fn location_index_path(&self) -> &PathBuf {
        &self.location_index_path
    }

    #[must_use]
    pub fn geocoder(&self) -> &GeocoderSettings {
        &self.geocoder
    }

    #[must_use]
    pub fn rate_limit_spacing(&self) -> Duration {
        self.rate_limit_spacing
    }

    #[must_use]
    pub fn headless(&self) -> bool {
        self.headless
    }

    #[must_use]
    pub fn chrome_path(&self) -> Option<&PathBuf> {
        self.chrome_path.as_ref()
    }

    #[must_use]
    pub fn max_concurrent_sites(&self) -> usize {
        self.max_concurrent_sites
    }

    #[must_use]
    pub fn sites(&self) -> &[String] {
        &self.sites
    }

    #[must_use]
    pub fn extra_sites(&self) -> &[SiteSpec] {
        &self.extra_sites
    }

    #[must_use]
    pub fn country_aliases(&self) -> &BTreeMap<String, String> {
        &self.country_aliases
    }

    /// Bounded wait settings for every session interaction
    #[must_use]
    pub fn wait_settings(&self) -> WaitSettings {
        WaitSettings {
            required: self.wait_timeout,
            optional: self.optional_wait_timeout,
            poll_interval: self.poll_interval,
        }
    }

    /// Built-in alias table plus `country_aliases`
    #[must_use]
    pub fn country_normalizer(&self) -> CountryNormalizer {
        CountryNormalizer::new().with_aliases(
            self.country_aliases
                .iter()
                .map(|(alias, canonical)| (alias.as_str(), canonical.clone())),
        )
    }
}
