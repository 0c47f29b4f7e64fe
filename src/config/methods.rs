//! Builder methods available for all states
//!
//! This module contains methods that can be called on the builder
//! regardless of its current type state.

use std::path::PathBuf;
use std::time::Duration;

use super::builder::HarvestConfigBuilder;
use crate::location::GeocoderSettings;
use crate::pagination::CrawlMode;
use crate::site::SiteSpec;

impl<State> HarvestConfigBuilder<State> {
    #[must_use]
    pub fn mode(mut self, mode: CrawlMode) -> Self {
        self.config.mode = mode;
        self
    }

    #[must_use]
    pub fn location_index_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.location_index_path = path.into();
        self
    }

    #[must_use]
    pub fn geocoder(mut self, settings: GeocoderSettings) -> Self {
        self.config.geocoder = settings;
        self
    }

    /// Minimum spacing between geocoding requests
    ///
    /// Public Nominatim bans clients that exceed one request per second, so
    /// lowering this is only sensible against a private instance.
    #[must_use]
    pub fn rate_limit_spacing(mut self, spacing: Duration) -> Self {
        self.config.rate_limit_spacing = spacing;
        self
    }

    #[must_use]
    pub fn wait_timeout(mut self, timeout: Duration) -> Self {
        self.config.wait_timeout = timeout;
        self
    }

    #[must_use]
    pub fn optional_wait_timeout(mut self, timeout: Duration) -> Self {
        self.config.optional_wait_timeout = timeout;
        self
    }

    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Set browser headless mode
    ///
    /// Headed mode is for watching a site's selectors misbehave during
    /// development; release builds force headless.
    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    #[must_use]
    pub fn chrome_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.chrome_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn max_concurrent_sites(mut self, n: usize) -> Self {
        self.config.max_concurrent_sites = n;
        self
    }

    /// Restrict the run to these built-in or extra sites.
    #[must_use]
    pub fn sites<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.sites = names.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn extra_site(mut self, site: SiteSpec) -> Self {
        self.config.extra_sites.push(site);
        self
    }

    #[must_use]
    pub fn country_alias(mut self, alias: impl Into<String>, canonical: impl Into<String>) -> Self {
        self.config
            .country_aliases
            .insert(alias.into(), canonical.into());
        self
    }
}
