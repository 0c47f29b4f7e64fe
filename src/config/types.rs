//! Core configuration types for job harvesting
//!
//! This module contains the main `HarvestConfig` struct, its defaults, and
//! file/environment loading.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::duration_secs;
use crate::error::ConfigError;
use crate::location::GeocoderSettings;
use crate::pagination::CrawlMode;
use crate::site::SiteSpec;
use crate::sites::{builtin_site, builtin_sites};
use crate::utils::constants::{
    CONFIG_ENV_VAR, DEFAULT_DATABASE_PATH, DEFAULT_GEOCODE_SPACING, DEFAULT_LOCATION_INDEX_PATH,
    DEFAULT_MAX_CONCURRENT_SITES, DEFAULT_OPTIONAL_WAIT_TIMEOUT, DEFAULT_POLL_INTERVAL,
    DEFAULT_WAIT_TIMEOUT,
};

/// Main configuration struct for a harvest run
///
/// Every field has a default, so a config file only needs the values it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Full crawl or bounded sample
    pub(crate) mode: CrawlMode,

    /// SQLite database holding postings
    pub(crate) database_path: PathBuf,

    /// Persisted country → cities index
    pub(crate) location_index_path: PathBuf,

    pub(crate) geocoder: GeocoderSettings,

    /// Minimum spacing between geocoding requests, in seconds
    #[serde(with = "duration_secs")]
    pub(crate) rate_limit_spacing: Duration,

    /// Wait for required elements (listing rows, descriptions), in seconds
    #[serde(with = "duration_secs")]
    pub(crate) wait_timeout: Duration,

    /// Wait for optional controls (consent dialogs), in seconds
    #[serde(with = "duration_secs")]
    pub(crate) optional_wait_timeout: Duration,

    #[serde(with = "duration_secs")]
    pub(crate) poll_interval: Duration,

    pub(crate) headless: bool,

    /// Browser binary; discovered when unset
    pub(crate) chrome_path: Option<PathBuf>,

    /// Sites crawled at the same time
    pub(crate) max_concurrent_sites: usize,

    /// Built-in sites to run; empty means all of them
    pub(crate) sites: Vec<String>,

    /// Additional sites; one sharing a built-in's name replaces it
    pub(crate) extra_sites: Vec<SiteSpec>,

    /// Country spellings on top of the built-in alias table
    pub(crate) country_aliases: BTreeMap<String, String>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            mode: CrawlMode::default(),
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            location_index_path: PathBuf::from(DEFAULT_LOCATION_INDEX_PATH),
            geocoder: GeocoderSettings::default(),
            rate_limit_spacing: DEFAULT_GEOCODE_SPACING,
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            optional_wait_timeout: DEFAULT_OPTIONAL_WAIT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            headless: true,
            chrome_path: None,
            max_concurrent_sites: DEFAULT_MAX_CONCURRENT_SITES,
            sites: Vec::new(),
            extra_sites: Vec::new(),
            country_aliases: BTreeMap::new(),
        }
    }
}

impl HarvestConfig {
    /// Load and validate a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Config named by the `JOB_HARVEST_CONFIG` environment variable, or
    /// defaults when it is unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => {
                info!(target: "job_harvest::config", "Loading config from {}", PathBuf::from(&path).display());
                Self::from_json_file(path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Reject values no run can work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mode.page_cap() == Some(0) {
            return Err(ConfigError::Invalid("sample mode needs at least one page".into()));
        }

        let durations = [
            ("wait_timeout", self.wait_timeout),
            ("optional_wait_timeout", self.optional_wait_timeout),
            ("poll_interval", self.poll_interval),
            ("geocoder.timeout", self.geocoder.timeout),
        ];
        if let Some((name, _)) = durations.iter().find(|(_, d)| d.is_zero()) {
            return Err(ConfigError::Invalid(format!("{name} must be greater than zero")));
        }

        if self.max_concurrent_sites == 0 {
            return Err(ConfigError::Invalid("max_concurrent_sites must be at least 1".into()));
        }

        let extra_names: Vec<&str> = self.extra_sites.iter().map(|s| s.name.as_str()).collect();
        for name in &self.sites {
            let known = builtin_site(name).is_some()
                || extra_names.iter().any(|extra| extra.eq_ignore_ascii_case(name.trim()));
            if !known {
                return Err(ConfigError::Invalid(format!("unknown site '{name}'")));
            }
        }

        for site in &self.extra_sites {
            site.validate()
                .map_err(|e| ConfigError::Invalid(format!("site '{}': {e}", site.name)))?;
        }
        Ok(())
    }

    /// Site specs to run: the selected built-ins (all when `sites` is
    /// empty) plus `extra_sites`, with same-named extras replacing built-ins.
    #[must_use]
    pub fn enabled_sites(&self) -> Vec<SiteSpec> {
        let selected = |name: &str| {
            self.sites.is_empty() || self.sites.iter().any(|s| s.trim().eq_ignore_ascii_case(name))
        };

        let mut specs: Vec<SiteSpec> = builtin_sites()
            .into_iter()
            .filter(|site| selected(&site.name))
            .filter(|site| {
                !self
                    .extra_sites
                    .iter()
                    .any(|extra| extra.name.eq_ignore_ascii_case(&site.name))
            })
            .collect();
        specs.extend(
            self.extra_sites
                .iter()
                .filter(|site| selected(&site.name))
                .cloned(),
        );
        specs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = HarvestConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.enabled_sites().len(), builtin_sites().len());
    }

    #[test]
    fn partial_json_keeps_defaults() -> anyhow::Result<()> {
        let config: HarvestConfig = serde_json::from_str(
            r#"{"mode": {"mode": "full"}, "wait_timeout": 2.5, "sites": ["avl"]}"#,
        )?;
        assert_eq!(config.mode, CrawlMode::Full);
        assert_eq!(config.wait_timeout, Duration::from_millis(2500));
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(config.enabled_sites().len(), 1);
        Ok(())
    }

    #[test]
    fn zero_sample_cap_is_rejected() {
        let config = HarvestConfig {
            mode: CrawlMode::Sample { pages: 0 },
            ..HarvestConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn unknown_site_is_rejected() {
        let config = HarvestConfig {
            sites: vec!["nope".into()],
            ..HarvestConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn extra_site_replaces_builtin_of_same_name() {
        let mut avl = crate::sites::avl();
        avl.company = "AVL List GmbH".into();
        let config = HarvestConfig {
            sites: vec!["AVL".into()],
            extra_sites: vec![avl],
            ..HarvestConfig::default()
        };
        let sites = config.enabled_sites();
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].company, "AVL List GmbH");
    }
}
