//! Type-safe builder for `HarvestConfig` using the typestate pattern
//!
//! The database path is the one value a caller must choose; `build()` only
//! exists once it has been set.

use std::marker::PhantomData;
use std::path::PathBuf;

use super::types::HarvestConfig;
use crate::error::ConfigError;

// Type states for the builder
pub struct WithDatabasePath;

pub struct HarvestConfigBuilder<State = ()> {
    pub(crate) config: HarvestConfig,
    pub(crate) database_path: Option<PathBuf>,
    pub(crate) _phantom: PhantomData<State>,
}

impl Default for HarvestConfigBuilder<()> {
    fn default() -> Self {
        Self {
            config: HarvestConfig::default(),
            database_path: None,
            _phantom: PhantomData,
        }
    }
}

impl HarvestConfig {
    /// Create a builder for configuring a `HarvestConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> HarvestConfigBuilder<()> {
        HarvestConfigBuilder::default()
    }
}

impl HarvestConfigBuilder<()> {
    pub fn database_path(self, path: impl Into<PathBuf>) -> HarvestConfigBuilder<WithDatabasePath> {
        HarvestConfigBuilder {
            config: self.config,
            database_path: Some(path.into()),
            _phantom: PhantomData,
        }
    }
}

// Build method only available when all required fields are set
impl HarvestConfigBuilder<WithDatabasePath> {
    pub fn build(self) -> Result<HarvestConfig, ConfigError> {
        let database_path = self
            .database_path
            .ok_or_else(|| ConfigError::Invalid("database_path is required".into()))?;

        // Enforce headless mode in release builds
        #[cfg(not(debug_assertions))]
        let headless = if !self.config.headless {
            tracing::warn!(
                target: "job_harvest::config",
                "Forcing headless mode in release build. \
                Headed mode is only available in debug builds for development."
            );
            true
        } else {
            self.config.headless
        };

        #[cfg(debug_assertions)]
        let headless = self.config.headless;

        let config = HarvestConfig {
            database_path,
            headless,
            ..self.config
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::CrawlMode;
    use std::time::Duration;

    #[test]
    fn builder_sets_required_and_optional_fields() -> anyhow::Result<()> {
        let config = HarvestConfig::builder()
            .database_path("/tmp/jobs.sqlite")
            .mode(CrawlMode::Full)
            .max_concurrent_sites(4)
            .wait_timeout(Duration::from_secs(3))
            .build()?;

        assert_eq!(config.database_path(), &PathBuf::from("/tmp/jobs.sqlite"));
        assert_eq!(config.mode(), CrawlMode::Full);
        assert_eq!(config.max_concurrent_sites(), 4);
        assert_eq!(config.wait_settings().required, Duration::from_secs(3));
        Ok(())
    }

    #[test]
    fn build_validates() {
        let result = HarvestConfig::builder()
            .database_path("jobs.sqlite")
            .max_concurrent_sites(0)
            .build();
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }
}
