//! Persisted country → cities index
//!
//! The JSON file on disk is the single source of truth:
//!
//! ```json
//! {
//!   "France": ["Lyon", "Paris"],
//!   "Germany": ["Berlin"]
//! }
//! ```
//!
//! A reverse `city → country` map (lowercased keys) is derived on load and
//! kept in step with every insert, giving O(1) lookups.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{IndexError, IndexResult};

/// In-memory copy of the country index plus its reverse lookup map
#[derive(Debug, Clone)]
pub struct CountryIndex {
    path: PathBuf,
    countries: BTreeMap<String, Vec<String>>,
    reverse: HashMap<String, String>,
}

impl CountryIndex {
    /// Empty index bound to `path`, nothing read from disk.
    #[must_use]
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            countries: BTreeMap::new(),
            reverse: HashMap::new(),
        }
    }

    /// Load the index from `path`.
    ///
    /// A missing file is an empty index, not an error.
    pub async fn load(path: impl Into<PathBuf>) -> IndexResult<Self> {
        let path = path.into();

        let raw = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    target: "job_harvest::location",
                    "No location index at {}, starting empty",
                    path.display()
                );
                return Ok(Self::empty(path));
            }
            Err(source) => {
                return Err(IndexError::Io {
                    path: path.display().to_string(),
                    source,
                });
            }
        };

        let countries: BTreeMap<String, Vec<String>> =
            serde_json::from_slice(&raw).map_err(|source| IndexError::Malformed {
                path: path.display().to_string(),
                source,
            })?;

        let mut index = Self {
            path,
            countries,
            reverse: HashMap::new(),
        };
        index.rebuild_reverse();

        info!(
            target: "job_harvest::location",
            "Loaded location index: {} countries, {} cities",
            index.countries.len(),
            index.reverse.len()
        );
        Ok(index)
    }

    fn rebuild_reverse(&mut self) {
        self.reverse.clear();
        for (country, cities) in &self.countries {
            for city in cities {
                self.reverse
                    .entry(city.to_lowercase())
                    .or_insert_with(|| country.clone());
            }
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Country for `city`, case-insensitive.
    #[must_use]
    pub fn country_of(&self, city: &str) -> Option<&str> {
        self.reverse.get(&city.to_lowercase()).map(String::as_str)
    }

    /// Cities recorded under `country`, in stored (sorted) order.
    #[must_use]
    pub fn cities(&self, country: &str) -> Option<&[String]> {
        self.countries.get(country).map(Vec::as_slice)
    }

    #[must_use]
    pub fn country_count(&self) -> usize {
        self.countries.len()
    }

    /// Record `city` under `country`.
    ///
    /// Returns `false` when the city was already listed for that country
    /// (compared case-insensitively), in which case nothing changes.
    /// The city list stays sorted case-insensitively.
    pub fn insert(&mut self, country: &str, city: &str) -> bool {
        let cities = self.countries.entry(country.to_string()).or_default();
        let key = city.to_lowercase();
        if cities.iter().any(|c| c.to_lowercase() == key) {
            return false;
        }

        cities.push(city.to_string());
        cities.sort_by_key(|c| c.to_lowercase());

        self.reverse
            .entry(key)
            .or_insert_with(|| country.to_string());
        true
    }

    /// Write the whole index back to disk, pretty-printed.
    ///
    /// The file is written to a sibling temp path and renamed into place so
    /// a crash mid-write never leaves a truncated index behind.
    pub async fn save(&self) -> IndexResult<()> {
        let io_err = |source| IndexError::Io {
            path: self.path.display().to_string(),
            source,
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let json = serde_json::to_vec_pretty(&self.countries).map_err(|source| {
            IndexError::Malformed {
                path: self.path.display().to_string(),
                source,
            }
        })?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io_err)?;

        debug!(
            target: "job_harvest::location",
            "Persisted location index to {}",
            self.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_is_empty_index() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let index = CountryIndex::load(dir.path().join("absent.json")).await?;
        assert_eq!(index.country_count(), 0);
        assert_eq!(index.country_of("Paris"), None);
        Ok(())
    }

    #[tokio::test]
    async fn reverse_lookup_is_case_insensitive() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("country_cities.json");
        tokio::fs::write(&path, r#"{"France": ["Lyon", "Paris"], "Germany": ["Berlin"]}"#).await?;

        let index = CountryIndex::load(&path).await?;
        assert_eq!(index.country_of("PARIS"), Some("France"));
        assert_eq!(index.country_of("berlin"), Some("Germany"));
        assert_eq!(index.country_of("Madrid"), None);
        Ok(())
    }

    #[tokio::test]
    async fn malformed_file_is_an_error() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("country_cities.json");
        tokio::fs::write(&path, "[1, 2, 3]").await?;

        let err = CountryIndex::load(&path).await.unwrap_err();
        assert!(matches!(err, IndexError::Malformed { .. }));
        Ok(())
    }

    #[test]
    fn insert_dedupes_and_sorts() {
        let mut index = CountryIndex::empty("unused.json");
        assert!(index.insert("France", "Paris"));
        assert!(index.insert("France", "lyon"));
        assert!(index.insert("France", "Bordeaux"));
        assert!(!index.insert("France", "PARIS"));

        assert_eq!(
            index.cities("France"),
            Some(&["Bordeaux".to_string(), "lyon".to_string(), "Paris".to_string()][..])
        );
        assert_eq!(index.country_of("Lyon"), Some("France"));
    }

    #[tokio::test]
    async fn save_creates_parent_dirs_and_round_trips() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("models").join("country_cities.json");

        let mut index = CountryIndex::empty(&path);
        index.insert("Austria", "Graz");
        index.save().await?;

        let text = tokio::fs::read_to_string(&path).await?;
        assert!(text.contains("\n"), "index should be pretty-printed");

        let reloaded = CountryIndex::load(&path).await?;
        assert_eq!(reloaded.country_of("graz"), Some("Austria"));
        Ok(())
    }
}
