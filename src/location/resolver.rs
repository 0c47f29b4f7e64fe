//! Tiered city → country resolution
//!
//! Lookup order, cheapest first:
//!
//! 1. in-memory cache (positive and negative results, this process only)
//! 2. persisted country index, loaded lazily and exactly once
//! 3. remote geocoder, spaced by the shared [`RateLimiter`]
//!
//! A remote hit is written to the memory cache and appended to the
//! persisted index, which is then saved in full. A remote miss or failure
//! is cached in memory only, so the next run asks again.
//!
//! One resolver is shared (behind `Arc`) by every pipeline in the process.
//! The index load is single-flight through `OnceCell::get_or_try_init`; a
//! failed load leaves the cell empty and the next call retries. Remote
//! lookups are single-flight per normalized city: concurrent callers for
//! the same key wait on the first caller's lookup. Index
//! read-modify-write happens under one mutex so concurrent resolvers never
//! lose each other's cities.

use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

use super::geocoder::Geocoder;
use super::index::CountryIndex;
use crate::error::IndexResult;
use crate::rate_limiter::RateLimiter;
use crate::utils::string_utils::collapse_whitespace;

/// Reduce free-form location text to the city part.
///
/// Trims, collapses internal whitespace and keeps only the text before the
/// first comma: `"  Paris ,  Île-de-France"` becomes `"Paris"`.
#[must_use]
pub fn normalize_city(raw: &str) -> String {
    let head = raw.split(',').next().unwrap_or_default();
    collapse_whitespace(head)
}

pub struct LocationResolver {
    memory: DashMap<String, Option<String>>,
    inflight: DashMap<String, Arc<OnceCell<Option<String>>>>,
    index_path: PathBuf,
    index: OnceCell<Mutex<CountryIndex>>,
    geocoder: Arc<dyn Geocoder>,
    limiter: Arc<RateLimiter>,
}

impl std::fmt::Debug for LocationResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationResolver")
            .field("index_path", &self.index_path)
            .field("cached", &self.memory.len())
            .field("index_loaded", &self.index.initialized())
            .finish_non_exhaustive()
    }
}

impl LocationResolver {
    pub fn new(
        index_path: impl Into<PathBuf>,
        geocoder: Arc<dyn Geocoder>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            memory: DashMap::new(),
            inflight: DashMap::new(),
            index_path: index_path.into(),
            index: OnceCell::new(),
            geocoder,
            limiter,
        }
    }

    /// Resolve free-form location text to a country name.
    ///
    /// Never fails: every error along the way degrades to `None`.
    pub async fn resolve(&self, raw: &str) -> Option<String> {
        let city = normalize_city(raw);
        if city.is_empty() {
            return None;
        }
        let key = city.to_lowercase();

        if let Some(hit) = self.memory.get(&key) {
            return hit.value().clone();
        }

        let index = match self.index().await {
            Ok(index) => Some(index),
            Err(e) => {
                warn!(
                    target: "job_harvest::location",
                    "Location index unavailable, falling back to remote lookup: {e}"
                );
                None
            }
        };

        if let Some(index) = index {
            let guard = index.lock().await;
            if let Some(country) = guard.country_of(&city) {
                let country = country.to_string();
                drop(guard);
                self.memory.insert(key, Some(country.clone()));
                return Some(country);
            }
        }

        // One remote lookup per key at a time; later callers share its answer.
        let flight = Arc::clone(self.inflight.entry(key.clone()).or_default().value());
        let country = flight
            .get_or_init(|| self.lookup_remote(&city, &key, index))
            .await
            .clone();
        self.inflight.remove(&key);
        country
    }

    async fn lookup_remote(
        &self,
        city: &str,
        key: &str,
        index: Option<&Mutex<CountryIndex>>,
    ) -> Option<String> {
        // A flight that finished between our cache check and joining has
        // already filled the memory cache.
        if let Some(hit) = self.memory.get(key) {
            return hit.value().clone();
        }

        self.limiter.acquire().await;
        let remote = match self.geocoder.country_for(city).await {
            Ok(found) => found,
            Err(e) => {
                warn!(target: "job_harvest::location", "Geocoding '{city}' failed: {e}");
                None
            }
        };

        let Some(country) = remote else {
            debug!(target: "job_harvest::location", "No country found for '{city}'");
            self.memory.insert(key.to_string(), None);
            return None;
        };

        self.memory.insert(key.to_string(), Some(country.clone()));

        if let Some(index) = index {
            let mut guard = index.lock().await;
            if guard.insert(&country, city) {
                if let Err(e) = guard.save().await {
                    warn!(
                        target: "job_harvest::location",
                        "Failed to persist '{city}' under '{country}': {e}"
                    );
                } else {
                    info!(target: "job_harvest::location", "Learned '{city}' → '{country}'");
                }
            }
        }

        Some(country)
    }

    /// Load the persisted index now instead of on first miss.
    pub async fn preload(&self) -> IndexResult<()> {
        self.index().await.map(|_| ())
    }

    /// Memory-cache entry for `city` (`Some(None)` is a cached miss).
    #[must_use]
    pub fn cached(&self, city: &str) -> Option<Option<String>> {
        self.memory
            .get(&normalize_city(city).to_lowercase())
            .map(|entry| entry.value().clone())
    }

    /// Cities the persisted index lists under `country`.
    pub async fn indexed_cities(&self, country: &str) -> Option<Vec<String>> {
        let index = self.index.get()?;
        let guard = index.lock().await;
        guard.cities(country).map(<[String]>::to_vec)
    }

    async fn index(&self) -> IndexResult<&Mutex<CountryIndex>> {
        self.index
            .get_or_try_init(|| async {
                CountryIndex::load(self.index_path.clone())
                    .await
                    .map(Mutex::new)
            })
            .await
    }
}
