//! Shared configuration constants for job_harvest
//!
//! This module contains default values and configuration constants used
//! throughout the codebase to ensure consistency and avoid magic numbers.

use std::time::Duration;

/// Value stored for any field a site does not provide
///
/// One sentinel is used everywhere so storage and comparisons never have to
/// special-case nulls.
pub const UNKNOWN: &str = "N/A";

/// Minimum spacing between two geocoding requests, process-wide
///
/// Public Nominatim allows one request per second per client. The extra
/// 100ms absorbs clock jitter between our timer and theirs.
pub const DEFAULT_GEOCODE_SPACING: Duration = Duration::from_millis(1100);

/// Public Nominatim search endpoint
pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org/search";

/// Identifying User-Agent sent with every geocoding request
///
/// Nominatim's usage policy rejects anonymous or browser-like agents.
pub const DEFAULT_GEOCODER_USER_AGENT: &str =
    "job-harvest/0.3 (+https://github.com/job-harvest/job-harvest)";

/// Geocoding request timeout
pub const DEFAULT_GEOCODER_TIMEOUT: Duration = Duration::from_secs(20);

/// Default location of the persisted country → cities index
pub const DEFAULT_LOCATION_INDEX_PATH: &str = "models/country_cities.json";

/// Default SQLite database for postings
pub const DEFAULT_DATABASE_PATH: &str = "data/job_postings.sqlite";

/// Bounded wait for a required element (listing rows, description body)
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(15);

/// Bounded wait for optional controls such as consent dialogs
pub const DEFAULT_OPTIONAL_WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Poll interval while waiting for elements or for stale content
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Navigation timeout for `goto`
pub const DEFAULT_NAVIGATION_TIMEOUT_SECS: u64 = 30;

/// Pages visited per site in sample mode
pub const DEFAULT_SAMPLE_PAGES: u32 = 2;

/// Listings older than this many months are discarded
pub const FRESHNESS_WINDOW_MONTHS: u32 = 2;

/// Number of sites crawled at the same time
pub const DEFAULT_MAX_CONCURRENT_SITES: usize = 2;

/// Chrome user agent string for the crawl browser
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";

/// Environment variable naming a JSON config file for the binary
pub const CONFIG_ENV_VAR: &str = "JOB_HARVEST_CONFIG";
