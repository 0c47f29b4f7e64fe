//! Error types for harvesting operations
//!
//! Each layer gets its own enum so callers can decide which failures are
//! fatal for a site, which only cost a single listing, and which are
//! swallowed entirely.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for browser session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Result type alias for extraction operations
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Result type alias for posting storage
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for geocoding lookups
pub type GeocodeResult<T> = Result<T, GeocodeError>;

/// Result type alias for the persisted location index
pub type IndexResult<T> = Result<T, IndexError>;

/// Result type alias for a single site run
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Failures raised by a browser session
#[derive(Debug, Error)]
pub enum SessionError {
    /// Browser could not be started or connected to
    #[error("Failed to launch browser session: {0}")]
    Launch(String),

    /// Navigation to a URL failed
    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    /// A bounded wait expired before the element appeared
    #[error("Timed out after {timeout:?} waiting for '{selector}'")]
    Timeout { selector: String, timeout: Duration },

    /// Element required for an interaction is absent
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Script evaluation failed
    #[error("Script evaluation failed: {0}")]
    Script(String),

    /// The session is no longer usable (browser crashed or was closed)
    #[error("Browser session is unusable: {0}")]
    Closed(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for SessionError {
    fn from(error: anyhow::Error) -> Self {
        SessionError::Other(error.to_string())
    }
}

impl SessionError {
    /// Whether the failure only affects the current element or page.
    ///
    /// `Launch` and `Closed` mean the whole session is gone; everything
    /// else is scoped to one item.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        !matches!(self, SessionError::Launch(_) | SessionError::Closed(_))
    }
}

/// Failures while turning markup into typed records
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Configured CSS selector does not parse
    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    /// A field the record cannot exist without is missing
    #[error("Required field '{0}' is missing")]
    MissingField(&'static str),

    /// Publish date text matched none of the candidate formats
    #[error("Unparseable publish date '{text}' (tried {formats} formats)")]
    UnparseableDate { text: String, formats: usize },

    /// Link could not be resolved into an absolute URL
    #[error("Invalid link '{link}': {source}")]
    InvalidLink {
        link: String,
        #[source]
        source: url::ParseError,
    },
}

/// Failures from the posting store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Insert rejected by the natural-key uniqueness constraint
    #[error("Posting already exists: {0}")]
    Conflict(String),

    /// Any other database failure
    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &error
            && db.is_unique_violation()
        {
            return StoreError::Conflict(db.message().to_string());
        }
        StoreError::Database(error.to_string())
    }
}

impl From<anyhow::Error> for StoreError {
    fn from(error: anyhow::Error) -> Self {
        // Keep conflicts distinguishable after `.context()` wrapping
        if let Some(sqlx::Error::Database(db)) = error.downcast_ref::<sqlx::Error>()
            && db.is_unique_violation()
        {
            return StoreError::Conflict(db.message().to_string());
        }
        StoreError::Database(format!("{error:#}"))
    }
}

/// Failures from the remote geocoding service
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// Request could not be sent or timed out
    #[error("Geocoding request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Service answered with a non-success status
    #[error("Geocoding service returned HTTP {0}")]
    Status(u16),

    /// Response body was not the expected JSON shape
    #[error("Malformed geocoding response: {0}")]
    Decode(String),
}

/// Failures loading or saving the persisted country index
#[derive(Debug, Error)]
pub enum IndexError {
    /// Reading or writing the index file failed
    #[error("Location index I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The index file exists but is not a country → cities object
    #[error("Location index at {path} is malformed: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Configuration loading and validation failures
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid JSON for `HarvestConfig`
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// A value is out of its accepted range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Failures that abort a single site's run
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Session could not be opened or died mid-run
    #[error("Session failure for {site}: {source}")]
    Session {
        site: String,
        #[source]
        source: SessionError,
    },

    /// Site description is unusable (bad selector, bad start URL)
    #[error("Invalid site definition for {site}: {message}")]
    InvalidSite { site: String, message: String },

    /// The posting store failed for a reason other than a duplicate
    #[error("Storage failure for {site}: {source}")]
    Store {
        site: String,
        #[source]
        source: StoreError,
    },
}
