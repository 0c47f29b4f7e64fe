//! Posting persistence
//!
//! [`PostingStore`] is the only thing the pipeline needs from storage:
//! "does this natural key exist?" and "insert this posting". The UNIQUE
//! constraint on the natural key is authoritative; a violating insert comes
//! back as [`StoreError::Conflict`].

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use tracing::info;

use crate::error::{StoreError, StoreResult};

/// SQL schema for the postings database
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS job_postings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    company TEXT NOT NULL,
    city TEXT NOT NULL,
    country TEXT NOT NULL,
    url TEXT NOT NULL,
    contract_type TEXT NOT NULL,
    work_mode TEXT NOT NULL,
    publish_date TEXT NOT NULL,
    description TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    UNIQUE(title, company, city, country, url)
);

-- Per-company listing queries
CREATE INDEX IF NOT EXISTS idx_job_postings_company ON job_postings(company);
"#;

/// A normalized posting ready to persist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPosting {
    pub title: String,
    pub company: String,
    pub city: String,
    pub country: String,
    /// Apply link, or the detail page when the site has none
    pub url: String,
    pub contract_type: String,
    pub work_mode: String,
    /// ISO `YYYY-MM-DD`, or the sentinel when the site prints no date
    pub publish_date: String,
    /// Description HTML
    pub description: String,
}

impl JobPosting {
    #[must_use]
    pub fn natural_key(&self) -> NaturalKey<'_> {
        NaturalKey {
            title: &self.title,
            company: &self.company,
            city: &self.city,
            country: &self.country,
            url: &self.url,
        }
    }
}

/// Fields whose combination identifies a posting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NaturalKey<'a> {
    pub title: &'a str,
    pub company: &'a str,
    pub city: &'a str,
    pub country: &'a str,
    pub url: &'a str,
}

impl std::fmt::Display for NaturalKey<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} @ {} ({}, {}) {}",
            self.title, self.company, self.city, self.country, self.url
        )
    }
}

/// A persisted posting with its server-set columns
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StoredPosting {
    pub id: i64,
    pub title: String,
    pub company: String,
    pub city: String,
    pub country: String,
    pub url: String,
    pub contract_type: String,
    pub work_mode: String,
    pub publish_date: String,
    pub description: String,
    pub created_at: String,
}

/// Storage collaborator used by the deduplicating sink
#[async_trait]
pub trait PostingStore: Send + Sync {
    /// Whether a posting with this natural key is already stored.
    async fn exists(&self, key: &NaturalKey<'_>) -> StoreResult<bool>;

    /// Insert a new posting, returning its id.
    ///
    /// Must fail with [`StoreError::Conflict`] when the natural key exists.
    async fn insert(&self, posting: &JobPosting) -> StoreResult<i64>;

    /// Number of stored postings.
    async fn count(&self) -> StoreResult<u64>;
}

/// SQLite-backed posting store
///
/// Uses WAL mode so concurrent pipelines can read while one writes.
#[derive(Debug, Clone)]
pub struct SqlitePostingStore {
    pool: SqlitePool,
}

impl SqlitePostingStore {
    /// Open existing database or create a new one at `db_path`.
    pub async fn open(db_path: &Path) -> StoreResult<Self> {
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create database directory")?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .context("Failed to open SQLite database")?;

        // Idempotent - CREATE IF NOT EXISTS
        sqlx::query(SCHEMA_SQL)
            .execute(&pool)
            .await
            .context("Failed to initialize database schema")?;

        info!(target: "job_harvest::store", "Opened posting store at {}", db_path.display());
        Ok(Self { pool })
    }

    /// All postings for `company`, oldest first.
    pub async fn postings_for(&self, company: &str) -> StoreResult<Vec<StoredPosting>> {
        let rows = sqlx::query_as::<_, StoredPosting>(
            r#"
            SELECT id, title, company, city, country, url, contract_type,
                   work_mode, publish_date, description, created_at
            FROM job_postings
            WHERE company = ?
            ORDER BY id
            "#,
        )
        .bind(company)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl PostingStore for SqlitePostingStore {
    async fn exists(&self, key: &NaturalKey<'_>) -> StoreResult<bool> {
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            SELECT 1 FROM job_postings
            WHERE title = ? AND company = ? AND city = ? AND country = ? AND url = ?
            LIMIT 1
            "#,
        )
        .bind(key.title)
        .bind(key.company)
        .bind(key.city)
        .bind(key.country)
        .bind(key.url)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    async fn insert(&self, posting: &JobPosting) -> StoreResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO job_postings
                (title, company, city, country, url, contract_type, work_mode, publish_date, description)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&posting.title)
        .bind(&posting.company)
        .bind(&posting.city)
        .bind(&posting.country)
        .bind(&posting.url)
        .bind(&posting.contract_type)
        .bind(&posting.work_mode)
        .bind(&posting.publish_date)
        .bind(&posting.description)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn count(&self) -> StoreResult<u64> {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM job_postings")
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(n).unwrap_or_default())
    }
}

/// In-process store with the same uniqueness rule, for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryPostingStore {
    rows: Mutex<Vec<JobPosting>>,
}

impl MemoryPostingStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything stored so far.
    #[must_use]
    pub fn postings(&self) -> Vec<JobPosting> {
        self.rows.lock().clone()
    }
}

#[async_trait]
impl PostingStore for MemoryPostingStore {
    async fn exists(&self, key: &NaturalKey<'_>) -> StoreResult<bool> {
        Ok(self.rows.lock().iter().any(|p| p.natural_key() == *key))
    }

    async fn insert(&self, posting: &JobPosting) -> StoreResult<i64> {
        let mut rows = self.rows.lock();
        if rows.iter().any(|p| p.natural_key() == posting.natural_key()) {
            return Err(StoreError::Conflict(posting.natural_key().to_string()));
        }
        rows.push(posting.clone());
        Ok(i64::try_from(rows.len()).unwrap_or(i64::MAX))
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(self.rows.lock().len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    pub(crate) fn posting(title: &str, url: &str) -> JobPosting {
        JobPosting {
            title: title.to_string(),
            company: "Acme".to_string(),
            city: "Paris".to_string(),
            country: "France".to_string(),
            url: url.to_string(),
            contract_type: "CDI".to_string(),
            work_mode: "N/A".to_string(),
            publish_date: "2025-03-05".to_string(),
            description: "<p>Build things</p>".to_string(),
        }
    }

    #[tokio::test]
    async fn insert_then_exists() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let store = SqlitePostingStore::open(&dir.path().join("jobs.sqlite")).await?;
        let job = posting("Senior Engineer", "https://x/1");

        assert!(!store.exists(&job.natural_key()).await?);
        store.insert(&job).await?;
        assert!(store.exists(&job.natural_key()).await?);
        assert_eq!(store.count().await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_insert_is_conflict() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let store = SqlitePostingStore::open(&dir.path().join("jobs.sqlite")).await?;
        let job = posting("Senior Engineer", "https://x/1");

        store.insert(&job).await?;
        let err = store.insert(&job).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)), "got {err:?}");
        assert_eq!(store.count().await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn created_at_is_server_set() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let store = SqlitePostingStore::open(&dir.path().join("nested").join("jobs.sqlite")).await?;
        store.insert(&posting("Engineer", "https://x/2")).await?;

        let rows = store.postings_for("Acme").await?;
        assert_eq!(rows.len(), 1);
        assert!(!rows[0].created_at.is_empty());
        assert_eq!(rows[0].publish_date, "2025-03-05");
        Ok(())
    }

    #[tokio::test]
    async fn different_url_is_a_different_posting() -> anyhow::Result<()> {
        let store = MemoryPostingStore::new();
        store.insert(&posting("Engineer", "https://x/1")).await?;
        store.insert(&posting("Engineer", "https://x/2")).await?;
        assert!(matches!(
            store.insert(&posting("Engineer", "https://x/1")).await,
            Err(StoreError::Conflict(_))
        ));
        assert_eq!(store.count().await?, 2);
        Ok(())
    }
}
