//! At-most-one insert per natural key
//!
//! `exists` followed by `insert` is not atomic: two pipelines, or a retried
//! item, can both pass the check. The store's uniqueness constraint catches
//! the loser, and the sink reports that as a duplicate rather than an error.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::store::{JobPosting, PostingStore};

/// What happened to a posting handed to the sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    Stored,
    SkippedDuplicate,
}

#[derive(Clone)]
pub struct DeduplicatingSink {
    store: Arc<dyn PostingStore>,
}

impl std::fmt::Debug for DeduplicatingSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeduplicatingSink").finish_non_exhaustive()
    }
}

impl DeduplicatingSink {
    pub fn new(store: Arc<dyn PostingStore>) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn store_handle(&self) -> &Arc<dyn PostingStore> {
        &self.store
    }

    /// Persist `posting` unless its natural key is already stored.
    ///
    /// Only non-conflict storage failures are errors.
    pub async fn store(&self, posting: &JobPosting) -> StoreResult<StoreOutcome> {
        let key = posting.natural_key();

        if self.store.exists(&key).await? {
            debug!(target: "job_harvest::sink", "Already stored: {key}");
            return Ok(StoreOutcome::SkippedDuplicate);
        }

        match self.store.insert(posting).await {
            Ok(id) => {
                debug!(target: "job_harvest::sink", "Stored #{id}: {key}");
                Ok(StoreOutcome::Stored)
            }
            Err(StoreError::Conflict(detail)) => {
                info!(target: "job_harvest::sink", "Duplicate detected: {key} ({detail})");
                Ok(StoreOutcome::SkippedDuplicate)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryPostingStore, NaturalKey};
    use async_trait::async_trait;

    fn posting() -> JobPosting {
        JobPosting {
            title: "Senior Engineer".into(),
            company: "Acme".into(),
            city: "Paris".into(),
            country: "France".into(),
            url: "https://x/1".into(),
            contract_type: "N/A".into(),
            work_mode: "N/A".into(),
            publish_date: "N/A".into(),
            description: "<p>Build</p>".into(),
        }
    }

    #[tokio::test]
    async fn second_store_is_skipped() -> anyhow::Result<()> {
        let store = Arc::new(MemoryPostingStore::new());
        let sink = DeduplicatingSink::new(store.clone());

        assert_eq!(sink.store(&posting()).await?, StoreOutcome::Stored);
        assert_eq!(sink.store(&posting()).await?, StoreOutcome::SkippedDuplicate);
        assert_eq!(store.count().await?, 1);
        Ok(())
    }

    /// Store whose existence check always misses, as if another writer
    /// inserted between check and insert.
    struct RacingStore(MemoryPostingStore);

    #[async_trait]
    impl PostingStore for RacingStore {
        async fn exists(&self, _key: &NaturalKey<'_>) -> StoreResult<bool> {
            Ok(false)
        }
        async fn insert(&self, posting: &JobPosting) -> StoreResult<i64> {
            self.0.insert(posting).await
        }
        async fn count(&self) -> StoreResult<u64> {
            self.0.count().await
        }
    }

    #[tokio::test]
    async fn insert_conflict_is_a_duplicate_not_an_error() -> anyhow::Result<()> {
        let store = Arc::new(RacingStore(MemoryPostingStore::new()));
        let sink = DeduplicatingSink::new(store.clone());

        assert_eq!(sink.store(&posting()).await?, StoreOutcome::Stored);
        assert_eq!(sink.store(&posting()).await?, StoreOutcome::SkippedDuplicate);
        assert_eq!(store.count().await?, 1);
        Ok(())
    }

    struct BrokenStore;

    #[async_trait]
    impl PostingStore for BrokenStore {
        async fn exists(&self, _key: &NaturalKey<'_>) -> StoreResult<bool> {
            Ok(false)
        }
        async fn insert(&self, _posting: &JobPosting) -> StoreResult<i64> {
            Err(StoreError::Database("disk I/O error".into()))
        }
        async fn count(&self) -> StoreResult<u64> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn other_failures_propagate() {
        let sink = DeduplicatingSink::new(Arc::new(BrokenStore));
        assert!(matches!(sink.store(&posting()).await, Err(StoreError::Database(_))));
    }
}
