use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, info};

use crate::app::Result;
use crate::domain::{cache_key, Column, Item, Sort, Timeframe};
use crate::fetcher::Fetcher;
use crate::store::{KvStore, StateStore};

pub const DEFAULT_WORKERS: usize = 8;

/// Cache-first access to subreddit listings.
///
/// Fetches for the same cache key are sequenced through a per-key mutex, so
/// a forced refresh racing an ordinary fetch cannot leave an older response
/// as the final cache state.
pub struct FeedService<K: KvStore> {
    store: Arc<StateStore<K>>,
    fetcher: Arc<dyn Fetcher>,
    key_locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<K: KvStore + 'static> FeedService<K> {
    pub fn new(store: Arc<StateStore<K>>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            store,
            fetcher,
            key_locks: StdMutex::new(HashMap::new()),
        }
    }

    /// Returns the listing for a column address, serving a fresh cache
    /// entry without touching the network unless `force_refresh` is set.
    ///
    /// A successful fetch always rewrites the cache entry, refreshing its
    /// timestamp; a failed one returns the error and leaves any previous
    /// entry untouched.
    pub async fn fetch_subreddit(
        &self,
        subreddit: &str,
        sort: Sort,
        timeframe: Option<Timeframe>,
        force_refresh: bool,
    ) -> Result<Vec<Item>> {
        let key = cache_key(subreddit, sort, timeframe);
        let lock = self.key_lock(&key);
        let _guard = lock.lock().await;

        if !force_refresh && self.store.is_cache_valid(&key)? {
            if let Some(items) = self.store.get_cached_items(&key)? {
                debug!(%key, "serving listing from cache");
                return Ok(items);
            }
        }

        let items = self.fetcher.fetch_listing(subreddit, sort, timeframe).await?;
        self.store.set_cache(&key, items.clone())?;
        info!(%key, count = items.len(), "cached fresh listing");

        Ok(items)
    }

    /// Forced refresh of every column with a bounded worker pool. Returns
    /// per-column results; one column failing never aborts the others.
    pub async fn refresh_all(
        self: Arc<Self>,
        columns: Vec<Column>,
        workers: usize,
    ) -> Vec<(String, Result<usize>)> {
        let semaphore = Arc::new(Semaphore::new(workers.max(1)));
        let mut handles = Vec::new();

        for column in columns {
            let service = Arc::clone(&self);
            let semaphore = Arc::clone(&semaphore);

            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire().await.expect("Semaphore closed");

                let result = service
                    .fetch_subreddit(&column.subreddit, column.sort, column.timeframe, true)
                    .await
                    .map(|items| items.len());
                (column.id, result)
            });

            handles.push(handle);
        }

        let mut results = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    tracing::error!("Task join error: {}", e);
                }
            }
        }

        results
    }

    fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.key_locks.lock().expect("key lock map poisoned");
        locks.entry(key.to_string()).or_default().clone()
    }
}
