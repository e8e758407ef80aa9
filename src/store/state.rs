use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::app::Result;
use crate::domain::{CacheEntry, Column, Item};
use crate::store::{keys, KvStore};

/// Cache entries are fresh for two hours after they were written.
pub const CACHE_DURATION_SECS: i64 = 2 * 60 * 60;

/// Nominal quota the usage fraction is measured against.
pub const STORAGE_QUOTA_BYTES: u64 = 5 * 1024 * 1024;

/// Usage fraction above which the quota warning becomes active.
pub const STORAGE_WARNING_THRESHOLD: f64 = 0.8;

/// Typed accessors over the key-value substrate for the four persisted
/// records: columns, read-item set, listing cache, and column order.
///
/// All operations are synchronous full-record reads and writes. A missing
/// record reads as its empty default; a present-but-malformed record fails
/// closed to the same default with a warning. Every write recomputes the
/// storage usage fraction against the quota.
pub struct StateStore<K: KvStore> {
    kv: K,
    quota_warning: AtomicBool,
}

impl<K: KvStore> StateStore<K> {
    /// Wraps a substrate and runs the startup usage check.
    pub fn new(kv: K) -> Result<Self> {
        let store = Self {
            kv,
            quota_warning: AtomicBool::new(false),
        };
        store.check_storage_usage()?;
        Ok(store)
    }

    pub fn get_columns(&self) -> Result<Vec<Column>> {
        self.read_record(keys::COLUMNS)
    }

    /// Replaces the whole column record in a single key write.
    pub fn save_columns(&self, columns: &[Column]) -> Result<()> {
        self.write_record(keys::COLUMNS, columns)
    }

    pub fn get_read_items(&self) -> Result<BTreeSet<String>> {
        self.read_record(keys::READ)
    }

    /// Adds one read id. Returns whether anything was written: an id that
    /// is already a member is a no-op with no write and no usage recheck.
    pub fn add_read_item(&self, item_id: &str) -> Result<bool> {
        let mut read = self.get_read_items()?;
        if !read.insert(item_id.to_string()) {
            return Ok(false);
        }
        self.write_record(keys::READ, &read)?;
        Ok(true)
    }

    /// Unions `item_ids` into the read set. Unlike [`add_read_item`] this
    /// always writes and always rechecks usage, even when the union changes
    /// nothing.
    ///
    /// [`add_read_item`]: StateStore::add_read_item
    pub fn add_read_items<I>(&self, item_ids: I) -> Result<()>
    where
        I: IntoIterator<Item = String>,
    {
        let mut read = self.get_read_items()?;
        read.extend(item_ids);
        self.write_record(keys::READ, &read)
    }

    pub fn get_cache(&self) -> Result<BTreeMap<String, CacheEntry>> {
        self.read_record(keys::CACHE)
    }

    /// Upserts one cache entry stamped with the current time.
    pub fn set_cache(&self, key: &str, items: Vec<Item>) -> Result<()> {
        self.set_cache_at(key, items, Utc::now())
    }

    pub fn set_cache_at(&self, key: &str, items: Vec<Item>, now: DateTime<Utc>) -> Result<()> {
        let mut cache = self.get_cache()?;
        cache.insert(
            key.to_string(),
            CacheEntry {
                items,
                cached_at: now,
            },
        );
        self.write_record(keys::CACHE, &cache)
    }

    pub fn is_cache_valid(&self, key: &str) -> Result<bool> {
        self.is_cache_valid_at(key, Utc::now())
    }

    /// False for an absent entry, otherwise fresh within
    /// [`CACHE_DURATION_SECS`] of its write.
    pub fn is_cache_valid_at(&self, key: &str, now: DateTime<Utc>) -> Result<bool> {
        let cache = self.get_cache()?;
        Ok(match cache.get(key) {
            Some(entry) => now - entry.cached_at < Duration::seconds(CACHE_DURATION_SECS),
            None => false,
        })
    }

    /// Cached items regardless of freshness. Callers that care about
    /// freshness check [`is_cache_valid`] first.
    ///
    /// [`is_cache_valid`]: StateStore::is_cache_valid
    pub fn get_cached_items(&self, key: &str) -> Result<Option<Vec<Item>>> {
        Ok(self.get_cache()?.remove(key).map(|entry| entry.items))
    }

    pub fn get_column_order(&self) -> Result<Vec<String>> {
        self.read_record(keys::ORDER)
    }

    /// Full replace of the order record.
    pub fn save_column_order(&self, order: &[String]) -> Result<()> {
        self.write_record(keys::ORDER, order)
    }

    /// Columns in display order. Order ids without a live column are
    /// dropped; live columns missing from the order are appended at the end
    /// in stored order. An empty order falls back to stored order.
    pub fn ordered_columns(&self) -> Result<Vec<Column>> {
        let columns = self.get_columns()?;
        let order = self.get_column_order()?;

        if order.is_empty() {
            return Ok(columns);
        }

        let mut ordered = Vec::with_capacity(columns.len());
        for id in &order {
            if let Some(column) = columns.iter().find(|c| &c.id == id) {
                ordered.push(column.clone());
            }
        }
        for column in columns {
            if !order.contains(&column.id) {
                ordered.push(column);
            }
        }

        Ok(ordered)
    }

    /// Recomputes the usage fraction over the full substrate and updates
    /// the quota warning flag. Runs after every mutating call and once at
    /// construction; the total is never cached.
    pub fn check_storage_usage(&self) -> Result<f64> {
        let usage = self.kv.total_bytes()? as f64 / STORAGE_QUOTA_BYTES as f64;
        let above = usage > STORAGE_WARNING_THRESHOLD;
        let was_above = self.quota_warning.swap(above, Ordering::Relaxed);
        if above && !was_above {
            warn!(
                usage_pct = usage * 100.0,
                "storage usage above warning threshold"
            );
        }
        Ok(usage)
    }

    /// Whether the last usage check exceeded the warning threshold.
    pub fn quota_warning_active(&self) -> bool {
        self.quota_warning.load(Ordering::Relaxed)
    }

    fn read_record<T>(&self, key: &str) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        let Some(raw) = self.kv.get(key)? else {
            return Ok(T::default());
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(value),
            Err(e) => {
                // Fail closed: a malformed record reads as empty.
                warn!(key, error = %e, "discarding malformed stored record");
                Ok(T::default())
            }
        }
    }

    fn write_record<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        self.kv.set(key, &serde_json::to_string(value)?)?;
        self.check_storage_usage()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{cache_key, Sort, Timeframe};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    /// In-memory substrate that counts writes and usage scans.
    #[derive(Default)]
    struct CountingKv {
        data: Mutex<BTreeMap<String, String>>,
        writes: AtomicUsize,
        usage_scans: AtomicUsize,
    }

    impl KvStore for CountingKv {
        fn get(&self, key: &str) -> Result<Option<String>> {
            Ok(self.data.lock().unwrap().get(key).cloned())
        }

        fn set(&self, key: &str, value: &str) -> Result<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.data
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        fn total_bytes(&self) -> Result<u64> {
            self.usage_scans.fetch_add(1, Ordering::SeqCst);
            let total = self
                .data
                .lock()
                .unwrap()
                .iter()
                .map(|(k, v)| (k.len() + v.len()) as u64)
                .sum();
            Ok(total)
        }
    }

    fn store() -> StateStore<CountingKv> {
        StateStore::new(CountingKv::default()).unwrap()
    }

    fn item(id: &str) -> Item {
        Item {
            id: id.into(),
            title: "a post".into(),
            score: 1,
            thumbnail: None,
            url: "https://www.reddit.com/r/test/comments/x/".into(),
            created: 1_700_000_000,
        }
    }

    fn counts(store: &StateStore<CountingKv>) -> (usize, usize) {
        (
            store.kv.writes.load(Ordering::SeqCst),
            store.kv.usage_scans.load(Ordering::SeqCst),
        )
    }

    #[test]
    fn test_duplicate_read_item_suppresses_write_and_recheck() {
        let store = store();
        assert!(store.add_read_item("a").unwrap());
        assert!(store.add_read_item("b").unwrap());

        let before = counts(&store);
        assert!(!store.add_read_item("a").unwrap());
        assert_eq!(counts(&store), before);

        assert_eq!(store.get_read_items().unwrap().len(), 2);
    }

    #[test]
    fn test_bulk_read_add_always_writes() {
        let store = store();
        store.add_read_item("a").unwrap();

        let (writes, scans) = counts(&store);

        store.add_read_items(Vec::new()).unwrap();
        assert_eq!(counts(&store), (writes + 1, scans + 1));

        store.add_read_items(vec!["a".to_string()]).unwrap();
        assert_eq!(counts(&store), (writes + 2, scans + 2));

        assert_eq!(store.get_read_items().unwrap().len(), 1);
    }

    #[test]
    fn test_bulk_read_add_unions() {
        let store = store();
        store.add_read_item("a").unwrap();
        store
            .add_read_items(vec!["a".to_string(), "b".to_string(), "c".to_string()])
            .unwrap();

        let read = store.get_read_items().unwrap();
        assert_eq!(read.len(), 3);
        assert!(read.contains("b"));
    }

    #[test]
    fn test_cache_validity_with_synthetic_clock() {
        let store = store();
        let key = cache_key("test", Sort::Hot, None);
        let now = Utc::now();

        assert!(!store.is_cache_valid_at(&key, now).unwrap());

        store.set_cache_at(&key, vec![item("i1")], now).unwrap();
        assert!(store.is_cache_valid_at(&key, now).unwrap());
        assert!(store
            .is_cache_valid_at(&key, now + Duration::seconds(CACHE_DURATION_SECS - 1))
            .unwrap());
        assert!(!store
            .is_cache_valid_at(&key, now + Duration::seconds(CACHE_DURATION_SECS))
            .unwrap());
    }

    #[test]
    fn test_stale_entries_still_readable() {
        let store = store();
        let key = cache_key("test", Sort::Hot, None);
        let old = Utc::now() - Duration::seconds(CACHE_DURATION_SECS + 60);

        store.set_cache_at(&key, vec![item("i1")], old).unwrap();

        assert!(!store.is_cache_valid(&key).unwrap());
        let cached = store.get_cached_items(&key).unwrap().unwrap();
        assert_eq!(cached[0].id, "i1");
    }

    #[test]
    fn test_cached_items_absent_key() {
        let store = store();
        assert_eq!(store.get_cached_items("nope_hot_none").unwrap(), None);
    }

    #[test]
    fn test_columns_round_trip() {
        let store = store();
        let columns = vec![Column {
            id: "c1".into(),
            subreddit: "x".into(),
            sort: Sort::Hot,
            timeframe: None,
        }];

        store.save_columns(&columns).unwrap();
        assert_eq!(store.get_columns().unwrap(), columns);
    }

    #[test]
    fn test_ordered_columns_appends_missing() {
        let store = store();
        let a = Column {
            id: "A".into(),
            subreddit: "a".into(),
            sort: Sort::Hot,
            timeframe: None,
        };
        let b = Column {
            id: "B".into(),
            subreddit: "b".into(),
            sort: Sort::Hot,
            timeframe: None,
        };
        let c = Column {
            id: "C".into(),
            subreddit: "c".into(),
            sort: Sort::Hot,
            timeframe: None,
        };
        store
            .save_columns(&[a.clone(), b.clone(), c.clone()])
            .unwrap();
        store
            .save_column_order(&["C".to_string(), "A".to_string()])
            .unwrap();

        let ordered = store.ordered_columns().unwrap();
        let ids: Vec<&str> = ordered.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_ordered_columns_drops_ghost_ids() {
        let store = store();
        let a = Column {
            id: "A".into(),
            subreddit: "a".into(),
            sort: Sort::Hot,
            timeframe: None,
        };
        store.save_columns(&[a]).unwrap();
        store
            .save_column_order(&["GONE".to_string(), "A".to_string()])
            .unwrap();

        let ordered = store.ordered_columns().unwrap();
        assert_eq!(ordered.len(), 1);
        assert_eq!(ordered[0].id, "A");
    }

    #[test]
    fn test_ordered_columns_empty_order_uses_stored_order() {
        let store = store();
        let a = Column {
            id: "A".into(),
            subreddit: "a".into(),
            sort: Sort::Hot,
            timeframe: None,
        };
        let b = Column {
            id: "B".into(),
            subreddit: "b".into(),
            sort: Sort::Top,
            timeframe: Some(Timeframe::Week),
        };
        store.save_columns(&[a, b]).unwrap();

        let ordered = store.ordered_columns().unwrap();
        let ids: Vec<&str> = ordered.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
    }

    #[test]
    fn test_malformed_record_reads_empty() {
        let kv = CountingKv::default();
        kv.set(keys::COLUMNS, "this is not json").unwrap();
        let store = StateStore::new(kv).unwrap();

        assert!(store.get_columns().unwrap().is_empty());
    }

    #[test]
    fn test_quota_warning_rises_and_clears() {
        let store = store();
        assert!(!store.quota_warning_active());

        // One record large enough to cross 80% of the 5 MiB quota.
        let big = "x".repeat((STORAGE_QUOTA_BYTES as usize * 9) / 10);
        store.save_column_order(&[big]).unwrap();
        assert!(store.quota_warning_active());

        store.save_column_order(&[]).unwrap();
        assert!(!store.quota_warning_active());
    }
}
