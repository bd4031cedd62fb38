//! Probabilistic existence cache in front of the key store.
//!
//! A bloom filter answers "definitely absent" without touching the key
//! store. It never produces false negatives for keys recorded through the
//! same [`BloomFilterStore`]; false positives fall through to the store.

use sha2::{Digest, Sha256};
use std::f64::consts::LN_2;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::DedupError;
use crate::key_store::KeyStore;

const DEFAULT_FALSE_POSITIVE_RATE: f64 = 0.01;
const MIN_BITS: u64 = 64;

/// Fast membership test that may report false positives but never false negatives.
pub trait ExistenceCache: Send + Sync {
    /// `false` means the key was definitely never recorded.
    fn key_exists(&self, key: &str) -> bool;

    /// Whether any warm-start load has finished.
    ///
    /// Until then the cache may miss keys that exist in the store.
    fn cache_restored(&self) -> bool;
}

/// Fixed-size bloom filter with double hashing over SHA-256.
#[derive(Debug, Clone)]
pub struct BloomFilter {
    bits: Vec<u64>,
    num_bits: u64,
    num_hashes: u32,
    inserted: usize,
}

impl BloomFilter {
    /// Sizes a filter for `expected_insertions` at the target false positive rate.
    pub fn with_rate(expected_insertions: usize, false_positive_rate: f64) -> Self {
        let n = expected_insertions.max(1) as f64;
        let p = if false_positive_rate > 0.0 && false_positive_rate < 1.0 {
            false_positive_rate
        } else {
            DEFAULT_FALSE_POSITIVE_RATE
        };

        let num_bits = ((-(n * p.ln()) / (LN_2 * LN_2)).ceil() as u64).max(MIN_BITS);
        let num_hashes = ((num_bits as f64 / n) * LN_2).round().max(1.0) as u32;

        Self {
            bits: vec![0; num_bits.div_ceil(64) as usize],
            num_bits,
            num_hashes,
            inserted: 0,
        }
    }

    pub fn num_bits(&self) -> u64 {
        self.num_bits
    }

    pub fn num_hashes(&self) -> u32 {
        self.num_hashes
    }

    /// Number of insertions so far, duplicates included.
    pub fn inserted(&self) -> usize {
        self.inserted
    }

    pub fn insert(&mut self, key: &str) {
        for index in self.indexes(key) {
            self.bits[(index / 64) as usize] |= 1 << (index % 64);
        }
        self.inserted += 1;
    }

    pub fn contains(&self, key: &str) -> bool {
        self.indexes(key)
            .all(|index| self.bits[(index / 64) as usize] & (1 << (index % 64)) != 0)
    }

    fn indexes(&self, key: &str) -> impl Iterator<Item = u64> {
        let digest = Sha256::digest(key.as_bytes());
        let mut first = [0u8; 8];
        let mut second = [0u8; 8];
        first.copy_from_slice(&digest[0..8]);
        second.copy_from_slice(&digest[8..16]);
        let h1 = u64::from_le_bytes(first);
        // odd step so every probe sequence visits distinct bits
        let h2 = u64::from_le_bytes(second) | 1;
        let num_bits = self.num_bits;

        (0..u64::from(self.num_hashes)).map(move |i| h1.wrapping_add(i.wrapping_mul(h2)) % num_bits)
    }
}

/// Two filter generations rotated once per key-store TTL.
///
/// A key lands in `current`; one rotation moves it to `previous` and the
/// next drops it. By then the key store has expired it too, so dropping it
/// never creates a false negative.
#[derive(Debug)]
struct Generations {
    current: BloomFilter,
    previous: Option<BloomFilter>,
    started: Instant,
}

/// Key store wrapped by a bloom filter for keys under one prefix.
///
/// Reads consult the filter first and only hit the key store on a possible
/// match. Writes go to the filter and then to the key store. Keys outside the
/// prefix bypass the filter entirely.
pub struct BloomFilterStore {
    prefix: String,
    store: Arc<dyn KeyStore>,
    insertion_count: usize,
    false_positive_rate: f64,
    // zero disables rotation
    rotate_every: Duration,
    filters: Mutex<Generations>,
    restored: AtomicBool,
}

impl BloomFilterStore {
    pub fn new(
        store: Arc<dyn KeyStore>,
        prefix: &str,
        insertion_count: usize,
        false_positive_rate: f64,
    ) -> Self {
        let filter = BloomFilter::with_rate(insertion_count, false_positive_rate);
        debug!(
            prefix,
            num_bits = filter.num_bits(),
            num_hashes = filter.num_hashes(),
            "Created bloom filter store"
        );
        Self {
            prefix: prefix.to_string(),
            store,
            insertion_count,
            false_positive_rate,
            rotate_every: Duration::ZERO,
            filters: Mutex::new(Generations {
                current: filter,
                previous: None,
                started: Instant::now(),
            }),
            restored: AtomicBool::new(true),
        }
    }

    /// Rotates the filter every `ttl`, matching the key store's expiry.
    ///
    /// Must not be shorter than the TTL of the wrapped key store.
    pub fn with_rotation(mut self, ttl: Duration) -> Self {
        self.rotate_every = ttl;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The key store behind the filter.
    pub fn inner(&self) -> &Arc<dyn KeyStore> {
        &self.store
    }

    /// Whether `key` exists in the key store.
    pub async fn exists(&self, key: &str) -> Result<bool, DedupError> {
        Ok(self.get(key).await?.is_some())
    }

    /// Reads the stored value for `key`.
    pub async fn get(&self, key: &str) -> Result<Option<i64>, DedupError> {
        if self.definitely_absent(key) {
            return Ok(None);
        }
        self.store.get(key).await
    }

    /// Records `value` under `key` in both the filter and the key store.
    pub async fn record(&self, key: &str, value: i64) -> Result<(), DedupError> {
        if self.covers(key) {
            self.generations().current.insert(key);
        }
        self.store.put(key, value).await
    }

    /// Marks the filter as warming up; reads bypass it until [`restore`](Self::restore).
    pub fn begin_restore(&self) {
        self.restored.store(false, Ordering::SeqCst);
    }

    /// Loads previously recorded keys into the filter and marks it restored.
    pub fn restore<I, S>(&self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut loaded = 0usize;
        {
            let mut filters = self.generations();
            for key in keys {
                if self.covers(key.as_ref()) {
                    filters.current.insert(key.as_ref());
                    loaded += 1;
                }
            }
        }
        self.restored.store(true, Ordering::SeqCst);
        info!(prefix = %self.prefix, loaded, "Existence cache restored");
    }

    /// Locks the filters, rotating them first when a TTL has passed.
    fn generations(&self) -> MutexGuard<'_, Generations> {
        let mut filters = self.filters.lock().unwrap_or_else(PoisonError::into_inner);
        if self.rotate_every.is_zero() {
            return filters;
        }
        let now = Instant::now();
        let age = now.duration_since(filters.started);
        if age < self.rotate_every {
            return filters;
        }
        let fresh = BloomFilter::with_rate(self.insertion_count, self.false_positive_rate);
        let retired = std::mem::replace(&mut filters.current, fresh);
        // after two TTLs every key of the retired generation has expired
        let within_two = self
            .rotate_every
            .checked_mul(2)
            .map_or(true, |two_ttls| age < two_ttls);
        filters.previous = within_two.then_some(retired);
        filters.started = now;
        debug!(prefix = %self.prefix, "Rotated bloom filter");
        filters
    }

    fn covers(&self, key: &str) -> bool {
        key.starts_with(&self.prefix)
    }

    fn definitely_absent(&self, key: &str) -> bool {
        self.covers(key) && self.cache_restored() && !self.key_exists(key)
    }
}

impl ExistenceCache for BloomFilterStore {
    fn key_exists(&self, key: &str) -> bool {
        if !self.covers(key) {
            return true;
        }
        let filters = self.generations();
        filters.current.contains(key)
            || filters
                .previous
                .as_ref()
                .is_some_and(|previous| previous.contains(key))
    }

    fn cache_restored(&self) -> bool {
        self.restored.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alertcast_common::BoxFuture;
    use std::sync::atomic::AtomicUsize;

    /// Key store double counting `get` calls.
    #[derive(Default)]
    struct CountingStore {
        gets: AtomicUsize,
        entries: Mutex<std::collections::HashMap<String, i64>>,
    }

    impl KeyStore for CountingStore {
        fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Option<i64>, DedupError> {
            Box::pin(async move {
                self.gets.fetch_add(1, Ordering::SeqCst);
                Ok(self.entries.lock().unwrap().get(key).copied())
            })
        }

        fn put<'a>(&'a self, key: &'a str, value: i64) -> BoxFuture<'a, (), DedupError> {
            Box::pin(async move {
                self.entries.lock().unwrap().insert(key.to_string(), value);
                Ok(())
            })
        }

        fn set_ttl(&self, _ttl: Duration) {}
    }

    #[test]
    fn test_bloom_filter_sizing() {
        let filter = BloomFilter::with_rate(100, 0.01);
        // 100 insertions at 1% need ~959 bits and ~7 hashes
        assert_eq!(filter.num_bits(), 959);
        assert_eq!(filter.num_hashes(), 7);
    }

    #[test]
    fn test_bloom_filter_has_no_false_negatives() {
        let mut filter = BloomFilter::with_rate(50, 0.01);
        let keys: Vec<String> = (0..500).map(|i| format!("DEDUP_dev{i}_E_1000")).collect();
        for key in &keys {
            filter.insert(key);
        }
        assert!(keys.iter().all(|k| filter.contains(k)));
        assert_eq!(filter.inserted(), 500);
    }

    #[test]
    fn test_bloom_filter_rejects_most_unknown_keys() {
        let mut filter = BloomFilter::with_rate(100, 0.01);
        for i in 0..100 {
            filter.insert(&format!("DEDUP_in{i}"));
        }
        let false_positives = (0..1_000)
            .filter(|i| filter.contains(&format!("DEDUP_out{i}")))
            .count();
        assert!(false_positives < 50, "false positives: {false_positives}");
    }

    #[tokio::test]
    async fn test_absent_keys_skip_the_store() {
        let store = Arc::new(CountingStore::default());
        let cache = BloomFilterStore::new(store.clone(), "DEDUP_", 100, 0.01);

        assert!(!cache.exists("DEDUP_a").await.unwrap());
        assert_eq!(store.gets.load(Ordering::SeqCst), 0);

        cache.record("DEDUP_a", 10).await.unwrap();
        assert!(cache.exists("DEDUP_a").await.unwrap());
        assert_eq!(cache.get("DEDUP_a").await.unwrap(), Some(10));
        assert_eq!(store.gets.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_keys_outside_prefix_go_to_store() {
        let store = Arc::new(CountingStore::default());
        store.put("OTHER_x", 5).await.unwrap();
        let cache = BloomFilterStore::new(store.clone(), "DEDUP_", 100, 0.01);

        assert!(cache.key_exists("OTHER_x"));
        assert_eq!(cache.get("OTHER_x").await.unwrap(), Some(5));
        assert_eq!(store.gets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unrestored_cache_reads_through() {
        let store = Arc::new(CountingStore::default());
        store.put("DEDUP_warm", 99).await.unwrap();
        let cache = BloomFilterStore::new(store.clone(), "DEDUP_", 100, 0.01);

        cache.begin_restore();
        assert!(!cache.cache_restored());
        // filter knows nothing yet, the store still answers
        assert!(cache.exists("DEDUP_warm").await.unwrap());

        cache.restore(["DEDUP_warm"]);
        assert!(cache.cache_restored());
        assert!(cache.key_exists("DEDUP_warm"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_filter_rotates_once_per_ttl() {
        let store = Arc::new(CountingStore::default());
        let cache = BloomFilterStore::new(store.clone(), "DEDUP_", 100, 0.01)
            .with_rotation(Duration::from_secs(10));

        cache.record("DEDUP_old", 1).await.unwrap();

        // one rotation keeps the key in the previous generation
        tokio::time::advance(Duration::from_secs(10)).await;
        cache.record("DEDUP_new", 2).await.unwrap();
        assert!(cache.key_exists("DEDUP_old"));
        assert!(cache.key_exists("DEDUP_new"));

        // the second rotation drops it
        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(!cache.key_exists("DEDUP_old"));
        assert!(cache.key_exists("DEDUP_new"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_filter_drops_both_generations() {
        let store = Arc::new(CountingStore::default());
        let cache = BloomFilterStore::new(store.clone(), "DEDUP_", 100, 0.01)
            .with_rotation(Duration::from_secs(10));

        cache.record("DEDUP_a", 1).await.unwrap();
        tokio::time::advance(Duration::from_secs(25)).await;

        assert!(!cache.key_exists("DEDUP_a"));
        assert_eq!(cache.get("DEDUP_a").await.unwrap(), None);
        assert_eq!(store.gets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_without_rotation_keys_stay() {
        let store = Arc::new(CountingStore::default());
        let cache = BloomFilterStore::new(store, "DEDUP_", 100, 0.01);

        cache.record("DEDUP_a", 1).await.unwrap();
        tokio::time::advance(Duration::from_secs(3_600)).await;

        assert!(cache.key_exists("DEDUP_a"));
    }
}
