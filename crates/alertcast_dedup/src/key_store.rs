//! TTL-bounded key store contract and its in-process implementation.
//!
//! Implementations are selected by name from a fixed registry
//! ([`KeyStoreKind`]); there is no runtime plugin loading. Entries expire a
//! fixed TTL after they were written, independently of dedup logic.

use alertcast_common::BoxFuture;
use alertcast_config::DedupConfig;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::error::DedupError;

/// A shared, TTL-bounded key → timestamp store.
///
/// Must be safe for concurrent use by many callers.
pub trait KeyStore: Send + Sync {
    /// Returns the value stored under `key`, or `None` if absent or expired.
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Option<i64>, DedupError>;

    /// Stores `value` under `key`, restarting its TTL.
    fn put<'a>(&'a self, key: &'a str, value: i64) -> BoxFuture<'a, (), DedupError>;

    /// Sets the TTL. The in-memory store applies it to every entry on its
    /// next read, including entries written before the change.
    fn set_ttl(&self, ttl: Duration);
}

/// Key store implementations known at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStoreKind {
    InMemory,
}

impl FromStr for KeyStoreKind {
    type Err = DedupError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim() {
            "in-memory" | "memory" | "InMemoryKeyStore" => Ok(KeyStoreKind::InMemory),
            other => Err(DedupError::UnknownStore(other.to_string())),
        }
    }
}

/// Instantiates the key store named by `name` for the given purpose.
pub fn create_key_store(
    name: &str,
    config: &DedupConfig,
    purpose: &str,
) -> Result<Arc<dyn KeyStore>, DedupError> {
    match name.parse::<KeyStoreKind>()? {
        KeyStoreKind::InMemory => Ok(Arc::new(InMemoryKeyStore::new(config, purpose))),
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    value: i64,
    written_at: Instant,
}

/// Process-local key store.
///
/// Expired entries are invisible to `get` immediately and are physically
/// removed by a sweep that runs on `put` at most once per TTL.
#[derive(Debug)]
pub struct InMemoryKeyStore {
    purpose: String,
    ttl: RwLock<Duration>,
    entries: Mutex<HashMap<String, Entry>>,
    last_sweep: Mutex<Instant>,
}

impl InMemoryKeyStore {
    pub fn new(config: &DedupConfig, purpose: &str) -> Self {
        Self {
            purpose: purpose.to_string(),
            ttl: RwLock::new(Duration::from_secs(config.store_ttl_seconds)),
            entries: Mutex::new(HashMap::new()),
            last_sweep: Mutex::new(Instant::now()),
        }
    }

    pub fn purpose(&self) -> &str {
        &self.purpose
    }

    /// Number of entries currently held, expired or not.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ttl(&self) -> Duration {
        *self.ttl.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn sweep_if_due(&self, entries: &mut HashMap<String, Entry>, now: Instant, ttl: Duration) {
        let mut last_sweep = self.last_sweep.lock().unwrap_or_else(PoisonError::into_inner);
        if now.duration_since(*last_sweep) < ttl {
            return;
        }
        let before = entries.len();
        entries.retain(|_, entry| now.duration_since(entry.written_at) < ttl);
        *last_sweep = now;
        debug!(
            purpose = %self.purpose,
            removed = before - entries.len(),
            "Swept expired key store entries"
        );
    }
}

impl KeyStore for InMemoryKeyStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Option<i64>, DedupError> {
        Box::pin(async move {
            let ttl = self.ttl();
            let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            Ok(entries
                .get(key)
                .filter(|entry| entry.written_at.elapsed() < ttl)
                .map(|entry| entry.value))
        })
    }

    fn put<'a>(&'a self, key: &'a str, value: i64) -> BoxFuture<'a, (), DedupError> {
        Box::pin(async move {
            let ttl = self.ttl();
            let now = Instant::now();
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            self.sweep_if_due(&mut entries, now, ttl);
            entries.insert(
                key.to_string(),
                Entry {
                    value,
                    written_at: now,
                },
            );
            Ok(())
        })
    }

    fn set_ttl(&self, ttl: Duration) {
        *self.ttl.write().unwrap_or_else(PoisonError::into_inner) = ttl;
    }
}
