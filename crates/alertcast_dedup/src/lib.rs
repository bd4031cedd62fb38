// --- File: crates/alertcast_dedup/src/lib.rs ---

// Alert deduplication: a key store contract with its in-memory TTL store, a
// bloom-filter existence cache in front of it, per-event key extractors and
// the Deduplicator that ties them together.

pub mod deduplicator;
pub mod error;
pub mod existence_cache;
pub mod key_extractor;
pub mod key_store;

#[cfg(test)]
mod deduplicator_test;
#[cfg(test)]
mod key_extractor_proptest;
#[cfg(test)]
mod key_extractor_test;

pub use deduplicator::Deduplicator;
pub use error::DedupError;
pub use existence_cache::{BloomFilter, BloomFilterStore, ExistenceCache};
pub use key_extractor::{
    halve_interval, EventKind, GenericKeyExtractor, GeofenceKeyExtractor, KeyExtractor,
    KeyExtractorFactory, DEDUP_KEY_PREFIX,
};
pub use key_store::{create_key_store, InMemoryKeyStore, KeyStore, KeyStoreKind};
