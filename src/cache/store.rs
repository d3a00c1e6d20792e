//! Screenshot cache over session storage

use crate::cache::key::{CacheKey, KeyTier};
use crate::cache::storage::{MemoryStorage, SessionStorage};
use crate::error::CacheError;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A cached capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// PNG bytes
    pub image_bytes: Vec<u8>,
    /// When the capture was taken
    pub captured_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Entry captured now
    pub fn new(image_bytes: Vec<u8>) -> Self {
        Self {
            image_bytes,
            captured_at: Utc::now(),
        }
    }
}

/// Serialized form: `{"data": "<base64>", "timestamp": <unix ms>}`
#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    data: String,
    timestamp: i64,
}

impl StoredEntry {
    fn encode(entry: &CacheEntry) -> Result<String, CacheError> {
        let stored = StoredEntry {
            data: STANDARD.encode(&entry.image_bytes),
            timestamp: entry.captured_at.timestamp_millis(),
        };
        serde_json::to_string(&stored).map_err(|e| CacheError::Encoding(e.to_string()))
    }

    fn decode(raw: &str) -> Result<CacheEntry, CacheError> {
        let stored: StoredEntry =
            serde_json::from_str(raw).map_err(|e| CacheError::Encoding(e.to_string()))?;
        let image_bytes = STANDARD
            .decode(stored.data.as_bytes())
            .map_err(|e| CacheError::Encoding(e.to_string()))?;
        let captured_at = DateTime::from_timestamp_millis(stored.timestamp)
            .ok_or_else(|| CacheError::Encoding(format!("bad timestamp {}", stored.timestamp)))?;

        Ok(CacheEntry {
            image_bytes,
            captured_at,
        })
    }
}

/// URL-keyed screenshot cache
///
/// Cache failures never reach callers: reads that fail are misses, and
/// writes that fail are dropped. A write that runs out of quota clears the
/// whole cache and retries once.
#[derive(Clone)]
pub struct CacheStore {
    storage: Arc<dyn SessionStorage>,
    tier: KeyTier,
}

impl CacheStore {
    /// Store over the given storage
    pub fn new(storage: Arc<dyn SessionStorage>, tier: KeyTier) -> Self {
        Self { storage, tier }
    }

    /// Store over a fresh [`MemoryStorage`] with the default quota
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()), KeyTier::default())
    }

    /// Key tier in use
    pub fn tier(&self) -> KeyTier {
        self.tier
    }

    /// Key this store uses for `url`
    pub fn key_for(&self, url: &str) -> CacheKey {
        CacheKey::for_url(url, self.tier)
    }

    /// Look up a capture
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let raw = match self.storage.get(key.as_str()) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Error reading from cache: {}", e);
                return None;
            }
        };

        match StoredEntry::decode(&raw) {
            Ok(entry) => {
                debug!("Cache hit: {}", key);
                Some(entry)
            }
            Err(e) => {
                warn!("Discarding corrupt cache entry {}: {}", key, e);
                None
            }
        }
    }

    /// Store a capture, replacing any previous entry at `key`
    pub fn put(&self, key: &CacheKey, entry: CacheEntry) {
        let encoded = match StoredEntry::encode(&entry) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!("Error saving to cache: {}", e);
                return;
            }
        };

        match self.storage.set(key.as_str(), encoded.clone()) {
            Ok(()) => debug!("Saved to cache: {}", key),
            Err(CacheError::CapacityExceeded { needed, available }) => {
                info!(
                    needed,
                    available, "Cache quota exceeded, clearing cache and retrying"
                );
                self.clear();
                if let Err(e) = self.storage.set(key.as_str(), encoded) {
                    warn!("Dropping cache entry {} after retry: {}", key, e);
                }
            }
            Err(e) => warn!("Error saving to cache: {}", e),
        }
    }

    /// Remove every entry
    pub fn clear(&self) {
        match self.storage.clear() {
            Ok(()) => info!("Cache cleared"),
            Err(e) => warn!("Error clearing cache: {}", e),
        }
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("tier", &self.tier)
            .field("entries", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_round_trip_is_byte_exact() {
        let store = CacheStore::in_memory();
        let key = store.key_for("https://a.test/");
        let bytes: Vec<u8> = (0..=255).collect();

        store.put(&key, CacheEntry::new(bytes.clone()));

        let entry = store.get(&key).unwrap();
        assert_eq!(entry.image_bytes, bytes);
    }

    #[test]
    fn test_timestamp_survives_at_millisecond_precision() {
        let store = CacheStore::in_memory();
        let key = store.key_for("https://a.test/");
        let entry = CacheEntry::new(vec![1, 2, 3]);
        let expected = entry.captured_at.timestamp_millis();

        store.put(&key, entry);
        assert_eq!(store.get(&key).unwrap().captured_at.timestamp_millis(), expected);
    }

    #[test]
    fn test_stored_format() {
        let storage = Arc::new(MemoryStorage::new());
        let store = CacheStore::new(storage.clone(), KeyTier::Raw);
        let key = store.key_for("https://a.test/");
        store.put(&key, CacheEntry::new(vec![0x89, b'P', b'N', b'G']));

        let raw = storage.get("https://a.test/").unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["data"], "iVBORw==");
        assert!(json["timestamp"].as_i64().unwrap() > 0);
    }

    #[test]
    fn test_corrupt_entry_reads_as_miss() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set("https://a.test/", "{not json".to_string()).unwrap();

        let store = CacheStore::new(storage, KeyTier::Raw);
        assert!(store.get(&store.key_for("https://a.test/")).is_none());
    }

    #[test]
    fn test_capacity_clears_then_retries() {
        // One encoded 64-byte entry is roughly 130 bytes with its key.
        let store = CacheStore::new(Arc::new(MemoryStorage::with_quota(300)), KeyTier::Raw);
        let a = store.key_for("a");
        let b = store.key_for("b");
        let c = store.key_for("c");

        store.put(&a, CacheEntry::new(vec![1; 64]));
        store.put(&b, CacheEntry::new(vec![2; 64]));
        assert_eq!(store.len(), 2);

        store.put(&c, CacheEntry::new(vec![3; 64]));

        assert_eq!(store.len(), 1);
        assert!(store.get(&a).is_none());
        assert_eq!(store.get(&c).unwrap().image_bytes, vec![3; 64]);
    }

    #[test]
    fn test_oversized_entry_is_dropped_silently() {
        let store = CacheStore::new(Arc::new(MemoryStorage::with_quota(16)), KeyTier::Raw);
        let key = store.key_for("a");
        store.put(&key, CacheEntry::new(vec![0; 1024]));

        assert!(store.is_empty());
        assert!(store.get(&key).is_none());
    }

    #[test]
    fn test_clear_is_idempotent() {
        let store = CacheStore::in_memory();
        store.put(&store.key_for("https://a.test/"), CacheEntry::new(vec![1]));
        store.clear();
        store.clear();
        assert!(store.is_empty());
    }
}
