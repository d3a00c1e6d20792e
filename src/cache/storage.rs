//! Key/value session storage with a byte quota

use crate::error::CacheError;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Default quota, matching extension session storage (10 MiB)
pub const DEFAULT_QUOTA_BYTES: usize = 10 * 1024 * 1024;

/// String key/value storage the cache is persisted into
pub trait SessionStorage: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: String) -> Result<(), CacheError>;

    /// Delete a value; absent keys are fine
    fn remove(&self, key: &str) -> Result<(), CacheError>;

    /// Delete everything
    fn clear(&self) -> Result<(), CacheError>;

    /// Number of stored keys
    fn len(&self) -> usize;

    /// Whether nothing is stored
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
struct Slots {
    values: HashMap<String, String>,
    used: usize,
}

fn footprint(key: &str, value: &str) -> usize {
    key.len() + value.len()
}

/// In-memory [`SessionStorage`] that refuses writes beyond its quota
#[derive(Debug)]
pub struct MemoryStorage {
    quota: usize,
    slots: Mutex<Slots>,
}

impl MemoryStorage {
    /// Storage with the default 10 MiB quota
    pub fn new() -> Self {
        Self::with_quota(DEFAULT_QUOTA_BYTES)
    }

    /// Storage limited to `quota` bytes of keys plus values
    pub fn with_quota(quota: usize) -> Self {
        Self {
            quota,
            slots: Mutex::new(Slots::default()),
        }
    }

    /// Quota in bytes
    pub fn quota(&self) -> usize {
        self.quota
    }

    /// Bytes currently in use
    pub fn used(&self) -> usize {
        self.slots.lock().used
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.slots.lock().values.get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        let mut slots = self.slots.lock();

        let replaced = slots
            .values
            .get(key)
            .map(|old| footprint(key, old))
            .unwrap_or(0);
        let needed = footprint(key, &value);
        let available = self.quota.saturating_sub(slots.used - replaced);

        if needed > available {
            return Err(CacheError::CapacityExceeded { needed, available });
        }

        slots.used = slots.used - replaced + needed;
        slots.values.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        let mut slots = self.slots.lock();
        if let Some(old) = slots.values.remove(key) {
            slots.used -= footprint(key, &old);
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        let mut slots = self.slots.lock();
        slots.values.clear();
        slots.used = 0;
        Ok(())
    }

    fn len(&self) -> usize {
        self.slots.lock().values.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let storage = MemoryStorage::new();
        storage.set("a", "one".to_string()).unwrap();

        assert_eq!(storage.get("a").unwrap().as_deref(), Some("one"));
        assert_eq!(storage.used(), 4);

        storage.remove("a").unwrap();
        assert_eq!(storage.get("a").unwrap(), None);
        assert_eq!(storage.used(), 0);
        assert!(storage.is_empty());
    }

    #[test]
    fn test_quota_enforced() {
        let storage = MemoryStorage::with_quota(10);
        storage.set("k", "12345".to_string()).unwrap();

        let err = storage.set("j", "123456".to_string()).unwrap_err();
        assert_eq!(
            err,
            CacheError::CapacityExceeded {
                needed: 7,
                available: 4
            }
        );
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn test_overwrite_reuses_space() {
        let storage = MemoryStorage::with_quota(10);
        storage.set("k", "123456789".to_string()).unwrap();
        storage.set("k", "abcdefghi".to_string()).unwrap();

        assert_eq!(storage.used(), 10);
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("abcdefghi"));
    }

    #[test]
    fn test_clear_resets_usage() {
        let storage = MemoryStorage::with_quota(10);
        storage.set("k", "123".to_string()).unwrap();
        storage.clear().unwrap();
        storage.clear().unwrap();

        assert_eq!(storage.used(), 0);
        assert_eq!(storage.len(), 0);
    }
}
