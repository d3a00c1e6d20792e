//! Screenshot cache
//!
//! Captures are keyed by URL and kept in a quota-bounded [`SessionStorage`].
//! Running out of quota clears the cache instead of evicting single entries.

pub mod key;
pub mod storage;
pub mod store;

pub use key::{normalize_url, try_normalize, CacheKey, KeyTier};
pub use storage::{MemoryStorage, SessionStorage, DEFAULT_QUOTA_BYTES};
pub use store::{CacheEntry, CacheStore};
