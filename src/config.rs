//! Service configuration
//!
//! Everything has a default; a JSON file may override any subset, and the CLI
//! overrides the file.

use crate::acquisition::{AcquisitionConfig, AcquisitionService};
use crate::browser::{BrowserConfig, ChromiumBackend, Navigator, NavigatorConfig};
use crate::cache::{CacheStore, KeyTier, MemoryStorage, DEFAULT_QUOTA_BYTES};
use crate::error::{Error, Result};
use crate::pipeline::ItemLimit;
use serde::{Deserialize, Serialize};
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Default listen port
pub const DEFAULT_PORT: u16 = 5000;

/// Default bind host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Headroom between a stage timeout and the CDP request timeout
const CDP_TIMEOUT_HEADROOM_MS: u64 = 1_000;

/// Cache sizing and keying
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Storage quota in bytes (default: 10 MiB)
    pub quota_bytes: usize,
    /// How URLs map to keys (default: normalized)
    pub key_tier: KeyTier,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            quota_bytes: DEFAULT_QUOTA_BYTES,
            key_tier: KeyTier::Normalized,
        }
    }
}

/// Batch defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Links per batch (default: 5)
    pub limit: ItemLimit,
    /// Use a running service instead of an in-process browser
    pub service_url: Option<String>,
    /// Per-request bound when talking to a remote service (default: 120000)
    pub request_timeout_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            limit: ItemLimit::default(),
            service_url: None,
            request_timeout_ms: 120_000,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Bind host
    pub host: String,
    /// Listen port
    pub port: u16,
    /// Chromium launch options
    pub browser: BrowserConfig,
    /// Capture sequence timing
    pub navigator: NavigatorConfig,
    /// Per-request defaults
    pub acquisition: AcquisitionConfig,
    /// Cache options
    pub cache: CacheConfig,
    /// Batch options
    pub batch: BatchConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            browser: BrowserConfig::default(),
            navigator: NavigatorConfig::default(),
            acquisition: AcquisitionConfig::default(),
            cache: CacheConfig::default(),
            batch: BatchConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load from a JSON file; missing fields keep their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading configuration from {}", path.display());
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Resolve `host:port`
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| Error::generic(format!("Cannot resolve {}:{}", self.host, self.port)))
    }

    /// Browser options with the CDP request timeout raised above the
    /// navigation and capture timeouts, so those fire first
    pub fn browser_config(&self) -> BrowserConfig {
        let mut browser = self.browser.clone();
        let longest = self
            .acquisition
            .timeout_ms
            .max(self.navigator.capture_timeout_ms);
        browser.request_timeout_ms = browser
            .request_timeout_ms
            .max(longest + CDP_TIMEOUT_HEADROOM_MS);
        browser
    }

    /// Navigator over a Chromium backend
    pub fn navigator(&self) -> Navigator {
        let backend = Arc::new(ChromiumBackend::new(self.browser_config()));
        Navigator::new(backend, self.navigator.clone())
    }

    /// In-process acquisition service
    pub fn acquisition_service(&self) -> AcquisitionService {
        AcquisitionService::new(self.navigator(), self.acquisition.clone())
    }

    /// Empty cache sized per config
    pub fn cache_store(&self) -> CacheStore {
        CacheStore::new(
            Arc::new(MemoryStorage::with_quota(self.cache.quota_bytes)),
            self.cache.key_tier,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.port, 5000);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.acquisition.timeout_ms, 30_000);
        assert_eq!(config.navigator.settle_ms, 2_000);
        assert_eq!(config.batch.limit, ItemLimit::Max(5));
        assert_eq!(config.cache.quota_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: ServiceConfig = serde_json::from_str(
            r#"{"port": 8080, "navigator": {"settle_ms": 500}, "batch": {"limit": "all"}}"#,
        )
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.navigator.settle_ms, 500);
        assert_eq!(config.navigator.idle_timeout_ms, 5_000);
        assert_eq!(config.batch.limit, ItemLimit::All);
    }

    #[test]
    fn test_cdp_timeout_follows_navigation_timeout() {
        let mut config = ServiceConfig::default();
        assert_eq!(config.browser_config().request_timeout_ms, 31_000);

        config.acquisition.timeout_ms = 90_000;
        assert_eq!(config.browser_config().request_timeout_ms, 91_000);

        config.browser.request_timeout_ms = 200_000;
        assert_eq!(config.browser_config().request_timeout_ms, 200_000);
    }

    #[test]
    fn test_socket_addr() {
        let addr = ServiceConfig::default().socket_addr().unwrap();
        assert_eq!(addr, "127.0.0.1:5000".parse().unwrap());
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!("linkshot-config-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, r#"{"host": "0.0.0.0"}"#).unwrap();

        let config = ServiceConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = ServiceConfig::from_file("/nonexistent/linkshot.json").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
