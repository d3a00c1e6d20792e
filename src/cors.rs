//! CORS policy for the screenshot service
//!
//! The service is meant to be called by a browser extension popup and by
//! local tooling, so only those origins get CORS headers:
//!
//! - **Allowed Origins**: `localhost`, `127.0.0.1` and `[::1]` on any port,
//!   plus `chrome-extension://<id>` and `moz-extension://<id>`
//! - **Allowed Methods**: GET, OPTIONS (preflight)
//! - **Allowed Headers**: Content-Type, Accept
//! - **Max Age**: 3600 seconds
//!
//! ```rust,ignore
//! use linkshot_web::cors::cors_layer;
//!
//! let app = axum::Router::new().layer(cors_layer());
//! ```

use http::{header::HeaderValue, Method};
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Allowed request headers
pub const ALLOWED_HEADERS: [http::header::HeaderName; 2] =
    [http::header::CONTENT_TYPE, http::header::ACCEPT];

/// Allowed methods
pub const ALLOWED_METHODS: [Method; 2] = [Method::GET, Method::OPTIONS];

/// Preflight cache lifetime (1 hour)
pub const DEFAULT_MAX_AGE_SECS: u64 = 3600;

const EXTENSION_SCHEMES: [&str; 2] = ["chrome-extension://", "moz-extension://"];

/// CORS layer allowing local and extension origins
pub fn cors_layer() -> CorsLayer {
    cors_layer_with_config(CorsConfig::default())
}

/// CORS layer built from `config`
pub fn cors_layer_with_config(config: CorsConfig) -> CorsLayer {
    let allow_extensions = config.allow_extensions;
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin, _| {
            is_localhost_origin(origin) || (allow_extensions && is_extension_origin(origin))
        }))
        .allow_methods(ALLOWED_METHODS)
        .allow_headers(ALLOWED_HEADERS)
        .expose_headers([http::header::CONTENT_LENGTH, http::header::CONTENT_TYPE])
        .max_age(Duration::from_secs(config.max_age_secs))
}

/// CORS options
#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Accept `chrome-extension://` and `moz-extension://` origins (default: true)
    pub allow_extensions: bool,
    /// Preflight cache lifetime in seconds
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_extensions: true,
            max_age_secs: DEFAULT_MAX_AGE_SECS,
        }
    }
}

impl CorsConfig {
    /// Set the preflight cache lifetime
    pub fn with_max_age(mut self, secs: u64) -> Self {
        self.max_age_secs = secs;
        self
    }

    /// Only accept loopback origins
    pub fn localhost_only(mut self) -> Self {
        self.allow_extensions = false;
        self
    }
}

/// Whether `origin` is `http(s)://localhost`, `127.0.0.1` or `[::1]`, with an optional port
///
/// ```rust
/// use http::header::HeaderValue;
/// use linkshot_web::cors::is_localhost_origin;
///
/// assert!(is_localhost_origin(&HeaderValue::from_static("http://localhost:5000")));
/// assert!(!is_localhost_origin(&HeaderValue::from_static("http://localhost.evil.com")));
/// ```
pub fn is_localhost_origin(origin: &HeaderValue) -> bool {
    let Ok(origin) = origin.to_str() else {
        return false;
    };
    let origin = origin.to_ascii_lowercase();

    let rest = match origin
        .strip_prefix("http://")
        .or_else(|| origin.strip_prefix("https://"))
    {
        Some(rest) => rest,
        None => return false,
    };

    ["localhost", "127.0.0.1", "[::1]"]
        .iter()
        .any(|host| match rest.strip_prefix(host) {
            Some(tail) => valid_tail(tail),
            None => false,
        })
}

/// Whether `origin` is a browser extension origin with a non-empty id
pub fn is_extension_origin(origin: &HeaderValue) -> bool {
    let Ok(origin) = origin.to_str() else {
        return false;
    };

    EXTENSION_SCHEMES.iter().any(|scheme| {
        origin
            .strip_prefix(scheme)
            .map(|id| {
                let id = id.trim_end_matches('/');
                !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            })
            .unwrap_or(false)
    })
}

/// What may follow the host: nothing, `/...`, or `:PORT[/...]` with PORT in 1..=65535
fn valid_tail(tail: &str) -> bool {
    if tail.is_empty() || tail.starts_with('/') {
        return true;
    }
    let Some(port) = tail.strip_prefix(':') else {
        return false;
    };
    let port = &port[..port.find('/').unwrap_or(port.len())];
    matches!(port.parse::<u16>(), Ok(p) if p > 0)
}
