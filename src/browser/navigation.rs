//! Page navigation and the capture sequence
//!
//! [`Navigator`] drives one browser session per request: launch, configure,
//! navigate, settle, dismiss consent banners, wait for network quiescence,
//! capture. The session is released on every exit path.

use crate::browser::capture::{CaptureOptions, CapturedImage};
use crate::browser::consent::ConsentDismisser;
use crate::browser::profile::{PageProfile, Viewport};
use crate::browser::session::{BrowserBackend, BrowserSession};
use crate::error::{BrowserError, CaptureError, NavigationError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Maximum accepted URL length
pub const MAX_URL_LENGTH: usize = 2048;

/// Condition to wait for after navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitUntil {
    /// Wait until load event fires
    Load,
    /// Wait until DOMContentLoaded event fires
    DomContentLoaded,
    /// Wait until no request has been in flight for 500ms
    #[default]
    NetworkIdle0,
    /// Wait until at most 2 requests have been in flight for 500ms
    NetworkIdle2,
}

impl WaitUntil {
    /// In-flight requests tolerated while considered idle, if network based
    pub fn max_inflight(&self) -> Option<usize> {
        match self {
            WaitUntil::NetworkIdle0 => Some(0),
            WaitUntil::NetworkIdle2 => Some(2),
            WaitUntil::Load | WaitUntil::DomContentLoaded => None,
        }
    }

    /// Idle window for the network based variants
    pub fn idle_window(&self) -> Duration {
        Duration::from_millis(500)
    }
}

/// One capture invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRequest {
    /// Absolute URL to capture
    pub url: String,
    /// Navigation timeout in milliseconds
    pub timeout_ms: u64,
    /// Viewport to render at
    pub viewport: Viewport,
    /// When navigation counts as finished
    pub wait_until: WaitUntil,
}

impl CaptureRequest {
    /// Request with default timeout, viewport and wait policy
    pub fn new<S: Into<String>>(url: S) -> Self {
        Self {
            url: url.into(),
            timeout_ms: 30_000,
            viewport: Viewport::default(),
            wait_until: WaitUntil::default(),
        }
    }

    /// Override the navigation timeout
    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }

    /// Override the viewport
    pub fn viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    /// Override the wait policy
    pub fn wait_until(mut self, wait_until: WaitUntil) -> Self {
        self.wait_until = wait_until;
        self
    }
}

/// Timing knobs for the capture sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigatorConfig {
    /// Bound on browser launch, in milliseconds (default: 30000)
    pub launch_timeout_ms: u64,
    /// Fixed delay after navigation for client-side rendering (default: 2000)
    pub settle_ms: u64,
    /// Idle window for the second quiescence wait (default: 1000)
    pub idle_window_ms: u64,
    /// Bound on the second quiescence wait (default: 5000)
    pub idle_timeout_ms: u64,
    /// Bound on the raster capture (default: 30000)
    pub capture_timeout_ms: u64,
    /// Try to click consent banners away (default: true)
    pub dismiss_consent: bool,
    /// Headers, user agent and masking applied to each page
    pub profile: PageProfile,
    /// Raster options
    pub capture: CaptureOptions,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            launch_timeout_ms: 30_000,
            settle_ms: 2_000,
            idle_window_ms: 1_000,
            idle_timeout_ms: 5_000,
            capture_timeout_ms: 30_000,
            dismiss_consent: true,
            profile: PageProfile::default(),
            capture: CaptureOptions::default(),
        }
    }
}

/// URL validation utilities
pub struct UrlValidator;

impl UrlValidator {
    /// Validate a URL for navigation
    pub fn validate(url: &str) -> std::result::Result<url::Url, String> {
        if url.trim().is_empty() {
            return Err("URL cannot be empty".to_string());
        }

        if url.len() > MAX_URL_LENGTH {
            return Err(format!(
                "URL exceeds maximum length of {} characters",
                MAX_URL_LENGTH
            ));
        }

        let parsed = url::Url::parse(url).map_err(|e| format!("{}: {}", e, url))?;

        match parsed.scheme() {
            "http" | "https" | "file" => Ok(parsed),
            other => Err(format!(
                "URL must use http://, https://, or file:// (got {}://): {}",
                other, url
            )),
        }
    }
}

/// Map the browser's network error text onto a navigation error.
///
/// This is the only place that inspects Chromium's `net::ERR_*` strings.
pub fn classify_net_error(message: &str, timeout_ms: u64) -> NavigationError {
    let text = message.to_string();
    let lower = text.to_ascii_lowercase();
    if text.contains("net::ERR_NAME_NOT_RESOLVED") || text.contains("net::ERR_NAME_RESOLUTION_FAILED")
    {
        NavigationError::DnsResolutionFailed(text)
    } else if text.contains("net::ERR_CONNECTION_REFUSED") {
        NavigationError::ConnectionRefused(text)
    } else if text.contains("net::ERR_CONNECTION_TIMED_OUT")
        || text.contains("net::ERR_TIMED_OUT")
        || lower.contains("timeout")
        || lower.contains("timed out")
    {
        NavigationError::Timeout(timeout_ms)
    } else {
        NavigationError::LoadFailed(text)
    }
}

/// Status text as reported, or the canonical phrase when it is empty (HTTP/2)
fn reason_phrase(status: u16, reported: Option<String>) -> String {
    match reported {
        Some(text) if !text.trim().is_empty() => text,
        _ => http::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or_default()
            .to_string(),
    }
}

/// Drives one browser session through load, settle and capture
#[derive(Clone)]
pub struct Navigator {
    backend: Arc<dyn BrowserBackend>,
    config: NavigatorConfig,
}

impl Navigator {
    /// Create a navigator over a backend
    pub fn new(backend: Arc<dyn BrowserBackend>, config: NavigatorConfig) -> Self {
        Self { backend, config }
    }

    /// Timing configuration
    pub fn config(&self) -> &NavigatorConfig {
        &self.config
    }

    /// Launch a session within the launch timeout
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        let timeout = Duration::from_millis(self.config.launch_timeout_ms);
        tokio::time::timeout(timeout, self.backend.launch())
            .await
            .map_err(|_| BrowserError::Timeout(self.config.launch_timeout_ms))?
    }

    /// Launch a session and tear it down again
    #[instrument(skip(self))]
    pub async fn probe(&self) -> Result<()> {
        let session = self.launch().await?;
        session.close().await?;
        debug!("Browser probe succeeded");
        Ok(())
    }

    /// Capture one URL as a full-page PNG
    #[instrument(skip(self, req), fields(url = %req.url))]
    pub async fn capture(&self, req: &CaptureRequest) -> Result<Vec<u8>> {
        let start = Instant::now();
        let mut session = self.launch().await?;
        debug!("Browser launched");

        let outcome = self.drive(session.as_mut(), req).await;

        if let Err(e) = session.close().await {
            warn!("Error closing browser: {}", e);
        }

        match &outcome {
            Ok(bytes) => info!(
                "Screenshot captured: {} bytes in {}ms",
                bytes.len(),
                start.elapsed().as_millis()
            ),
            Err(e) => warn!("Capture failed after {}ms: {}", start.elapsed().as_millis(), e),
        }

        outcome
    }

    async fn drive(&self, session: &mut dyn BrowserSession, req: &CaptureRequest) -> Result<Vec<u8>> {
        let profile = self.config.profile.clone().with_viewport(req.viewport);
        session.configure(&profile).await?;
        debug!("Viewport and headers set");

        self.navigate(session, req).await?;

        let settle = Duration::from_millis(self.config.settle_ms);
        if !settle.is_zero() {
            debug!("Waiting {}ms for content to settle", self.config.settle_ms);
            tokio::time::sleep(settle).await;
        }

        if self.config.dismiss_consent {
            ConsentDismisser::dismiss(session).await;
        }

        let idle = Duration::from_millis(self.config.idle_window_ms);
        let idle_timeout = Duration::from_millis(self.config.idle_timeout_ms);
        match session.wait_for_network_idle(idle, idle_timeout).await {
            Ok(()) => debug!("Network is idle"),
            Err(e) => debug!("Network idle wait ended early, proceeding: {}", e),
        }

        let capture_timeout = Duration::from_millis(self.config.capture_timeout_ms);
        let data = tokio::time::timeout(capture_timeout, session.screenshot(&self.config.capture))
            .await
            .map_err(|_| CaptureError::Timeout(self.config.capture_timeout_ms))?
            .map_err(|e| match e {
                crate::error::Error::Capture(c) => c,
                other => CaptureError::ScreenshotFailed(other.to_string()),
            })?;

        Ok(CapturedImage::from_png(data)?.into_bytes())
    }

    async fn navigate(&self, session: &mut dyn BrowserSession, req: &CaptureRequest) -> Result<()> {
        info!("Navigating to: {}", req.url);
        let timeout = Duration::from_millis(req.timeout_ms);

        let response = tokio::time::timeout(
            timeout + Duration::from_millis(250),
            session.navigate(&req.url, req.wait_until, timeout),
        )
        .await
        .map_err(|_| NavigationError::Timeout(req.timeout_ms))?
        .map_err(|e| match e {
            crate::error::Error::Navigation(nav) => nav,
            other => classify_net_error(&other.to_string(), req.timeout_ms),
        })?;

        if let Some(status) = response.status {
            if !(200..400).contains(&status) {
                return Err(NavigationError::HttpError {
                    status,
                    message: reason_phrase(status, response.status_text),
                }
                .into());
            }
        }

        debug!(
            "Page loaded: {}",
            response.final_url.as_deref().unwrap_or(&req.url)
        );
        Ok(())
    }
}
