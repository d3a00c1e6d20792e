//! Browser session abstraction
//!
//! The Navigator only talks to these traits. Production code launches
//! Chromium through [`ChromiumBackend`](super::ChromiumBackend); tests plug in
//! scripted sessions.

use crate::browser::capture::CaptureOptions;
use crate::browser::navigation::WaitUntil;
use crate::browser::profile::PageProfile;
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// What the browser reported about the main document after navigation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentResponse {
    /// Final URL after redirects
    pub final_url: Option<String>,
    /// Main document HTTP status, when the protocol exposes one
    pub status: Option<u16>,
    /// Status text that came with `status`
    pub status_text: Option<String>,
}

impl DocumentResponse {
    /// A response that carried the given status
    pub fn with_status(status: u16, status_text: impl Into<String>) -> Self {
        Self {
            final_url: None,
            status: Some(status),
            status_text: Some(status_text.into()),
        }
    }
}

/// Launches isolated browser sessions
#[async_trait]
pub trait BrowserBackend: Send + Sync {
    /// Launch a fresh session that shares no state with earlier ones
    async fn launch(&self) -> Result<Box<dyn BrowserSession>>;
}

/// One exclusively-owned browser session with a single page
#[async_trait]
pub trait BrowserSession: Send {
    /// Apply viewport, user agent and request headers
    async fn configure(&mut self, profile: &PageProfile) -> Result<()>;

    /// Navigate and wait according to `wait_until`, bounded by `timeout`
    async fn navigate(
        &mut self,
        url: &str,
        wait_until: WaitUntil,
        timeout: Duration,
    ) -> Result<DocumentResponse>;

    /// Evaluate a script in the page and return its JSON value
    async fn evaluate(&mut self, script: &str) -> Result<serde_json::Value>;

    /// Wait until no request has been in flight for `idle`, bounded by `timeout`
    async fn wait_for_network_idle(&mut self, idle: Duration, timeout: Duration) -> Result<()>;

    /// Capture the page as an image
    async fn screenshot(&mut self, options: &CaptureOptions) -> Result<Vec<u8>>;

    /// Tear the session down
    async fn close(self: Box<Self>) -> Result<()>;
}
