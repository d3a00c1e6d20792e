//! Chromium lifecycle management
//!
//! [`ChromiumBackend`] launches one Chromium process per session, each with a
//! throwaway profile directory, so cookies and storage never carry over from
//! one capture to the next.

use crate::browser::capture::CaptureOptions;
use crate::browser::navigation::WaitUntil;
use crate::browser::network::NetworkMonitor;
use crate::browser::profile::PageProfile;
use crate::browser::session::{BrowserBackend, BrowserSession, DocumentResponse};
use crate::error::{BrowserError, CaptureError, Error, NavigationError, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as CdpBrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::{
    Headers, SetExtraHttpHeadersParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, CaptureScreenshotFormat,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Configuration for browser launch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run in headless mode (default: true)
    pub headless: bool,
    /// Browser window width (default: 1280)
    pub width: u32,
    /// Browser window height (default: 800)
    pub height: u32,
    /// Enable the Chromium sandbox (default: false, containers rarely allow it)
    pub sandbox: bool,
    /// Path to Chrome/Chromium executable (None = auto-detect)
    pub chrome_path: Option<String>,
    /// CDP request timeout in milliseconds (default: 30000)
    pub request_timeout_ms: u64,
    /// Additional Chrome arguments
    pub extra_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            width: 1280,
            height: 800,
            sandbox: false,
            chrome_path: None,
            request_timeout_ms: 30_000,
            extra_args: Vec::new(),
        }
    }
}

impl BrowserConfig {
    /// Create a new config builder
    pub fn builder() -> BrowserConfigBuilder {
        BrowserConfigBuilder::default()
    }

    /// Command line arguments passed to Chromium on top of chromiumoxide's
    pub fn launch_args(&self) -> Vec<String> {
        let mut args = vec![
            "--disable-dev-shm-usage".to_string(),
            "--disable-gpu".to_string(),
            format!("--window-size={},{}", self.width, self.height),
        ];
        if !self.sandbox {
            args.push("--no-sandbox".to_string());
            args.push("--disable-setuid-sandbox".to_string());
        }
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

/// Builder for BrowserConfig
#[derive(Default)]
pub struct BrowserConfigBuilder {
    config: BrowserConfig,
}

impl BrowserConfigBuilder {
    /// Set headless mode
    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    /// Set window dimensions
    pub fn window(mut self, width: u32, height: u32) -> Self {
        self.config.width = width;
        self.config.height = height;
        self
    }

    /// Enable/disable sandbox
    pub fn sandbox(mut self, sandbox: bool) -> Self {
        self.config.sandbox = sandbox;
        self
    }

    /// Set Chrome path
    pub fn chrome_path<S: Into<String>>(mut self, path: S) -> Self {
        self.config.chrome_path = Some(path.into());
        self
    }

    /// Set CDP request timeout
    pub fn request_timeout_ms(mut self, ms: u64) -> Self {
        self.config.request_timeout_ms = ms;
        self
    }

    /// Add extra Chrome argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.config.extra_args.push(arg.into());
        self
    }

    /// Build the config
    pub fn build(self) -> BrowserConfig {
        self.config
    }
}

/// Launches isolated Chromium sessions
#[derive(Debug, Clone, Default)]
pub struct ChromiumBackend {
    config: BrowserConfig,
}

impl ChromiumBackend {
    /// Create a backend with the given launch configuration
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }

    /// Get the browser configuration
    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }
}

#[async_trait]
impl BrowserBackend for ChromiumBackend {
    #[instrument(skip(self))]
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        // Removed on drop, so a failed or cancelled launch leaves nothing behind.
        let profile_dir = ProfileDir::fresh();

        let mut builder = CdpBrowserConfig::builder()
            .user_data_dir(profile_dir.path())
            .request_timeout(Duration::from_millis(self.config.request_timeout_ms))
            .window_size(self.config.width, self.config.height);

        if self.config.headless {
            builder = builder.new_headless_mode();
        } else {
            builder = builder.with_head();
        }

        if let Some(ref path) = self.config.chrome_path {
            builder = builder.chrome_executable(path);
        }

        for arg in self.config.launch_args() {
            builder = builder.arg(arg);
        }

        let cdp_config = builder.build().map_err(BrowserError::ConfigError)?;

        let (browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    warn!("Browser handler event error");
                    break;
                }
            }
            debug!("Browser handler finished");
        });

        let mut session = ChromiumSession {
            browser,
            handler: handler_task,
            page: None,
            monitor: None,
            profile_dir,
        };

        // A failed page open must still tear the process down.
        if let Err(e) = session.open_page().await {
            let _ = Box::new(session).close().await;
            return Err(e);
        }

        info!("Browser launched successfully");
        Ok(Box::new(session))
    }
}

/// Throwaway user-data directory for one browser process
#[derive(Debug)]
struct ProfileDir {
    path: PathBuf,
    removed: bool,
}

impl ProfileDir {
    fn fresh() -> Self {
        Self::at(std::env::temp_dir().join(format!("linkshot-{}", uuid::Uuid::new_v4())))
    }

    fn at(path: PathBuf) -> Self {
        Self {
            path,
            removed: false,
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    async fn remove(&mut self) {
        self.removed = true;
        if let Err(e) = tokio::fs::remove_dir_all(&self.path).await {
            debug!("Could not remove profile dir {}: {}", self.path.display(), e);
        }
    }
}

impl Drop for ProfileDir {
    fn drop(&mut self) {
        if !self.removed {
            let _ = std::fs::remove_dir_all(&self.path);
        }
    }
}

/// One Chromium process with a single page
///
/// Dropping an unclosed session kills the child process (chromiumoxide's
/// `Browser` does so on drop), stops the handler task and removes the
/// profile directory.
pub struct ChromiumSession {
    // Field order is drop order: the process dies before its directory goes.
    browser: Browser,
    handler: JoinHandle<()>,
    page: Option<Page>,
    monitor: Option<NetworkMonitor>,
    profile_dir: ProfileDir,
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

impl ChromiumSession {
    async fn open_page(&mut self) -> Result<()> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::PageCreationFailed(e.to_string()))?;

        self.monitor = Some(NetworkMonitor::attach(&page).await?);
        self.page = Some(page);
        Ok(())
    }

    fn page(&self) -> Result<Page> {
        self.page
            .clone()
            .ok_or_else(|| BrowserError::PageCreationFailed("no page open".to_string()).into())
    }

    fn monitor(&self) -> Result<&NetworkMonitor> {
        self.monitor
            .as_ref()
            .ok_or_else(|| Error::generic("network monitor not attached"))
    }

    async fn inject_script(page: &Page, script: &str) -> Result<()> {
        let params = AddScriptToEvaluateOnNewDocumentParams::builder()
            .source(script)
            .build()
            .map_err(|e| Error::cdp(format!("Failed to build script params: {}", e)))?;

        page.execute(params)
            .await
            .map_err(|e| Error::cdp(format!("Failed to inject script: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn configure(&mut self, profile: &PageProfile) -> Result<()> {
        let page = self.page()?;

        page.execute(SetDeviceMetricsOverrideParams::new(
            i64::from(profile.viewport.width),
            i64::from(profile.viewport.height),
            profile.device_scale_factor,
            false,
        ))
        .await?;

        let user_agent = SetUserAgentOverrideParams::builder()
            .user_agent(profile.user_agent.clone())
            .accept_language(profile.accept_language.clone())
            .build()
            .map_err(|e| BrowserError::ConfigError(e.to_string()))?;
        page.execute(user_agent).await?;

        page.execute(SetExtraHttpHeadersParams::new(Headers::new(
            profile.extra_headers(),
        )))
        .await?;

        for script in profile.stealth_scripts() {
            Self::inject_script(&page, &script).await?;
        }

        Ok(())
    }

    async fn navigate(
        &mut self,
        url: &str,
        wait_until: WaitUntil,
        timeout: Duration,
    ) -> Result<DocumentResponse> {
        let page = self.page()?;
        let monitor = self.monitor()?;
        let timeout_ms = timeout.as_millis() as u64;

        let main_frame = page.mainframe().await?.map(|f| f.inner().clone());
        monitor.begin_navigation(main_frame);

        let load = async {
            page.goto(url).await.map_err(|e| match e {
                CdpError::Timeout => Error::from(NavigationError::Timeout(timeout_ms)),
                other => Error::from(crate::browser::navigation::classify_net_error(
                    &other.to_string(),
                    timeout_ms,
                )),
            })?;

            if let Some(max_inflight) = wait_until.max_inflight() {
                monitor
                    .wait_for_idle(max_inflight, wait_until.idle_window(), timeout)
                    .await?;
            }
            Ok::<(), Error>(())
        };

        tokio::time::timeout(timeout, load)
            .await
            .map_err(|_| NavigationError::Timeout(timeout_ms))??;

        let mut response = monitor.document().unwrap_or_default();
        if response.final_url.is_none() {
            response.final_url = page.url().await?;
        }
        Ok(response)
    }

    async fn evaluate(&mut self, script: &str) -> Result<serde_json::Value> {
        let result = self.page()?.evaluate(script).await?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn wait_for_network_idle(&mut self, idle: Duration, timeout: Duration) -> Result<()> {
        self.monitor()?.wait_for_idle(0, idle, timeout).await
    }

    async fn screenshot(&mut self, options: &CaptureOptions) -> Result<Vec<u8>> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(options.full_page)
            .omit_background(options.omit_background)
            .from_surface(true)
            .build();

        let data = self
            .page()?
            .screenshot(params)
            .await
            .map_err(|e| CaptureError::ScreenshotFailed(e.to_string()))?;

        debug!("Screenshot captured: {} bytes", data.len());
        Ok(data)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let mut this = *self;
        debug!("Closing browser");

        this.monitor.take();
        this.page.take();

        let closed = this.browser.close().await.map(|_| ());
        let _ = tokio::time::timeout(Duration::from_secs(5), this.browser.wait()).await;
        let _ = tokio::time::timeout(Duration::from_secs(5), &mut this.handler).await;
        this.handler.abort();

        this.profile_dir.remove().await;

        closed.map_err(|e| Error::cdp(e.to_string()))?;
        debug!("Browser closed");
        Ok(())
    }
}
