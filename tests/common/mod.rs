//! Scripted browser and acquirer doubles shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use linkshot_web::acquisition::{Acquirer, AcquisitionResult};
use linkshot_web::browser::{
    BrowserBackend, BrowserSession, CaptureOptions, DocumentResponse, Navigator, NavigatorConfig,
    PageProfile, WaitUntil,
};
use linkshot_web::error::{AcquisitionError, BrowserError, Error, ErrorKind, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Smallest byte string that passes PNG validation
pub fn png(tag: u8) -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];
    bytes.extend_from_slice(&[0, 0, 0, 13, tag]);
    bytes
}

/// What each session step does
#[derive(Debug, Clone)]
pub struct Script {
    pub launch_error: Option<String>,
    pub navigate_error: Option<String>,
    pub navigate_hangs: bool,
    pub document: DocumentResponse,
    pub evaluate_fails: bool,
    pub idle_times_out: bool,
    pub screenshot: Option<Vec<u8>>,
    pub close_fails: bool,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            launch_error: None,
            navigate_error: None,
            navigate_hangs: false,
            document: DocumentResponse::with_status(200, "OK"),
            evaluate_fails: false,
            idle_times_out: false,
            screenshot: Some(png(1)),
            close_fails: false,
        }
    }
}

/// Backend whose sessions follow a [`Script`] and record every step
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    pub script: Arc<Mutex<Script>>,
    pub steps: Arc<Mutex<Vec<String>>>,
    pub launches: Arc<AtomicUsize>,
}

impl ScriptedBackend {
    pub fn new(script: Script) -> Self {
        Self {
            script: Arc::new(Mutex::new(script)),
            ..Self::default()
        }
    }

    pub fn steps(&self) -> Vec<String> {
        self.steps.lock().clone()
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    /// Navigator with no settle delay
    pub fn navigator(&self) -> Navigator {
        let config = NavigatorConfig {
            settle_ms: 0,
            idle_window_ms: 10,
            idle_timeout_ms: 50,
            ..NavigatorConfig::default()
        };
        Navigator::new(Arc::new(self.clone()), config)
    }
}

#[async_trait]
impl BrowserBackend for ScriptedBackend {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        self.steps.lock().push("launch".to_string());

        let script = self.script.lock().clone();
        if let Some(msg) = &script.launch_error {
            return Err(BrowserError::LaunchFailed(msg.clone()).into());
        }

        Ok(Box::new(ScriptedSession {
            script,
            steps: Arc::clone(&self.steps),
        }))
    }
}

pub struct ScriptedSession {
    script: Script,
    steps: Arc<Mutex<Vec<String>>>,
}

impl ScriptedSession {
    fn step(&self, name: &str) {
        self.steps.lock().push(name.to_string());
    }
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn configure(&mut self, profile: &PageProfile) -> Result<()> {
        self.step(&format!(
            "configure {}x{}",
            profile.viewport.width, profile.viewport.height
        ));
        Ok(())
    }

    async fn navigate(
        &mut self,
        url: &str,
        _wait_until: WaitUntil,
        _timeout: Duration,
    ) -> Result<DocumentResponse> {
        self.step(&format!("navigate {}", url));
        if self.script.navigate_hangs {
            std::future::pending::<()>().await;
        }
        match &self.script.navigate_error {
            Some(msg) => Err(Error::cdp(msg.clone())),
            None => Ok(self.script.document.clone()),
        }
    }

    async fn evaluate(&mut self, _script: &str) -> Result<serde_json::Value> {
        self.step("evaluate");
        if self.script.evaluate_fails {
            Err(Error::cdp("Execution context was destroyed"))
        } else {
            Ok(serde_json::json!(1))
        }
    }

    async fn wait_for_network_idle(&mut self, _idle: Duration, timeout: Duration) -> Result<()> {
        self.step("idle");
        if self.script.idle_times_out {
            Err(linkshot_web::error::NavigationError::Timeout(timeout.as_millis() as u64).into())
        } else {
            Ok(())
        }
    }

    async fn screenshot(&mut self, _options: &CaptureOptions) -> Result<Vec<u8>> {
        self.step("screenshot");
        match &self.script.screenshot {
            Some(bytes) => Ok(bytes.clone()),
            None => Err(Error::cdp("Unable to capture screenshot")),
        }
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.step("close");
        if self.script.close_fails {
            Err(Error::cdp("browser already gone"))
        } else {
            Ok(())
        }
    }
}

/// Acquirer answering from a URL table, counting calls
#[derive(Default)]
pub struct MockAcquirer {
    pub healthy: bool,
    pub responses: HashMap<String, AcquisitionResult<Vec<u8>>>,
    pub delay: Option<Duration>,
    pub health_delay: Option<Duration>,
    pub calls: Mutex<Vec<String>>,
    pub health_checks: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl MockAcquirer {
    pub fn healthy() -> Self {
        Self {
            healthy: true,
            ..Self::default()
        }
    }

    pub fn unhealthy() -> Self {
        Self::default()
    }

    pub fn ok(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.responses.insert(url.to_string(), Ok(bytes));
        self
    }

    pub fn fail(mut self, url: &str, kind: ErrorKind, message: &str) -> Self {
        self.responses
            .insert(url.to_string(), Err(AcquisitionError::new(kind, message)));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_health_delay(mut self, delay: Duration) -> Self {
        self.health_delay = Some(delay);
        self
    }

    /// Most `health`/`acquire` calls ever in flight at once
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn busy(&self, delay: Option<Duration>) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl Acquirer for MockAcquirer {
    async fn health(&self) -> AcquisitionResult<String> {
        self.health_checks.fetch_add(1, Ordering::SeqCst);
        self.busy(self.health_delay).await;
        if self.healthy {
            Ok("Service is running and the browser backend is working".to_string())
        } else {
            Err(AcquisitionError::unavailable("Failed to launch browser: no chrome"))
        }
    }

    async fn acquire(&self, url: &str) -> AcquisitionResult<Vec<u8>> {
        self.calls.lock().push(url.to_string());
        self.busy(self.delay).await;
        match self.responses.get(url) {
            Some(result) => result.clone(),
            None => Err(AcquisitionError::new(
                ErrorKind::NavigationFailed,
                format!("no scripted response for {}", url),
            )),
        }
    }
}
