//! Network activity tracking over CDP events
//!
//! Chromium does not expose "network idle" directly. We follow
//! `Network.requestWillBeSent` / `loadingFinished` / `loadingFailed` to count
//! in-flight requests, and `Network.responseReceived` to pick up the main
//! document's status.

use crate::browser::session::DocumentResponse;
use crate::error::{NavigationError, Result};
use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent, EventResponseReceived,
    ResourceType,
};
use chromiumoxide::Page;
use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::trace;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Snapshot of network activity for one page
#[derive(Debug)]
pub struct NetworkActivity {
    inflight: HashSet<String>,
    last_change: Instant,
    main_frame: Option<String>,
    document: Option<DocumentResponse>,
}

impl NetworkActivity {
    /// Fresh, quiet activity record
    pub fn new() -> Self {
        Self {
            inflight: HashSet::new(),
            last_change: Instant::now(),
            main_frame: None,
            document: None,
        }
    }

    /// Forget the previous document before a new navigation
    pub fn begin_navigation(&mut self, main_frame: Option<String>) {
        self.main_frame = main_frame;
        self.document = None;
        self.last_change = Instant::now();
    }

    /// A request went out
    pub fn request_started(&mut self, request_id: &str) {
        self.inflight.insert(request_id.to_string());
        self.last_change = Instant::now();
    }

    /// A request finished or failed
    pub fn request_ended(&mut self, request_id: &str) {
        if self.inflight.remove(request_id) {
            self.last_change = Instant::now();
        }
    }

    /// A document response arrived; the first one for the main frame wins
    pub fn document_received(
        &mut self,
        frame_id: Option<&str>,
        url: &str,
        status: i64,
        status_text: &str,
    ) {
        if self.document.is_some() {
            return;
        }
        if let (Some(main), Some(frame)) = (self.main_frame.as_deref(), frame_id) {
            if main != frame {
                return;
            }
        }
        self.document = Some(DocumentResponse {
            final_url: Some(url.to_string()),
            status: u16::try_from(status).ok().filter(|s| *s > 0),
            status_text: Some(status_text.to_string()),
        });
    }

    /// Number of requests currently in flight
    pub fn inflight(&self) -> usize {
        self.inflight.len()
    }

    /// The main document response seen since the last navigation
    pub fn document(&self) -> Option<DocumentResponse> {
        self.document.clone()
    }

    /// Whether at most `max_inflight` requests have been open for `idle`
    pub fn is_quiet(&self, max_inflight: usize, idle: Duration, now: Instant) -> bool {
        self.inflight.len() <= max_inflight && now.duration_since(self.last_change) >= idle
    }
}

impl Default for NetworkActivity {
    fn default() -> Self {
        Self::new()
    }
}

/// Live network monitor attached to a page
pub struct NetworkMonitor {
    activity: Arc<Mutex<NetworkActivity>>,
    tasks: Vec<JoinHandle<()>>,
}

impl NetworkMonitor {
    /// Subscribe to the page's network events
    pub async fn attach(page: &Page) -> Result<Self> {
        let activity = Arc::new(Mutex::new(NetworkActivity::new()));
        let mut tasks = Vec::with_capacity(4);

        let mut sent = page.event_listener::<EventRequestWillBeSent>().await?;
        let state = Arc::clone(&activity);
        tasks.push(tokio::spawn(async move {
            while let Some(event) = sent.next().await {
                trace!("request started: {}", event.request.url);
                state.lock().request_started(event.request_id.inner());
            }
        }));

        let mut finished = page.event_listener::<EventLoadingFinished>().await?;
        let state = Arc::clone(&activity);
        tasks.push(tokio::spawn(async move {
            while let Some(event) = finished.next().await {
                state.lock().request_ended(event.request_id.inner());
            }
        }));

        let mut failed = page.event_listener::<EventLoadingFailed>().await?;
        let state = Arc::clone(&activity);
        tasks.push(tokio::spawn(async move {
            while let Some(event) = failed.next().await {
                trace!("request failed: {}", event.error_text);
                state.lock().request_ended(event.request_id.inner());
            }
        }));

        let mut responses = page.event_listener::<EventResponseReceived>().await?;
        let state = Arc::clone(&activity);
        tasks.push(tokio::spawn(async move {
            while let Some(event) = responses.next().await {
                if event.r#type != ResourceType::Document {
                    continue;
                }
                let frame = event.frame_id.as_ref().map(|f| f.inner().as_str());
                state.lock().document_received(
                    frame,
                    &event.response.url,
                    event.response.status,
                    &event.response.status_text,
                );
            }
        }));

        Ok(Self { activity, tasks })
    }

    /// Reset document tracking ahead of a navigation
    pub fn begin_navigation(&self, main_frame: Option<String>) {
        self.activity.lock().begin_navigation(main_frame);
    }

    /// The main document response, if one was observed
    pub fn document(&self) -> Option<DocumentResponse> {
        self.activity.lock().document()
    }

    /// Wait until at most `max_inflight` requests stay open for `idle`
    pub async fn wait_for_idle(
        &self,
        max_inflight: usize,
        idle: Duration,
        timeout: Duration,
    ) -> Result<()> {
        let wait = async {
            loop {
                let quiet = self.activity.lock().is_quiet(max_inflight, idle, Instant::now());
                if quiet {
                    return;
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        };

        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| NavigationError::Timeout(timeout.as_millis() as u64).into())
    }
}

impl Drop for NetworkMonitor {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
