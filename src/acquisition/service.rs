//! In-process acquisition service

use crate::acquisition::{Acquirer, AcquisitionResult};
use crate::browser::{CaptureRequest, Navigator, UrlValidator, Viewport, WaitUntil};
use crate::error::{AcquisitionError, ErrorKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

/// Per-request defaults used to build each [`CaptureRequest`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Navigation timeout in milliseconds (default: 30000)
    pub timeout_ms: u64,
    /// Viewport (default: 1280x800)
    pub viewport: Viewport,
    /// Navigation wait policy (default: network idle)
    pub wait_until: WaitUntil,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            viewport: Viewport::default(),
            wait_until: WaitUntil::NetworkIdle0,
        }
    }
}

/// Wraps single Navigator runs with validation and error normalization
#[derive(Clone)]
pub struct AcquisitionService {
    navigator: Navigator,
    config: AcquisitionConfig,
}

impl AcquisitionService {
    /// Create a service over a navigator
    pub fn new(navigator: Navigator, config: AcquisitionConfig) -> Self {
        Self { navigator, config }
    }

    /// Request defaults
    pub fn config(&self) -> &AcquisitionConfig {
        &self.config
    }

    /// Build the capture request for a URL
    pub fn request_for(&self, url: &str) -> CaptureRequest {
        CaptureRequest::new(url)
            .timeout_ms(self.config.timeout_ms)
            .viewport(self.config.viewport)
            .wait_until(self.config.wait_until)
    }

    /// Launch and immediately tear down a session
    #[instrument(skip(self))]
    pub async fn probe(&self) -> AcquisitionResult<()> {
        self.navigator.probe().await.map_err(|e| {
            error!("Health check failed: {}", e);
            AcquisitionError::unavailable(e.to_string())
        })
    }

    /// Capture one URL, classifying any failure
    #[instrument(skip(self))]
    pub async fn capture(&self, url: &str) -> AcquisitionResult<Vec<u8>> {
        if let Err(reason) = UrlValidator::validate(url) {
            return Err(AcquisitionError::new(ErrorKind::InvalidUrl, reason));
        }

        info!("Generating screenshot for: {}", url);
        let request = self.request_for(url);

        self.navigator.capture(&request).await.map_err(|e| {
            error!(error = ?e, kind = e.kind().label(), "Error generating screenshot for {}", url);
            AcquisitionError::from(e)
        })
    }
}

#[async_trait]
impl Acquirer for AcquisitionService {
    async fn health(&self) -> AcquisitionResult<String> {
        self.probe().await?;
        Ok("Service is running and the browser backend is working".to_string())
    }

    async fn acquire(&self, url: &str) -> AcquisitionResult<Vec<u8>> {
        self.capture(url).await
    }
}
