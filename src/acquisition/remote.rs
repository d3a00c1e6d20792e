//! HTTP client for a running screenshot service

use crate::acquisition::{Acquirer, AcquisitionResult};
use crate::error::{AcquisitionError, ErrorKind};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, error, instrument};

/// Default service address
pub const DEFAULT_SERVICE_URL: &str = "http://localhost:5000";

/// Calls `GET /health` and `GET /screenshot?url=` on a remote service
#[derive(Debug, Clone)]
pub struct RemoteAcquirer {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteAcquirer {
    /// Client for the service at `base_url`
    ///
    /// `timeout` bounds a whole request and should exceed the service's own
    /// worst case (launch + navigation + settle + idle + capture).
    pub fn new<S: Into<String>>(base_url: S, timeout: Duration) -> AcquisitionResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AcquisitionError::unavailable(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Service base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn transport_error(err: reqwest::Error) -> AcquisitionError {
        if err.is_timeout() {
            AcquisitionError::new(ErrorKind::NavigationTimeout, "Screenshot request timed out")
        } else {
            AcquisitionError::unavailable(format!("Preview service unreachable: {}", err))
        }
    }
}

/// Map a failed `/screenshot` response onto an error kind
fn classify_status(status: StatusCode, body: &str) -> ErrorKind {
    match status {
        StatusCode::BAD_REQUEST => ErrorKind::InvalidUrl,
        StatusCode::NOT_FOUND => ErrorKind::ServiceUnavailable,
        _ if body.contains("Page load timed out") => ErrorKind::NavigationTimeout,
        _ if body.contains("Capture timed out") => ErrorKind::CaptureFailed,
        _ if body.contains("Could not resolve website address") => ErrorKind::DnsResolutionFailed,
        _ if body.contains("Connection refused by website") => ErrorKind::ConnectionRefused,
        _ => match parse_http_status(body) {
            Some(code) => ErrorKind::HttpError { status: code },
            None => ErrorKind::Unknown,
        },
    }
}

/// Pull `NNN` out of a "... HTTP NNN - Reason" message
fn parse_http_status(body: &str) -> Option<u16> {
    let rest = &body[body.find("HTTP ")? + 5..];
    rest.split_whitespace().next()?.parse().ok()
}

#[async_trait]
impl Acquirer for RemoteAcquirer {
    #[instrument(skip(self))]
    async fn health(&self) -> AcquisitionResult<String> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .map_err(|e| {
                error!("Server health check failed: {}", e);
                AcquisitionError::unavailable(e.to_string())
            })?;

        let ok = response.status().is_success();
        let text = response.text().await.unwrap_or_default();
        debug!("Health check response: {}", text);

        if ok {
            Ok(text)
        } else {
            Err(AcquisitionError::unavailable(text))
        }
    }

    #[instrument(skip(self))]
    async fn acquire(&self, url: &str) -> AcquisitionResult<Vec<u8>> {
        let response = self
            .client
            .get(format!("{}/screenshot", self.base_url))
            .query(&[("url", url)])
            .header(reqwest::header::ACCEPT, "image/png")
            .send()
            .await
            .map_err(Self::transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Server error ({}): {}", status, body);
            return Err(AcquisitionError::new(classify_status(status, &body), body));
        }

        let bytes = response.bytes().await.map_err(Self::transport_error)?;
        if bytes.is_empty() {
            return Err(AcquisitionError::new(
                ErrorKind::CaptureFailed,
                "Received empty response from server",
            ));
        }

        Ok(bytes.to_vec())
    }
}
