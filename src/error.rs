//! Error types for Linkshot Web
//!
//! Each layer has its own `thiserror` enum. They fold into [`Error`], and the
//! acquisition boundary collapses any of them into a caller-visible
//! [`ErrorKind`] plus a human-readable message (see [`AcquisitionError`]).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The main error type for Linkshot Web operations
#[derive(Error, Debug)]
pub enum Error {
    /// Browser-related errors
    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    /// Navigation errors
    #[error("Navigation error: {0}")]
    Navigation(#[from] NavigationError),

    /// Capture errors
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    /// Cache store errors
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Link extraction collaborator errors
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Normalized acquisition failure
    #[error("{0}")]
    Acquisition(#[from] AcquisitionError),

    /// Batch-level failures
    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// ChromiumOxide errors
    #[error("CDP error: {0}")]
    Cdp(String),

    /// Generic error with message
    #[error("{0}")]
    Generic(String),
}

/// Browser lifecycle and control errors
#[derive(Error, Debug)]
pub enum BrowserError {
    /// Failed to launch browser
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    /// Browser configuration error
    #[error("Invalid browser configuration: {0}")]
    ConfigError(String),

    /// Failed to create new page/tab
    #[error("Failed to create page: {0}")]
    PageCreationFailed(String),

    /// Timeout waiting for browser
    #[error("Browser operation timed out after {0}ms")]
    Timeout(u64),
}

/// Navigation errors
#[derive(Error, Debug)]
pub enum NavigationError {
    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Navigation timeout
    #[error("Page load timed out after {0}ms")]
    Timeout(u64),

    /// Host name could not be resolved
    #[error("Could not resolve website address: {0}")]
    DnsResolutionFailed(String),

    /// Remote end refused the connection
    #[error("Connection refused by website: {0}")]
    ConnectionRefused(String),

    /// HTTP error
    #[error("HTTP {status} - {message}")]
    HttpError {
        /// HTTP status code
        status: u16,
        /// Status text
        message: String,
    },

    /// Any other page load failure
    #[error("Page load failed: {0}")]
    LoadFailed(String),
}

/// Capture errors
#[derive(Error, Debug)]
pub enum CaptureError {
    /// Screenshot failed
    #[error("Screenshot capture failed: {0}")]
    ScreenshotFailed(String),

    /// The browser returned no usable image
    #[error("Screenshot capture returned an empty image")]
    EmptyImage,

    /// Capture timeout
    #[error("Capture timed out after {0}ms")]
    Timeout(u64),
}

/// Cache store errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The backing storage has no room for the entry
    #[error("Storage quota exceeded: needed {needed} bytes, {available} available")]
    CapacityExceeded {
        /// Bytes the write needed
        needed: usize,
        /// Bytes still free before the write
        available: usize,
    },

    /// A stored entry could not be encoded or decoded
    #[error("Cache entry encoding failed: {0}")]
    Encoding(String),

    /// Any other storage failure
    #[error("Storage failure: {0}")]
    Storage(String),
}

/// Link extraction collaborator errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// The collaborator reported failure
    #[error("Link extraction failed: {0}")]
    ExtractionFailed(String),

    /// The collaborator succeeded but found nothing
    #[error("No valid links found on this page")]
    NoLinks,
}

/// Batch-level failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    /// Health probe failed before the batch started
    #[error("Preview service is not running: {0}")]
    ServiceUnavailable(String),

    /// Nothing left to process after dedup and cap
    #[error("No valid links found to preview")]
    NoCandidates,
}

/// Caller-visible failure category for one capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ErrorKind {
    /// The automation backend could not start a session
    ServiceUnavailable,
    /// The URL was rejected before navigation
    InvalidUrl,
    /// Navigation exceeded its timeout
    NavigationTimeout,
    /// DNS lookup failed
    DnsResolutionFailed,
    /// The target refused the connection
    ConnectionRefused,
    /// The main document answered with a failing status
    HttpError {
        /// HTTP status code
        status: u16,
    },
    /// Any other navigation failure
    NavigationFailed,
    /// Raster capture failed
    CaptureFailed,
    /// Anything else
    Unknown,
}

impl ErrorKind {
    /// Short machine-friendly label
    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::ServiceUnavailable => "service_unavailable",
            ErrorKind::InvalidUrl => "invalid_url",
            ErrorKind::NavigationTimeout => "navigation_timeout",
            ErrorKind::DnsResolutionFailed => "dns_resolution_failed",
            ErrorKind::ConnectionRefused => "connection_refused",
            ErrorKind::HttpError { .. } => "http_error",
            ErrorKind::NavigationFailed => "navigation_failed",
            ErrorKind::CaptureFailed => "capture_failed",
            ErrorKind::Unknown => "unknown",
        }
    }
}

/// A classified acquisition failure
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct AcquisitionError {
    /// Failure category
    pub kind: ErrorKind,
    /// Message shown to the user
    pub message: String,
}

impl AcquisitionError {
    /// Build an acquisition error
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// The backend could not be reached or launched
    pub fn unavailable<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::ServiceUnavailable, message)
    }
}

impl From<Error> for AcquisitionError {
    fn from(err: Error) -> Self {
        let kind = err.kind();
        let message = match &err {
            Error::Navigation(NavigationError::Timeout(_)) => "Page load timed out".to_string(),
            Error::Navigation(NavigationError::DnsResolutionFailed(_)) => {
                "Could not resolve website address".to_string()
            }
            Error::Navigation(NavigationError::ConnectionRefused(_)) => {
                "Connection refused by website".to_string()
            }
            Error::Navigation(NavigationError::HttpError { status, message }) => {
                format!("HTTP {} - {}", status, message)
            }
            Error::Navigation(NavigationError::LoadFailed(msg)) => msg.clone(),
            Error::Acquisition(inner) => inner.message.clone(),
            other => other.to_string(),
        };
        Self { kind, message }
    }
}

/// Result type alias for Linkshot Web operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a generic error from a string
    pub fn generic<S: Into<String>>(msg: S) -> Self {
        Error::Generic(msg.into())
    }

    /// Create a CDP error from a string
    pub fn cdp<S: Into<String>>(msg: S) -> Self {
        Error::Cdp(msg.into())
    }

    /// Classify this error for callers
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Browser(BrowserError::LaunchFailed(_))
            | Error::Browser(BrowserError::ConfigError(_))
            | Error::Browser(BrowserError::Timeout(_)) => ErrorKind::ServiceUnavailable,
            Error::Browser(BrowserError::PageCreationFailed(_)) => ErrorKind::NavigationFailed,
            Error::Navigation(nav) => match nav {
                NavigationError::InvalidUrl(_) => ErrorKind::InvalidUrl,
                NavigationError::Timeout(_) => ErrorKind::NavigationTimeout,
                NavigationError::DnsResolutionFailed(_) => ErrorKind::DnsResolutionFailed,
                NavigationError::ConnectionRefused(_) => ErrorKind::ConnectionRefused,
                NavigationError::HttpError { status, .. } => ErrorKind::HttpError { status: *status },
                NavigationError::LoadFailed(_) => ErrorKind::NavigationFailed,
            },
            Error::Capture(_) => ErrorKind::CaptureFailed,
            Error::Acquisition(inner) => inner.kind,
            Error::Batch(BatchError::ServiceUnavailable(_)) => ErrorKind::ServiceUnavailable,
            _ => ErrorKind::Unknown,
        }
    }
}

/// Convert chromiumoxide errors
impl From<chromiumoxide::error::CdpError> for Error {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Error::Cdp(err.to_string())
    }
}
