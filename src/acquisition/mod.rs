//! Screenshot acquisition
//!
//! An [`Acquirer`] turns a URL into PNG bytes or a classified
//! [`AcquisitionError`]. [`AcquisitionService`] does it in-process through a
//! [`Navigator`](crate::browser::Navigator); [`RemoteAcquirer`] asks a running
//! service over HTTP, the way the browser extension does.

pub mod remote;
pub mod service;

pub use remote::RemoteAcquirer;
pub use service::{AcquisitionConfig, AcquisitionService};

use crate::error::AcquisitionError;
use async_trait::async_trait;

/// Result of one acquisition
pub type AcquisitionResult<T> = std::result::Result<T, AcquisitionError>;

/// Something that can capture URLs
#[async_trait]
pub trait Acquirer: Send + Sync {
    /// Confirm the backend can serve captures at all
    async fn health(&self) -> AcquisitionResult<String>;

    /// Capture one URL. Exactly one attempt, no retries.
    async fn acquire(&self, url: &str) -> AcquisitionResult<Vec<u8>>;
}
