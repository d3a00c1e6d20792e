//! Linkshot Web - Link Preview Screenshots over Headless Chromium
//!
//! This crate renders web pages to full-page PNG previews and turns lists of
//! links into incremental, cached preview batches.
//!
//! # Features
//!
//! - **Navigator**: one isolated Chromium session per capture, network-idle
//!   waits, consent banner dismissal, classified failures
//! - **Acquisition Service**: URL validation and error normalization, in
//!   process or over HTTP
//! - **Cache Store**: quota-bounded, URL-keyed screenshot cache
//! - **Batch Pipeline**: dedup, item limit, sequential capture, per-item
//!   failure tolerance, supersede on restart
//! - **HTTP Service**: `/health` and `/screenshot?url=` over axum
//!
//! # Architecture
//!
//! ```text
//! links ──▶ BatchPipeline ──▶ CacheStore (hit?)
//!                 │
//!                 ▼ miss
//!           Acquirer ──▶ AcquisitionService ──▶ Navigator ──▶ Chromium (CDP)
//!              │                                     │
//!              └─ RemoteAcquirer ──HTTP──▶ server ───┘
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use linkshot_web::acquisition::Acquirer;
//! use linkshot_web::config::ServiceConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = ServiceConfig::default().acquisition_service();
//!     let png = service.acquire("https://example.com").await?;
//!
//!     println!("Captured {} bytes", png.len());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod acquisition;
pub mod browser;
pub mod cache;
pub mod config;
pub mod cors;
pub mod error;
pub mod pipeline;
pub mod server;

// Re-exports for convenience
pub use acquisition::{Acquirer, AcquisitionService, RemoteAcquirer};
pub use browser::{CaptureRequest, Navigator};
pub use cache::{CacheEntry, CacheKey, CacheStore};
pub use error::{AcquisitionError, Error, ErrorKind, Result};
pub use pipeline::{BatchEvent, BatchOutcome, BatchPipeline, CaptureResult, ItemLimit, LinkCandidate};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
