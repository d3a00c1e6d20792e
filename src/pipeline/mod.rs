//! Batch preview pipeline
//!
//! ```text
//! links ──▶ dedup + limit ──▶ health probe ──▶ for each candidate:
//!                                               cache hit? ──▶ Success
//!                                               acquire ──▶ cache ──▶ Success
//!                                               error ──▶ Failure
//! ```

pub mod batch;
pub mod links;
pub mod state;

pub use batch::{BatchEvent, BatchOutcome, BatchPipeline, BatchReport};
pub use links::{dedup_candidates, ItemLimit, LinkCandidate, LinkExtractionResponse};
pub use state::{BatchSnapshot, BatchState, CaptureResult, ResultSummary};
