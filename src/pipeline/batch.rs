//! Sequential batch runner

use crate::acquisition::Acquirer;
use crate::cache::{CacheEntry, CacheStore};
use crate::error::{BatchError, Result};
use crate::pipeline::links::{ItemLimit, LinkCandidate};
use crate::pipeline::state::{BatchSnapshot, BatchState, CaptureResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Progress notifications for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    /// The run passed its health probe
    Started {
        /// Batch id
        batch_id: Uuid,
        /// Candidates to process
        total: usize,
    },
    /// About to process candidate `current` (1-based)
    Progress {
        /// 1-based index
        current: usize,
        /// Candidates to process
        total: usize,
    },
    /// One candidate finished
    Item(CaptureResult),
    /// The run ended
    Finished(BatchOutcome),
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BatchOutcome {
    /// Every candidate was processed and at least one succeeded
    Completed {
        /// Successful results
        succeeded: usize,
        /// Failed results
        failed: usize,
    },
    /// Every candidate was processed and none succeeded
    AllFailed,
    /// A newer run took over before this one finished
    Superseded,
}

impl fmt::Display for BatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchOutcome::Completed { succeeded, failed } => write!(
                f,
                "Successfully generated {} previews ({} failed)",
                succeeded, failed
            ),
            BatchOutcome::AllFailed => f.write_str("Could not generate any previews"),
            BatchOutcome::Superseded => f.write_str("Superseded by a newer batch"),
        }
    }
}

/// A finished (or superseded) run
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// Final state
    pub state: BatchState,
    /// How it ended
    pub outcome: BatchOutcome,
}

impl BatchReport {
    /// Results in candidate order
    pub fn results(&self) -> &[CaptureResult] {
        self.state.results()
    }

    /// Persistable view
    pub fn snapshot(&self) -> BatchSnapshot {
        self.state.snapshot()
    }
}

/// Turns link lists into preview images, one at a time
///
/// A pipeline runs at most one capture at a time. Starting a run marks any
/// earlier run on the same pipeline stale; the stale run stops before its
/// next candidate.
pub struct BatchPipeline {
    acquirer: Arc<dyn Acquirer>,
    cache: CacheStore,
    generation: AtomicU64,
    lane: Mutex<()>,
}

impl BatchPipeline {
    /// Pipeline over an acquirer and a cache
    pub fn new(acquirer: Arc<dyn Acquirer>, cache: CacheStore) -> Self {
        Self {
            acquirer,
            cache,
            generation: AtomicU64::new(0),
            lane: Mutex::new(()),
        }
    }

    /// The cache this pipeline reads and writes
    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Mark the running batch, if any, as stale
    pub fn supersede(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Process `candidates` in order
    ///
    /// Fails only when the health probe fails or nothing survives dedup and
    /// the limit. Per-candidate failures are recorded as results.
    #[instrument(skip(self, candidates, events), fields(candidates = candidates.len()))]
    pub async fn run(
        &self,
        candidates: Vec<LinkCandidate>,
        limit: ItemLimit,
        events: Option<mpsc::Sender<BatchEvent>>,
    ) -> Result<BatchReport> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut state = BatchState::new(candidates, limit);

        // The probe takes the lane too, after any stale in-flight capture.
        let health = {
            let _lane = self.lane.lock().await;
            self.acquirer.health().await
        };
        if let Err(e) = health {
            error!("Preview service health check failed: {}", e);
            return Err(BatchError::ServiceUnavailable(e.message).into());
        }

        if state.total() == 0 {
            return Err(BatchError::NoCandidates.into());
        }

        info!(batch_id = %state.id(), "Processing {} links for preview", state.total());
        emit(
            &events,
            BatchEvent::Started {
                batch_id: state.id(),
                total: state.total(),
            },
        )
        .await;

        while let Some(candidate) = state.current().cloned() {
            let result = {
                let _lane = self.lane.lock().await;
                if !self.is_current(generation) {
                    break;
                }

                emit(
                    &events,
                    BatchEvent::Progress {
                        current: state.cursor() + 1,
                        total: state.total(),
                    },
                )
                .await;
                self.capture_one(&candidate).await
            };

            state.record(result.clone());
            emit(&events, BatchEvent::Item(result)).await;
        }

        let outcome = if !state.is_done() {
            info!(batch_id = %state.id(), "Batch superseded at {}/{}", state.cursor(), state.total());
            BatchOutcome::Superseded
        } else if state.succeeded() == 0 {
            warn!(batch_id = %state.id(), "Could not generate any previews");
            BatchOutcome::AllFailed
        } else {
            let outcome = BatchOutcome::Completed {
                succeeded: state.succeeded(),
                failed: state.failed(),
            };
            info!(batch_id = %state.id(), "{}", outcome);
            outcome
        };

        emit(&events, BatchEvent::Finished(outcome)).await;
        Ok(BatchReport { state, outcome })
    }

    async fn capture_one(&self, candidate: &LinkCandidate) -> CaptureResult {
        let key = self.cache.key_for(&candidate.url);

        if let Some(entry) = self.cache.get(&key) {
            debug!("Using cached screenshot for {}", candidate.url);
            return CaptureResult::Success {
                url: candidate.url.clone(),
                text: candidate.text.clone(),
                image_bytes: entry.image_bytes,
                from_cache: true,
            };
        }

        match self.acquirer.acquire(&candidate.url).await {
            Ok(image_bytes) => {
                self.cache.put(&key, CacheEntry::new(image_bytes.clone()));
                CaptureResult::Success {
                    url: candidate.url.clone(),
                    text: candidate.text.clone(),
                    image_bytes,
                    from_cache: false,
                }
            }
            Err(e) => {
                warn!("Failed to generate preview for {}: {}", candidate.url, e);
                CaptureResult::Failure {
                    url: candidate.url.clone(),
                    text: candidate.text.clone(),
                    kind: e.kind,
                    message: e.message,
                }
            }
        }
    }
}

async fn emit(events: &Option<mpsc::Sender<BatchEvent>>, event: BatchEvent) {
    if let Some(tx) = events {
        if tx.send(event).await.is_err() {
            debug!("Batch event receiver dropped");
        }
    }
}
