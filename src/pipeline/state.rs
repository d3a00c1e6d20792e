//! Per-run batch state

use crate::error::ErrorKind;
use crate::pipeline::links::{dedup_candidates, ItemLimit, LinkCandidate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of one candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureResult {
    /// An image was produced or found in the cache
    Success {
        /// Candidate URL
        url: String,
        /// Display text
        text: String,
        /// PNG bytes
        image_bytes: Vec<u8>,
        /// Served from the cache
        from_cache: bool,
    },
    /// Acquisition failed
    Failure {
        /// Candidate URL
        url: String,
        /// Display text
        text: String,
        /// Failure category
        kind: ErrorKind,
        /// User-facing message
        message: String,
    },
}

impl CaptureResult {
    /// Candidate URL
    pub fn url(&self) -> &str {
        match self {
            CaptureResult::Success { url, .. } | CaptureResult::Failure { url, .. } => url,
        }
    }

    /// Display text
    pub fn text(&self) -> &str {
        match self {
            CaptureResult::Success { text, .. } | CaptureResult::Failure { text, .. } => text,
        }
    }

    /// Whether an image is available
    pub fn is_success(&self) -> bool {
        matches!(self, CaptureResult::Success { .. })
    }

    /// PNG bytes on success
    pub fn image_bytes(&self) -> Option<&[u8]> {
        match self {
            CaptureResult::Success { image_bytes, .. } => Some(image_bytes),
            CaptureResult::Failure { .. } => None,
        }
    }

    /// Serializable form without the image
    pub fn summary(&self) -> ResultSummary {
        match self {
            CaptureResult::Success {
                url,
                text,
                image_bytes,
                from_cache,
            } => ResultSummary::Success {
                url: url.clone(),
                text: text.clone(),
                size: image_bytes.len(),
                from_cache: *from_cache,
            },
            CaptureResult::Failure {
                url,
                text,
                kind,
                message,
            } => ResultSummary::Failure {
                url: url.clone(),
                text: text.clone(),
                kind: *kind,
                message: message.clone(),
            },
        }
    }
}

/// [`CaptureResult`] minus the image bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResultSummary {
    /// Image produced
    Success {
        /// Candidate URL
        url: String,
        /// Display text
        text: String,
        /// Image size in bytes
        size: usize,
        /// Served from the cache
        from_cache: bool,
    },
    /// Acquisition failed
    Failure {
        /// Candidate URL
        url: String,
        /// Display text
        text: String,
        /// Failure category
        kind: ErrorKind,
        /// User-facing message
        message: String,
    },
}

/// Persistable view of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSnapshot {
    /// Batch id
    pub batch_id: Uuid,
    /// Item limit the batch ran with
    pub limit: ItemLimit,
    /// Candidates after dedup and cap
    pub links: Vec<LinkCandidate>,
    /// Results so far, in candidate order
    pub results: Vec<ResultSummary>,
    /// Index of the next unprocessed candidate
    pub cursor: usize,
    /// When the batch started
    pub started_at: DateTime<Utc>,
}

/// State of one pipeline run
#[derive(Debug, Clone)]
pub struct BatchState {
    id: Uuid,
    candidates: Vec<LinkCandidate>,
    limit: ItemLimit,
    results: Vec<CaptureResult>,
    cursor: usize,
    started_at: DateTime<Utc>,
}

impl BatchState {
    /// Dedup and cap `candidates` into a fresh batch
    pub fn new(candidates: Vec<LinkCandidate>, limit: ItemLimit) -> Self {
        let mut candidates = dedup_candidates(candidates);
        limit.apply(&mut candidates);

        Self {
            id: Uuid::new_v4(),
            results: Vec::with_capacity(candidates.len()),
            candidates,
            limit,
            cursor: 0,
            started_at: Utc::now(),
        }
    }

    /// Batch id
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Candidates after dedup and cap
    pub fn candidates(&self) -> &[LinkCandidate] {
        &self.candidates
    }

    /// Results so far
    pub fn results(&self) -> &[CaptureResult] {
        &self.results
    }

    /// Consume the state, keeping the results
    pub fn into_results(self) -> Vec<CaptureResult> {
        self.results
    }

    /// Number of candidates
    pub fn total(&self) -> usize {
        self.candidates.len()
    }

    /// Index of the next candidate
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Next candidate to process
    pub fn current(&self) -> Option<&LinkCandidate> {
        self.candidates.get(self.cursor)
    }

    /// Record the current candidate's result and advance
    pub fn record(&mut self, result: CaptureResult) {
        self.results.push(result);
        self.cursor += 1;
    }

    /// Whether every candidate has a result
    pub fn is_done(&self) -> bool {
        self.cursor >= self.candidates.len()
    }

    /// Successful results so far
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    /// Failed results so far
    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    /// Persistable view
    pub fn snapshot(&self) -> BatchSnapshot {
        BatchSnapshot {
            batch_id: self.id,
            limit: self.limit,
            links: self.candidates.clone(),
            results: self.results.iter().map(CaptureResult::summary).collect(),
            cursor: self.cursor,
            started_at: self.started_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success(url: &str) -> CaptureResult {
        CaptureResult::Success {
            url: url.to_string(),
            text: url.to_string(),
            image_bytes: vec![1, 2, 3],
            from_cache: false,
        }
    }

    #[test]
    fn test_new_dedups_and_caps() {
        let state = BatchState::new(
            vec![
                LinkCandidate::new("https://a.com/1", "1"),
                LinkCandidate::new("https://a.com/1?x", "dup"),
                LinkCandidate::new("https://a.com/2", "2"),
                LinkCandidate::new("https://a.com/3", "3"),
            ],
            ItemLimit::Max(2),
        );

        assert_eq!(state.total(), 2);
        assert_eq!(state.current().unwrap().url, "https://a.com/1");
    }

    #[test]
    fn test_cursor_advances() {
        let mut state = BatchState::new(
            vec![LinkCandidate::new("https://a.com/", "a")],
            ItemLimit::All,
        );
        assert!(!state.is_done());

        state.record(success("https://a.com/"));
        assert!(state.is_done());
        assert!(state.current().is_none());
        assert_eq!(state.succeeded(), 1);
        assert_eq!(state.failed(), 0);
    }

    #[test]
    fn test_snapshot_omits_bytes() {
        let mut state = BatchState::new(
            vec![
                LinkCandidate::new("https://a.com/", "a"),
                LinkCandidate::new("https://b.com/", "b"),
            ],
            ItemLimit::All,
        );
        state.record(success("https://a.com/"));
        state.record(CaptureResult::Failure {
            url: "https://b.com/".to_string(),
            text: "b".to_string(),
            kind: ErrorKind::HttpError { status: 404 },
            message: "HTTP 404 - Not Found".to_string(),
        });

        let snapshot = state.snapshot();
        let json = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(json["cursor"], 2);
        assert_eq!(json["limit"], "all");
        assert_eq!(json["results"][0]["status"], "success");
        assert_eq!(json["results"][0]["size"], 3);
        assert_eq!(json["results"][1]["kind"]["type"], "http_error");
        assert_eq!(json["results"][1]["kind"]["status"], 404);

        let back: BatchSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back, snapshot);
    }
}
