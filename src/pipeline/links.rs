//! Link candidates, deduplication and the item limit

use crate::cache::try_normalize;
use crate::error::{ExtractionError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Default number of links previewed per batch
pub const DEFAULT_ITEM_LIMIT: usize = 5;

/// A link offered for preview
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkCandidate {
    /// Absolute URL
    pub url: String,
    /// Display text
    #[serde(default)]
    pub text: String,
}

impl LinkCandidate {
    /// Create a candidate
    pub fn new<U: Into<String>, T: Into<String>>(url: U, text: T) -> Self {
        Self {
            url: url.into(),
            text: text.into(),
        }
    }
}

/// What the page link collector hands back
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkExtractionResponse {
    /// Whether collection worked
    pub success: bool,
    /// Collected links
    #[serde(default)]
    pub links: Vec<LinkCandidate>,
    /// Failure reason when `success` is false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LinkExtractionResponse {
    /// The links, or why there are none
    pub fn into_candidates(self) -> Result<Vec<LinkCandidate>> {
        if !self.success {
            let reason = self
                .error
                .unwrap_or_else(|| "Unknown error occurred".to_string());
            return Err(ExtractionError::ExtractionFailed(reason).into());
        }
        if self.links.is_empty() {
            return Err(ExtractionError::NoLinks.into());
        }
        Ok(self.links)
    }
}

/// Collapse candidates that share origin + path
///
/// The first occurrence wins, order is kept, unparsable URLs are dropped and
/// blank display text falls back to the URL.
pub fn dedup_candidates<I>(candidates: I) -> Vec<LinkCandidate>
where
    I: IntoIterator<Item = LinkCandidate>,
{
    let mut seen = HashSet::new();
    let mut unique = Vec::new();

    for candidate in candidates {
        let Some(key) = try_normalize(&candidate.url) else {
            warn!("Invalid URL: {}", candidate.url);
            continue;
        };
        if !seen.insert(key) {
            debug!("Skipping duplicate link: {}", candidate.url);
            continue;
        }

        let text = candidate.text.trim();
        let text = if text.is_empty() {
            candidate.url.clone()
        } else {
            text.to_string()
        };
        unique.push(LinkCandidate {
            url: candidate.url,
            text,
        });
    }

    unique
}

/// How many candidates a batch processes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemLimit {
    /// No cap
    All,
    /// At most this many
    Max(usize),
}

impl ItemLimit {
    /// Cap `items` in place
    pub fn apply<T>(&self, items: &mut Vec<T>) {
        if let ItemLimit::Max(n) = self {
            items.truncate(*n);
        }
    }

    /// Parse, falling back to the default on anything unusable
    pub fn lenient(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl Default for ItemLimit {
    fn default() -> Self {
        ItemLimit::Max(DEFAULT_ITEM_LIMIT)
    }
}

impl fmt::Display for ItemLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemLimit::All => f.write_str("all"),
            ItemLimit::Max(n) => write!(f, "{}", n),
        }
    }
}

impl FromStr for ItemLimit {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(ItemLimit::All);
        }
        match s.parse::<usize>() {
            Ok(0) => Err("item limit must be at least 1".to_string()),
            Ok(n) => Ok(ItemLimit::Max(n)),
            Err(_) => Err(format!("expected \"all\" or a number, got {:?}", s)),
        }
    }
}

impl Serialize for ItemLimit {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            ItemLimit::All => serializer.serialize_str("all"),
            ItemLimit::Max(n) => serializer.serialize_u64(*n as u64),
        }
    }
}

impl<'de> Deserialize<'de> for ItemLimit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Count(usize),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Count(0) => Err(serde::de::Error::custom("item limit must be at least 1")),
            Raw::Count(n) => Ok(ItemLimit::Max(n)),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}
