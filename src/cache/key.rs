//! Cache keys

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// How URLs are turned into cache keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyTier {
    /// Origin + path; query and fragment ignored
    #[default]
    Normalized,
    /// The URL string exactly as given
    Raw,
}

/// Key under which one capture is stored
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for `url` under the given tier
    pub fn for_url(url: &str, tier: KeyTier) -> Self {
        match tier {
            KeyTier::Normalized => Self(normalize_url(url)),
            KeyTier::Raw => Self(url.to_string()),
        }
    }

    /// The key string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

/// Origin + path of `url`, or `None` if it does not parse
///
/// Hosted URLs become `scheme://host[:port]/path`. Opaque origins (`file:`)
/// keep everything up to the query.
pub fn try_normalize(url: &str) -> Option<String> {
    let mut parsed = Url::parse(url).ok()?;
    let origin = parsed.origin();

    if origin.is_tuple() {
        return Some(format!("{}{}", origin.ascii_serialization(), parsed.path()));
    }

    parsed.set_query(None);
    parsed.set_fragment(None);
    Some(parsed.into())
}

/// Like [`try_normalize`], but unparsable input is cut at `?`/`#` instead
pub fn normalize_url(url: &str) -> String {
    try_normalize(url).unwrap_or_else(|| {
        let end = url.find(['?', '#']).unwrap_or(url.len());
        url[..end].to_string()
    })
}
