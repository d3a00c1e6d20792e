//! Page profile: viewport, headers and automation masking
//!
//! Sites tend to serve degraded content to obvious bots, so every capture runs
//! with a desktop user agent, real `Accept`/`Accept-Language` headers and the
//! usual automation tells hidden.

use serde::{Deserialize, Serialize};

/// Default desktop user agent
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Default `Accept-Language` header
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// Default `Accept` header
pub const DEFAULT_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

/// Viewport size in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 800,
        }
    }
}

/// Everything applied to a page before navigation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageProfile {
    /// Viewport size
    pub viewport: Viewport,
    /// Device scale factor
    pub device_scale_factor: f64,
    /// User agent string
    pub user_agent: String,
    /// `Accept-Language` header value
    pub accept_language: String,
    /// `Accept` header value
    pub accept: String,
    /// Inject the automation-masking scripts
    pub stealth: bool,
}

impl Default for PageProfile {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            device_scale_factor: 1.0,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            accept: DEFAULT_ACCEPT.to_string(),
            stealth: true,
        }
    }
}

impl PageProfile {
    /// Profile with a different viewport
    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    /// Extra HTTP headers sent with every request
    pub fn extra_headers(&self) -> serde_json::Value {
        serde_json::json!({
            "Accept-Language": self.accept_language,
            "Accept": self.accept,
        })
    }

    /// Scripts to run on every new document, in order
    pub fn stealth_scripts(&self) -> Vec<String> {
        if !self.stealth {
            return Vec::new();
        }

        let primary = self
            .accept_language
            .split(',')
            .next()
            .unwrap_or("en-US")
            .trim()
            .to_string();

        vec![
            r#"
                Object.defineProperty(navigator, 'webdriver', {
                    get: () => undefined,
                    configurable: true
                });
            "#
            .to_string(),
            format!(
                r#"
                Object.defineProperty(navigator, 'languages', {{
                    get: () => ['{primary}', 'en'],
                    configurable: true
                }});
                Object.defineProperty(navigator, 'language', {{
                    get: () => '{primary}',
                    configurable: true
                }});
            "#
            ),
            r#"
                if (!window.chrome) {
                    window.chrome = {};
                }
                if (!window.chrome.runtime) {
                    window.chrome.runtime = {};
                }
            "#
            .to_string(),
        ]
    }
}
