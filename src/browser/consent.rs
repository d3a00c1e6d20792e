//! Cookie/consent banner dismissal
//!
//! Failure here is always ignored: the dismissal runs after a successful
//! navigation and can never turn a good capture into a failed one.

use crate::browser::session::BrowserSession;
use tracing::debug;

/// Selectors for common accept buttons
pub const CONSENT_SELECTORS: &[&str] = &[
    r#"button[id*="cookie"][id*="accept"]"#,
    r#"button[class*="cookie"][class*="accept"]"#,
    r#"button[id*="consent"]"#,
    r#"button[class*="consent"]"#,
    r#"a[id*="cookie"][id*="accept"]"#,
    r#"a[class*="cookie"][class*="accept"]"#,
];

/// Clicks known consent buttons in the current page
pub struct ConsentDismisser;

impl ConsentDismisser {
    /// Build the script that clicks every match and returns the click count
    pub fn script() -> String {
        let selectors = serde_json::to_string(CONSENT_SELECTORS).unwrap_or_else(|_| "[]".into());
        format!(
            r#"
                (() => {{
                    let clicked = 0;
                    for (const selector of {selectors}) {{
                        document.querySelectorAll(selector).forEach(el => {{
                            try {{
                                el.click();
                                clicked += 1;
                            }} catch (e) {{}}
                        }});
                    }}
                    return clicked;
                }})()
            "#
        )
    }

    /// Click consent buttons. Returns how many were clicked, if known.
    pub async fn dismiss(session: &mut dyn BrowserSession) -> Option<u64> {
        match session.evaluate(&Self::script()).await {
            Ok(value) => {
                let clicked = value.as_u64();
                debug!("Consent dismissal clicked {:?} elements", clicked);
                clicked
            }
            Err(e) => {
                debug!("No cookie banners found or could not dismiss: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_embeds_every_selector() {
        let script = ConsentDismisser::script();
        for selector in CONSENT_SELECTORS {
            let quoted = serde_json::to_string(selector).unwrap();
            assert!(script.contains(&quoted), "missing {selector}");
        }
        assert!(script.contains("return clicked"));
    }
}
