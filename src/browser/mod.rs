//! Browser automation module
//!
//! This module drives headless Chromium through ChromiumOxide: session
//! lifecycle, navigation with network-quiescence waits, consent banner
//! dismissal and full-page capture.

pub mod capture;
pub mod consent;
pub mod controller;
pub mod navigation;
pub mod network;
pub mod profile;
pub mod session;

pub use capture::{CaptureOptions, CapturedImage};
pub use consent::ConsentDismisser;
pub use controller::{BrowserConfig, ChromiumBackend, ChromiumSession};
pub use navigation::{
    classify_net_error, CaptureRequest, Navigator, NavigatorConfig, UrlValidator, WaitUntil,
};
pub use network::{NetworkActivity, NetworkMonitor};
pub use profile::{PageProfile, Viewport};
pub use session::{BrowserBackend, BrowserSession, DocumentResponse};
