//! Page capture options and image validation

use crate::error::{CaptureError, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};

/// PNG file signature
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

/// Options for a raster capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureOptions {
    /// Capture the whole scrollable page, not just the viewport
    #[serde(default = "default_true")]
    pub full_page: bool,
    /// Leave the default white background transparent
    #[serde(default = "default_true")]
    pub omit_background: bool,
}

fn default_true() -> bool {
    true
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            full_page: true,
            omit_background: true,
        }
    }
}

/// A captured PNG
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    /// Raw PNG bytes
    pub data: Vec<u8>,
}

impl CapturedImage {
    /// Validate raw bytes coming back from the browser
    pub fn from_png(data: Vec<u8>) -> Result<Self> {
        if data.is_empty() {
            return Err(CaptureError::EmptyImage.into());
        }
        if !data.starts_with(&PNG_SIGNATURE) {
            return Err(CaptureError::ScreenshotFailed(format!(
                "browser returned {} bytes that are not a PNG",
                data.len()
            ))
            .into());
        }
        Ok(Self { data })
    }

    /// Size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// MIME type of the image
    pub fn mime_type(&self) -> &'static str {
        "image/png"
    }

    /// Base64 encoding of the image
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.data)
    }

    /// Take the bytes out
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}
