//! Image format selection from a file path.
//!
//! Downloaded files are named after the remote URL's extension, so the
//! extension is the only type information the assembler needs. Anything
//! unrecognised is treated as JPEG, the dominant format on manga CDNs.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Image encodings the assembler can embed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageFormat {
    #[default]
    Jpeg,
    Png,
}

impl ImageFormat {
    /// Pick the format from the path's extension (case-insensitive).
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("png") => ImageFormat::Png,
            Some("jpg") | Some("jpeg") => ImageFormat::Jpeg,
            _ => ImageFormat::default(),
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
        }
    }
}
