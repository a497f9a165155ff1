//! Page geometry: fit an image onto a fixed page without upscaling.
//!
//! Image pixels are measured in page units (one pixel = one millimetre on an
//! A4 page), so small images keep their natural size and large ones shrink
//! until both edges fit. The image is never enlarged.

use crate::error::MangaPdfError;
use serde::{Deserialize, Serialize};

/// PDF user-space points per millimetre.
pub const POINTS_PER_MM: f64 = 72.0 / 25.4;

/// Fixed physical page dimensions in millimetres, constant across a document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSpec {
    pub width: f64,
    pub height: f64,
}

impl PageSpec {
    /// ISO A4 portrait.
    pub const A4: PageSpec = PageSpec {
        width: 210.0,
        height: 297.0,
    };

    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Width in PDF points.
    pub fn width_pt(&self) -> f64 {
        self.width * POINTS_PER_MM
    }

    /// Height in PDF points.
    pub fn height_pt(&self) -> f64 {
        self.height * POINTS_PER_MM
    }
}

impl Default for PageSpec {
    fn default() -> Self {
        Self::A4
    }
}

/// Pixel dimensions read from an image header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

impl ImageDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Placement of one image on one page, in page units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawPlan {
    /// Always in `(0, 1]`.
    pub scale: f64,
    pub draw_width: f64,
    pub draw_height: f64,
}

/// Compute the draw scale that fits `img` inside `page`, preserving aspect ratio.
///
/// # Errors
/// * [`MangaPdfError::InvalidImageDimensions`] if either image dimension is zero
/// * [`MangaPdfError::InvalidConfig`] if the page is not strictly positive
pub fn fit(img: ImageDimensions, page: PageSpec) -> Result<DrawPlan, MangaPdfError> {
    if !(page.width > 0.0 && page.height > 0.0) {
        return Err(MangaPdfError::InvalidConfig(format!(
            "page size must be positive, got {}x{} mm",
            page.width, page.height
        )));
    }
    if img.width == 0 || img.height == 0 {
        return Err(MangaPdfError::InvalidImageDimensions {
            width: img.width,
            height: img.height,
        });
    }

    let (w, h) = (f64::from(img.width), f64::from(img.height));
    let scale = if w > page.width || h > page.height {
        (page.width / w).min(page.height / h)
    } else {
        1.0
    };

    Ok(DrawPlan {
        scale,
        draw_width: w * scale,
        draw_height: h * scale,
    })
}
