use crate::foundation::error::{FieldinkError, FieldinkResult};

pub use kurbo::{Point, Rect, Size};

/// Height of one template page in point units (A4 at 72 dpi).
///
/// Every page of a template is assumed to share this height; page numbers for fields that do not
/// carry one explicitly are inferred from it.
pub const PAGE_HEIGHT: f64 = 842.0;

/// Width of one page in point units, used only when rasterizing pages for export.
pub const PAGE_WIDTH: f64 = 595.0;

/// Infer a 1-based page number from a document-absolute `y` coordinate.
pub fn page_for_y(y: f64) -> u32 {
    if !y.is_finite() || y <= 0.0 {
        return 1;
    }
    // `as` saturates at u32::MAX; validation rejects such pages against the page count.
    ((y / PAGE_HEIGHT).floor() as u32).saturating_add(1)
}

/// Map a document-absolute `y` coordinate onto its page (`y` modulo the page height).
pub fn page_local_y(y: f64) -> f64 {
    if !y.is_finite() || y <= 0.0 {
        return y.max(0.0);
    }
    y - f64::from(page_for_y(y) - 1) * PAGE_HEIGHT
}

/// Pixel dimensions of a raster surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Create a validated canvas with non-zero dimensions.
    pub fn new(width: u32, height: u32) -> FieldinkResult<Self> {
        if width == 0 || height == 0 {
            return Err(FieldinkError::validation(
                "canvas width/height must be > 0",
            ));
        }
        Ok(Self { width, height })
    }

    /// Total pixel count.
    pub fn area(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Scale `inner` uniformly so it fits inside `outer`, centered on it.
///
/// Degenerate inputs return `outer` unchanged.
pub fn fit_centered(inner: Size, outer: Rect) -> Rect {
    if inner.width <= 0.0 || inner.height <= 0.0 || outer.width() <= 0.0 || outer.height() <= 0.0
    {
        return outer;
    }
    let scale = (outer.width() / inner.width).min(outer.height() / inner.height);
    let size = Size::new(inner.width * scale, inner.height * scale);
    Rect::from_center_size(outer.center(), size)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
