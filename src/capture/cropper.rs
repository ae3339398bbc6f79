use crate::capture::artifact::ImageArtifact;
use crate::foundation::error::{FieldinkError, FieldinkResult};

/// Transparent margin added on every side of the cropped ink, in pixels.
pub const PAD: u32 = 10;

/// Inclusive pixel bounds of all non-transparent pixels in a raster.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InkBounds {
    /// Leftmost inked column.
    pub min_x: u32,
    /// Topmost inked row.
    pub min_y: u32,
    /// Rightmost inked column.
    pub max_x: u32,
    /// Bottommost inked row.
    pub max_y: u32,
}

impl InkBounds {
    /// Width of the inked region.
    pub fn width(self) -> u32 {
        self.max_x - self.min_x + 1
    }

    /// Height of the inked region.
    pub fn height(self) -> u32 {
        self.max_y - self.min_y + 1
    }
}

/// Scan every pixel's alpha channel for the extent of the ink.
///
/// Returns `None` when the raster is fully transparent.
pub fn ink_bounds(raster: &image::RgbaImage) -> Option<InkBounds> {
    let mut bounds: Option<InkBounds> = None;
    for (x, y, px) in raster.enumerate_pixels() {
        if px.0[3] == 0 {
            continue;
        }
        bounds = Some(match bounds {
            None => InkBounds {
                min_x: x,
                min_y: y,
                max_x: x,
                max_y: y,
            },
            Some(b) => InkBounds {
                min_x: b.min_x.min(x),
                min_y: b.min_y.min(y),
                max_x: b.max_x.max(x),
                max_y: b.max_y.max(y),
            },
        });
    }
    bounds
}

/// Crop a raster tightly to its ink and surround it with [`PAD`] transparent pixels.
///
/// A raster without any ink is rejected with [`FieldinkError::EmptyStrokeCommit`]; this never
/// produces a zero-sized image.
pub fn crop_to_ink(raster: &image::RgbaImage) -> FieldinkResult<image::RgbaImage> {
    let bounds = ink_bounds(raster).ok_or(FieldinkError::EmptyStrokeCommit)?;

    let mut out = image::RgbaImage::new(bounds.width() + 2 * PAD, bounds.height() + 2 * PAD);
    for y in bounds.min_y..=bounds.max_y {
        for x in bounds.min_x..=bounds.max_x {
            let px = *raster.get_pixel(x, y);
            out.put_pixel(x - bounds.min_x + PAD, y - bounds.min_y + PAD, px);
        }
    }
    Ok(out)
}

/// Crop a raster to its ink and encode the result as a PNG artifact.
#[tracing::instrument(skip(raster), fields(w = raster.width(), h = raster.height()))]
pub fn crop_to_artifact(raster: &image::RgbaImage) -> FieldinkResult<ImageArtifact> {
    let cropped = crop_to_ink(raster)?;
    let artifact = ImageArtifact::encode_png(&cropped)?;
    tracing::debug!(
        width = artifact.width(),
        height = artifact.height(),
        bytes = artifact.encoded_bytes().len(),
        "cropped ink to artifact"
    );
    Ok(artifact)
}

#[cfg(test)]
#[path = "../../tests/unit/capture/cropper.rs"]
mod tests;
