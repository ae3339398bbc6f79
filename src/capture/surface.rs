use crate::foundation::core::{Canvas, Point, Rect};
use crate::foundation::error::{FieldinkError, FieldinkResult};

/// Pen used to rasterize strokes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PenStyle {
    /// Stroke diameter in pixels.
    pub width_px: f64,
    /// Straight-alpha RGBA ink color.
    pub rgba: [u8; 4],
}

impl Default for PenStyle {
    fn default() -> Self {
        Self {
            width_px: 3.0,
            rgba: [17, 24, 39, 255],
        }
    }
}

/// Live drawing buffer for exactly one active field.
///
/// The buffer is owned by whichever field is bound; rebinding always starts from a fully
/// transparent raster, so two fields never share ink.
#[derive(Clone, Debug)]
pub struct StrokeCaptureSurface {
    pen: PenStyle,
    buffer: Option<image::RgbaImage>,
    owner: Option<String>,
    cursor: Option<Point>,
    inked: bool,
    strokes: u32,
}

impl StrokeCaptureSurface {
    /// Create an unmounted surface.
    pub fn new(pen: PenStyle) -> Self {
        Self {
            pen,
            buffer: None,
            owner: None,
            cursor: None,
            inked: false,
            strokes: 0,
        }
    }

    /// Create a surface already mounted at `canvas` size.
    pub fn mounted(canvas: Canvas, pen: PenStyle) -> Self {
        let mut s = Self::new(pen);
        s.buffer = Some(image::RgbaImage::new(canvas.width, canvas.height));
        s
    }

    /// Give the surface a pixel size. Remounting discards any ink.
    pub fn mount(&mut self, width: u32, height: u32) -> FieldinkResult<()> {
        let canvas = Canvas::new(width, height)?;
        self.buffer = Some(image::RgbaImage::new(canvas.width, canvas.height));
        self.reset_ink();
        Ok(())
    }

    /// Return `true` once the surface has a pixel size.
    pub fn is_mounted(&self) -> bool {
        self.buffer.is_some()
    }

    /// Pixel size, if mounted.
    pub fn canvas(&self) -> Option<Canvas> {
        self.buffer.as_ref().map(|b| Canvas {
            width: b.width(),
            height: b.height(),
        })
    }

    /// Bind the buffer to `key`, clearing any ink left by the previous owner.
    pub fn bind(&mut self, key: &str) -> FieldinkResult<()> {
        if !self.is_mounted() {
            return Err(FieldinkError::SurfaceNeverMounted);
        }
        self.owner = Some(key.to_string());
        self.clear();
        Ok(())
    }

    /// Field key currently owning the buffer.
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    /// Discard all ink. The owner is kept.
    pub fn clear(&mut self) {
        if let Some(buf) = self.buffer.as_mut() {
            for px in buf.pixels_mut() {
                *px = image::Rgba([0, 0, 0, 0]);
            }
        }
        self.reset_ink();
    }

    /// Begin a stroke at `p` (pixel coordinates). Draws a dot so taps leave ink.
    pub fn pointer_down(&mut self, p: Point) {
        if self.owner.is_none() {
            return;
        }
        self.stamp_segment(p, p);
        self.cursor = Some(p);
    }

    /// Extend the current stroke to `p`. Ignored when no stroke is in progress.
    pub fn pointer_move(&mut self, p: Point) {
        let Some(from) = self.cursor else {
            return;
        };
        self.stamp_segment(from, p);
        self.cursor = Some(p);
    }

    /// End the current stroke.
    ///
    /// Returns `true` when a stroke was in progress and the buffer now holds ink.
    pub fn pointer_up(&mut self) -> bool {
        if self.cursor.take().is_none() {
            return false;
        }
        self.strokes += 1;
        self.inked
    }

    /// Return `true` while no ink has been captured since the last clear.
    pub fn is_empty(&self) -> bool {
        !self.inked
    }

    /// Number of completed strokes since the last clear.
    pub fn stroke_count(&self) -> u32 {
        self.strokes
    }

    /// Borrow the raw straight-alpha raster, if mounted.
    pub fn raster(&self) -> Option<&image::RgbaImage> {
        self.buffer.as_ref()
    }

    fn reset_ink(&mut self) {
        self.cursor = None;
        self.inked = false;
        self.strokes = 0;
    }

    // Round-capped segment: stamp pen disks every half pixel along the line.
    fn stamp_segment(&mut self, from: Point, to: Point) {
        let Some(buf) = self.buffer.as_mut() else {
            return;
        };
        let radius = (self.pen.width_px / 2.0).max(0.5);
        let (w, h) = (i64::from(buf.width()), i64::from(buf.height()));
        let reach = Rect::new(-radius, -radius, w as f64 + radius, h as f64 + radius);
        let Some((from, to)) = clip_segment(from, to, reach) else {
            return;
        };
        let len = from.distance(to);
        let steps = (len * 2.0).ceil().max(1.0) as u32;
        let r2 = radius * radius;
        let ink = image::Rgba(self.pen.rgba);

        for i in 0..=steps {
            let c = from.lerp(to, f64::from(i) / f64::from(steps));
            let x0 = ((c.x - radius).floor() as i64).max(0);
            let y0 = ((c.y - radius).floor() as i64).max(0);
            let x1 = ((c.x + radius).ceil() as i64).min(w - 1);
            let y1 = ((c.y + radius).ceil() as i64).min(h - 1);
            for y in y0..=y1 {
                for x in x0..=x1 {
                    let dx = x as f64 + 0.5 - c.x;
                    let dy = y as f64 + 0.5 - c.y;
                    if dx * dx + dy * dy <= r2 {
                        buf.put_pixel(x as u32, y as u32, ink);
                        self.inked = true;
                    }
                }
            }
        }
    }
}

// Liang-Barsky: the part of `a -> b` inside `r`, or `None` when it misses `r` entirely.
fn clip_segment(a: Point, b: Point, r: Rect) -> Option<(Point, Point)> {
    if ![a.x, a.y, b.x, b.y].iter().all(|v| v.is_finite()) {
        return None;
    }
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
    for (p, q) in [
        (-dx, a.x - r.x0),
        (dx, r.x1 - a.x),
        (-dy, a.y - r.y0),
        (dy, r.y1 - a.y),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            t0 = t0.max(t);
        } else {
            t1 = t1.min(t);
        }
        if t0 > t1 {
            return None;
        }
    }
    Some((a.lerp(b, t0), a.lerp(b, t1)))
}

#[cfg(test)]
#[path = "../../tests/unit/capture/surface.rs"]
mod tests;
