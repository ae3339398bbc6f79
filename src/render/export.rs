use image::RgbaImage;
use image::imageops::FilterType;

use crate::foundation::core::{PAGE_HEIGHT, PAGE_WIDTH, Rect};
use crate::foundation::error::{FieldinkError, FieldinkResult};
use crate::render::registry::{Drawable, FieldGeometry, RendererRegistry};
use crate::store::values::FieldValueStore;
use crate::template::model::{FieldSpec, Template};

/// Drawables of one page, in field order.
#[derive(Clone, Debug, PartialEq)]
pub struct PageDrawables {
    /// 1-based page number.
    pub page: u32,
    /// `(field key, drawable)` pairs; fields that rendered [`Drawable::Nothing`] are omitted.
    pub items: Vec<(String, Drawable)>,
}

impl PageDrawables {
    /// Look up the drawable produced for `key`.
    pub fn get(&self, key: &str) -> Option<&Drawable> {
        self.items.iter().find(|(k, _)| k == key).map(|(_, d)| d)
    }
}

/// Dispatch every valued field of `template` through `registry`.
///
/// Returns one entry per template page, including pages with nothing to draw.
#[tracing::instrument(skip(template, store, registry), fields(pages = template.pages))]
pub fn layout_document(
    template: &Template,
    store: &FieldValueStore,
    registry: &RendererRegistry,
) -> Vec<PageDrawables> {
    let mut pages: Vec<PageDrawables> = (1..=template.pages)
        .map(|page| PageDrawables {
            page,
            items: Vec::new(),
        })
        .collect();

    let mut fields: Vec<&FieldSpec> = template.fields.values().collect();
    fields.sort_by(|a, b| a.order_cmp(b));

    for spec in fields {
        let Some(value) = store.get(&spec.key) else {
            continue;
        };
        let geometry = FieldGeometry::of(spec);
        let drawable = registry.render(spec.field_type, value, &geometry);
        if drawable == Drawable::Nothing {
            continue;
        }
        let Some(slot) = (geometry.page as usize)
            .checked_sub(1)
            .and_then(|i| pages.get_mut(i))
        else {
            tracing::warn!(key = %spec.key, page = geometry.page, "field page outside template, skipped");
            continue;
        };
        slot.items.push((spec.key.clone(), drawable));
    }
    pages
}

/// Composite the raster drawables of one page onto a transparent canvas `width_px` wide.
///
/// Image and shape drawables are painted with source-over in premultiplied space. Text and
/// barcode drawables need fonts and symbologies the host owns, so they are skipped here.
#[tracing::instrument(skip(page), fields(page = page.page))]
pub fn rasterize_page(page: &PageDrawables, width_px: u32) -> FieldinkResult<RgbaImage> {
    if width_px == 0 {
        return Err(FieldinkError::validation("raster width must be > 0"));
    }
    let scale = f64::from(width_px) / PAGE_WIDTH;
    let height_px = (PAGE_HEIGHT * scale).round().max(1.0) as u32;
    let mut canvas = PremulCanvas::new(width_px, height_px);

    for (key, drawable) in &page.items {
        match drawable {
            Drawable::Image { rect, image } => {
                let Some(target) = pixel_rect(*rect, scale, width_px, height_px) else {
                    continue;
                };
                let mut src = image.decode_rgba()?;
                if (src.width(), src.height()) != (target.w, target.h) {
                    src = image::imageops::resize(&src, target.w, target.h, FilterType::Triangle);
                }
                premultiply_rgba8_in_place(&mut src);
                canvas.blit(&src, target.x, target.y);
            }
            Drawable::Shape { rect, rgba } => {
                let Some(target) = pixel_rect(*rect, scale, width_px, height_px) else {
                    continue;
                };
                let mut px = *rgba;
                premultiply_rgba8_in_place(&mut px);
                canvas.fill(target, px);
            }
            Drawable::Text { .. } | Drawable::Barcode { .. } => {
                tracing::debug!(%key, "host-drawn drawable skipped by rasterizer");
            }
            Drawable::Nothing => {}
        }
    }
    Ok(canvas.into_straight())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PixelRect {
    x: u32,
    y: u32,
    w: u32,
    h: u32,
}

fn pixel_rect(rect: Rect, scale: f64, width: u32, height: u32) -> Option<PixelRect> {
    let x0 = (rect.x0 * scale).round().clamp(0.0, f64::from(width));
    let y0 = (rect.y0 * scale).round().clamp(0.0, f64::from(height));
    let x1 = (rect.x1 * scale).round().clamp(0.0, f64::from(width));
    let y1 = (rect.y1 * scale).round().clamp(0.0, f64::from(height));
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some(PixelRect {
        x: x0 as u32,
        y: y0 as u32,
        w: (x1 - x0) as u32,
        h: (y1 - y0) as u32,
    })
}

type PremulRgba8 = [u8; 4];

struct PremulCanvas {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PremulCanvas {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
        }
    }

    fn put(&mut self, x: u32, y: u32, src: PremulRgba8) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let dst = [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ];
        self.data[i..i + 4].copy_from_slice(&over(dst, src));
    }

    fn blit(&mut self, src: &RgbaImage, x: u32, y: u32) {
        for (sx, sy, px) in src.enumerate_pixels() {
            self.put(x + sx, y + sy, px.0);
        }
    }

    fn fill(&mut self, r: PixelRect, px: PremulRgba8) {
        for y in r.y..r.y + r.h {
            for x in r.x..r.x + r.w {
                self.put(x, y, px);
            }
        }
    }

    fn into_straight(mut self) -> RgbaImage {
        unpremultiply_rgba8_in_place(&mut self.data);
        RgbaImage::from_raw(self.width, self.height, self.data)
            .unwrap_or_else(|| RgbaImage::new(self.width, self.height))
    }
}

fn over(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    if src[3] == 0 {
        return dst;
    }
    let inv = 255u16 - u16::from(src[3]);
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = src[i].saturating_add(mul_div255(u16::from(dst[i]), inv));
    }
    out
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 {
            px[..3].fill(0);
            continue;
        }
        for c in &mut px[..3] {
            *c = mul_div255(u16::from(*c), a);
        }
    }
}

fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u32::from(px[3]);
        if a == 0 || a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u32::from(*c) * 255 + a / 2) / a).min(255) as u8;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/export.rs"]
mod tests;
