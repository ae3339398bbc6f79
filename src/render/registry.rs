use std::collections::HashMap;

use crate::capture::artifact::ImageArtifact;
use crate::foundation::core::{Rect, Size, fit_centered};
use crate::store::values::FieldValue;
use crate::template::model::{FieldSpec, FieldType};

/// Where a field is drawn: its page and page-local rectangle in points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldGeometry {
    /// 1-based page number.
    pub page: u32,
    /// Declared slot in page-local points.
    pub rect: Rect,
}

impl FieldGeometry {
    /// Geometry of a declared field.
    pub fn of(spec: &FieldSpec) -> Self {
        Self {
            page: spec.page(),
            rect: spec.rect(),
        }
    }
}

/// Output of a renderer, consumed by the host's document generator.
#[derive(Clone, Debug, PartialEq)]
pub enum Drawable {
    /// Nothing to draw.
    Nothing,
    /// Literal text inside `rect`.
    Text {
        /// Text box.
        rect: Rect,
        /// Content.
        content: String,
    },
    /// Image placed at `rect` (already fitted inside the field's slot).
    Image {
        /// Placement.
        rect: Rect,
        /// Encoded image.
        image: ImageArtifact,
    },
    /// Barcode payload inside `rect`.
    Barcode {
        /// Barcode box.
        rect: Rect,
        /// Encoded data.
        data: String,
    },
    /// Filled rectangle.
    Shape {
        /// Shape bounds.
        rect: Rect,
        /// Straight-alpha RGBA fill.
        rgba: [u8; 4],
    },
}

/// Renderer signature: `(value, geometry) -> drawable`.
pub type RenderFn = Box<dyn Fn(&FieldValue, &FieldGeometry) -> Drawable>;

/// Type-keyed renderer dispatch.
///
/// Dispatch fails closed: a type without a renderer draws nothing. Two compatibility rules apply
/// on top of the plain lookup:
///
/// - a `text` field whose value is an image is drawn through the `image` renderer, since
///   signature values are often mislabeled upstream;
/// - a `signature` field without a registered renderer is drawn as a centered image.
pub struct RendererRegistry {
    renderers: HashMap<FieldType, RenderFn>,
}

impl Default for RendererRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for RendererRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<&FieldType> = self.renderers.keys().collect();
        types.sort();
        f.debug_struct("RendererRegistry")
            .field("types", &types)
            .finish()
    }
}

impl RendererRegistry {
    /// Registry with no renderers at all.
    pub fn empty() -> Self {
        Self {
            renderers: HashMap::new(),
        }
    }

    /// Registry with the built-in text, image, signature-image, barcode and shape renderers.
    ///
    /// `signature` is deliberately left to the synthesized fallback.
    pub fn with_defaults() -> Self {
        let mut r = Self::empty();
        r.register(FieldType::Text, render_text);
        r.register(FieldType::Image, render_image_centered);
        r.register(FieldType::SignatureImage, render_image_centered);
        r.register(FieldType::Barcode, render_barcode);
        r.register(FieldType::Shape, render_shape);
        r
    }

    /// Register (or replace) the renderer for `ty`.
    pub fn register<F>(&mut self, ty: FieldType, f: F)
    where
        F: Fn(&FieldValue, &FieldGeometry) -> Drawable + 'static,
    {
        self.renderers.insert(ty, Box::new(f));
    }

    /// Remove the renderer for `ty`.
    pub fn unregister(&mut self, ty: FieldType) -> bool {
        self.renderers.remove(&ty).is_some()
    }

    /// Return `true` when `ty` has a registered renderer.
    pub fn has(&self, ty: FieldType) -> bool {
        self.renderers.contains_key(&ty)
    }

    /// Render `value` for a field of type `ty`.
    pub fn render(&self, ty: FieldType, value: &FieldValue, geometry: &FieldGeometry) -> Drawable {
        if ty == FieldType::Text && value.as_image().is_some() {
            tracing::debug!(page = geometry.page, "image value in text field, drawing as image");
            return self.render_as_image(value, geometry);
        }
        match self.renderers.get(&ty) {
            Some(f) => f(value, geometry),
            None if ty == FieldType::Signature => render_image_centered(value, geometry),
            None => {
                tracing::debug!(?ty, "no renderer registered, drawing nothing");
                Drawable::Nothing
            }
        }
    }

    fn render_as_image(&self, value: &FieldValue, geometry: &FieldGeometry) -> Drawable {
        match self.renderers.get(&FieldType::Image) {
            Some(f) => f(value, geometry),
            None => render_image_centered(value, geometry),
        }
    }
}

/// Draw text values as text. Image values draw nothing here; dispatch reroutes them.
pub fn render_text(value: &FieldValue, geometry: &FieldGeometry) -> Drawable {
    match value {
        FieldValue::Text(s) if !s.is_empty() => Drawable::Text {
            rect: geometry.rect,
            content: s.clone(),
        },
        _ => Drawable::Nothing,
    }
}

/// Draw an image value scaled to fit the field's slot, centered, aspect preserved.
pub fn render_image_centered(value: &FieldValue, geometry: &FieldGeometry) -> Drawable {
    let Some(image) = value.as_image() else {
        return Drawable::Nothing;
    };
    let natural = Size::new(f64::from(image.width()), f64::from(image.height()));
    Drawable::Image {
        rect: fit_centered(natural, geometry.rect),
        image: image.clone(),
    }
}

/// Draw a barcode from its text payload.
pub fn render_barcode(value: &FieldValue, geometry: &FieldGeometry) -> Drawable {
    match value {
        FieldValue::Text(s) if !s.is_empty() => Drawable::Barcode {
            rect: geometry.rect,
            data: s.clone(),
        },
        _ => Drawable::Nothing,
    }
}

/// Draw a filled rectangle; a `#rrggbb` or `#rrggbbaa` text value picks the color.
pub fn render_shape(value: &FieldValue, geometry: &FieldGeometry) -> Drawable {
    let rgba = match value {
        FieldValue::Text(s) => parse_hex_rgba(s).unwrap_or([0, 0, 0, 255]),
        FieldValue::Image(_) => return Drawable::Nothing,
    };
    Drawable::Shape {
        rect: geometry.rect,
        rgba,
    }
}

fn parse_hex_rgba(s: &str) -> Option<[u8; 4]> {
    let hex = s.trim().strip_prefix('#')?;
    if !matches!(hex.len(), 6 | 8) || !hex.is_ascii() {
        return None;
    }
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    let a = if hex.len() == 8 { byte(6)? } else { 255 };
    Some([byte(0)?, byte(2)?, byte(4)?, a])
}

#[cfg(test)]
#[path = "../../tests/unit/render/registry.rs"]
mod tests;
