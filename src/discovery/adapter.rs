use crate::foundation::core::{PAGE_HEIGHT, Rect};
use crate::foundation::error::{FieldinkError, FieldinkResult};
use crate::template::model::{FieldSpec, FieldType, Position, Template};

/// Where a discovered field's geometry came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldOrigin {
    /// Placeholder taken from the template declaration.
    Declared,
    /// Found on the rendered surface.
    Rendered,
}

/// A field in the ordered signing list.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DiscoveredField {
    /// Field declaration (rendered geometry once found).
    #[serde(flatten)]
    pub spec: FieldSpec,
    /// Source of the geometry.
    pub origin: FieldOrigin,
    /// Pixel bounds on the rendered surface, when found there.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixel_bounds: Option<Rect>,
}

impl DiscoveredField {
    /// Wrap a template declaration.
    pub fn declared(spec: FieldSpec) -> Self {
        Self {
            spec,
            origin: FieldOrigin::Declared,
            pixel_bounds: None,
        }
    }

    /// Field key.
    pub fn key(&self) -> &str {
        &self.spec.key
    }

    /// 1-based page number.
    pub fn page(&self) -> u32 {
        self.spec.page()
    }
}

/// Read side of the external render surface.
///
/// Implementations adapt whatever the host renders (a DOM, a PDF viewer, a snapshot) into
/// discovered fields. They must not fail: missing pages simply yield no fields.
pub trait RenderedSurface {
    /// Number of pages the surface has rendered so far.
    fn rendered_page_count(&self) -> u32;

    /// Ask the surface to bring `page` into view so it renders fully.
    fn bring_into_view(&mut self, _page: u32) {}

    /// Signature fields rendered on `page`, with page-local point geometry.
    fn list_rendered_fields(&self, page: u32) -> Vec<DiscoveredField>;
}

/// Interaction marker carried by a rendered field container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementMarker {
    /// The container can be selected.
    Selectable,
    /// The container reacts to pointer input.
    Interactive,
    /// Purely presentational.
    Static,
}

/// A field container found in a rendered page.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RenderedElement {
    /// Field key annotation.
    #[serde(default)]
    pub field_key: Option<String>,
    /// Type annotation from the schema metadata the renderer attached, if any.
    #[serde(default)]
    pub declared_type: Option<FieldType>,
    /// Interaction markers on the container.
    #[serde(default)]
    pub markers: Vec<ElementMarker>,
    /// Whether the container embeds a drawable (canvas-like) surface.
    #[serde(default)]
    pub has_drawable_surface: bool,
    /// Bounds in surface pixels.
    pub bounds: Rect,
}

/// A rendered page container.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RenderedPage {
    /// 1-based page number.
    pub page: u32,
    /// Page container bounds in surface pixels.
    pub bounds: Rect,
    /// Field containers on the page.
    #[serde(default)]
    pub elements: Vec<RenderedElement>,
}

/// Snapshot of an external render surface: per-page containers with geometry and annotations.
///
/// Detection is gated on declared types: an element matches only if it is selectable or
/// interactive, embeds a drawable surface, and its key resolves to a signature type (either in
/// the template or in the element's own type annotation). Element names are never consulted.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ElementTreeSurface {
    /// Rendered pages in any order.
    #[serde(default)]
    pub pages: Vec<RenderedPage>,
    /// Template used to resolve declared types. Not part of the snapshot.
    #[serde(skip)]
    pub template: Option<Template>,
    /// Pages brought into view, in request order.
    #[serde(skip)]
    pub viewed: Vec<u32>,
}

impl ElementTreeSurface {
    /// Build a surface adapter over `pages` resolving types through `template`.
    pub fn new(pages: Vec<RenderedPage>, template: Template) -> Self {
        Self {
            pages,
            template: Some(template),
            viewed: Vec::new(),
        }
    }

    /// Parse a snapshot from JSON and attach `template`.
    pub fn from_json(json: &str, template: Template) -> FieldinkResult<Self> {
        let mut s: ElementTreeSurface = serde_json::from_str(json)
            .map_err(|e| FieldinkError::validation(format!("surface JSON: {e}")))?;
        s.template = Some(template);
        Ok(s)
    }

    fn resolved_type(&self, el: &RenderedElement, key: &str) -> Option<FieldType> {
        self.template
            .as_ref()
            .and_then(|t| t.field(key))
            .map(|f| f.field_type)
            .or(el.declared_type)
    }

    fn matches(&self, el: &RenderedElement) -> Option<(String, FieldType)> {
        let key = el.field_key.as_deref().filter(|k| !k.is_empty())?;
        let interactive = el
            .markers
            .iter()
            .any(|m| matches!(m, ElementMarker::Selectable | ElementMarker::Interactive));
        if !interactive || !el.has_drawable_surface {
            return None;
        }
        let ty = self.resolved_type(el, key)?;
        ty.is_signature().then(|| (key.to_string(), ty))
    }
}

impl RenderedSurface for ElementTreeSurface {
    fn rendered_page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn bring_into_view(&mut self, page: u32) {
        self.viewed.push(page);
    }

    fn list_rendered_fields(&self, page: u32) -> Vec<DiscoveredField> {
        let Some(container) = self.pages.iter().find(|p| p.page == page) else {
            return Vec::new();
        };
        let page_px = container.bounds;
        if page_px.height() <= 0.0 {
            return Vec::new();
        }
        // Surface pixels to template points.
        let scale = PAGE_HEIGHT / page_px.height();

        container
            .elements
            .iter()
            .filter_map(|el| {
                let (key, field_type) = self.matches(el)?;
                let b = el.bounds;
                Some(DiscoveredField {
                    spec: FieldSpec {
                        key,
                        field_type,
                        position: Position {
                            x: (b.x0 - page_px.x0) * scale,
                            y: (b.y0 - page_px.y0) * scale,
                        },
                        width: b.width() * scale,
                        height: b.height() * scale,
                        page: Some(page),
                    },
                    origin: FieldOrigin::Rendered,
                    pixel_bounds: Some(b),
                })
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/discovery/adapter.rs"]
mod tests;
