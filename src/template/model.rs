use std::collections::BTreeMap;

use crate::foundation::core::{PAGE_HEIGHT, Rect, page_for_y, page_local_y};
use crate::foundation::error::{FieldinkError, FieldinkResult};
use crate::template::fingerprint::{TemplateId, fingerprint_template};

/// Declared value type of a template field.
///
/// Type strings this crate does not know deserialize to [`FieldType::Unknown`], which renders
/// nothing.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Plain text.
    Text,
    /// Embedded raster image.
    Image,
    /// Freehand signature captured as ink.
    Signature,
    /// Signature supplied as an image.
    SignatureImage,
    /// Barcode payload.
    Barcode,
    /// Decorative shape.
    Shape,
    /// Anything else.
    #[serde(other)]
    Unknown,
}

impl FieldType {
    /// Return `true` for the types that expect handwritten ink.
    pub fn is_signature(self) -> bool {
        matches!(self, Self::Signature | Self::SignatureImage)
    }
}

/// Top-left corner of a field in point units.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Position {
    /// Horizontal offset from the page's left edge.
    pub x: f64,
    /// Vertical offset. Page-local when the field carries a page, document-absolute otherwise.
    pub y: f64,
}

/// A single declared field.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FieldSpec {
    /// Unique key; filled from the template map key when omitted.
    #[serde(default)]
    pub key: String,
    /// Declared value type.
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Placement of the top-left corner.
    pub position: Position,
    /// Width in points.
    pub width: f64,
    /// Height in points.
    pub height: f64,
    /// Explicit 1-based page number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl FieldSpec {
    /// 1-based page, inferred from `position.y` when not explicit.
    pub fn page(&self) -> u32 {
        self.page.unwrap_or_else(|| page_for_y(self.position.y))
    }

    /// Vertical position relative to the field's own page.
    pub fn page_local_y(&self) -> f64 {
        match self.page {
            Some(_) => self.position.y,
            None => page_local_y(self.position.y),
        }
    }

    /// Page-local bounding rectangle in points.
    pub fn rect(&self) -> Rect {
        let y = self.page_local_y();
        Rect::new(
            self.position.x,
            y,
            self.position.x + self.width,
            y + self.height,
        )
    }

    /// Ordering shared by every ordered field list: page, then page-local `y`, then key.
    pub fn order_cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.page()
            .cmp(&other.page())
            .then_with(|| self.page_local_y().total_cmp(&other.page_local_y()))
            .then_with(|| self.key.cmp(&other.key))
    }
}

/// A document template: page count plus keyed field declarations.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Template {
    /// Number of pages the rendered document is expected to have.
    #[serde(alias = "pageCount")]
    pub pages: u32,
    /// Field declarations keyed by field key.
    pub fields: BTreeMap<String, FieldSpec>,
}

impl Template {
    /// Parse, normalize and validate a template from JSON.
    pub fn from_json(json: &str) -> FieldinkResult<Self> {
        let mut template: Template = serde_json::from_str(json)
            .map_err(|e| FieldinkError::validation(format!("template JSON: {e}")))?;
        template.normalize_keys()?;
        template.validate()?;
        Ok(template)
    }

    /// Fill missing `FieldSpec::key` values from their map keys.
    pub fn normalize_keys(&mut self) -> FieldinkResult<()> {
        for (map_key, spec) in &mut self.fields {
            if spec.key.is_empty() {
                spec.key = map_key.clone();
            } else if spec.key != *map_key {
                return Err(FieldinkError::validation(format!(
                    "field '{map_key}' declares mismatched key '{}'",
                    spec.key
                )));
            }
        }
        Ok(())
    }

    /// Check structural constraints on pages and field geometry.
    pub fn validate(&self) -> FieldinkResult<()> {
        if self.pages == 0 {
            return Err(FieldinkError::validation("template must have pages >= 1"));
        }
        for (key, spec) in &self.fields {
            if key.is_empty() {
                return Err(FieldinkError::validation("field keys must be non-empty"));
            }
            if spec.key != *key {
                return Err(FieldinkError::validation(format!(
                    "field '{key}' has key '{}'",
                    spec.key
                )));
            }
            let geometry = [spec.position.x, spec.position.y, spec.width, spec.height];
            if geometry.iter().any(|v| !v.is_finite() || *v < 0.0) {
                return Err(FieldinkError::validation(format!(
                    "field '{key}' geometry must be finite and >= 0"
                )));
            }
            let page = spec.page();
            if page == 0 || page > self.pages {
                return Err(FieldinkError::validation(format!(
                    "field '{key}' is on page {page} but the template has {} page(s)",
                    self.pages
                )));
            }
        }
        Ok(())
    }

    /// Declared signature fields in map order.
    pub fn signature_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.values().filter(|f| f.field_type.is_signature())
    }

    /// Look up a field declaration by key.
    pub fn field(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.get(key)
    }

    /// Stable content fingerprint, used to detect template identity changes.
    pub fn id(&self) -> TemplateId {
        fingerprint_template(self)
    }

    /// Document height in points when every page has [`PAGE_HEIGHT`].
    pub fn document_height(&self) -> f64 {
        f64::from(self.pages) * PAGE_HEIGHT
    }
}

#[cfg(test)]
#[path = "../../tests/unit/template/model.rs"]
mod tests;
