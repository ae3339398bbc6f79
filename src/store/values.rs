use std::collections::BTreeMap;

use crate::capture::artifact::{ImageArtifact, is_image_payload};
use crate::foundation::error::{FieldinkError, FieldinkResult};

/// A field value, classified once when it enters the store.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum FieldValue {
    /// Literal text.
    Text(String),
    /// Embedded image (serialized as a data URI).
    Image(ImageArtifact),
}

impl FieldValue {
    /// Classify a raw host string.
    ///
    /// Strings carrying the embedded-image marker become [`FieldValue::Image`] when they decode;
    /// a marker string that fails to decode stays text.
    pub fn ingest(raw: &str) -> Self {
        if is_image_payload(raw) {
            match ImageArtifact::from_data_uri(raw) {
                Ok(artifact) => return Self::Image(artifact),
                Err(err) => {
                    tracing::warn!(error = %err, "image marker payload did not decode, keeping as text");
                }
            }
        }
        Self::Text(raw.to_string())
    }

    /// External string form: the text itself or the image data URI.
    pub fn to_raw(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Image(a) => a.to_data_uri(),
        }
    }

    /// Borrow the image artifact, if this is an image value.
    pub fn as_image(&self) -> Option<&ImageArtifact> {
        match self {
            Self::Image(a) => Some(a),
            Self::Text(_) => None,
        }
    }
}

/// Map of field key to committed value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldValueStore {
    values: BTreeMap<String, FieldValue>,
}

impl FieldValueStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest a raw `key -> string` map as delivered by the host.
    pub fn from_raw(raw: &BTreeMap<String, String>) -> Self {
        let mut store = Self::new();
        store.merge_raw(raw);
        store
    }

    /// Parse a raw `key -> string` JSON object.
    pub fn from_json(json: &str) -> FieldinkResult<Self> {
        let raw: BTreeMap<String, String> = serde_json::from_str(json)
            .map_err(|e| FieldinkError::validation(format!("values JSON: {e}")))?;
        Ok(Self::from_raw(&raw))
    }

    /// Serialize back to a raw `key -> string` JSON object.
    pub fn to_json(&self) -> FieldinkResult<String> {
        serde_json::to_string_pretty(&self.to_raw())
            .map_err(|e| FieldinkError::encode(format!("values JSON: {e}")))
    }

    /// Raw `key -> string` view.
    pub fn to_raw(&self) -> BTreeMap<String, String> {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), v.to_raw()))
            .collect()
    }

    /// Merge raw host values, e.g. the map delivered by a signature commit callback.
    pub fn merge_raw(&mut self, raw: &BTreeMap<String, String>) {
        for (key, value) in raw {
            self.values.insert(key.clone(), FieldValue::ingest(value));
        }
    }

    /// Merge committed artifacts, replacing previous values whole.
    pub fn merge_artifacts(&mut self, artifacts: &BTreeMap<String, ImageArtifact>) {
        for (key, artifact) in artifacts {
            self.values
                .insert(key.clone(), FieldValue::Image(artifact.clone()));
        }
    }

    /// Insert or replace one value.
    pub fn insert(&mut self, key: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        self.values.insert(key.into(), value)
    }

    /// Look up a value.
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.values.get(key)
    }

    /// Image artifacts currently stored, keyed by field.
    pub fn images(&self) -> BTreeMap<String, ImageArtifact> {
        self.values
            .iter()
            .filter_map(|(k, v)| v.as_image().map(|a| (k.clone(), a.clone())))
            .collect()
    }

    /// Iterate values in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Return `true` when no values are stored.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/store/values.rs"]
mod tests;
