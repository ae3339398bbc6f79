use std::io::Cursor;

use anyhow::Context as _;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::foundation::error::{FieldinkError, FieldinkResult};

/// Marker every self-describing embedded image payload starts with.
pub const IMAGE_PAYLOAD_PREFIX: &str = "data:image/";

const PNG_MIME: &str = "image/png";

/// Return `true` when `value` carries the embedded-image marker prefix.
///
/// This only sniffs the prefix; use [`ImageArtifact::from_data_uri`] to actually decode.
pub fn is_image_payload(value: &str) -> bool {
    value.starts_with(IMAGE_PAYLOAD_PREFIX)
}

/// Encoded image produced from captured ink (or ingested from a host payload).
///
/// Artifacts are immutable once built: re-signing a field replaces the whole value.
/// Serializes as its data URI.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageArtifact {
    mime_type: String,
    encoded: Vec<u8>,
    width: u32,
    height: u32,
}

impl ImageArtifact {
    /// Losslessly encode a straight-alpha RGBA raster as PNG.
    pub fn encode_png(raster: &image::RgbaImage) -> FieldinkResult<Self> {
        let (width, height) = raster.dimensions();
        if width == 0 || height == 0 {
            return Err(FieldinkError::encode("artifact raster must be non-empty"));
        }
        let mut encoded = Vec::new();
        raster
            .write_to(&mut Cursor::new(&mut encoded), image::ImageFormat::Png)
            .context("encode artifact png")?;
        Ok(Self {
            mime_type: PNG_MIME.to_string(),
            encoded,
            width,
            height,
        })
    }

    /// Decode an artifact from its external `data:<mime>;base64,<payload>` form.
    pub fn from_data_uri(uri: &str) -> FieldinkResult<Self> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| FieldinkError::decode("payload is not a data URI"))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| FieldinkError::decode("data URI has no payload separator"))?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| FieldinkError::decode("only base64 data URIs are supported"))?;
        if !mime_type.starts_with("image/") {
            return Err(FieldinkError::decode(format!(
                "data URI mime type '{mime_type}' is not an image"
            )));
        }

        let encoded = STANDARD
            .decode(payload.trim())
            .map_err(|e| FieldinkError::decode(format!("data URI base64: {e}")))?;
        let dims = image::load_from_memory(&encoded)
            .context("decode data URI image")?
            .to_rgba8()
            .dimensions();

        Ok(Self {
            mime_type: mime_type.to_string(),
            encoded,
            width: dims.0,
            height: dims.1,
        })
    }

    /// External single-string representation: MIME type plus base64 payload.
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.encoded))
    }

    /// Decode the payload back into a straight-alpha RGBA raster.
    pub fn decode_rgba(&self) -> FieldinkResult<image::RgbaImage> {
        let img = image::load_from_memory(&self.encoded).context("decode artifact image")?;
        Ok(img.to_rgba8())
    }

    /// MIME type of the encoded payload.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Encoded payload bytes.
    pub fn encoded_bytes(&self) -> &[u8] {
        &self.encoded
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }
}

impl serde::Serialize for ImageArtifact {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_data_uri())
    }
}

impl<'de> serde::Deserialize<'de> for ImageArtifact {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let uri = String::deserialize(deserializer)?;
        Self::from_data_uri(&uri).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/capture/artifact.rs"]
mod tests;
