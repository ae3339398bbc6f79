use xxhash_rust::xxh3::Xxh3;

use crate::template::model::{FieldType, Template};

const XXH3_SEED: u64 = 0x5f1e_1d1a_c0de_7e11;

/// Stable identity of a template's contents.
///
/// Two templates with equal pages and field declarations share an id regardless of how they were
/// loaded; any geometry or type change produces a new one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct TemplateId {
    /// Upper 64 bits of the digest.
    pub hi: u64,
    /// Lower 64 bits of the digest.
    pub lo: u64,
}

pub(crate) fn fingerprint_template(template: &Template) -> TemplateId {
    let mut h = StableHasher::new();
    h.write_u32(template.pages);
    h.write_u32(template.fields.len() as u32);
    // BTreeMap iteration keeps the digest independent of insertion order.
    for (key, spec) in &template.fields {
        h.write_str(key);
        h.write_u8(field_type_tag(spec.field_type));
        h.write_f64(spec.position.x);
        h.write_f64(spec.position.y);
        h.write_f64(spec.width);
        h.write_f64(spec.height);
        match spec.page {
            Some(p) => {
                h.write_u8(1);
                h.write_u32(p);
            }
            None => h.write_u8(0),
        }
    }
    h.finish()
}

fn field_type_tag(t: FieldType) -> u8 {
    match t {
        FieldType::Text => 0,
        FieldType::Image => 1,
        FieldType::Signature => 2,
        FieldType::SignatureImage => 3,
        FieldType::Barcode => 4,
        FieldType::Shape => 5,
        FieldType::Unknown => 255,
    }
}

struct StableHasher {
    inner: Xxh3,
}

impl StableHasher {
    fn new() -> Self {
        Self {
            inner: Xxh3::with_seed(XXH3_SEED),
        }
    }

    fn write_bytes(&mut self, b: &[u8]) {
        self.inner.update(b);
    }

    fn write_u8(&mut self, v: u8) {
        self.write_bytes(&[v]);
    }

    fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.write_bytes(&v.to_le_bytes());
    }

    fn write_f64(&mut self, v: f64) {
        self.write_u64(v.to_bits());
    }

    fn write_str(&mut self, s: &str) {
        self.write_u32(s.len() as u32);
        self.write_bytes(s.as_bytes());
    }

    fn finish(self) -> TemplateId {
        let v = self.inner.digest128();
        TemplateId {
            hi: (v >> 64) as u64,
            lo: v as u64,
        }
    }
}
