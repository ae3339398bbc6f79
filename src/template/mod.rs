//! Static per-document field declarations.

pub(crate) mod fingerprint;
pub(crate) mod model;
