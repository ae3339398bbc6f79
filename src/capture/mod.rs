//! Ink capture: the live stroke buffer, the bounding-box cropper, and encoded artifacts.

pub(crate) mod artifact;
pub(crate) mod cropper;
pub(crate) mod surface;
