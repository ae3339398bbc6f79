//! Export-time rendering: type-keyed renderer dispatch, page layout, and page rasterization.

pub(crate) mod export;
pub(crate) mod registry;
