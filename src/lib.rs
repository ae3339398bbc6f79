//! Fieldink reconciles document templates with rendered output and captures signatures for them.
//!
//! The engine has four parts that a host application wires together:
//!
//! - [`FieldDiscovery`] merges a [`Template`]'s declared signature fields with what an external
//!   [`RenderedSurface`] actually drew, under a bounded retry budget
//! - [`SignatureSession`] walks the ordered fields, driving a [`StrokeCaptureSurface`] and
//!   committing cropped [`ImageArtifact`]s to a [`SignatureSink`]
//! - [`FieldValueStore`] holds committed values as tagged text/image values
//! - [`RendererRegistry`] dispatches values to type-specific renderers at export time
//!
//! [`SigningController`] owns one discovery service and at most one session per open document.
//! Nothing in the crate sleeps on its own: time is passed in explicitly, or read from a [`Clock`].
#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod foundation;

pub(crate) mod capture;
pub(crate) mod discovery;
pub(crate) mod render;
pub(crate) mod session;
pub(crate) mod store;
pub(crate) mod template;

pub use crate::foundation::clock::{Clock, ManualClock, SystemClock};
pub use crate::foundation::core::{
    Canvas, PAGE_HEIGHT, PAGE_WIDTH, Point, Rect, Size, fit_centered, page_for_y, page_local_y,
};
pub use crate::foundation::error::{FieldinkError, FieldinkResult};

pub use crate::capture::artifact::{IMAGE_PAYLOAD_PREFIX, ImageArtifact, is_image_payload};
pub use crate::capture::cropper::{InkBounds, PAD, crop_to_artifact, crop_to_ink, ink_bounds};
pub use crate::capture::surface::{PenStyle, StrokeCaptureSurface};
pub use crate::discovery::adapter::{
    DiscoveredField, ElementMarker, ElementTreeSurface, FieldOrigin, RenderedElement,
    RenderedPage, RenderedSurface,
};
pub use crate::discovery::schedule::{Liveness, RepeatStatus, RepeatUntil, RetryBudget};
pub use crate::discovery::service::{DiscoveryOpts, DiscoveryOutcome, FieldDiscovery};
pub use crate::render::export::{PageDrawables, layout_document, rasterize_page};
pub use crate::render::registry::{
    Drawable, FieldGeometry, RenderFn, RendererRegistry, render_barcode, render_image_centered,
    render_shape, render_text,
};
pub use crate::session::controller::SigningController;
pub use crate::session::state::{
    CaptureState, CommitOutcome, Notice, SignatureSession, SignatureSink,
};
pub use crate::store::values::{FieldValue, FieldValueStore};
pub use crate::template::fingerprint::TemplateId;
pub use crate::template::model::{FieldSpec, FieldType, Position, Template};
