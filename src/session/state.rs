use std::collections::{BTreeMap, VecDeque};

use crate::capture::artifact::ImageArtifact;
use crate::capture::cropper::crop_to_artifact;
use crate::capture::surface::StrokeCaptureSurface;
use crate::discovery::adapter::DiscoveredField;
use crate::foundation::core::Point;
use crate::foundation::error::{FieldinkError, FieldinkResult};

/// Capture state of a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CaptureState {
    /// `key` is active and the stroke buffer is empty.
    Editing(String),
    /// `key` is active and at least one stroke left ink.
    Dirty(String),
    /// Terminal: no active field.
    Closed,
}

/// One-shot advisory surfaced to the operator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    /// The active field moved to a different page.
    PageChanged {
        /// Page of the previously active field.
        from: u32,
        /// Page of the newly active field.
        to: u32,
        /// Newly active field.
        key: String,
    },
    /// Capture could not start because the drawing surface has no size yet. Retryable.
    SurfaceNeverMounted,
}

/// Host side of a commit: receives `field key -> data URI` maps.
pub trait SignatureSink {
    /// Called with the full signature map when a session completes or is closed after commits.
    fn signatures_committed(&mut self, signatures: &BTreeMap<String, String>);
}

impl<F> SignatureSink for F
where
    F: FnMut(&BTreeMap<String, String>),
{
    fn signatures_committed(&mut self, signatures: &BTreeMap<String, String>) {
        self(signatures)
    }
}

/// What a successful commit led to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Capture moved on to the next unsigned field.
    Advanced {
        /// Newly active field.
        next: String,
    },
    /// No unsigned field remained; the map was emitted and the session closed.
    Completed {
        /// Number of entries in the emitted map.
        emitted: usize,
    },
}

/// Drives freehand signature capture across the ordered field list.
///
/// The session reads the ordered fields (it never reorders or invents them), owns the single
/// stroke buffer, and keeps committed artifacts until it emits them to the host.
#[derive(Debug)]
pub struct SignatureSession {
    fields: Vec<DiscoveredField>,
    signatures: BTreeMap<String, ImageArtifact>,
    state: CaptureState,
    surface: StrokeCaptureSurface,
    notices: VecDeque<Notice>,
    unemitted: bool,
}

impl SignatureSession {
    /// Open a session over `fields`, treating entries of `existing` as already signed.
    ///
    /// The first unsigned field becomes active, or the first field when all are signed.
    pub fn open(
        fields: &[DiscoveredField],
        existing: &BTreeMap<String, ImageArtifact>,
        surface: StrokeCaptureSurface,
    ) -> FieldinkResult<Self> {
        if !surface.is_mounted() {
            return Err(FieldinkError::SurfaceNeverMounted);
        }
        if fields.is_empty() {
            return Err(FieldinkError::validation("no signature fields to capture"));
        }

        let signatures = existing
            .iter()
            .filter(|(k, _)| fields.iter().any(|f| f.key() == k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let mut session = Self {
            fields: fields.to_vec(),
            signatures,
            state: CaptureState::Closed,
            surface,
            notices: VecDeque::new(),
            unemitted: false,
        };
        let first = session
            .first_unsigned()
            .unwrap_or_else(|| session.fields[0].key().to_string());
        session.activate(first)?;
        Ok(session)
    }

    /// Replace the ordered field list with a newer snapshot from discovery.
    pub fn refresh_fields(&mut self, fields: &[DiscoveredField]) {
        if self.is_closed() || fields.is_empty() {
            return;
        }
        self.fields = fields.to_vec();
        let fields = &self.fields;
        self.signatures
            .retain(|k, _| fields.iter().any(|f| f.key() == k.as_str()));

        let active_missing = self
            .active_key()
            .is_some_and(|k| !self.fields.iter().any(|f| f.key() == k));
        if active_missing {
            let next = self
                .first_unsigned()
                .unwrap_or_else(|| self.fields[0].key().to_string());
            if let Err(err) = self.activate(next) {
                tracing::warn!(error = %err, "could not re-activate after field refresh");
            }
        }
    }

    /// Current capture state.
    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    /// Key of the active field, if any.
    pub fn active_key(&self) -> Option<&str> {
        match &self.state {
            CaptureState::Editing(k) | CaptureState::Dirty(k) => Some(k),
            CaptureState::Closed => None,
        }
    }

    /// The active field.
    pub fn active_field(&self) -> Option<&DiscoveredField> {
        let key = self.active_key()?;
        self.fields.iter().find(|f| f.key() == key)
    }

    /// Ordered fields as last seen from discovery.
    pub fn fields(&self) -> &[DiscoveredField] {
        &self.fields
    }

    /// Committed artifacts keyed by field.
    pub fn signatures(&self) -> &BTreeMap<String, ImageArtifact> {
        &self.signatures
    }

    /// Return `true` when `key` has a committed signature.
    pub fn is_signed(&self, key: &str) -> bool {
        self.signatures.contains_key(key)
    }

    /// Return `true` when a commit would be accepted.
    pub fn can_commit(&self) -> bool {
        matches!(self.state, CaptureState::Dirty(_))
    }

    /// Return `true` once the session has terminated.
    pub fn is_closed(&self) -> bool {
        self.state == CaptureState::Closed
    }

    /// The stroke buffer (for previews).
    pub fn surface(&self) -> &StrokeCaptureSurface {
        &self.surface
    }

    /// Pop the oldest pending notice.
    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notices.pop_front()
    }

    /// Make `key` the active field. Always clears the stroke buffer.
    #[tracing::instrument(skip(self))]
    pub fn select_field(&mut self, key: &str) -> FieldinkResult<()> {
        if self.is_closed() {
            return Err(FieldinkError::SessionClosed);
        }
        if !self.fields.iter().any(|f| f.key() == key) {
            return Err(FieldinkError::unknown_field(key));
        }
        self.activate(key.to_string())
    }

    /// Pointer pressed on the drawing surface.
    pub fn pointer_down(&mut self, p: Point) {
        if !self.is_closed() {
            self.surface.pointer_down(p);
        }
    }

    /// Pointer dragged on the drawing surface.
    pub fn pointer_move(&mut self, p: Point) {
        if !self.is_closed() {
            self.surface.pointer_move(p);
        }
    }

    /// Pointer released: a stroke that left ink makes the active field dirty.
    pub fn pointer_up(&mut self) {
        if self.is_closed() {
            return;
        }
        let inked = self.surface.pointer_up();
        if let CaptureState::Editing(key) = &self.state
            && inked
        {
            tracing::debug!(key = %key, "stroke captured");
            self.state = CaptureState::Dirty(key.clone());
        }
    }

    /// Discard the stroke buffer and return to editing the same field.
    pub fn clear(&mut self) {
        self.surface.clear();
        if let CaptureState::Dirty(key) = &self.state {
            self.state = CaptureState::Editing(key.clone());
        }
    }

    /// Commit the ink to the active field and move to the next unsigned field after it.
    ///
    /// When none is left, the full signature map is emitted to `sink` and the session closes.
    #[tracing::instrument(skip(self, sink))]
    pub fn commit_one(&mut self, sink: &mut dyn SignatureSink) -> FieldinkResult<CommitOutcome> {
        let key = self.dirty_key()?;
        let artifact = self.crop()?;
        self.signatures.insert(key.clone(), artifact);
        self.unemitted = true;

        match self.next_unsigned_after(&key) {
            Some(next) => {
                self.activate(next.clone())?;
                Ok(CommitOutcome::Advanced { next })
            }
            None => Ok(self.complete(sink)),
        }
    }

    /// Commit the ink to every field that is not signed yet, then emit and close.
    ///
    /// Fields that already carry a signature keep it, the active one included.
    #[tracing::instrument(skip(self, sink))]
    pub fn commit_all(&mut self, sink: &mut dyn SignatureSink) -> FieldinkResult<CommitOutcome> {
        self.dirty_key()?;
        let artifact = self.crop()?;

        let targets: Vec<String> = self
            .fields
            .iter()
            .map(|f| f.key().to_string())
            .filter(|k| !self.signatures.contains_key(k))
            .collect();
        for k in targets {
            self.signatures.insert(k, artifact.clone());
        }
        self.unemitted = true;
        Ok(self.complete(sink))
    }

    /// Stop capturing. Commits not yet emitted are flushed to `sink`; nothing is retracted.
    pub fn close(&mut self, sink: &mut dyn SignatureSink) {
        if self.is_closed() {
            return;
        }
        if self.unemitted {
            self.emit(sink);
        }
        self.surface.clear();
        self.state = CaptureState::Closed;
        tracing::debug!("signature session closed");
    }

    fn dirty_key(&self) -> FieldinkResult<String> {
        match &self.state {
            CaptureState::Dirty(k) => Ok(k.clone()),
            CaptureState::Editing(_) => Err(FieldinkError::EmptyStrokeCommit),
            CaptureState::Closed => Err(FieldinkError::SessionClosed),
        }
    }

    fn crop(&self) -> FieldinkResult<ImageArtifact> {
        let raster = self
            .surface
            .raster()
            .ok_or(FieldinkError::SurfaceNeverMounted)?;
        crop_to_artifact(raster)
    }

    fn complete(&mut self, sink: &mut dyn SignatureSink) -> CommitOutcome {
        let emitted = self.emit(sink);
        self.surface.clear();
        self.state = CaptureState::Closed;
        tracing::info!(emitted, "signature session complete");
        CommitOutcome::Completed { emitted }
    }

    fn emit(&mut self, sink: &mut dyn SignatureSink) -> usize {
        let map: BTreeMap<String, String> = self
            .signatures
            .iter()
            .map(|(k, a)| (k.clone(), a.to_data_uri()))
            .collect();
        sink.signatures_committed(&map);
        self.unemitted = false;
        map.len()
    }

    fn activate(&mut self, key: String) -> FieldinkResult<()> {
        let previous_page = self.active_field().map(DiscoveredField::page);
        let page = self
            .fields
            .iter()
            .find(|f| f.key() == key)
            .map(DiscoveredField::page)
            .ok_or_else(|| FieldinkError::unknown_field(key.clone()))?;

        self.surface.bind(&key)?;
        if let Some(from) = previous_page
            && from != page
        {
            self.notices.push_back(Notice::PageChanged {
                from,
                to: page,
                key: key.clone(),
            });
        }
        tracing::debug!(key = %key, page, "field active");
        self.state = CaptureState::Editing(key);
        Ok(())
    }

    fn first_unsigned(&self) -> Option<String> {
        self.fields
            .iter()
            .find(|f| !self.signatures.contains_key(f.key()))
            .map(|f| f.key().to_string())
    }

    fn next_unsigned_after(&self, key: &str) -> Option<String> {
        let idx = self.fields.iter().position(|f| f.key() == key)?;
        self.fields[idx + 1..]
            .iter()
            .find(|f| !self.signatures.contains_key(f.key()))
            .map(|f| f.key().to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/state.rs"]
mod tests;
