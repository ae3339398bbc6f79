use std::collections::VecDeque;
use std::time::Duration;

use crate::capture::surface::StrokeCaptureSurface;
use crate::discovery::adapter::{DiscoveredField, RenderedSurface};
use crate::discovery::schedule::Liveness;
use crate::discovery::service::{DiscoveryOpts, FieldDiscovery};
use crate::foundation::error::{FieldinkError, FieldinkResult};
use crate::session::state::{Notice, SignatureSession, SignatureSink};
use crate::store::values::FieldValueStore;
use crate::template::fingerprint::TemplateId;
use crate::template::model::Template;

/// Per-document owner of discovery and capture.
///
/// Holds exactly one discovery window and at most one signature session. Discovery state is never
/// shared across documents: a template identity change or a session close starts a fresh window
/// with a fresh liveness flag, and [`SigningController::teardown`] kills the flag so no scheduled
/// continuation mutates anything afterwards.
#[derive(Debug)]
pub struct SigningController {
    template: Template,
    opts: DiscoveryOpts,
    liveness: Liveness,
    discovery: FieldDiscovery,
    session: Option<SignatureSession>,
    notices: VecDeque<Notice>,
    mount_notice_sent: bool,
}

impl SigningController {
    /// Open a document and schedule discovery.
    pub fn open(template: Template, opts: DiscoveryOpts, now: Duration) -> Self {
        let liveness = Liveness::new();
        let discovery = FieldDiscovery::new(&template, opts, now, liveness.clone());
        Self {
            template,
            opts,
            liveness,
            discovery,
            session: None,
            notices: VecDeque::new(),
            mount_notice_sent: false,
        }
    }

    /// Identity of the open template.
    pub fn template_id(&self) -> TemplateId {
        self.discovery.template_id()
    }

    /// The open template.
    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Discovery window for the open template.
    pub fn discovery(&self) -> &FieldDiscovery {
        &self.discovery
    }

    /// Ordered signing list as currently known.
    pub fn ordered_fields(&self) -> &[DiscoveredField] {
        self.discovery.ordered_fields()
    }

    /// Swap in a (possibly) new template.
    ///
    /// Returns `true` when the identity changed and all discovery and session state was reset.
    /// The open session, if any, is dropped without emitting.
    pub fn set_template(&mut self, template: Template, now: Duration) -> bool {
        if template.id() == self.template_id() {
            return false;
        }
        tracing::debug!("template identity changed, resetting discovery and session");
        self.template = template;
        self.session = None;
        self.restart_discovery(now);
        true
    }

    /// Advance discovery and hand the latest ordered list to the session.
    pub fn tick(&mut self, surface: &mut dyn RenderedSurface, now: Duration) -> Option<Duration> {
        let next = self.discovery.tick(surface, now);
        if let Some(session) = self.session.as_mut() {
            session.refresh_fields(self.discovery.ordered_fields());
        }
        next
    }

    /// Start capturing on `surface`, treating image values in `existing` as already signed.
    ///
    /// An unmounted surface queues a single [`Notice::SurfaceNeverMounted`] and fails; the caller
    /// may retry once the surface has a size. A session that has not closed yet must be closed
    /// with [`SigningController::close_session`] first, so its commits reach a sink.
    pub fn start_capture(
        &mut self,
        surface: StrokeCaptureSurface,
        existing: &FieldValueStore,
    ) -> FieldinkResult<&mut SignatureSession> {
        if !self.liveness.is_alive() {
            return Err(FieldinkError::SessionClosed);
        }
        if self.session.as_ref().is_some_and(|s| !s.is_closed()) {
            return Err(FieldinkError::SessionInProgress);
        }
        let signed = existing.images();
        match SignatureSession::open(self.discovery.ordered_fields(), &signed, surface) {
            Ok(session) => {
                self.mount_notice_sent = false;
                Ok(self.session.insert(session))
            }
            Err(FieldinkError::SurfaceNeverMounted) => {
                if !self.mount_notice_sent {
                    self.notices.push_back(Notice::SurfaceNeverMounted);
                    self.mount_notice_sent = true;
                }
                tracing::warn!("capture surface not mounted, capture session not started");
                Err(FieldinkError::SurfaceNeverMounted)
            }
            Err(err) => Err(err),
        }
    }

    /// The open session.
    pub fn session(&self) -> Option<&SignatureSession> {
        self.session.as_ref()
    }

    /// The open session, mutably.
    pub fn session_mut(&mut self) -> Option<&mut SignatureSession> {
        self.session.as_mut()
    }

    /// Close the session (flushing unemitted commits to `sink`) and restart discovery.
    pub fn close_session(&mut self, sink: &mut dyn SignatureSink, now: Duration) {
        if let Some(mut session) = self.session.take() {
            session.close(sink);
        }
        self.restart_discovery(now);
    }

    /// Drop a session that finished on its own (after its final commit).
    ///
    /// Returns `true` if one was dropped; discovery restarts so the next session sees fresh
    /// fields.
    pub fn reap_finished(&mut self, now: Duration) -> bool {
        if self.session.as_ref().is_some_and(SignatureSession::is_closed) {
            self.session = None;
            self.restart_discovery(now);
            return true;
        }
        false
    }

    /// Host view is going away: flush the session and stop every scheduled continuation.
    pub fn teardown(&mut self, sink: &mut dyn SignatureSink) {
        if let Some(mut session) = self.session.take() {
            session.close(sink);
        }
        self.liveness.kill();
    }

    /// Return `true` until [`SigningController::teardown`] runs.
    pub fn is_alive(&self) -> bool {
        self.liveness.is_alive()
    }

    /// Pop the oldest pending notice, controller notices first.
    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notices
            .pop_front()
            .or_else(|| self.session.as_mut().and_then(SignatureSession::take_notice))
    }

    fn restart_discovery(&mut self, now: Duration) {
        self.liveness.kill();
        self.liveness = Liveness::new();
        self.discovery
            .restart(&self.template, now, self.liveness.clone());
        self.mount_notice_sent = false;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/controller.rs"]
mod tests;
