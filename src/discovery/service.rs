use std::collections::BTreeSet;
use std::time::Duration;

use crate::discovery::adapter::{DiscoveredField, RenderedSurface};
use crate::discovery::schedule::{Liveness, RepeatStatus, RepeatUntil, RetryBudget};
use crate::foundation::clock::Clock;
use crate::foundation::env;
use crate::template::fingerprint::TemplateId;
use crate::template::model::Template;

/// Timing configuration for field discovery.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiscoveryOpts {
    /// Delay after opening before the first look at the surface, so it can mount.
    pub mount_settle: Duration,
    /// Polling budget while waiting for every page to render.
    pub budget: RetryBudget,
    /// Settle delay before scanning page 1.
    pub page_settle_base: Duration,
    /// Extra settle delay per additional page, since later pages render slower.
    pub page_settle_step: Duration,
}

impl Default for DiscoveryOpts {
    fn default() -> Self {
        Self {
            mount_settle: Duration::from_millis(1000),
            budget: RetryBudget::default(),
            page_settle_base: Duration::from_millis(250),
            page_settle_step: Duration::from_millis(50),
        }
    }
}

impl DiscoveryOpts {
    /// Defaults overridden by `FIELDINK_DISCOVERY_ATTEMPTS`, `FIELDINK_DISCOVERY_INTERVAL_MS` and
    /// `FIELDINK_MOUNT_SETTLE_MS`.
    pub fn from_env() -> Self {
        let mut opts = Self::default();
        if let Some(n) = env::positive_var::<u32>("FIELDINK_DISCOVERY_ATTEMPTS") {
            opts.budget.max_attempts = n;
        }
        if let Some(d) = env::millis_var("FIELDINK_DISCOVERY_INTERVAL_MS") {
            opts.budget.interval = d;
        }
        if let Some(d) = env::millis_var("FIELDINK_MOUNT_SETTLE_MS") {
            opts.mount_settle = d;
        }
        opts
    }

    /// Settle delay before scanning 1-based `page`.
    pub fn page_settle(&self, page: u32) -> Duration {
        self.page_settle_base
            .saturating_add(self.page_settle_step.saturating_mul(page.saturating_sub(1)))
    }
}

/// How a discovery window ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiscoveryOutcome {
    /// A full scan found at least one rendered field.
    Completed {
        /// Number of distinct rendered fields merged.
        rendered: usize,
    },
    /// The retry budget ran out without rendered matches; the list stays declared-only.
    TimedOut,
    /// The owning view was torn down.
    Cancelled,
}

#[derive(Clone, Debug)]
enum Phase {
    Polling(RepeatUntil),
    Scanning {
        poller: RepeatUntil,
        page: u32,
        ready_at: Duration,
    },
    Finished(DiscoveryOutcome),
}

/// Owns the ordered signing list for one open document.
///
/// Seeded with every declared signature field, then refined from the render surface during one
/// bounded polling window. Nothing here fails or blocks: callers [`FieldDiscovery::tick`] it
/// whenever time passes and read [`FieldDiscovery::ordered_fields`] as an eventually consistent
/// view until the window ends.
#[derive(Clone, Debug)]
pub struct FieldDiscovery {
    template_id: TemplateId,
    page_count: u32,
    opts: DiscoveryOpts,
    liveness: Liveness,
    fields: Vec<DiscoveredField>,
    rendered: BTreeSet<String>,
    phase: Phase,
}

impl FieldDiscovery {
    /// Seed declared signature fields and schedule the first poll after the mount settle delay.
    pub fn new(template: &Template, opts: DiscoveryOpts, now: Duration, liveness: Liveness) -> Self {
        let first_at = now.saturating_add(opts.mount_settle);
        let mut svc = Self {
            template_id: template.id(),
            page_count: template.pages,
            opts,
            fields: Vec::new(),
            rendered: BTreeSet::new(),
            phase: Phase::Polling(RepeatUntil::new(opts.budget, first_at, liveness.clone())),
            liveness,
        };
        svc.seed(template);
        svc
    }

    /// Drop all discovery state and start a new window for `template`.
    pub fn restart(&mut self, template: &Template, now: Duration, liveness: Liveness) {
        *self = Self::new(template, self.opts, now, liveness);
    }

    fn seed(&mut self, template: &Template) {
        self.fields = template
            .signature_fields()
            .cloned()
            .map(DiscoveredField::declared)
            .collect();
        self.sort();
    }

    /// Identity of the template this window was seeded from.
    pub fn template_id(&self) -> TemplateId {
        self.template_id
    }

    /// Current ordered field list, sorted by page then `y`.
    pub fn ordered_fields(&self) -> &[DiscoveredField] {
        &self.fields
    }

    /// Outcome once the window has ended.
    pub fn outcome(&self) -> Option<DiscoveryOutcome> {
        match &self.phase {
            Phase::Finished(o) => Some(*o),
            _ => None,
        }
    }

    /// Return `true` once the list is frozen.
    pub fn is_finished(&self) -> bool {
        self.outcome().is_some()
    }

    /// Time at which the next tick has work to do.
    pub fn next_wakeup(&self) -> Option<Duration> {
        match &self.phase {
            Phase::Polling(p) => p.next_at(),
            Phase::Scanning { ready_at, .. } => Some(*ready_at),
            Phase::Finished(_) => None,
        }
    }

    /// Advance discovery to `now`. Returns the next wakeup time, or `None` once finished.
    #[tracing::instrument(skip(self, surface), fields(page_count = self.page_count))]
    pub fn tick(&mut self, surface: &mut dyn RenderedSurface, now: Duration) -> Option<Duration> {
        if !self.liveness.is_alive() && !self.is_finished() {
            tracing::debug!("discovery cancelled by teardown");
            self.phase = Phase::Finished(DiscoveryOutcome::Cancelled);
        }

        loop {
            let phase = std::mem::replace(
                &mut self.phase,
                Phase::Finished(DiscoveryOutcome::Cancelled),
            );
            let (next, again) = self.step(phase, surface, now);
            self.phase = next;
            if !again {
                break;
            }
        }
        self.next_wakeup()
    }

    // Returns the next phase and whether it may make progress at the same `now`.
    fn step(
        &mut self,
        phase: Phase,
        surface: &mut dyn RenderedSurface,
        now: Duration,
    ) -> (Phase, bool) {
        match phase {
            Phase::Finished(o) => (Phase::Finished(o), false),
            Phase::Polling(mut poller) => {
                let pages = self.page_count;
                match poller.poll(now, || surface.rendered_page_count() >= pages) {
                    RepeatStatus::Waiting { .. } => (Phase::Polling(poller), false),
                    RepeatStatus::Satisfied { attempts } => {
                        tracing::debug!(attempts, "all pages rendered, scanning");
                        surface.bring_into_view(1);
                        let ready_at = now.saturating_add(self.opts.page_settle(1));
                        (
                            Phase::Scanning {
                                poller,
                                page: 1,
                                ready_at,
                            },
                            true,
                        )
                    }
                    RepeatStatus::Exhausted { attempts } => (self.give_up(attempts), false),
                    RepeatStatus::Cancelled => {
                        (Phase::Finished(DiscoveryOutcome::Cancelled), false)
                    }
                }
            }
            Phase::Scanning {
                mut poller,
                page,
                ready_at,
            } => {
                if now < ready_at {
                    return (
                        Phase::Scanning {
                            poller,
                            page,
                            ready_at,
                        },
                        false,
                    );
                }
                self.scan_page(surface, page);

                if page < self.page_count {
                    let next = page + 1;
                    surface.bring_into_view(next);
                    let ready_at = now.saturating_add(self.opts.page_settle(next));
                    return (
                        Phase::Scanning {
                            poller,
                            page: next,
                            ready_at,
                        },
                        true,
                    );
                }

                if !self.rendered.is_empty() {
                    let rendered = self.rendered.len();
                    tracing::debug!(rendered, fields = self.fields.len(), "discovery complete");
                    return (
                        Phase::Finished(DiscoveryOutcome::Completed { rendered }),
                        false,
                    );
                }
                match poller.retry(now) {
                    RepeatStatus::Exhausted { attempts } => (self.give_up(attempts), false),
                    RepeatStatus::Cancelled => {
                        (Phase::Finished(DiscoveryOutcome::Cancelled), false)
                    }
                    _ => (Phase::Polling(poller), false),
                }
            }
        }
    }

    fn give_up(&self, attempts: u32) -> Phase {
        tracing::warn!(
            attempts,
            declared = self.fields.len(),
            "render surface produced no signature fields, using declared fields only"
        );
        Phase::Finished(DiscoveryOutcome::TimedOut)
    }

    #[tracing::instrument(skip(self, surface))]
    fn scan_page(&mut self, surface: &dyn RenderedSurface, page: u32) {
        for found in surface.list_rendered_fields(page) {
            self.merge(found);
        }
        self.sort();
    }

    // Merge by key: rendered geometry replaces the declared placeholder; keys stay unique.
    fn merge(&mut self, found: DiscoveredField) {
        let key = found.key().to_string();
        match self.fields.iter_mut().find(|f| f.key() == key) {
            Some(existing) => *existing = found,
            None => self.fields.push(found),
        }
        if self.rendered.insert(key.clone()) {
            tracing::debug!(key = %key, "rendered field merged");
        }
    }

    fn sort(&mut self) {
        self.fields.sort_by(|a, b| a.spec.order_cmp(&b.spec));
    }

    /// Drive the window to its end, sleeping on `clock` between ticks.
    pub fn run_to_end(
        &mut self,
        surface: &mut dyn RenderedSurface,
        clock: &dyn Clock,
    ) -> DiscoveryOutcome {
        while let Some(at) = self.tick(surface, clock.now()) {
            clock.sleep_until(at);
        }
        self.outcome().unwrap_or(DiscoveryOutcome::Cancelled)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/discovery/service.rs"]
mod tests;
