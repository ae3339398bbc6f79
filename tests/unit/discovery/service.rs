use std::collections::BTreeMap;

use super::*;
use crate::discovery::adapter::FieldOrigin;
use crate::foundation::clock::ManualClock;
use crate::template::model::{FieldSpec, FieldType, Position};

fn spec(key: &str, ty: FieldType, y: f64, page: Option<u32>) -> FieldSpec {
    FieldSpec {
        key: key.to_string(),
        field_type: ty,
        position: Position { x: 10.0, y },
        width: 100.0,
        height: 30.0,
        page,
    }
}

fn template() -> Template {
    let mut fields = BTreeMap::new();
    for f in [
        spec("sig_b", FieldType::Signature, 600.0, None),
        spec("sig_a", FieldType::Signature, 200.0, None),
        spec("sig_c", FieldType::SignatureImage, 842.0 + 100.0, None),
        spec("name", FieldType::Text, 50.0, None),
    ] {
        fields.insert(f.key.clone(), f);
    }
    Template { pages: 2, fields }
}

fn rendered(key: &str, page: u32, y: f64) -> DiscoveredField {
    DiscoveredField {
        spec: spec(key, FieldType::Signature, y, Some(page)),
        origin: FieldOrigin::Rendered,
        pixel_bounds: None,
    }
}

/// Surface with a scripted page count and scripted rendered fields.
#[derive(Default)]
struct ScriptedSurface {
    pages: u32,
    fields: Vec<DiscoveredField>,
    viewed: Vec<u32>,
    count_checks: std::cell::Cell<u32>,
}

impl RenderedSurface for ScriptedSurface {
    fn rendered_page_count(&self) -> u32 {
        self.count_checks.set(self.count_checks.get() + 1);
        self.pages
    }

    fn bring_into_view(&mut self, page: u32) {
        self.viewed.push(page);
    }

    fn list_rendered_fields(&self, page: u32) -> Vec<DiscoveredField> {
        self.fields
            .iter()
            .filter(|f| f.page() == page)
            .cloned()
            .collect()
    }
}

fn keys(svc: &FieldDiscovery) -> Vec<&str> {
    svc.ordered_fields().iter().map(|f| f.key()).collect()
}

fn opts() -> DiscoveryOpts {
    DiscoveryOpts {
        mount_settle: Duration::from_millis(1000),
        budget: RetryBudget {
            max_attempts: 30,
            interval: Duration::from_millis(500),
        },
        page_settle_base: Duration::from_millis(200),
        page_settle_step: Duration::from_millis(100),
    }
}

#[test]
fn seeds_declared_signature_fields_in_order() {
    let svc = FieldDiscovery::new(&template(), opts(), Duration::ZERO, Liveness::new());
    assert_eq!(keys(&svc), vec!["sig_a", "sig_b", "sig_c"]);
    assert!(
        svc.ordered_fields()
            .iter()
            .all(|f| f.origin == FieldOrigin::Declared)
    );
    assert_eq!(svc.next_wakeup(), Some(Duration::from_millis(1000)));
}

#[test]
fn page_settle_grows_with_page_index() {
    let o = opts();
    assert_eq!(o.page_settle(1), Duration::from_millis(200));
    assert_eq!(o.page_settle(3), Duration::from_millis(400));
}

#[test]
fn does_not_touch_surface_before_mount_settle() {
    let mut svc = FieldDiscovery::new(&template(), opts(), Duration::ZERO, Liveness::new());
    let mut surface = ScriptedSurface::default();
    let next = svc.tick(&mut surface, Duration::from_millis(999));
    assert_eq!(next, Some(Duration::from_millis(1000)));
    assert_eq!(surface.count_checks.get(), 0);
}

#[test]
fn rendered_geometry_wins_and_new_fields_are_appended() {
    let mut svc = FieldDiscovery::new(&template(), opts(), Duration::ZERO, Liveness::new());
    let mut surface = ScriptedSurface {
        pages: 2,
        fields: vec![
            rendered("sig_b", 1, 100.0),
            rendered("sig_extra", 2, 10.0),
        ],
        ..Default::default()
    };
    let clock = ManualClock::new();

    let outcome = svc.run_to_end(&mut surface, &clock);
    assert_eq!(outcome, DiscoveryOutcome::Completed { rendered: 2 });
    assert_eq!(keys(&svc), vec!["sig_b", "sig_a", "sig_extra", "sig_c"]);
    assert_eq!(svc.ordered_fields()[0].origin, FieldOrigin::Rendered);
    assert_eq!(surface.viewed, vec![1, 2]);
    // mount settle + page 1 settle + page 2 settle.
    assert_eq!(clock.now(), Duration::from_millis(1000 + 200 + 300));
}

#[test]
fn waits_for_all_pages_before_scanning() {
    let mut svc = FieldDiscovery::new(&template(), opts(), Duration::ZERO, Liveness::new());
    let mut surface = ScriptedSurface {
        pages: 1,
        fields: vec![rendered("sig_a", 1, 150.0)],
        ..Default::default()
    };

    let next = svc.tick(&mut surface, Duration::from_millis(1000));
    assert_eq!(next, Some(Duration::from_millis(1500)));
    assert!(surface.viewed.is_empty());

    surface.pages = 2;
    let next = svc.tick(&mut surface, Duration::from_millis(1500));
    assert_eq!(next, Some(Duration::from_millis(1700)));
    assert_eq!(surface.viewed, vec![1]);
    assert!(!svc.is_finished());
}

#[test]
fn exhausted_budget_leaves_declared_only_fields() {
    let mut svc = FieldDiscovery::new(&template(), opts(), Duration::ZERO, Liveness::new());
    let before: Vec<DiscoveredField> = svc.ordered_fields().to_vec();
    let mut surface = ScriptedSurface::default();
    let clock = ManualClock::new();

    assert_eq!(
        svc.run_to_end(&mut surface, &clock),
        DiscoveryOutcome::TimedOut
    );
    assert_eq!(svc.ordered_fields(), before.as_slice());
    assert_eq!(surface.count_checks.get(), 30);
    // mount settle + 29 intervals.
    assert_eq!(clock.now(), Duration::from_millis(1000 + 29 * 500));
}

#[test]
fn zero_match_scans_consume_the_budget() {
    let mut svc = FieldDiscovery::new(&template(), opts(), Duration::ZERO, Liveness::new());
    let mut surface = ScriptedSurface {
        pages: 2,
        ..Default::default()
    };
    let clock = ManualClock::new();

    assert_eq!(
        svc.run_to_end(&mut surface, &clock),
        DiscoveryOutcome::TimedOut
    );
    assert_eq!(keys(&svc), vec!["sig_a", "sig_b", "sig_c"]);
    assert!(surface.viewed.len() >= 2);
}

#[test]
fn teardown_stops_all_mutation() {
    let liveness = Liveness::new();
    let mut svc = FieldDiscovery::new(&template(), opts(), Duration::ZERO, liveness.clone());
    let mut surface = ScriptedSurface {
        pages: 2,
        fields: vec![rendered("sig_new", 1, 5.0)],
        ..Default::default()
    };

    liveness.kill();
    assert_eq!(svc.tick(&mut surface, Duration::from_secs(60)), None);
    assert_eq!(svc.outcome(), Some(DiscoveryOutcome::Cancelled));
    assert_eq!(keys(&svc), vec!["sig_a", "sig_b", "sig_c"]);
    assert_eq!(surface.count_checks.get(), 0);
}

#[test]
fn finished_list_is_frozen() {
    let mut svc = FieldDiscovery::new(&template(), opts(), Duration::ZERO, Liveness::new());
    let mut surface = ScriptedSurface {
        pages: 2,
        fields: vec![rendered("sig_a", 1, 150.0)],
        ..Default::default()
    };
    let clock = ManualClock::new();
    svc.run_to_end(&mut surface, &clock);

    surface.fields.push(rendered("late", 1, 1.0));
    assert_eq!(svc.tick(&mut surface, clock.now() + Duration::from_secs(5)), None);
    assert!(!keys(&svc).contains(&"late"));
}

#[test]
fn restart_clears_state_and_counters() {
    let mut svc = FieldDiscovery::new(&template(), opts(), Duration::ZERO, Liveness::new());
    let mut surface = ScriptedSurface {
        pages: 2,
        fields: vec![rendered("sig_extra", 1, 5.0)],
        ..Default::default()
    };
    svc.run_to_end(&mut surface, &ManualClock::new());
    assert!(keys(&svc).contains(&"sig_extra"));

    let mut other = template();
    other.fields.remove("sig_c");
    svc.restart(&other, Duration::from_secs(100), Liveness::new());
    assert_eq!(keys(&svc), vec!["sig_a", "sig_b"]);
    assert!(!svc.is_finished());
    assert_eq!(svc.template_id(), other.id());
    assert_eq!(svc.next_wakeup(), Some(Duration::from_millis(101_000)));
}

#[test]
fn sorting_is_idempotent() {
    let mut svc = FieldDiscovery::new(&template(), opts(), Duration::ZERO, Liveness::new());
    let mut surface = ScriptedSurface {
        pages: 2,
        fields: vec![rendered("z", 1, 0.0), rendered("sig_c", 2, 5.0)],
        ..Default::default()
    };
    svc.run_to_end(&mut surface, &ManualClock::new());
    let mut resorted = svc.ordered_fields().to_vec();
    resorted.sort_by(|a, b| a.spec.order_cmp(&b.spec));
    assert_eq!(resorted.as_slice(), svc.ordered_fields());
}
