use super::*;

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

fn budget(max_attempts: u32) -> RetryBudget {
    RetryBudget {
        max_attempts,
        interval: ms(100),
    }
}

#[test]
fn default_budget_covers_fifteen_seconds() {
    assert_eq!(RetryBudget::default().window(), Duration::from_secs(15));
}

#[test]
fn waits_until_first_check() {
    let mut task = RepeatUntil::new(budget(3), ms(50), Liveness::new());
    let mut called = false;
    let status = task.poll(ms(10), || {
        called = true;
        true
    });
    assert_eq!(status, RepeatStatus::Waiting { until: ms(50) });
    assert!(!called);
    assert_eq!(task.attempts(), 0);
}

#[test]
fn satisfied_on_third_attempt() {
    let mut task = RepeatUntil::new(budget(5), ms(0), Liveness::new());
    let mut now = ms(0);
    let mut checks = 0;
    let status = loop {
        let status = task.poll(now, || {
            checks += 1;
            checks == 3
        });
        match status {
            RepeatStatus::Waiting { until } => now = until,
            other => break other,
        }
    };
    assert_eq!(status, RepeatStatus::Satisfied { attempts: 3 });
    assert_eq!(now, ms(200));
    assert_eq!(task.next_at(), None);
}

#[test]
fn exhausts_after_budget() {
    let mut task = RepeatUntil::new(budget(2), ms(0), Liveness::new());
    assert_eq!(
        task.poll(ms(0), || false),
        RepeatStatus::Waiting { until: ms(100) }
    );
    assert_eq!(
        task.poll(ms(100), || false),
        RepeatStatus::Exhausted { attempts: 2 }
    );
    // Finished tasks never run the predicate again.
    assert_eq!(
        task.poll(ms(1_000), || panic!("must not run")),
        RepeatStatus::Exhausted { attempts: 2 }
    );
}

#[test]
fn killed_liveness_cancels_without_running_predicate() {
    let liveness = Liveness::new();
    let mut task = RepeatUntil::new(budget(5), ms(0), liveness.clone());
    liveness.kill();
    assert!(!liveness.is_alive());
    assert_eq!(
        task.poll(ms(0), || panic!("must not run")),
        RepeatStatus::Cancelled
    );
}

#[test]
fn retry_consumes_an_attempt() {
    let mut task = RepeatUntil::new(budget(2), ms(0), Liveness::new());
    assert_eq!(
        task.poll(ms(0), || true),
        RepeatStatus::Satisfied { attempts: 1 }
    );
    assert_eq!(task.retry(ms(40)), RepeatStatus::Exhausted { attempts: 2 });

    let mut roomy = RepeatUntil::new(budget(4), ms(0), Liveness::new());
    roomy.poll(ms(0), || true);
    assert_eq!(roomy.retry(ms(40)), RepeatStatus::Waiting { until: ms(140) });
    assert_eq!(roomy.next_at(), Some(ms(140)));
}
