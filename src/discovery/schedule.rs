use std::{cell::Cell, rc::Rc, time::Duration};

/// Bounded retry budget: at most `max_attempts` checks spaced `interval` apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryBudget {
    /// Maximum number of predicate checks.
    pub max_attempts: u32,
    /// Delay between consecutive checks.
    pub interval: Duration,
}

impl RetryBudget {
    /// Total time window covered by the budget.
    pub fn window(self) -> Duration {
        self.interval.saturating_mul(self.max_attempts)
    }
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            interval: Duration::from_millis(500),
        }
    }
}

/// Shared liveness flag checked by every scheduled continuation.
///
/// Clones observe the same flag. Once killed it stays dead; owners create a fresh flag per
/// session.
#[derive(Clone, Debug)]
pub struct Liveness {
    alive: Rc<Cell<bool>>,
}

impl Liveness {
    /// Create a live flag.
    pub fn new() -> Self {
        Self {
            alive: Rc::new(Cell::new(true)),
        }
    }

    /// Return `true` until [`Liveness::kill`] is called on any clone.
    pub fn is_alive(&self) -> bool {
        self.alive.get()
    }

    /// Mark the owner as torn down.
    pub fn kill(&self) {
        self.alive.set(false);
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of polling a [`RepeatUntil`] task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RepeatStatus {
    /// Not due yet, or the last check failed with attempts left; poll again at `until`.
    Waiting {
        /// Time of the next check.
        until: Duration,
    },
    /// The predicate held on attempt number `attempts`.
    Satisfied {
        /// Attempts consumed, including the successful one.
        attempts: u32,
    },
    /// Every attempt failed.
    Exhausted {
        /// Attempts consumed.
        attempts: u32,
    },
    /// The liveness flag was killed.
    Cancelled,
}

/// Cancellable "repeat until predicate or budget exhausted" task.
///
/// The task never sleeps itself: callers poll it with the current time and it reports when it next
/// wants to run, which keeps it deterministic under a fake clock.
#[derive(Clone, Debug)]
pub struct RepeatUntil {
    budget: RetryBudget,
    attempts: u32,
    next_at: Duration,
    liveness: Liveness,
    done: Option<RepeatStatus>,
}

impl RepeatUntil {
    /// Schedule the first check at `first_at`.
    pub fn new(budget: RetryBudget, first_at: Duration, liveness: Liveness) -> Self {
        Self {
            budget,
            attempts: 0,
            next_at: first_at,
            liveness,
            done: None,
        }
    }

    /// Attempts consumed so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Time of the next scheduled check, if the task is still pending.
    pub fn next_at(&self) -> Option<Duration> {
        self.done.is_none().then_some(self.next_at)
    }

    /// Run the predicate if due.
    ///
    /// The predicate is not called when the task is cancelled, finished, or not yet due.
    pub fn poll(&mut self, now: Duration, predicate: impl FnOnce() -> bool) -> RepeatStatus {
        if let Some(done) = self.done {
            return done;
        }
        if !self.liveness.is_alive() {
            return self.finish(RepeatStatus::Cancelled);
        }
        if now < self.next_at {
            return RepeatStatus::Waiting {
                until: self.next_at,
            };
        }

        self.attempts += 1;
        if predicate() {
            return self.finish(RepeatStatus::Satisfied {
                attempts: self.attempts,
            });
        }
        self.reschedule(now)
    }

    /// Re-arm a task whose predicate held but whose follow-up work came up empty.
    ///
    /// Counts as one more attempt against the budget.
    pub fn retry(&mut self, now: Duration) -> RepeatStatus {
        if !self.liveness.is_alive() {
            return self.finish(RepeatStatus::Cancelled);
        }
        self.done = None;
        self.attempts += 1;
        self.reschedule(now)
    }

    fn reschedule(&mut self, now: Duration) -> RepeatStatus {
        if self.attempts >= self.budget.max_attempts {
            return self.finish(RepeatStatus::Exhausted {
                attempts: self.attempts,
            });
        }
        self.next_at = now.saturating_add(self.budget.interval);
        RepeatStatus::Waiting {
            until: self.next_at,
        }
    }

    fn finish(&mut self, status: RepeatStatus) -> RepeatStatus {
        self.done = Some(status);
        status
    }
}

#[cfg(test)]
#[path = "../../tests/unit/discovery/schedule.rs"]
mod tests;
