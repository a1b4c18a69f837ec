use std::time::{Duration, Instant};

/// A restartable one-shot delay driven by the caller's clock.
///
/// Every [`arm`](Self::arm) pushes the deadline to `now + delay`, so a burst
/// of arms collapses into a single firing `delay` after the last one.
/// Nothing runs on its own: the owner polls [`fire`](Self::fire) from its
/// event loop and performs the action when it returns `true`.
#[derive(Clone, Debug)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub const fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the pending firing, if one is pending.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Disarm and report `true` once the deadline has passed.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
