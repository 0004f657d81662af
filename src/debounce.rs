use std::time::{Duration, Instant};

use tracing::trace;

/// Trailing-edge debounce over a single pending value.
///
/// `schedule` replaces whatever is pending and restarts the quiet period,
/// so of a rapid burst of values only the last one is ever committed, and
/// only once `delay` has elapsed with no further schedule. A canceled or
/// superseded value never fires. Time is passed in by the caller, which
/// keeps the contract checkable without sleeping.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Debouncer {
            delay,
            pending: None,
        }
    }

    /// Replaces any pending value and moves the deadline to `now + delay`.
    pub fn schedule(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.delay));
    }

    /// Drops the pending value, if any. Canceling an idle debouncer is a
    /// no-op.
    pub fn cancel(&mut self) {
        if self.pending.take().is_some() {
            trace!("Canceled pending debounce commit");
        }
    }

    /// Commits and returns the pending value iff its quiet period has
    /// elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((_, deadline)) if now >= *deadline => {
                self.pending.take().map(|(value, _)| value)
            }
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
