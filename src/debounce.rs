use std::time::{Duration, Instant};

/// Settle-and-emit timer.
///
/// Every `push` replaces the pending value and restarts the quiet period;
/// `poll` hands the value out once the input has been quiet for `delay`.
/// The caller drives time, so the event loop can poll it on its tick and
/// tests can step it without sleeping.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<Pending<T>>,
}

#[derive(Debug)]
struct Pending<T> {
    value: T,
    deadline: Instant,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some(Pending {
            value,
            deadline: now + self.delay,
        });
    }

    pub fn poll(&mut self, now: Instant) -> Option<T> {
        let ready = self
            .pending
            .as_ref()
            .map(|pending| now >= pending.deadline)
            .unwrap_or(false);
        if !ready {
            return None;
        }
        self.pending.take().map(|pending| pending.value)
    }

    /// Emits the pending value immediately, skipping the rest of the wait.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|pending| pending.value)
    }

    /// Drops the pending value without emitting it. Returns whether a timer was armed.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|pending| pending.deadline)
    }
}
