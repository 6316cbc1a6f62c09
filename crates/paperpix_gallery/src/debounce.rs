//! Last-value-wins debouncing of high-frequency input.
//!
//! The debouncer owns its single pending value and the deadline after which it
//! fires. Pushing a new value replaces the pending one and restarts the quiet
//! period, so only the final value before the quiet period takes effect.

use std::time::Duration;
use web_time::Instant;

/// Coalesces rapid input into at most one pending value.
#[derive(Debug)]
pub struct Debouncer<T> {
    /// Quiet period required before the pending value fires.
    delay: Duration,

    /// Pending value and the instant it was last pushed.
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    /// Default quiet period for slider input (20 ms).
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(20);

    /// Smallest quiet period accepted; shorter delays are raised to this.
    pub const MIN_DELAY: Duration = Duration::from_millis(15);

    /// Create a debouncer with the default delay.
    pub fn new() -> Self {
        Self::with_delay(Self::DEFAULT_DELAY)
    }

    /// Create a debouncer with a custom delay (at least [`Self::MIN_DELAY`]).
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: delay.max(Self::MIN_DELAY),
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Replace the pending value and restart the quiet period.
    pub fn push(&mut self, value: T) {
        self.push_at(value, Instant::now());
    }

    /// Like [`Self::push`] with an explicit timestamp.
    pub fn push_at(&mut self, value: T, now: Instant) {
        if self.pending.is_some() {
            log::trace!("Debounce: replacing pending value");
        }
        self.pending = Some((value, now));
    }

    /// Take the pending value if its quiet period has elapsed.
    pub fn poll(&mut self) -> Option<T> {
        self.poll_at(Instant::now())
    }

    /// Like [`Self::poll`] with an explicit timestamp.
    pub fn poll_at(&mut self, now: Instant) -> Option<T> {
        let (_, pushed_at) = self.pending.as_ref()?;
        if now.saturating_duration_since(*pushed_at) < self.delay {
            return None;
        }
        self.pending.take().map(|(value, _)| value)
    }

    /// Time left until the pending value fires, if any.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        let (_, pushed_at) = self.pending.as_ref()?;
        Some(
            self.delay
                .saturating_sub(now.saturating_duration_since(*pushed_at)),
        )
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Take the pending value immediately, ignoring the quiet period.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }

    /// Drop the pending value without firing it.
    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

impl<T> Default for Debouncer<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let mut debouncer: Debouncer<u32> = Debouncer::new();
        assert!(!debouncer.is_pending());
        assert_eq!(debouncer.poll(), None);
        assert_eq!(debouncer.delay(), Duration::from_millis(20));
    }

    #[test]
    fn test_fires_after_quiet_period() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new();
        debouncer.push_at(40, start);

        assert_eq!(debouncer.poll_at(start + Duration::from_millis(5)), None);
        assert_eq!(debouncer.poll_at(start + Duration::from_millis(20)), Some(40));
        assert!(!debouncer.is_pending());
        assert_eq!(debouncer.poll_at(start + Duration::from_millis(50)), None);
    }

    #[test]
    fn test_last_value_wins() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new();
        debouncer.push_at(10, start);
        debouncer.push_at(20, start + Duration::from_millis(10));
        debouncer.push_at(30, start + Duration::from_millis(19));

        // quiet period restarts at the last push
        assert_eq!(debouncer.poll_at(start + Duration::from_millis(25)), None);
        assert_eq!(debouncer.poll_at(start + Duration::from_millis(39)), Some(30));
    }

    #[test]
    fn test_minimum_delay() {
        let debouncer: Debouncer<()> = Debouncer::with_delay(Duration::from_millis(1));
        assert_eq!(debouncer.delay(), Debouncer::<()>::MIN_DELAY);
    }

    #[test]
    fn test_remaining() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new();
        assert_eq!(debouncer.remaining(start), None);
        debouncer.push_at(1, start);
        assert_eq!(
            debouncer.remaining(start + Duration::from_millis(5)),
            Some(Duration::from_millis(15))
        );
    }

    #[test]
    fn test_cancel_and_flush() {
        let mut debouncer = Debouncer::new();
        debouncer.push(1);
        debouncer.cancel();
        assert_eq!(debouncer.flush(), None);

        debouncer.push(2);
        assert_eq!(debouncer.flush(), Some(2));
    }
}
