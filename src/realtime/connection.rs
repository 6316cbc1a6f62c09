//! Reconnect state machine for the realtime channel.
//!
//! Drivers report socket events and ask the machine when to dial; the
//! machine owns the single retry deadline.

use std::time::Duration;

use web_time::Instant;

use crate::constants::RECONNECT_DELAY;

/// Where the channel is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Never started
    Idle,
    /// A dial is in progress
    Connecting,
    Connected,
    /// Lost the connection; dial again at `until`
    Retrying { until: Instant },
    /// Shut down for good
    Closed,
}

/// Coarse status for display, without the deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    Connecting,
    Connected,
    Reconnecting,
    Closed,
}

impl ChannelStatus {
    pub fn label(self) -> &'static str {
        match self {
            ChannelStatus::Connecting => "connecting",
            ChannelStatus::Connected => "connected",
            ChannelStatus::Reconnecting => "reconnecting",
            ChannelStatus::Closed => "closed",
        }
    }
}

/// Connection lifecycle with a fixed retry delay and unlimited retries.
#[derive(Debug, Clone)]
pub struct ReconnectMachine {
    state: ConnectionState,
    delay: Duration,
    attempts: u32,
}

impl Default for ReconnectMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconnectMachine {
    pub fn new() -> Self {
        Self::with_delay(RECONNECT_DELAY)
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            state: ConnectionState::Idle,
            delay,
            attempts: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn status(&self) -> ChannelStatus {
        match self.state {
            ConnectionState::Idle | ConnectionState::Connecting => ChannelStatus::Connecting,
            ConnectionState::Connected => ChannelStatus::Connected,
            ConnectionState::Retrying { .. } => ChannelStatus::Reconnecting,
            ConnectionState::Closed => ChannelStatus::Closed,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn is_closed(&self) -> bool {
        self.state == ConnectionState::Closed
    }

    /// Dials made so far, including the first.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Leave `Idle`. Returns true when the caller should dial now.
    pub fn start(&mut self) -> bool {
        if self.state != ConnectionState::Idle {
            return false;
        }
        self.begin_dial();
        true
    }

    fn begin_dial(&mut self) {
        self.attempts += 1;
        log::debug!("Realtime dial attempt {}", self.attempts);
        self.state = ConnectionState::Connecting;
    }

    /// The socket opened.
    pub fn on_open(&mut self) {
        if self.state == ConnectionState::Connecting {
            log::info!("Realtime channel connected");
            self.state = ConnectionState::Connected;
        }
    }

    /// The socket closed, errored, or the dial failed.
    ///
    /// Schedules one retry and returns its deadline. While a retry is already
    /// pending, or after [`close`](Self::close), nothing changes and `None`
    /// is returned.
    pub fn on_close(&mut self, now: Instant) -> Option<Instant> {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Connected => {
                let until = now + self.delay;
                log::warn!("Realtime channel lost, retrying in {:?}", self.delay);
                self.state = ConnectionState::Retrying { until };
                Some(until)
            }
            ConnectionState::Idle
            | ConnectionState::Retrying { .. }
            | ConnectionState::Closed => None,
        }
    }

    /// Returns true (and moves to `Connecting`) once the retry deadline has
    /// passed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.state {
            ConnectionState::Retrying { until } if now >= until => {
                self.begin_dial();
                true
            }
            _ => false,
        }
    }

    /// Fire the pending retry regardless of the clock, for drivers whose own
    /// timer already waited out the delay.
    pub fn retry_now(&mut self) -> bool {
        if matches!(self.state, ConnectionState::Retrying { .. }) {
            self.begin_dial();
            true
        } else {
            false
        }
    }

    /// Time left before the pending retry.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        match self.state {
            ConnectionState::Retrying { until } => Some(until.saturating_duration_since(now)),
            _ => None,
        }
    }

    /// Tear down; no dial happens afterwards.
    pub fn close(&mut self) {
        if self.state != ConnectionState::Closed {
            log::info!("Realtime channel closed");
        }
        self.state = ConnectionState::Closed;
    }
}

/// Owns the callback behind a pending host timer.
///
/// A fired callback is still running when the slot learns about it, so it is
/// parked and only dropped when the next one fires or the slot goes away.
/// Cancelling drops the armed callback at once and hands back the handle to
/// clear.
#[derive(Debug)]
pub struct TimerSlot<C> {
    armed: Option<(i32, C)>,
    spent: Option<C>,
}

impl<C> Default for TimerSlot<C> {
    fn default() -> Self {
        Self {
            armed: None,
            spent: None,
        }
    }
}

impl<C> TimerSlot<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `callback` alive until its timer fires or is cancelled. Returns
    /// the handle of a timer this one replaces.
    pub fn arm(&mut self, handle: i32, callback: C) -> Option<i32> {
        self.armed
            .replace((handle, callback))
            .map(|(previous, _)| previous)
    }

    /// The armed timer went off.
    pub fn fire(&mut self) {
        if let Some((_, callback)) = self.armed.take() {
            self.spent = Some(callback);
        }
    }

    /// Drop the armed callback; the caller clears the returned handle.
    pub fn cancel(&mut self) -> Option<i32> {
        self.armed.take().map(|(handle, _)| handle)
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }
}
