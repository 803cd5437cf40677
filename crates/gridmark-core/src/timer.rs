#![forbid(unsafe_code)]

//! Explicit scheduled-event object.
//!
//! Components never spawn threads or sleep. When they need to act later they
//! arm a [`Timer`] and expose its [`deadline`](Timer::deadline); the host
//! schedules a callback for that instant and calls back in. Firing consumes
//! the timer, so a callback that arrives after `cancel` (or twice) is a no-op.

use std::time::{Duration, Instant};

/// A one-shot deadline that can be armed, cancelled and fired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timer {
    deadline: Option<Instant>,
}

impl Timer {
    /// A disarmed timer.
    #[must_use]
    pub const fn new() -> Self {
        Self { deadline: None }
    }

    /// Arm the timer to fire `delay` after `now`, replacing any prior deadline.
    pub fn arm_at(&mut self, now: Instant, delay: Duration) {
        self.deadline = Some(now + delay);
    }

    /// Disarm the timer. Calling this on a disarmed timer does nothing.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Whether the timer is armed.
    #[inline]
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// The instant the timer fires, if armed.
    #[inline]
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether the timer is armed and its deadline has passed.
    #[must_use]
    pub fn is_due_at(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    /// Time left until the deadline (zero once due), if armed.
    #[must_use]
    pub fn remaining_at(&self, now: Instant) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Fire the timer if due. Returns `true` exactly once per arming.
    pub fn fire_at(&mut self, now: Instant) -> bool {
        if self.is_due_at(now) {
            self.deadline = None;
            true
        } else {
            false
        }
    }
}
