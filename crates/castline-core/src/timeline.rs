//! Event schedule and simulation clock.
//!
//! The timeline holds the absolute ticks at which something observable may
//! change: a buff expiring, a cooldown coming back, a server tick, a cast
//! finishing. The driver never advances by an arbitrary increment; it pops the
//! next wake-up and advances by exactly that delta, so no expiry boundary is
//! ever stepped over and no step is spent on an interval where nothing changes.
//!
//! Every resource re-arm goes through [`Timeline::arm_stacks`] or
//! [`Timeline::arm_ready`], which reset the resource and register its expiry in
//! one call.
//!
//! # Example
//!
//! ```
//! use castline_core::timeline::Timeline;
//! use castline_core::timer::TimedResource;
//!
//! let mut timeline = Timeline::new();
//! let mut swift = TimedResource::buff();
//! timeline.arm_stacks(&mut swift, 1000, 1);
//! timeline.push_event(300);
//!
//! assert_eq!(timeline.pop_next_delta(), Some(300));
//! timeline.advance(300);
//! assert_eq!(timeline.pop_next_delta(), Some(700));
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::timer::TimedResource;

/// Ordered, de-duplicated set of pending wake-ups plus the current tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeline {
    now: u64,
    events: BTreeSet<u64>,
}

impl Timeline {
    /// Creates an empty timeline at tick 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current tick.
    #[must_use]
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Schedules a wake-up `delta` ticks from now.
    ///
    /// A zero delta is ignored: whatever happens "now" is already being
    /// processed by the caller.
    pub fn push_event(&mut self, delta: u64) {
        if delta > 0 {
            self.events.insert(self.now + delta);
        }
    }

    /// Re-arms a buff and schedules its expiry.
    pub fn arm_stacks(&mut self, resource: &mut TimedResource, time: u64, stacks: u8) {
        resource.reset_stacks(time, stacks);
        self.push_event(time);
    }

    /// Re-arms a gate and schedules its expiry.
    pub fn arm_ready(&mut self, resource: &mut TimedResource, time: u64, ready: bool) {
        resource.reset_ready(time, ready);
        self.push_event(time);
    }

    /// Pops the next wake-up strictly after now and returns its distance.
    ///
    /// Entries at or before the current tick are stale (they were reached by a
    /// previous advance) and are discarded. Simultaneous events collapse into a
    /// single entry, so one advance settles all of them.
    pub fn pop_next_delta(&mut self) -> Option<u64> {
        while let Some(at) = self.events.pop_first() {
            if at > self.now {
                return Some(at - self.now);
            }
        }
        None
    }

    /// Returns the next wake-up strictly after now without removing it.
    #[must_use]
    pub fn peek_next(&self) -> Option<u64> {
        self.events.range(self.now + 1..).next().copied()
    }

    /// Moves the clock forward.
    pub fn advance(&mut self, delta: u64) {
        self.now += delta;
    }

    /// Number of pending wake-ups, stale ones included.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.events.len()
    }

    /// Drops all events and rewinds the clock to zero.
    pub fn clear(&mut self) {
        self.now = 0;
        self.events.clear();
    }
}
