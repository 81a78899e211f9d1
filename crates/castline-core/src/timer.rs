//! Countdown primitive behind every buff, cooldown, proc and gauge.
//!
//! A [`TimedResource`] carries three pieces of state: the ticks left until it
//! expires, a stack count and a ready flag. Two usage patterns share the type:
//!
//! - **Cooldown gate**: `ready` means the action may be used again. Armed with
//!   [`TimedResource::reset_ready`]`(cd, false)`, it flips back to ready when
//!   the countdown reaches zero.
//! - **Buff / gauge**: `stacks > 0` means the effect is active. Armed with
//!   [`TimedResource::reset_stacks`]`(duration, n)`, its stacks drop to zero
//!   on expiry.
//!
//! # Invariant
//!
//! `remaining == 0` implies `ready || stacks == 0`. The update rule is the
//! only thing that maintains it; nothing outside this module writes fields.

use serde::{Deserialize, Serialize};

/// A countdown with a stack count and a ready flag.
///
/// # Example
///
/// ```
/// use castline_core::timer::TimedResource;
///
/// let mut cooldown = TimedResource::cooldown();
/// assert!(cooldown.is_ready());
///
/// cooldown.reset_ready(6000, false);
/// cooldown.update(5999);
/// assert!(!cooldown.is_ready());
/// cooldown.update(1);
/// assert!(cooldown.is_ready());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimedResource {
    remaining: u64,
    stacks: u8,
    ready: bool,
}

impl TimedResource {
    /// Creates an idle buff: no time left, no stacks.
    #[must_use]
    pub const fn buff() -> Self {
        Self {
            remaining: 0,
            stacks: 0,
            ready: false,
        }
    }

    /// Creates a cooldown that starts ready.
    #[must_use]
    pub const fn cooldown() -> Self {
        Self {
            remaining: 0,
            stacks: 0,
            ready: true,
        }
    }

    /// Re-arms the resource as a buff with `stacks` for `time` ticks.
    ///
    /// The ready flag is cleared; buffs never read it.
    pub fn reset_stacks(&mut self, time: u64, stacks: u8) {
        self.remaining = time;
        self.stacks = stacks;
        self.ready = false;
    }

    /// Re-arms the resource as a gate for `time` ticks.
    ///
    /// Stacks are cleared; gates never read them.
    pub fn reset_ready(&mut self, time: u64, ready: bool) {
        self.remaining = time;
        self.stacks = 0;
        self.ready = ready;
    }

    /// Zeroes the countdown without firing the expiry transition.
    pub fn clear(&mut self) {
        self.remaining = 0;
        self.stacks = 0;
    }

    /// Counts `elapsed` ticks off the remaining time, clamped at zero.
    ///
    /// The expiry transition (`ready = true`, `stacks = 0`) fires on the update
    /// that crosses zero and never again until the resource is re-armed. A
    /// resource that is already at zero is not touched, so a gate that was
    /// consumed (ready set back to false at zero time) stays consumed.
    pub fn update(&mut self, elapsed: u64) {
        if self.remaining == 0 {
            return;
        }
        self.remaining = self.remaining.saturating_sub(elapsed);
        if self.remaining == 0 {
            self.ready = true;
            self.stacks = 0;
        }
    }

    /// Decrements the stack count by one, expiring the buff at zero.
    pub fn consume_stack(&mut self) {
        if self.stacks <= 1 {
            self.clear();
        } else {
            self.stacks -= 1;
        }
    }

    /// Marks a fired gate as consumed without re-arming it.
    pub fn consume_ready(&mut self) {
        self.ready = false;
    }

    /// Ticks left before expiry.
    #[must_use]
    pub const fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Current stack count.
    #[must_use]
    pub const fn stacks(&self) -> u8 {
        self.stacks
    }

    /// Whether the gate is open.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.ready
    }

    /// Whether the buff has any stacks.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.stacks > 0
    }

    /// Checks the zero-time invariant.
    #[must_use]
    pub const fn holds_invariant(&self) -> bool {
        self.remaining > 0 || self.ready || self.stacks == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod buff_tests {
        use super::*;

        #[test]
        fn stacks_drop_exactly_at_expiry() {
            let mut buff = TimedResource::buff();
            buff.reset_stacks(1500, 3);

            buff.update(1499);
            assert_eq!(buff.stacks(), 3);
            assert_eq!(buff.remaining(), 1);

            buff.update(1);
            assert_eq!(buff.stacks(), 0);
            assert_eq!(buff.remaining(), 0);
        }

        #[test]
        fn overshoot_clamps_at_zero() {
            let mut buff = TimedResource::buff();
            buff.reset_stacks(100, 1);
            buff.update(250);
            assert_eq!(buff.remaining(), 0);
            assert!(!buff.is_active());
            assert!(buff.holds_invariant());
        }

        #[test]
        fn consume_stack_expires_last_charge() {
            let mut triple = TimedResource::buff();
            triple.reset_stacks(1500, 3);
            triple.consume_stack();
            triple.consume_stack();
            assert_eq!(triple.stacks(), 1);
            assert_eq!(triple.remaining(), 1500);
            triple.consume_stack();
            assert!(!triple.is_active());
            assert_eq!(triple.remaining(), 0);
        }
    }

    mod gate_tests {
        use super::*;

        #[test]
        fn cooldown_starts_ready() {
            assert!(TimedResource::cooldown().is_ready());
            assert!(!TimedResource::buff().is_ready());
        }

        #[test]
        fn expiry_fires_once() {
            let mut gate = TimedResource::buff();
            gate.reset_ready(10, false);
            gate.update(10);
            assert!(gate.is_ready());

            gate.consume_ready();
            gate.update(5);
            assert!(!gate.is_ready(), "an already expired gate must not re-fire");
        }

        #[test]
        fn zero_arm_does_not_fire_on_update() {
            let mut gate = TimedResource::buff();
            gate.reset_ready(0, false);
            gate.update(1);
            assert!(!gate.is_ready());
            assert!(gate.holds_invariant());
        }
    }

    #[test]
    fn clear_keeps_ready_flag() {
        let mut gate = TimedResource::buff();
        gate.reset_ready(3000, false);
        gate.clear();
        assert_eq!(gate.remaining(), 0);
        assert!(!gate.is_ready());
        assert!(gate.holds_invariant());
    }
}
