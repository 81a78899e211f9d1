//! The capability set every job variant implements.
//!
//! Drivers, rotations and the batch evaluator are generic over [`Job`], so a
//! new job is one more implementing type and nothing else changes. Calls are
//! statically dispatched on the per-event path.

use std::fmt::Debug;

use crate::transition::Transition;

/// An action identifier that can cross the binding boundary as an index.
pub trait JobAction: Copy + Eq + Debug + Send + Sync + 'static {
    /// Number of distinct actions.
    const COUNT: usize;

    /// Stable index of the action, in `0..COUNT`.
    fn index(self) -> usize;

    /// Action with the given index, if any.
    fn from_index(index: usize) -> Option<Self>;

    /// Whether this is the "keep waiting" action that carries no decision.
    fn is_idle(self) -> bool;
}

/// One combatant's simulation state and step contract.
pub trait Job {
    /// The job's action enumeration.
    type Action: JobAction;

    /// Restores the pre-combat state, clearing history and counters.
    fn reset(&mut self);

    /// Advances every timer by `elapsed` ticks and resolves what fired.
    ///
    /// # Panics
    ///
    /// Panics if `elapsed` is zero.
    fn advance(&mut self, elapsed: u64);

    /// Actions that may be applied right now.
    fn legal_actions(&self) -> Vec<Self::Action>;

    /// Applies an action from the legal set.
    ///
    /// # Panics
    ///
    /// Panics if `action` is not in [`Job::legal_actions`].
    fn apply(&mut self, action: Self::Action);

    /// Fixed-length normalized snapshot of the state.
    fn encode_state(&self) -> Vec<f32>;

    /// Recorded transitions, oldest first.
    fn transitions(&self) -> &[Transition<Self::Action>];

    /// Pops the next scheduled wake-up and returns its distance from now.
    fn next_event_delta(&mut self) -> Option<u64>;

    /// Current tick.
    fn now(&self) -> u64;

    /// Damage dealt since the last reset.
    fn total_damage(&self) -> f64;

    /// Whether the current legal set warrants a policy decision.
    fn at_decision_point(&self) -> bool {
        self.legal_actions().iter().any(|action| !action.is_idle())
    }
}
