//! Decision-making seam between the driver and a policy.
//!
//! A [`Rotation`] receives the encoded state and the non-trivial legal set at
//! every decision point and returns one action from that set. Learned
//! policies live outside this crate; [`RandomRotation`] is the uniform
//! baseline used for smoke runs, benchmarks and property tests.
//!
//! # Example
//!
//! ```
//! use castline_core::black_mage::Action;
//! use castline_core::rotation::Rotation;
//!
//! // Any closure over (state, legal) is a rotation.
//! let mut first_legal = |_: &[f32], legal: &[Action]| legal[0];
//! assert_eq!(first_legal.choose(&[], &[Action::Fire3, Action::Idle]), Action::Fire3);
//! ```

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::job::JobAction;

/// A policy choosing among legal actions.
pub trait Rotation<A: JobAction> {
    /// Picks one action from `legal`.
    ///
    /// `legal` is never empty and always contains something besides the idle
    /// action. Returning an action outside `legal` is a contract violation and
    /// panics in the job.
    fn choose(&mut self, state: &[f32], legal: &[A]) -> A;
}

impl<A, F> Rotation<A> for F
where
    A: JobAction,
    F: FnMut(&[f32], &[A]) -> A,
{
    fn choose(&mut self, state: &[f32], legal: &[A]) -> A {
        self(state, legal)
    }
}

/// Picks uniformly among legal actions with its own seeded RNG.
#[derive(Debug, Clone)]
pub struct RandomRotation {
    rng: ChaCha8Rng,
}

impl RandomRotation {
    /// Creates a rotation seeded from `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl<A: JobAction> Rotation<A> for RandomRotation {
    fn choose(&mut self, _state: &[f32], legal: &[A]) -> A {
        match SliceRandom::choose(legal, &mut self.rng) {
            Some(action) => *action,
            None => panic!("rotation asked to choose from an empty legal set"),
        }
    }
}

/// Prefers actions in a fixed priority order, falling back to the first legal
/// action.
///
/// Handy for scripted openers and tests that need a specific line.
#[derive(Debug, Clone)]
pub struct PriorityRotation<A> {
    priorities: Vec<A>,
}

impl<A: JobAction> PriorityRotation<A> {
    /// Creates a rotation trying `priorities` front to back.
    #[must_use]
    pub fn new(priorities: Vec<A>) -> Self {
        Self { priorities }
    }
}

impl<A: JobAction> Rotation<A> for PriorityRotation<A> {
    fn choose(&mut self, _state: &[f32], legal: &[A]) -> A {
        self.priorities
            .iter()
            .copied()
            .find(|action| legal.contains(action))
            .unwrap_or(legal[0])
    }
}
