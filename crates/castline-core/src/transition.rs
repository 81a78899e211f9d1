//! MDP transitions recorded at decision points.
//!
//! A transition is opened every time the job reaches a decision point with a
//! non-trivial legal set. Opening a new one closes the previous one by
//! stamping how many ticks it stayed open. Damage dealt in between accumulates
//! as the open transition's reward, so each transition reads as "in this
//! state, with these options, the policy picked this action and it earned
//! this much before the next decision".

use serde::{Deserialize, Serialize};

/// One recorded decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition<A> {
    /// Encoded job state at the decision point.
    pub state: Vec<f32>,
    /// Actions that were legal at the decision point.
    pub legal_actions: Vec<A>,
    /// The action chosen, once one has been applied.
    pub action: Option<A>,
    /// Damage dealt between this decision point and the next.
    pub reward: f64,
    /// Tick at which the transition was opened.
    pub opened_at: u64,
    /// Ticks until the next decision point; zero while still open.
    pub elapsed: u64,
}

/// Append-only log of transitions with one open entry at the tail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecorder<A> {
    history: Vec<Transition<A>>,
}

impl<A> Default for TransitionRecorder<A> {
    fn default() -> Self {
        Self {
            history: Vec::new(),
        }
    }
}

impl<A: Copy> TransitionRecorder<A> {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Closes the open transition and opens a new one at `now`.
    pub fn open(&mut self, state: Vec<f32>, legal_actions: Vec<A>, now: u64) {
        if let Some(last) = self.history.last_mut() {
            last.elapsed = now - last.opened_at;
        }
        self.history.push(Transition {
            state,
            legal_actions,
            action: None,
            reward: 0.0,
            opened_at: now,
            elapsed: 0,
        });
    }

    /// Adds damage to the open transition.
    pub fn add_reward(&mut self, reward: f64) {
        if let Some(last) = self.history.last_mut() {
            last.reward += reward;
        }
    }

    /// Records the chosen action on the open transition.
    ///
    /// Only the first choice at a decision point is kept; later applies
    /// before the next decision point (waiting out a GCD, say) do not
    /// overwrite it.
    pub fn record_action(&mut self, action: A) {
        if let Some(last) = self.history.last_mut() {
            if last.action.is_none() {
                last.action = Some(action);
            }
        }
    }

    /// All transitions, the open one last.
    #[must_use]
    pub fn history(&self) -> &[Transition<A>] {
        &self.history
    }

    /// Total reward recorded so far.
    #[must_use]
    pub fn total_reward(&self) -> f64 {
        self.history.iter().map(|t| t.reward).sum()
    }

    /// Forgets every transition.
    pub fn clear(&mut self) {
        self.history.clear();
    }
}
