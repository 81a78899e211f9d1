//! Event-driven driver loop.
//!
//! The [`Simulation`] owns one job and a horizon. Each [`Simulation::step`]:
//!
//! 1. **DECIDE**: if the legal set holds anything besides the idle action,
//!    hand the encoded state and the legal set to the rotation and apply its
//!    choice
//! 2. **SCHEDULE**: pop the next wake-up from the job's timeline
//! 3. **ADVANCE**: move the job forward by exactly that delta, letting it
//!    resolve expiries, server ticks and cast completion
//!
//! The loop never advances by a fixed quantum; it jumps from one event to the
//! next, so a ten-minute fight costs a few thousand steps.
//!
//! # Determinism
//!
//! Given the same job seed and a deterministic rotation, two runs produce
//! identical transitions. The job owns its RNG and nothing here draws random
//! numbers.
//!
//! # Example
//!
//! ```
//! use castline_core::black_mage::BlackMage;
//! use castline_core::rotation::RandomRotation;
//! use castline_core::simulation::Simulation;
//! use castline_core::stats::Stats;
//!
//! let job = BlackMage::new(Stats::default(), 42).unwrap();
//! let mut sim = Simulation::new(job, 6000);
//! let summary = sim.run(&mut RandomRotation::new(42));
//!
//! assert!(summary.elapsed >= 6000);
//! assert!(summary.dps > 0.0);
//! ```

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::job::Job;
use crate::rotation::Rotation;

/// Outcome of one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Total damage dealt.
    pub total_damage: f64,
    /// Ticks simulated.
    pub elapsed: u64,
    /// Damage per second.
    pub dps: f64,
    /// Decisions handed to the rotation.
    pub decisions: u64,
    /// Transitions the job recorded.
    pub transitions: usize,
}

/// Drives a job against a rotation up to a horizon.
#[derive(Debug, Clone)]
pub struct Simulation<J: Job> {
    job: J,
    horizon: u64,
    decisions: u64,
}

impl<J: Job> Simulation<J> {
    /// Wraps a job that has already been reset.
    #[must_use]
    pub fn new(job: J, horizon: u64) -> Self {
        Self {
            job,
            horizon,
            decisions: 0,
        }
    }

    /// Whether the horizon has been reached.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.job.now() >= self.horizon
    }

    /// Runs one decide/schedule/advance cycle.
    ///
    /// Returns `false` once the horizon is reached or the job has nothing
    /// left to wake up for.
    pub fn step<R: Rotation<J::Action>>(&mut self, rotation: &mut R) -> bool {
        if self.is_done() {
            return false;
        }

        // PHASE 1: DECIDE
        if self.job.at_decision_point() {
            let legal = self.job.legal_actions();
            let state = self.job.encode_state();
            let action = rotation.choose(&state, &legal);
            self.job.apply(action);
            self.decisions += 1;
        }

        // PHASE 2: SCHEDULE, PHASE 3: ADVANCE
        match self.job.next_event_delta() {
            Some(delta) => self.job.advance(delta),
            None => return false,
        }
        !self.is_done()
    }

    /// Steps until the horizon and summarises the run.
    pub fn run<R: Rotation<J::Action>>(&mut self, rotation: &mut R) -> RunSummary {
        while self.step(rotation) {}
        let summary = self.summary();
        info!(
            elapsed = summary.elapsed,
            damage = summary.total_damage,
            dps = summary.dps,
            decisions = summary.decisions,
            "run complete"
        );
        summary
    }

    /// Summary of the run so far.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn summary(&self) -> RunSummary {
        let elapsed = self.job.now();
        let total_damage = self.job.total_damage();
        RunSummary {
            total_damage,
            elapsed,
            dps: if elapsed == 0 {
                0.0
            } else {
                100.0 * total_damage / elapsed as f64
            },
            decisions: self.decisions,
            transitions: self.job.transitions().len(),
        }
    }

    /// The horizon in ticks.
    #[must_use]
    pub fn horizon(&self) -> u64 {
        self.horizon
    }

    /// The job being driven.
    #[must_use]
    pub fn job(&self) -> &J {
        &self.job
    }

    /// Mutable access to the job, for scripted setups between steps.
    pub fn job_mut(&mut self) -> &mut J {
        &mut self.job
    }

    /// Consumes the driver and returns the job.
    #[must_use]
    pub fn into_job(self) -> J {
        self.job
    }
}

// =============================================================================
// Tests
// =============================================================================
