//! Test helper functions for building jobs and driving them.
//!
//! This module provides factory functions and stepping utilities that make
//! writing tests more ergonomic and consistent.

use crate::black_mage::{Action, BlackMage};
use crate::config::Opener;
use crate::job::Job;
use crate::rotation::{RandomRotation, Rotation};
use crate::simulation::Simulation;
use crate::stats::Stats;

// =============================================================================
// Job Setup
// =============================================================================

/// Stats roughly matching a mid-tier level-80 gear set.
pub fn geared_stats() -> Stats {
    Stats {
        ss_multiplier: 0.95,
        potency_multiplier: 30.0,
        expected_multiplier: 1.12,
        dot_multiplier: 1.05,
    }
}

/// A job with the default precast opener and geared stats.
pub fn precast_job(seed: u64) -> BlackMage {
    BlackMage::new(geared_stats(), seed).unwrap()
}

/// A job starting Neutral with full mana.
pub fn neutral_job(seed: u64) -> BlackMage {
    BlackMage::with_opener(geared_stats(), seed, Opener::Neutral).unwrap()
}

// =============================================================================
// Driving
// =============================================================================

/// Runs a seeded random rotation for `horizon` ticks and returns the job.
pub fn run_random(seed: u64, horizon: u64) -> BlackMage {
    let mut sim = Simulation::new(precast_job(seed), horizon);
    sim.run(&mut RandomRotation::new(seed));
    sim.into_job()
}

/// Steps a driver to the horizon, calling `check` on the job after every step.
pub fn run_checked<R, F>(job: BlackMage, horizon: u64, rotation: &mut R, mut check: F) -> BlackMage
where
    R: Rotation<Action>,
    F: FnMut(&BlackMage),
{
    let mut sim = Simulation::new(job, horizon);
    check(sim.job());
    while sim.step(rotation) {
        check(sim.job());
    }
    check(sim.job());
    sim.into_job()
}

/// Advances to the next scheduled event.
pub fn advance_to_next(job: &mut BlackMage) -> u64 {
    let delta = job.next_event_delta().unwrap();
    job.advance(delta);
    delta
}

/// Advances until the job offers a non-trivial decision.
pub fn advance_to_decision(job: &mut BlackMage) {
    while !job.at_decision_point() {
        advance_to_next(job);
    }
}

/// Applies `action` and then advances to the next decision point.
pub fn cast_and_wait(job: &mut BlackMage, action: Action) {
    job.apply(action);
    advance_to_next(job);
    advance_to_decision(job);
}
