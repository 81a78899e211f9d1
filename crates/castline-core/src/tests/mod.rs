//! Crate-level tests that drive whole fights.
//!
//! - `determinism.rs`: seeds fix the fight; reset and batch runs replay it
//! - `integration.rs`: transition bookkeeping, openers, scripted rotations
//! - `invariants.rs`: property tests over random seeds and rotations
//! - `helpers.rs`: job factories and stepping utilities

mod helpers;
mod invariants;
