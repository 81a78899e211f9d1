//! # Castline Core
//!
//! Discrete-event combat rotation simulator.
//!
//! This crate advances one combatant ("job") through a fight against a
//! training target: timed resources decay, server ticks regenerate mana and
//! deal damage over time, casts resolve against a rules table, and every
//! decision point is recorded as a transition for an external policy to learn
//! from.
//!
//! ## Architecture
//!
//! - **Resources**: [`timer::TimedResource`] behind every buff, cooldown and gauge
//! - **Clock**: [`timeline::Timeline`] of pending wake-ups; the driver jumps between them
//! - **Jobs**: the [`job::Job`] trait, implemented by [`black_mage::BlackMage`]
//! - **Policies**: the [`rotation::Rotation`] seam and its baselines
//! - **Drivers**: [`simulation::Simulation`] for one run, [`batch`] for many
//!
//! ## Usage
//!
//! ```
//! use castline_core::black_mage::BlackMage;
//! use castline_core::config::RunConfig;
//! use castline_core::rotation::RandomRotation;
//! use castline_core::simulation::Simulation;
//!
//! let config = RunConfig { horizon: 3000, ..RunConfig::default() };
//! let job = BlackMage::from_config(&config)?;
//! let summary = Simulation::new(job, config.horizon).run(&mut RandomRotation::new(1));
//! assert!(summary.total_damage > 0.0);
//! # Ok::<(), castline_core::SimError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod batch;
pub mod black_mage;
pub mod config;
pub mod error;
pub mod job;
pub mod rotation;
pub mod simulation;
pub mod stats;
pub mod timeline;
pub mod timer;
pub mod transition;

pub use error::{Result, SimError};
pub use job::{Job, JobAction};

#[cfg(test)]
mod tests;
