//! Run configuration.
//!
//! A [`RunConfig`] bundles everything needed to reproduce one simulated pull:
//! the RNG seed, the horizon, the character's stats and the pre-pull opener.
//! It loads from JSON and is validated before a job is built from it.
//!
//! # Example
//!
//! ```
//! use castline_core::config::{Opener, RunConfig};
//!
//! let config = RunConfig::from_json_str(r#"{
//!     "seed": 7,
//!     "horizon": 60000,
//!     "stats": { "ss_multiplier": 0.95, "potency_multiplier": 30.0,
//!                "expected_multiplier": 1.1, "dot_multiplier": 1.05 }
//! }"#).unwrap();
//!
//! assert_eq!(config.seed, 7);
//! assert_eq!(config.opener, Opener::PrecastBlizzard3);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::stats::{Attributes, Stats};

/// Ten minutes of combat in ticks.
pub const DEFAULT_HORIZON: u64 = 60_000;

/// Pre-pull configuration applied on reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Opener {
    /// Blizzard III hard-cast before the pull with Sharpcast used 10 s earlier.
    #[default]
    PrecastBlizzard3,
    /// No element, full mana, nothing precast.
    Neutral,
}

/// Where the stat multipliers come from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatSource {
    /// Multipliers given directly.
    Multipliers(Stats),
    /// Multipliers derived from raw attributes.
    Attributes(Attributes),
}

impl Default for StatSource {
    fn default() -> Self {
        Self::Multipliers(Stats::default())
    }
}

impl StatSource {
    /// Resolves the source into validated multipliers.
    ///
    /// # Errors
    ///
    /// Propagates validation errors from [`Stats`].
    pub fn resolve(&self) -> Result<Stats> {
        match self {
            Self::Multipliers(stats) => {
                stats.validate()?;
                Ok(*stats)
            }
            Self::Attributes(attributes) => Stats::from_attributes(attributes),
        }
    }
}

/// Configuration for one simulated pull.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Seed for the job's proc and server-tick RNG.
    pub seed: u64,
    /// Number of ticks the driver runs before stopping.
    pub horizon: u64,
    /// Character stats.
    pub stats: StatSource,
    /// Pre-pull configuration.
    pub opener: Opener,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            horizon: DEFAULT_HORIZON,
            stats: StatSource::default(),
            opener: Opener::default(),
        }
    }
}

impl RunConfig {
    /// Parses and validates a JSON configuration.
    ///
    /// Missing fields fall back to [`RunConfig::default`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::SimError::InvalidConfig`] on malformed JSON and the
    /// stats errors on out-of-range values.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.stats.resolve()?;
        Ok(config)
    }

    /// Returns a copy with a different seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}
