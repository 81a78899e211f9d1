//! Character stat multipliers.
//!
//! The engine only ever sees four multipliers. They can be supplied directly
//! or derived from raw character attributes with the level-80 formulas.

use serde::{Deserialize, Serialize};

use crate::black_mage::rules::{CastBase, CastTimes};
use crate::error::{Result, SimError};

/// Main-stat level base.
const LEVEL_MAIN: u32 = 340;
/// Sub-stat level base.
const LEVEL_SUB: u32 = 380;
/// Sub-stat level divisor.
const LEVEL_DIV: u32 = 3300;
/// Intelligence job modifier, in thousandths.
const JOB_MOD_INT: u32 = 115;
/// Bonus damage of a direct hit.
const DIRECT_HIT_BONUS: f64 = 0.25;

/// Immutable per-run multipliers consumed by the damage and timing formulas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    /// Spell-speed multiplier applied to base cast times (below 1 is faster).
    pub ss_multiplier: f64,
    /// Damage per point of potency.
    pub potency_multiplier: f64,
    /// Expected-value multiplier from critical and direct hits.
    pub expected_multiplier: f64,
    /// Spell-speed bonus to damage-over-time ticks.
    pub dot_multiplier: f64,
}

impl Default for Stats {
    /// Unit multipliers: base cast times, damage equal to scaled potency.
    fn default() -> Self {
        Self {
            ss_multiplier: 1.0,
            potency_multiplier: 1.0,
            expected_multiplier: 1.0,
            dot_multiplier: 1.0,
        }
    }
}

impl Stats {
    /// Creates stats from explicit multipliers, validating each one.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidStats`] if any multiplier is non-finite or
    /// not strictly positive.
    pub fn new(
        ss_multiplier: f64,
        potency_multiplier: f64,
        expected_multiplier: f64,
        dot_multiplier: f64,
    ) -> Result<Self> {
        let stats = Self {
            ss_multiplier,
            potency_multiplier,
            expected_multiplier,
            dot_multiplier,
        };
        stats.validate()?;
        Ok(stats)
    }

    /// Checks that every multiplier is finite and positive.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidStats`] naming the first offending field, or
    /// if spell speed is so fast that the shortest global cooldown truncates
    /// to zero ticks.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("ss_multiplier", self.ss_multiplier),
            ("potency_multiplier", self.potency_multiplier),
            ("expected_multiplier", self.expected_multiplier),
            ("dot_multiplier", self.dot_multiplier),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                return Err(SimError::InvalidStats(format!("{name} must be positive, got {value}")));
            }
        }
        let fastest = CastTimes::new(self.ss_multiplier)
            .tier(CastBase::Standard)
            .leylines_hastened;
        if fastest == 0 {
            return Err(SimError::InvalidStats(format!(
                "ss_multiplier {} truncates the global cooldown to zero ticks",
                self.ss_multiplier
            )));
        }
        Ok(())
    }

    /// Derives multipliers from raw character attributes.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidAttributes`] if intelligence is below the
    /// main-stat base, any sub-stat is below the sub-stat base, an attribute
    /// is too large for the level formulas, or the derived multipliers fail
    /// [`Stats::validate`].
    ///
    /// # Example
    ///
    /// ```
    /// use castline_core::stats::{Attributes, Stats};
    ///
    /// let base = Attributes {
    ///     weapon_damage: 0,
    ///     intelligence: 340,
    ///     determination: 340,
    ///     critical_hit: 380,
    ///     direct_hit: 380,
    ///     spell_speed: 380,
    /// };
    /// let stats = Stats::from_attributes(&base).unwrap();
    /// assert_eq!(stats.ss_multiplier, 1.0);
    /// ```
    pub fn from_attributes(attributes: &Attributes) -> Result<Self> {
        attributes.validate()?;
        let attrs = attributes;

        let weapon = (LEVEL_MAIN * JOB_MOD_INT / 1000)
            .checked_add(attrs.weapon_damage)
            .ok_or_else(|| out_of_range("weapon_damage", attrs.weapon_damage))?;
        let attack = scale("intelligence", attrs.intelligence, 165, LEVEL_MAIN, LEVEL_MAIN)? + 100;
        let determination =
            scale("determination", attrs.determination, 130, LEVEL_MAIN, LEVEL_DIV)? + 1000;

        let crit_points = scale("critical_hit", attrs.critical_hit, 200, LEVEL_SUB, LEVEL_DIV)?;
        let crit_rate = f64::from(crit_points + 50) / 1000.0;
        let crit_bonus = f64::from(crit_points + 1400) / 1000.0;
        let direct_points = scale("direct_hit", attrs.direct_hit, 550, LEVEL_SUB, LEVEL_DIV)?;
        let direct_rate = f64::from(direct_points) / 1000.0;

        let speed = scale("spell_speed", attrs.spell_speed, 130, LEVEL_SUB, LEVEL_DIV)?;

        Self::new(
            f64::from(1000 - speed) / 1000.0,
            f64::from(weapon) * f64::from(attack) * f64::from(determination) / 1e7,
            1.0 + crit_rate * (crit_bonus - 1.0) + direct_rate * DIRECT_HIT_BONUS,
            f64::from(1000 + speed) / 1000.0,
        )
        .map_err(|err| SimError::InvalidAttributes(err.to_string()))
    }
}

/// Raw character attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    /// Weapon magic damage.
    pub weapon_damage: u32,
    /// Main stat.
    pub intelligence: u32,
    /// Determination.
    pub determination: u32,
    /// Critical hit.
    pub critical_hit: u32,
    /// Direct hit rate.
    pub direct_hit: u32,
    /// Spell speed.
    pub spell_speed: u32,
}

fn out_of_range(name: &str, value: u32) -> SimError {
    SimError::InvalidAttributes(format!("{name} {value} is out of range"))
}

/// Level-scaled points: `rate * (value - base) / divisor`, or an error if the
/// product overflows. `value` must already be at least `base`.
fn scale(name: &str, value: u32, rate: u32, base: u32, divisor: u32) -> Result<u32> {
    rate.checked_mul(value - base)
        .map(|points| points / divisor)
        .ok_or_else(|| out_of_range(name, value))
}

impl Attributes {
    fn validate(&self) -> Result<()> {
        if self.intelligence < LEVEL_MAIN {
            return Err(SimError::InvalidAttributes(format!(
                "intelligence {} is below {LEVEL_MAIN}",
                self.intelligence
            )));
        }
        if self.determination < LEVEL_MAIN {
            return Err(SimError::InvalidAttributes(format!(
                "determination {} is below {LEVEL_MAIN}",
                self.determination
            )));
        }
        let subs = [
            ("critical_hit", self.critical_hit),
            ("direct_hit", self.direct_hit),
            ("spell_speed", self.spell_speed),
        ];
        for (name, value) in subs {
            if value < LEVEL_SUB {
                return Err(SimError::InvalidAttributes(format!("{name} {value} is below {LEVEL_SUB}")));
            }
            // Speed above this point would drive the cast multiplier to zero.
            if name == "spell_speed" && scale(name, value, 130, LEVEL_SUB, LEVEL_DIV)? >= 1000 {
                return Err(out_of_range(name, value));
            }
        }
        Ok(())
    }
}
