//! Rule constants and pure formulas.
//!
//! Durations are in ticks (10 ms), base cast times in milliseconds. Nothing in
//! here reads job state directly; the job passes in the handful of values each
//! formula needs.

use serde::{Deserialize, Serialize};

use super::action::SpellRule;

// =============================================================================
// Constants
// =============================================================================

/// Mana pool size.
pub const MAX_MANA: u32 = 10_000;
/// Interval between server ticks (mana regen and DoT damage).
pub const SERVER_TICK: u64 = 300;
/// Mana regained per server tick outside Umbral Ice.
pub const MANA_PER_TICK: u32 = 200;
/// Mana regained per server tick under one, two and three Umbral Ice stacks.
pub const MANA_PER_TICK_ICE: [u32; 3] = [3200, 4700, 6200];
/// Mana restored by Manafont.
pub const MANAFONT_MANA: u32 = 3000;

/// Nominal global cooldown, used to normalise the GCD timer.
pub const NOMINAL_GCD: u64 = 250;
/// Animation lock of an instant action.
pub const ANIMATION_LOCK: u64 = 70;
/// Extra delay added after every action.
pub const ACTION_TAX: u64 = 10;

/// Elemental gauge lifetime.
pub const GAUGE_DURATION: u64 = 1500;
/// Maximum elemental gauge stacks.
pub const MAX_GAUGE_STACKS: u8 = 3;
/// Maximum Umbral Hearts.
pub const MAX_UMBRAL_HEARTS: u8 = 3;
/// Interval between Polyglot charges while Enochian holds.
pub const POLYGLOT_PERIOD: u64 = 3000;
/// Maximum Polyglot charges.
pub const MAX_POLYGLOT: u8 = 2;

/// Swiftcast duration.
pub const SWIFTCAST_DURATION: u64 = 1000;
/// Swiftcast recast.
pub const SWIFTCAST_CD: u64 = 6000;
/// Triplecast duration.
pub const TRIPLECAST_DURATION: u64 = 1500;
/// Triplecast recast.
pub const TRIPLECAST_CD: u64 = 6000;
/// Triplecast charges.
pub const TRIPLECAST_CHARGES: u8 = 3;
/// Sharpcast duration.
pub const SHARPCAST_DURATION: u64 = 1500;
/// Sharpcast recast.
pub const SHARPCAST_CD: u64 = 3000;
/// Ley Lines duration.
pub const LEYLINES_DURATION: u64 = 3000;
/// Ley Lines recast.
pub const LEYLINES_CD: u64 = 9000;
/// Manafont recast.
pub const MANAFONT_CD: u64 = 18_000;
/// Enochian recast.
pub const ENOCHIAN_CD: u64 = 3000;
/// Transpose recast.
pub const TRANSPOSE_CD: u64 = 500;
/// Firestarter duration.
pub const FIRESTARTER_DURATION: u64 = 1800;
/// Thundercloud duration.
pub const THUNDERCLOUD_DURATION: u64 = 1800;
/// Thunder III damage-over-time duration.
pub const DOT_DURATION: u64 = 2400;
/// How long ago Sharpcast was used before the pull in the precast opener.
pub const PRECAST_SHARPCAST_AGE: u64 = 1000;

/// Chance that Fire grants Firestarter.
pub const FIRESTARTER_RATE: f64 = 0.4;
/// Chance that a Thunder III tick grants Thundercloud.
pub const THUNDERCLOUD_RATE: f64 = 0.1;

/// Thunder III potency per DoT tick.
pub const DOT_POTENCY: u32 = 40;
/// Thunder III potency when cast from Thundercloud (initial hit plus full DoT).
pub const THUNDERCLOUD_POTENCY: u32 = 390;
/// DoT stack value when applied under Enochian.
pub const DOT_EMPOWERED: u8 = 1;
/// DoT stack value when applied without Enochian.
pub const DOT_PLAIN: u8 = 2;

/// Fire spell multipliers under one, two and three Astral Fire stacks.
pub const ASTRAL_FIRE_MULTIPLIER: [f64; 3] = [1.4, 1.6, 1.8];
/// Multipliers for a spell cast under one, two and three stacks of the opposite element.
pub const OPPOSITE_ELEMENT_MULTIPLIER: [f64; 3] = [0.9, 0.8, 0.7];
/// Enochian damage bonus.
pub const ENOCHIAN_MULTIPLIER: f64 = 1.15;
/// Magick and Mend trait bonus.
pub const MAGICK_AND_MEND_MULTIPLIER: f64 = 1.3;

/// Ley Lines cast-time factor, in percent.
const LEYLINES_PERCENT: u64 = 85;

// =============================================================================
// Element and aspect
// =============================================================================

/// Current elemental polarity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Element {
    /// No element.
    #[default]
    Neutral,
    /// Umbral Ice.
    UmbralIce,
    /// Astral Fire.
    AstralFire,
}

/// Elemental aspect of a spell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Aspect {
    /// Ice spell.
    Ice,
    /// Fire spell.
    Fire,
    /// Neither.
    Unaspected,
}

impl Aspect {
    /// Whether `element` is the polarity this aspect builds.
    #[must_use]
    pub fn matches(self, element: Element) -> bool {
        matches!(
            (self, element),
            (Self::Ice, Element::UmbralIce) | (Self::Fire, Element::AstralFire)
        )
    }

    /// Whether `element` is the polarity opposite this aspect.
    #[must_use]
    pub fn opposes(self, element: Element) -> bool {
        matches!(
            (self, element),
            (Self::Ice, Element::AstralFire) | (Self::Fire, Element::UmbralIce)
        )
    }
}

// =============================================================================
// Cast times
// =============================================================================

/// Base cast time classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CastBase {
    /// 2.5 s.
    Standard,
    /// 3.5 s.
    Third,
    /// 2.8 s.
    Fourth,
    /// 3.0 s.
    Extended,
}

impl CastBase {
    /// Base cast time in milliseconds.
    #[must_use]
    pub const fn millis(self) -> u32 {
        match self {
            Self::Standard => 2500,
            Self::Third => 3500,
            Self::Fourth => 2800,
            Self::Extended => 3000,
        }
    }
}

/// Scales a base cast time to ticks with the game's truncation order.
///
/// The base is multiplied by spell speed and truncated to whole milliseconds,
/// then Ley Lines (85 %) and opposite-element haste (50 %) apply in that
/// order, each truncating again, before the result truncates to ticks.
///
/// # Example
///
/// ```
/// use castline_core::black_mage::rules::scaled_cast;
///
/// assert_eq!(scaled_cast(1.0, 2500, false, false), 250);
/// assert_eq!(scaled_cast(1.0, 2500, true, false), 212);
/// assert_eq!(scaled_cast(0.95, 3500, true, true), 141);
/// ```
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn scaled_cast(ss_multiplier: f64, base_millis: u32, leylines: bool, hastened: bool) -> u64 {
    let mut millis = (ss_multiplier * f64::from(base_millis)).floor() as u64;
    if leylines {
        millis = millis.saturating_mul(LEYLINES_PERCENT) / 100;
    }
    if hastened {
        millis /= 2;
    }
    millis / 10
}

/// Cast times of one base class under every modifier combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeedTier {
    /// Unmodified.
    pub normal: u64,
    /// Opposite-element haste.
    pub hastened: u64,
    /// Ley Lines.
    pub leylines: u64,
    /// Ley Lines and opposite-element haste.
    pub leylines_hastened: u64,
}

impl SpeedTier {
    fn new(ss_multiplier: f64, base: CastBase) -> Self {
        let millis = base.millis();
        Self {
            normal: scaled_cast(ss_multiplier, millis, false, false),
            hastened: scaled_cast(ss_multiplier, millis, false, true),
            leylines: scaled_cast(ss_multiplier, millis, true, false),
            leylines_hastened: scaled_cast(ss_multiplier, millis, true, true),
        }
    }
}

/// Cast times for every base class, precomputed from spell speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastTimes {
    standard: SpeedTier,
    third: SpeedTier,
    fourth: SpeedTier,
    extended: SpeedTier,
}

impl CastTimes {
    /// Precomputes every tier for a spell-speed multiplier.
    #[must_use]
    pub fn new(ss_multiplier: f64) -> Self {
        Self {
            standard: SpeedTier::new(ss_multiplier, CastBase::Standard),
            third: SpeedTier::new(ss_multiplier, CastBase::Third),
            fourth: SpeedTier::new(ss_multiplier, CastBase::Fourth),
            extended: SpeedTier::new(ss_multiplier, CastBase::Extended),
        }
    }

    /// The tier for a base class.
    #[must_use]
    pub fn tier(&self, base: CastBase) -> &SpeedTier {
        match base {
            CastBase::Standard => &self.standard,
            CastBase::Third => &self.third,
            CastBase::Fourth => &self.fourth,
            CastBase::Extended => &self.extended,
        }
    }
}

/// Picks the Ley Lines variant only if the buff outlasts it.
#[must_use]
pub fn with_leylines(leylines_remaining: Option<u64>, leylines_time: u64, normal_time: u64) -> u64 {
    match leylines_remaining {
        Some(remaining) if leylines_time < remaining => leylines_time,
        _ => normal_time,
    }
}

// =============================================================================
// Cost and damage
// =============================================================================

/// Element state a cost or damage formula depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attunement {
    /// Current element.
    pub element: Element,
    /// Gauge stacks.
    pub stacks: u8,
    /// Umbral Hearts held.
    pub umbral_hearts: u8,
}

/// Cost as quarters of base for stack counts one and two; three is free.
fn quartered(base: u32, stacks: u8, quarters: [u32; 2]) -> u32 {
    match stacks {
        1 => base * quarters[0] / 4,
        2 => base * quarters[1] / 4,
        _ => 0,
    }
}

/// Mana cost of a spell before proc overrides.
///
/// `fits` is whether the cast finishes before the elemental gauge runs out;
/// discounts only apply when it does. Only spells hastened by the opposite
/// element are discounted by it; the fourth-tier spells are not.
#[must_use]
pub fn mana_cost(rule: &SpellRule, attunement: Attunement, fits: bool) -> u32 {
    let Attunement {
        element,
        stacks,
        umbral_hearts,
    } = attunement;
    if rule.flat_cost {
        return rule.mp_cost;
    }
    let base = rule.mp_cost;
    let opposed = fits && rule.hastened_by_opposite && rule.aspect.opposes(element);
    match rule.aspect {
        // Fire IV doubles without hearts in any element and is never discounted.
        Aspect::Fire if !rule.hastened_by_opposite => {
            if umbral_hearts == 0 {
                base * 2
            } else {
                base
            }
        }
        Aspect::Ice | Aspect::Fire if opposed => quartered(base, stacks, [2, 1]),
        Aspect::Ice if fits && rule.aspect.matches(element) => quartered(base, stacks, [3, 2]),
        Aspect::Fire if rule.aspect.matches(element) && umbral_hearts == 0 => base * 2,
        _ => base,
    }
}

fn stack_tier(table: &[f64; 3], stacks: u8) -> f64 {
    table[usize::from(stacks.clamp(1, MAX_GAUGE_STACKS)) - 1]
}

/// Elemental damage multiplier for a spell.
#[must_use]
pub fn element_multiplier(aspect: Aspect, element: Element, stacks: u8) -> f64 {
    if aspect.opposes(element) {
        stack_tier(&OPPOSITE_ELEMENT_MULTIPLIER, stacks)
    } else if aspect == Aspect::Fire && aspect.matches(element) {
        stack_tier(&ASTRAL_FIRE_MULTIPLIER, stacks)
    } else {
        1.0
    }
}

/// Multipliers common to every hit.
#[must_use]
pub fn hit_multiplier(potency_multiplier: f64, expected_multiplier: f64, enochian: bool) -> f64 {
    let enochian = if enochian { ENOCHIAN_MULTIPLIER } else { 1.0 };
    potency_multiplier * expected_multiplier * enochian * MAGICK_AND_MEND_MULTIPLIER
}
