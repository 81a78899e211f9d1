//! Black mage actions and their static rule rows.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::job::JobAction;

use super::rules::{Aspect, CastBase};

/// Every action the job can take, in stable index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Action {
    /// Let the global cooldown roll without acting.
    Idle,
    /// Blizzard.
    Blizzard,
    /// Blizzard III.
    Blizzard3,
    /// Blizzard IV.
    Blizzard4,
    /// Freeze.
    Freeze,
    /// Fire.
    Fire,
    /// Fire III.
    Fire3,
    /// Fire IV.
    Fire4,
    /// Thunder III.
    Thunder3,
    /// Xenoglossy, spends a Polyglot charge.
    Xenoglossy,
    /// Despair.
    Despair,
    /// Umbral Soul.
    UmbralSoul,
    /// Swiftcast.
    Swiftcast,
    /// Triplecast.
    Triplecast,
    /// Sharpcast.
    Sharpcast,
    /// Ley Lines.
    Leylines,
    /// Manafont.
    Manafont,
    /// Enochian.
    Enochian,
    /// Transpose.
    Transpose,
    /// Hold the next action until the coming mana tick.
    WaitForMp,
}

/// Broad category of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    /// Damage spell with a cast time, on the global cooldown.
    Spell,
    /// Global-cooldown spell that always resolves instantly.
    InstantSpell,
    /// Off-global action that grants a timed buff.
    Buff,
    /// Off-global action with an immediate effect.
    Cooldown,
    /// No effect besides letting time pass.
    Wait,
}

bitflags! {
    /// A set of actions, one bit per [`Action`] index.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ActionMask: u32 {
        /// [`Action::Idle`]
        const IDLE = 1 << 0;
        /// [`Action::Blizzard`]
        const BLIZZARD = 1 << 1;
        /// [`Action::Blizzard3`]
        const BLIZZARD3 = 1 << 2;
        /// [`Action::Blizzard4`]
        const BLIZZARD4 = 1 << 3;
        /// [`Action::Freeze`]
        const FREEZE = 1 << 4;
        /// [`Action::Fire`]
        const FIRE = 1 << 5;
        /// [`Action::Fire3`]
        const FIRE3 = 1 << 6;
        /// [`Action::Fire4`]
        const FIRE4 = 1 << 7;
        /// [`Action::Thunder3`]
        const THUNDER3 = 1 << 8;
        /// [`Action::Xenoglossy`]
        const XENOGLOSSY = 1 << 9;
        /// [`Action::Despair`]
        const DESPAIR = 1 << 10;
        /// [`Action::UmbralSoul`]
        const UMBRAL_SOUL = 1 << 11;
        /// [`Action::Swiftcast`]
        const SWIFTCAST = 1 << 12;
        /// [`Action::Triplecast`]
        const TRIPLECAST = 1 << 13;
        /// [`Action::Sharpcast`]
        const SHARPCAST = 1 << 14;
        /// [`Action::Leylines`]
        const LEYLINES = 1 << 15;
        /// [`Action::Manafont`]
        const MANAFONT = 1 << 16;
        /// [`Action::Enochian`]
        const ENOCHIAN = 1 << 17;
        /// [`Action::Transpose`]
        const TRANSPOSE = 1 << 18;
        /// [`Action::WaitForMp`]
        const WAIT_FOR_MP = 1 << 19;
    }
}

impl ActionMask {
    /// Whether the mask holds `action`.
    #[must_use]
    pub fn has(self, action: Action) -> bool {
        self.contains(action.mask())
    }

    /// Iterates the actions in the mask in index order.
    pub fn actions(self) -> impl Iterator<Item = Action> {
        Action::ALL.into_iter().filter(move |action| self.has(*action))
    }

    /// Whether the mask offers nothing but waiting on the global cooldown.
    #[must_use]
    pub fn is_trivial(self) -> bool {
        self.difference(Self::IDLE).is_empty()
    }
}

/// Static rule row for a global-cooldown spell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpellRule {
    /// Potency before any multiplier.
    pub potency: u32,
    /// Mana cost before discounts.
    pub mp_cost: u32,
    /// Which base cast time the spell uses.
    pub cast: CastBase,
    /// Elemental aspect, driving discounts and multipliers.
    pub aspect: Aspect,
    /// Cost ignores element and Umbral Hearts.
    pub flat_cost: bool,
    /// Cast time halves under three stacks of the opposite element.
    pub hastened_by_opposite: bool,
}

impl SpellRule {
    const fn new(potency: u32, mp_cost: u32, cast: CastBase, aspect: Aspect) -> Self {
        Self {
            potency,
            mp_cost,
            cast,
            aspect,
            flat_cost: false,
            hastened_by_opposite: false,
        }
    }

    const fn hastened(mut self) -> Self {
        self.hastened_by_opposite = true;
        self
    }

    const fn flat(mut self) -> Self {
        self.flat_cost = true;
        self
    }
}

const BLIZZARD: SpellRule = SpellRule::new(180, 400, CastBase::Standard, Aspect::Ice).hastened();
const BLIZZARD3: SpellRule = SpellRule::new(240, 800, CastBase::Third, Aspect::Ice).hastened();
const BLIZZARD4: SpellRule = SpellRule::new(260, 800, CastBase::Fourth, Aspect::Ice);
const FREEZE: SpellRule = SpellRule::new(100, 1000, CastBase::Extended, Aspect::Ice).hastened();
const FIRE: SpellRule = SpellRule::new(180, 800, CastBase::Standard, Aspect::Fire).hastened();
const FIRE3: SpellRule = SpellRule::new(240, 2000, CastBase::Third, Aspect::Fire).hastened();
const FIRE4: SpellRule = SpellRule::new(300, 800, CastBase::Fourth, Aspect::Fire);
const THUNDER3: SpellRule = SpellRule::new(70, 400, CastBase::Standard, Aspect::Unaspected);
const XENOGLOSSY: SpellRule = SpellRule::new(750, 0, CastBase::Standard, Aspect::Unaspected);
const DESPAIR: SpellRule = SpellRule::new(380, 800, CastBase::Extended, Aspect::Fire).flat();
const UMBRAL_SOUL: SpellRule = SpellRule::new(0, 0, CastBase::Standard, Aspect::Unaspected);

impl Action {
    /// All actions in index order.
    pub const ALL: [Self; 20] = [
        Self::Idle,
        Self::Blizzard,
        Self::Blizzard3,
        Self::Blizzard4,
        Self::Freeze,
        Self::Fire,
        Self::Fire3,
        Self::Fire4,
        Self::Thunder3,
        Self::Xenoglossy,
        Self::Despair,
        Self::UmbralSoul,
        Self::Swiftcast,
        Self::Triplecast,
        Self::Sharpcast,
        Self::Leylines,
        Self::Manafont,
        Self::Enochian,
        Self::Transpose,
        Self::WaitForMp,
    ];

    /// Single-bit mask for this action.
    #[must_use]
    pub fn mask(self) -> ActionMask {
        ActionMask::from_bits_retain(1 << self as u32)
    }

    /// Category of the action.
    #[must_use]
    pub fn kind(self) -> ActionKind {
        match self {
            Self::Idle | Self::WaitForMp => ActionKind::Wait,
            Self::Xenoglossy | Self::UmbralSoul => ActionKind::InstantSpell,
            Self::Swiftcast
            | Self::Triplecast
            | Self::Sharpcast
            | Self::Leylines
            | Self::Enochian => ActionKind::Buff,
            Self::Manafont | Self::Transpose => ActionKind::Cooldown,
            _ => ActionKind::Spell,
        }
    }

    /// Whether the action goes on the global cooldown.
    #[must_use]
    pub fn is_gcd(self) -> bool {
        self.rule().is_some()
    }

    /// Rule row for global-cooldown spells.
    #[must_use]
    pub fn rule(self) -> Option<&'static SpellRule> {
        match self {
            Self::Blizzard => Some(&BLIZZARD),
            Self::Blizzard3 => Some(&BLIZZARD3),
            Self::Blizzard4 => Some(&BLIZZARD4),
            Self::Freeze => Some(&FREEZE),
            Self::Fire => Some(&FIRE),
            Self::Fire3 => Some(&FIRE3),
            Self::Fire4 => Some(&FIRE4),
            Self::Thunder3 => Some(&THUNDER3),
            Self::Xenoglossy => Some(&XENOGLOSSY),
            Self::Despair => Some(&DESPAIR),
            Self::UmbralSoul => Some(&UMBRAL_SOUL),
            _ => None,
        }
    }

    /// Display name as shown in game.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Blizzard => "Blizzard",
            Self::Blizzard3 => "Blizzard III",
            Self::Blizzard4 => "Blizzard IV",
            Self::Freeze => "Freeze",
            Self::Fire => "Fire",
            Self::Fire3 => "Fire III",
            Self::Fire4 => "Fire IV",
            Self::Thunder3 => "Thunder III",
            Self::Xenoglossy => "Xenoglossy",
            Self::Despair => "Despair",
            Self::UmbralSoul => "Umbral Soul",
            Self::Swiftcast => "Swiftcast",
            Self::Triplecast => "Triplecast",
            Self::Sharpcast => "Sharpcast",
            Self::Leylines => "Ley Lines",
            Self::Manafont => "Manafont",
            Self::Enochian => "Enochian",
            Self::Transpose => "Transpose",
            Self::WaitForMp => "Wait for MP",
        }
    }
}

impl JobAction for Action {
    const COUNT: usize = Self::ALL.len();

    fn index(self) -> usize {
        self as usize
    }

    fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    fn is_idle(self) -> bool {
        self == Self::Idle
    }
}
