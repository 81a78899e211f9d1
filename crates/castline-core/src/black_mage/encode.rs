//! Fixed-length state vector fed to rotation policies.
//!
//! Flags encode as 0.0 or 1.0; timers are normalised by their full duration so
//! every field lands in roughly `[0, 1]`.

use super::rules::{
    DOT_DURATION, DOT_EMPOWERED, ENOCHIAN_CD, FIRESTARTER_DURATION, GAUGE_DURATION, LEYLINES_CD,
    LEYLINES_DURATION, MANAFONT_CD, MAX_MANA, NOMINAL_GCD, POLYGLOT_PERIOD, SHARPCAST_CD,
    SHARPCAST_DURATION, SWIFTCAST_CD, SWIFTCAST_DURATION, THUNDERCLOUD_DURATION, TRANSPOSE_CD,
    TRIPLECAST_CD, TRIPLECAST_CHARGES, TRIPLECAST_DURATION,
};
use super::{BlackMage, Element};
use crate::timer::TimedResource;

/// Number of fields in the encoded state.
pub const STATE_LEN: usize = 47;

fn flag(value: bool) -> f32 {
    if value {
        1.0
    } else {
        0.0
    }
}

#[allow(clippy::cast_precision_loss)]
fn ratio(value: u64, full: u64) -> f32 {
    value as f32 / full as f32
}

/// Appends the active flag and remaining-time ratio of a buff.
fn push_buff(state: &mut Vec<f32>, buff: &TimedResource, duration: u64) {
    state.push(flag(buff.is_active()));
    state.push(ratio(buff.remaining(), duration));
}

/// Appends the ready flag and remaining-time ratio of a cooldown.
fn push_cooldown(state: &mut Vec<f32>, cooldown: &TimedResource, recast: u64) {
    state.push(flag(cooldown.is_ready()));
    state.push(ratio(cooldown.remaining(), recast));
}

impl BlackMage {
    pub(super) fn encode(&self) -> Vec<f32> {
        let mut state = Vec::with_capacity(STATE_LEN);
        let stacks = self.gauge.stacks();
        let buffs = &self.buffs;
        let cooldowns = &self.cooldowns;

        state.push(ratio(u64::from(self.mana), u64::from(MAX_MANA)));
        state.push(flag(self.element == Element::UmbralIce));
        state.push(flag(self.element == Element::AstralFire));
        state.push(flag(self.umbral_hearts > 0));
        state.push(flag(self.enochian));
        state.push(flag(stacks > 0));
        state.push(flag(stacks == 1));
        state.push(flag(stacks == 2));
        state.push(flag(stacks == 3));
        state.push(ratio(self.gauge.remaining(), GAUGE_DURATION));

        state.push(flag(self.polyglot > 0));
        state.push(flag(self.polyglot > 1));
        state.push(ratio(
            POLYGLOT_PERIOD.saturating_sub(self.polyglot_timer.remaining()),
            POLYGLOT_PERIOD,
        ));

        push_buff(&mut state, &buffs.swiftcast, SWIFTCAST_DURATION);
        push_buff(&mut state, &buffs.sharpcast, SHARPCAST_DURATION);
        state.push(ratio(
            u64::from(buffs.triplecast.stacks()),
            u64::from(TRIPLECAST_CHARGES),
        ));
        state.push(ratio(buffs.triplecast.remaining(), TRIPLECAST_DURATION));
        push_buff(&mut state, &buffs.leylines, LEYLINES_DURATION);
        push_buff(&mut state, &buffs.firestarter, FIRESTARTER_DURATION);
        push_buff(&mut state, &buffs.thundercloud, THUNDERCLOUD_DURATION);
        push_buff(&mut state, &buffs.thunder_dot, DOT_DURATION);
        state.push(flag(buffs.thunder_dot.stacks() == DOT_EMPOWERED));

        push_cooldown(&mut state, &cooldowns.swiftcast, SWIFTCAST_CD);
        push_cooldown(&mut state, &cooldowns.triplecast, TRIPLECAST_CD);
        push_cooldown(&mut state, &cooldowns.sharpcast, SHARPCAST_CD);
        push_cooldown(&mut state, &cooldowns.leylines, LEYLINES_CD);
        push_cooldown(&mut state, &cooldowns.manafont, MANAFONT_CD);
        push_cooldown(&mut state, &cooldowns.enochian, ENOCHIAN_CD);
        push_cooldown(&mut state, &self.gcd, NOMINAL_GCD);

        state.push(flag(self.umbral_hearts == 1));
        state.push(flag(self.umbral_hearts == 2));
        state.push(flag(self.umbral_hearts == 3));
        push_cooldown(&mut state, &cooldowns.transpose, TRANSPOSE_CD);

        debug_assert_eq!(state.len(), STATE_LEN);
        state
    }
}
