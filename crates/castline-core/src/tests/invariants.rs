//! Property tests over random fights.
//!
//! Each case builds a job from one seed and drives it with a random rotation
//! from another, checking the gauge, mana and resource invariants after every
//! driver step.

use proptest::prelude::*;

use crate::black_mage::rules::{MAX_GAUGE_STACKS, MAX_MANA, MAX_POLYGLOT, MAX_UMBRAL_HEARTS};
use crate::black_mage::{BlackMage, Element};
use crate::config::Opener;
use crate::job::{Job, JobAction};
use crate::rotation::RandomRotation;

use super::helpers::{geared_stats, run_checked};

fn check_state(job: &BlackMage) {
    assert!(job.gauge_stacks() <= MAX_GAUGE_STACKS);
    assert!(job.umbral_hearts() <= MAX_UMBRAL_HEARTS);
    assert!(job.polyglot() <= MAX_POLYGLOT);
    assert!(job.mana() <= MAX_MANA);
    assert!(job.resources_hold_invariant(), "tick {}", job.now());
    if job.element() == Element::Neutral {
        assert_eq!(job.gauge_stacks(), 0);
        assert_eq!(job.umbral_hearts(), 0);
        assert!(!job.enochian());
    }
}

fn opener() -> impl Strategy<Value = Opener> {
    prop_oneof![Just(Opener::PrecastBlizzard3), Just(Opener::Neutral)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Gauge, mana and timer invariants hold at every step of a random fight.
    #[test]
    fn random_fights_keep_invariants(
        job_seed in any::<u64>(),
        rotation_seed in any::<u64>(),
        opener in opener(),
    ) {
        let job = BlackMage::with_opener(geared_stats(), job_seed, opener).unwrap();
        let job = run_checked(job, 9000, &mut RandomRotation::new(rotation_seed), check_state);
        prop_assert!(job.now() >= 9000);
        prop_assert!(job.total_damage() >= 0.0);
    }

    /// The legal set is a pure function of the state and never mixes Idle with a GCD.
    #[test]
    fn legal_sets_are_stable(job_seed in any::<u64>(), rotation_seed in any::<u64>()) {
        let job = BlackMage::new(geared_stats(), job_seed).unwrap();
        run_checked(job, 6000, &mut RandomRotation::new(rotation_seed), |job| {
            let legal = job.legal_actions();
            assert_eq!(legal, job.legal_actions());
            assert_eq!(legal, job.legal_mask().actions().collect::<Vec<_>>());
            let idle = legal.iter().any(|action| action.is_idle());
            let gcd = legal.iter().any(|action| action.is_gcd());
            assert!(!(idle && gcd), "Idle and a GCD offered together at {}", job.now());
        });
    }

    /// The clock never runs past the next scheduled wake-up.
    #[test]
    fn next_event_delta_is_positive(job_seed in any::<u64>()) {
        let mut job = BlackMage::new(geared_stats(), job_seed).unwrap();
        let delta = job.next_event_delta();
        prop_assert!(matches!(delta, Some(d) if d > 0));
    }
}
