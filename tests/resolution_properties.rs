//! Property tests for the clamped quantities of a resolution pass

use arc_operations::combat::{ammo_ratio, involved_defense};
use arc_operations::combat::endurance::{endurance, endurance_modifier};
use arc_operations::core::{CombatConfig, Dice};
use arc_operations::map::TerrainModifiers;
use proptest::prelude::*;

proptest! {
    #[test]
    fn ammo_ratio_is_a_fraction(
        available in 0.0f64..1e4,
        demand in 0.0f64..10.0,
        elapsed in 0.0f64..20_000.0,
        multiplier in 0.0f64..3.0,
    ) {
        let config = CombatConfig::default();
        let ratio = ammo_ratio(available, demand, elapsed, multiplier, &config);
        prop_assert!((0.0..=1.0).contains(&ratio));
        // Never more than half the stock in one pass
        prop_assert!(demand * elapsed * ratio <= 0.5 * available * (1.0 + 1e-9) + 1e-12);
    }

    #[test]
    fn defender_salvo_within_commitment(
        ratio in 0.0f64..50.0,
        density in 0.0f64..5.0,
        demand in 0.0f64..10.0,
        elapsed in 1.0f64..20_000.0,
        available in 0.0f64..1e4,
        multiplier in 0.5f64..1.5,
    ) {
        let config = CombatConfig::default();
        let ammo = ammo_ratio(available, demand, elapsed, multiplier, &config);
        let involved = involved_defense(ratio, density, demand, elapsed, ammo, available, &config);
        prop_assert!(involved >= 0.0 && involved <= 1.0);
        prop_assert!(demand * elapsed * ammo * involved <= 0.8 * available * (1.0 + 1e-9) + 1e-12);
    }

    #[test]
    fn endurance_modifier_stays_in_bounds(ratio in 0.0f64..1e6, density in 0.0f64..10.0) {
        let config = CombatConfig::default();
        let m = endurance_modifier(ratio, density, &TerrainModifiers::default(), &config);
        prop_assert!(m >= config.min_endurance_modifier && m <= config.max_endurance_modifier);
    }

    #[test]
    fn dice_draws_in_range(seed in any::<u64>(), n in 0u64..500, p in 0.0f64..1.0, lo in -10i32..10, span in 0i32..20) {
        let config = CombatConfig::default();
        let mut dice = Dice::new(seed);
        let u = dice.uniform();
        prop_assert!((0.0..1.0).contains(&u));
        prop_assert!(dice.binomial(n, p) <= n);
        let roll = dice.die_roll(lo, lo + span);
        prop_assert!(roll >= lo && roll <= lo + span);
        let e = endurance(&mut dice, &config, p, 1.0);
        prop_assert!(e >= 1.0 && e <= config.max_endurance);
    }
}
