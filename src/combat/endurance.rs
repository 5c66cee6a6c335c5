//! Endurance and disruption timing
//!
//! Endurance is simulated time to breaking point. A fresh detachment
//! disrupts after a fraction of it; one already disrupted retreats once the
//! full endurance runs out.

use serde::{Deserialize, Serialize};

use crate::combat::engagement::{CombatKind, CombatStats};
use crate::core::config::CombatConfig;
use crate::core::dice::Dice;
use crate::core::types::{DetachmentId, Minute, Side};
use crate::force::{Detachment, Mode};
use crate::map::TerrainModifiers;

/// What happens to a detachment when it reaches its breaking point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Breakpoint {
    Disrupt,
    Retreat,
}

/// The earliest breaking point in a combat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextBreak {
    pub at: Minute,
    pub detachment: DetachmentId,
    pub breakpoint: Breakpoint,
}

/// Share of endurance kept at a given fatigue
pub fn fatigue_modifier(fatigue: f64, config: &CombatConfig) -> f64 {
    let floor = config.fatigue_floor;
    floor + (1.0 - floor) * (1.0 - fatigue.clamp(0.0, 1.0))
}

/// Ratio over density and cover, clamped to the configured bounds
pub fn endurance_modifier(
    ratio: f64,
    density: f64,
    terrain: &TerrainModifiers,
    config: &CombatConfig,
) -> f64 {
    let cover = density * terrain.defense * terrain.rough_defense;
    let raw = if cover > 0.0 && ratio.is_finite() {
        ratio / cover
    } else {
        config.max_endurance_modifier
    };
    raw.clamp(config.min_endurance_modifier, config.max_endurance_modifier)
}

/// Extra strain on a defender that is nearly surrounded or spread thin
pub fn defender_penalty(stats: &CombatStats, config: &CombatConfig) -> f64 {
    let mut penalty = 1.0;
    if stats.blocked_hexes + stats.semi_blocked_hexes >= 6 {
        penalty *= config.encirclement_penalty;
    }
    if stats.density < config.low_density_threshold {
        penalty *= config.low_density_penalty;
    }
    penalty
}

/// Divisor on endurance for one side of a combat
///
/// Meeting engagements have no prepared defender: both sides are treated
/// as attackers, the defending side with the ratio inverted and its own
/// density as the opposition.
pub fn side_modifier(
    side: Side,
    kind: CombatKind,
    stats: &CombatStats,
    terrain: &TerrainModifiers,
    config: &CombatConfig,
) -> f64 {
    match (side, kind) {
        (Side::Attacker, _) => 1.0 / endurance_modifier(stats.ratio, stats.density, terrain, config),
        (Side::Defender, CombatKind::Meeting) => {
            let inverted = if stats.ratio > 0.0 { 1.0 / stats.ratio } else { f64::INFINITY };
            1.0 / endurance_modifier(inverted, stats.attacker_density, terrain, config)
        }
        (Side::Defender, _) => {
            endurance_modifier(stats.ratio, stats.density, terrain, config)
                * defender_penalty(stats, config)
        }
    }
}

/// Draw a basic endurance and scale it, in minutes
pub fn endurance(dice: &mut Dice, config: &CombatConfig, fatigue: f64, modifier: f64) -> f64 {
    let base = dice
        .normal_with(config.endurance_mean, config.endurance_std_dev)
        .max(0.0);
    let scaled = base * fatigue_modifier(fatigue, config) / modifier.max(f64::EPSILON);
    scaled.clamp(1.0, config.max_endurance)
}

/// Breaking point candidate for one detachment, if it can still break
pub fn candidate(
    dice: &mut Dice,
    config: &CombatConfig,
    now: Minute,
    det: &Detachment,
    modifier: f64,
) -> Option<NextBreak> {
    if !det.is_active() || matches!(det.mode, Mode::Retreating | Mode::Regrouping) {
        return None;
    }
    let minutes = endurance(dice, config, det.fatigue, modifier);
    let (delay, breakpoint) = if det.mode == Mode::Disrupted {
        (minutes, Breakpoint::Retreat)
    } else {
        (minutes * config.disrupt_fraction, Breakpoint::Disrupt)
    };
    Some(NextBreak {
        at: now + (delay.round() as Minute).max(1),
        detachment: det.id,
        breakpoint,
    })
}

/// How long a disruption lasts, in minutes
///
/// `ratio` is the odds as seen by the disrupted side's opponent.
pub fn disruption_minutes(
    dice: &mut Dice,
    config: &CombatConfig,
    fatigue: f64,
    ratio: f64,
    density: f64,
) -> Minute {
    let bounds = config.min_endurance_modifier..=config.max_endurance_modifier;
    let clamp = |v: f64| {
        if v.is_finite() {
            v.clamp(*bounds.start(), *bounds.end())
        } else {
            *bounds.end()
        }
    };
    let base = dice
        .normal_with(config.disruption_mean, config.disruption_std_dev)
        .max(0.0);
    let minutes = base * (1.0 + fatigue.clamp(0.0, 1.0)) * clamp(ratio) / clamp(density);
    minutes.min(config.max_disruption).round() as Minute
}
