//! The combat record binding two groups at a hex
//!
//! A combat never advances on its own. `resolve` fast-forwards it from
//! `last_checked` to a given minute in one pass: categorize, fire, ration,
//! consume, deduct losses. The theater decides when that happens and what
//! follows.

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::combat::endurance::{candidate, side_modifier, NextBreak};
use crate::combat::group::{involved_defense, CombatGroup, LossStep};
use crate::core::arena::Arena;
use crate::core::config::CombatConfig;
use crate::core::dice::Dice;
use crate::core::error::Anomaly;
use crate::core::types::{CombatId, DetachmentId, EventId, Minute, Side};
use crate::force::{Armory, Detachment};
use crate::map::{HexCoord, TerrainModifiers};

/// How the combat started. Infiltration may become a meeting in place;
/// an assault may spawn a new meeting when it ends. Never the reverse.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombatKind {
    #[display(fmt = "assault")]
    Assault,
    #[display(fmt = "infiltration")]
    Infiltration,
    #[display(fmt = "meeting engagement")]
    Meeting,
}

/// Figures from the last assessment, read by endurance and retreat
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CombatStats {
    /// Attack power over defense power
    pub ratio: f64,
    /// Defender line power per frontage, after terrain
    pub density: f64,
    /// Attacker line power per frontage, used in meeting engagements
    pub attacker_density: f64,
    /// Committed share of defensive potential in the last pass
    pub involved_defense: f64,
    /// Neighbors closed to the defenders: enemy-held, impassable or off-map
    pub blocked_hexes: u8,
    /// Neighbors under hostile zone of control
    pub semi_blocked_hexes: u8,
    pub passes: u32,
}

/// Everything a resolution pass reads or mutates besides the combat itself
pub struct Battlefield<'a> {
    pub detachments: &'a mut Arena<DetachmentId, Detachment>,
    pub armory: &'a Armory,
    pub config: &'a CombatConfig,
    pub dice: &'a mut Dice,
    pub anomalies: &'a mut Vec<Anomaly>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combat {
    pub id: CombatId,
    pub cell: HexCoord,
    pub kind: CombatKind,
    pub attackers: CombatGroup,
    pub defenders: CombatGroup,
    pub terrain: TerrainModifiers,
    /// Minute up to which losses have been applied
    pub last_checked: Minute,
    pub next_event: Option<EventId>,
    pub started: Minute,
    pub stats: CombatStats,
}

impl Combat {
    pub fn new(
        id: CombatId,
        cell: HexCoord,
        kind: CombatKind,
        now: Minute,
        terrain: TerrainModifiers,
    ) -> Self {
        Self {
            id,
            cell,
            kind,
            attackers: CombatGroup::new(Side::Attacker),
            defenders: CombatGroup::new(Side::Defender),
            terrain,
            last_checked: now,
            next_event: None,
            started: now,
            stats: CombatStats {
                ratio: 1.0,
                density: 1.0,
                attacker_density: 1.0,
                involved_defense: 1.0,
                ..CombatStats::default()
            },
        }
    }

    pub fn group(&self, side: Side) -> &CombatGroup {
        match side {
            Side::Attacker => &self.attackers,
            Side::Defender => &self.defenders,
        }
    }

    pub fn group_mut(&mut self, side: Side) -> &mut CombatGroup {
        match side {
            Side::Attacker => &mut self.attackers,
            Side::Defender => &mut self.defenders,
        }
    }

    pub fn side_of(&self, detachment: DetachmentId) -> Option<Side> {
        if self.attackers.contains(detachment) {
            Some(Side::Attacker)
        } else if self.defenders.contains(detachment) {
            Some(Side::Defender)
        } else {
            None
        }
    }

    pub fn contains(&self, detachment: DetachmentId) -> bool {
        self.side_of(detachment).is_some()
    }

    pub fn participants(&self) -> Vec<DetachmentId> {
        let mut all = self.attackers.detachments();
        all.extend(self.defenders.detachments());
        all
    }

    /// A combat with an empty side must terminate
    pub fn is_over(&self) -> bool {
        self.attackers.is_empty() || self.defenders.is_empty()
    }

    /// The side left standing, if exactly one is
    pub fn survivors(&self) -> Option<Side> {
        match (self.attackers.is_empty(), self.defenders.is_empty()) {
            (false, true) => Some(Side::Attacker),
            (true, false) => Some(Side::Defender),
            _ => None,
        }
    }

    /// Rebuild categories, potential fire, ratio and density
    ///
    /// No time passes. Detachments that vanished from the arena are dropped
    /// from the rosters and reported.
    pub fn assess(&mut self, field: &mut Battlefield) {
        for missing in self
            .attackers
            .prune(field.detachments)
            .into_iter()
            .chain(self.defenders.prune(field.detachments))
        {
            tracing::warn!("{} missing from {}", missing, self.id);
            field.anomalies.push(Anomaly::MissingDetachment(missing));
        }

        self.attackers.categorize(self.kind, field.detachments);
        self.defenders.categorize(self.kind, field.detachments);

        let density_factor = self.terrain.density_factor();
        if self.kind != CombatKind::Meeting {
            self.defenders.dress_line(
                field.detachments,
                field.armory,
                field.config,
                density_factor,
                field.dice,
            );
        }
        self.attackers.calculate_target_count(field.detachments);
        self.defenders.calculate_target_count(field.detachments);

        self.attackers
            .assess_fire(field.detachments, field.armory, field.config, field.anomalies);
        self.defenders
            .assess_fire(field.detachments, field.armory, field.config, field.anomalies);

        let config = field.config;
        let attack = self.attackers.power;
        let defense = self.defenders.power;
        self.stats.ratio = if attack <= 0.0 {
            tracing::warn!("bad ratio in {} at {:?}", self.id, self.cell);
            field.anomalies.push(Anomaly::BadRatio(self.id));
            config.min_endurance_modifier
        } else if defense <= 0.0 {
            config.max_endurance_modifier
        } else {
            attack / defense
        };

        let scale = density_factor / config.frontage_capacity;
        self.stats.density = self.defenders.line_power * scale;
        self.stats.attacker_density = self.attackers.line_power * scale;
    }

    /// Exchange fire for `elapsed` minutes using the current assessment
    pub fn exchange(&mut self, elapsed: f64, field: &mut Battlefield) {
        let config = field.config;
        self.attackers
            .ration(field.detachments, config, field.dice, elapsed);
        self.defenders
            .ration(field.detachments, config, field.dice, elapsed);

        let involved = if self.kind == CombatKind::Meeting {
            1.0
        } else {
            involved_defense(
                self.stats.ratio,
                self.stats.density,
                self.defenders.demand,
                elapsed,
                self.defenders.ammo_ratio,
                self.defenders.available_ammo,
                config,
            )
        };
        self.stats.involved_defense = involved;

        self.attackers.commit(1.0, elapsed);
        self.defenders.commit(involved, elapsed);
        self.attackers
            .consume(field.detachments, config, elapsed, 1.0, field.anomalies);
        self.defenders
            .consume(field.detachments, config, elapsed, involved, field.anomalies);

        let cover = self.terrain.cover();
        let at_defenders = self.attackers.rounds;
        let at_attackers = self.defenders.rounds;
        let mut attacker_losses = 0;
        let mut defender_losses = 0;
        for step in LossStep::ORDER {
            defender_losses += self.defenders.absorb(
                step,
                &at_defenders,
                field.detachments,
                field.armory,
                config,
                cover,
                field.dice,
            );
            attacker_losses += self.attackers.absorb(
                step,
                &at_attackers,
                field.detachments,
                field.armory,
                config,
                cover,
                field.dice,
            );
        }

        let weapons = field.armory.len();
        self.attackers.rebuild_tally(field.detachments, weapons);
        self.defenders.rebuild_tally(field.detachments, weapons);
        self.stats.passes += 1;

        tracing::debug!(
            "{} at {:?}: {:.0} min, ratio {:.2}, density {:.2}, involved {:.2}, losses {}/{}",
            self.kind,
            self.cell,
            elapsed,
            self.stats.ratio,
            self.stats.density,
            involved,
            attacker_losses,
            defender_losses
        );
    }

    /// Fast-forward from `last_checked` to `now`; false if no time passed
    pub fn resolve(&mut self, now: Minute, field: &mut Battlefield) -> bool {
        if now <= self.last_checked {
            return false;
        }
        let elapsed = (now - self.last_checked) as f64;
        self.assess(field);
        self.exchange(elapsed, field);
        self.last_checked = now;
        true
    }

    /// Earliest breaking point over both sides
    pub fn plan_next_break(&self, now: Minute, field: &mut Battlefield) -> Option<NextBreak> {
        let mut best: Option<NextBreak> = None;
        for side in [Side::Attacker, Side::Defender] {
            let modifier = side_modifier(side, self.kind, &self.stats, &self.terrain, field.config);
            for id in self.group(side).detachments() {
                let Some(det) = field.detachments.get(id) else {
                    continue;
                };
                if let Some(next) = candidate(field.dice, field.config, now, det, modifier) {
                    if best.map_or(true, |b| next.at < b.at) {
                        best = Some(next);
                    }
                }
            }
        }
        best
    }
}
