//! One side of a combat
//!
//! A combat group owns the side's roster and its three troop categories.
//! Each resolution pass it rebuilds the rounds-on-target accumulators,
//! rations ammunition, spends supplies through the detachments themselves
//! and absorbs the opponent's fire.

use serde::{Deserialize, Serialize};

use crate::combat::category::{unit_direct_power, CategoryKind, InvolvedUnit, TroopCategory};
use crate::combat::endurance::fatigue_modifier;
use crate::combat::engagement::CombatKind;
use crate::core::arena::Arena;
use crate::core::config::{CombatConfig, Doctrine, PENETRATION_CLASSES, WEIGHT_CLASSES};
use crate::core::dice::Dice;
use crate::core::error::Anomaly;
use crate::core::types::{DetachmentId, ForceId, Side, MINUTES_PER_DAY};
use crate::force::{ArmorClass, Armory, Detachment, IndirectReach, Mode, Tally, WeaponId};
use crate::map::EdgeCrossing;

/// Ammunition shortfalls below this many tons are rounding noise
const AMMO_EPSILON: f64 = 1e-9;

/// A detachment committed to one side of a combat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvolvedDetachment {
    pub detachment: DetachmentId,
    /// Minutes of preparation before it joined
    pub preparation: f64,
    /// Edge crossed to reach the combat, fixed at enlistment
    pub crossing: EdgeCrossing,

    // Per-pass figures, rebuilt by `assess_fire`
    #[serde(default)]
    pub fire_multiplier: f64,
    /// Tons of ammunition per minute at full commitment
    #[serde(default)]
    pub ammo_demand: f64,
    /// Tons of fuel per minute
    #[serde(default)]
    pub fuel_demand: f64,
    #[serde(default)]
    pub fatigue_rate: f64,
}

impl InvolvedDetachment {
    pub fn new(detachment: DetachmentId, preparation: f64, crossing: EdgeCrossing) -> Self {
        Self {
            detachment,
            preparation: preparation.max(0.0),
            crossing,
            fire_multiplier: 0.0,
            ammo_demand: 0.0,
            fuel_demand: 0.0,
            fatigue_rate: 1.0,
        }
    }
}

/// Rounds per minute (or per pass), split the way losses are resolved
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Salvo {
    /// Direct anti-personnel fire
    pub ap: f64,
    /// Direct anti-tank fire by penetration class
    pub at: [f64; PENETRATION_CLASSES],
    /// Indirect fire reaching the opponent's line only, by shell weight
    pub art_line: [f64; WEIGHT_CLASSES],
    /// Indirect fire reaching anywhere in the hex, by shell weight
    pub art_rear: [f64; WEIGHT_CLASSES],
}

impl Salvo {
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            ap: self.ap * factor,
            at: self.at.map(|v| v * factor),
            art_line: self.art_line.map(|v| v * factor),
            art_rear: self.art_rear.map(|v| v * factor),
        }
    }

    /// Weight of the direct fire
    pub fn direct_power(&self, config: &CombatConfig) -> f64 {
        self.ap * config.ap_power + self.at.iter().sum::<f64>() * config.at_power
    }

    pub fn power(&self, config: &CombatConfig) -> f64 {
        let indirect: f64 = self.art_line.iter().chain(self.art_rear.iter()).sum();
        self.direct_power(config) + indirect * config.artillery_power
    }
}

/// One stage of loss deduction. The order is fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LossStep {
    /// Anti-tank fire into the line; only hard targets can be killed
    AntiTank,
    /// Direct anti-personnel fire against the line
    DirectFire,
    /// Long-reaching indirect fire against artillery and passive troops
    RearArtillery,
    /// Indirect fire against the line
    FrontArtillery,
}

impl LossStep {
    pub const ORDER: [LossStep; 4] = [
        LossStep::AntiTank,
        LossStep::DirectFire,
        LossStep::RearArtillery,
        LossStep::FrontArtillery,
    ];

    fn classes(&self) -> usize {
        match self {
            LossStep::AntiTank => PENETRATION_CLASSES,
            LossStep::DirectFire => 1,
            LossStep::RearArtillery | LossStep::FrontArtillery => WEIGHT_CLASSES,
        }
    }

    fn rounds(&self, salvo: &Salvo, class: usize) -> f64 {
        match self {
            LossStep::AntiTank => salvo.at[class],
            LossStep::DirectFire => salvo.ap,
            LossStep::RearArtillery => salvo.art_rear[class],
            LossStep::FrontArtillery => salvo.art_line[class],
        }
    }

    fn kill_probability(&self, config: &CombatConfig, class: usize, armor: ArmorClass) -> f64 {
        let a = armor.index();
        match self {
            LossStep::AntiTank => config.at_kill[class][a],
            LossStep::DirectFire => config.ap_kill[a],
            LossStep::RearArtillery | LossStep::FrontArtillery => config.artillery_kill[class][a],
        }
    }
}

/// One inventory line exposed to a loss step
#[derive(Debug, Clone, Copy)]
struct Target {
    detachment: DetachmentId,
    unit: usize,
    line: usize,
    weapon: WeaponId,
    armor: ArmorClass,
    count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatGroup {
    pub side: Side,
    pub force: Option<ForceId>,
    roster: Vec<InvolvedDetachment>,

    pub line: TroopCategory,
    pub artillery: TroopCategory,
    pub passive: TroopCategory,

    /// Current holdings of the whole side
    pub tally: Tally,
    /// Items destroyed so far, by weapon id
    pub lost: Vec<u32>,

    /// Potential rounds per minute
    pub fire: Salvo,
    /// Rounds on target in the last pass
    pub rounds: Salvo,
    pub power: f64,
    pub line_power: f64,
    /// Ammunition per minute at full commitment (tons)
    pub demand: f64,

    pub ammo_ratio: f64,
    pub available_ammo: f64,
    /// Ammunition the committed fire spent in the last pass (tons)
    pub total_salvo: f64,

    target_count: u32,
    pass_kills: u32,
}

impl CombatGroup {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            force: None,
            roster: Vec::new(),
            line: TroopCategory::new(CategoryKind::Line),
            artillery: TroopCategory::new(CategoryKind::Artillery),
            passive: TroopCategory::new(CategoryKind::Passive),
            tally: Tally::default(),
            lost: Vec::new(),
            fire: Salvo::default(),
            rounds: Salvo::default(),
            power: 0.0,
            line_power: 0.0,
            demand: 0.0,
            ammo_ratio: 0.0,
            available_ammo: 0.0,
            total_salvo: 0.0,
            target_count: 0,
            pass_kills: 0,
        }
    }

    pub fn roster(&self) -> &[InvolvedDetachment] {
        &self.roster
    }

    pub fn detachments(&self) -> Vec<DetachmentId> {
        self.roster.iter().map(|e| e.detachment).collect()
    }

    pub fn involved(&self, detachment: DetachmentId) -> Option<&InvolvedDetachment> {
        self.roster.iter().find(|e| e.detachment == detachment)
    }

    pub fn contains(&self, detachment: DetachmentId) -> bool {
        self.involved(detachment).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.roster.is_empty()
    }

    pub fn len(&self) -> usize {
        self.roster.len()
    }

    /// Add a detachment to the roster; false if it is already on it
    pub fn enlist(
        &mut self,
        detachment: &Detachment,
        preparation: f64,
        crossing: EdgeCrossing,
    ) -> bool {
        if self.contains(detachment.id) {
            return false;
        }
        self.force.get_or_insert(detachment.force);
        self.roster
            .push(InvolvedDetachment::new(detachment.id, preparation, crossing));
        true
    }

    /// Drop a detachment from the roster and every category
    pub fn withdraw(&mut self, detachment: DetachmentId) -> bool {
        let before = self.roster.len();
        self.roster.retain(|e| e.detachment != detachment);
        if self.roster.len() == before {
            return false;
        }
        for category in [&mut self.line, &mut self.artillery, &mut self.passive] {
            category.remove_detachment(detachment);
        }
        true
    }

    /// Drop roster entries whose detachment no longer exists
    pub fn prune(&mut self, detachments: &Arena<DetachmentId, Detachment>) -> Vec<DetachmentId> {
        let missing: Vec<DetachmentId> = self
            .roster
            .iter()
            .map(|e| e.detachment)
            .filter(|id| !detachments.contains(*id))
            .collect();
        for id in &missing {
            self.withdraw(*id);
        }
        missing
    }

    /// Put every surviving unit of the roster into its category
    ///
    /// The earliest dug-in member of the roster holds the front.
    pub fn categorize(&mut self, kind: CombatKind, detachments: &Arena<DetachmentId, Detachment>) {
        self.line.clear();
        self.artillery.clear();
        self.passive.clear();

        let front = self
            .roster
            .iter()
            .filter_map(|e| detachments.get(e.detachment))
            .find(|d| d.mode == Mode::Defending)
            .map(|d| d.id);

        for entry in &self.roster {
            let Some(det) = detachments.get(entry.detachment) else {
                continue;
            };
            let holds_front = front == Some(det.id);
            for (index, unit) in det.units.iter().enumerate() {
                if unit.is_destroyed() {
                    continue;
                }
                let (category, reserve) = CategoryKind::classify(self.side, kind, det, unit, holds_front);
                let involved = InvolvedUnit::new(det.id, index, reserve);
                match category {
                    CategoryKind::Line => self.line.push(involved),
                    CategoryKind::Artillery => self.artillery.push(involved),
                    CategoryKind::Passive => self.passive.push(involved),
                }
            }
        }
    }

    /// Pull random reserves into the line until it is dense enough
    ///
    /// Returns the projected density of the dressed line.
    pub fn dress_line(
        &mut self,
        detachments: &Arena<DetachmentId, Detachment>,
        armory: &Armory,
        config: &CombatConfig,
        density_factor: f64,
        dice: &mut Dice,
    ) -> f64 {
        let scale = density_factor / config.frontage_capacity;
        let mut density = self.line.projected_power(detachments, armory, config) * scale;

        while density < config.density_threshold {
            let reserves = self.passive.reserves();
            let Some(pick) = dice.pick_index(reserves.len()) else {
                break;
            };
            let Some(mut unit) = self.passive.take(reserves[pick]) else {
                break;
            };
            unit.reserve = false;
            if let Some(u) = unit.resolve(detachments) {
                density += unit_direct_power(u, armory, config) * scale;
            }
            self.line.push(unit);
        }
        density
    }

    /// Recount targets in all three categories
    pub fn calculate_target_count(&mut self, detachments: &Arena<DetachmentId, Detachment>) -> u32 {
        self.pass_kills = 0;
        self.target_count = self.line.calculate_target_count(detachments)
            + self.artillery.calculate_target_count(detachments)
            + self.passive.calculate_target_count(detachments);
        self.target_count
    }

    pub fn target_count(&self) -> u32 {
        self.target_count
    }

    /// Rebuild potential fire, power and supply demand
    pub fn assess_fire(
        &mut self,
        detachments: &Arena<DetachmentId, Detachment>,
        armory: &Armory,
        config: &CombatConfig,
        anomalies: &mut Vec<Anomaly>,
    ) {
        let attacking = self.side == Side::Attacker;
        for entry in &mut self.roster {
            entry.ammo_demand = 0.0;
            entry.fuel_demand = 0.0;
            let Some(det) = detachments.get(entry.detachment) else {
                entry.fire_multiplier = 0.0;
                continue;
            };
            let doctrine = match config.doctrine(&det.doctrine) {
                Some(d) => d.clone(),
                None => {
                    tracing::warn!("{} has unknown doctrine '{}'", det.name, det.doctrine);
                    anomalies.push(Anomaly::UnknownDoctrine(det.id, det.doctrine.clone()));
                    Doctrine::default()
                }
            };
            let rate = if attacking {
                doctrine.attack_fire
            } else {
                doctrine.defense_fire
            };
            let preparation = if config.max_preparation > 0.0 {
                entry.preparation.min(config.max_preparation) / config.max_preparation
            } else {
                0.0
            };
            entry.fire_multiplier = rate
                * fatigue_modifier(det.fatigue, config)
                * (1.0 + preparation * config.preparation_bonus);
            entry.fatigue_rate = doctrine.fatigue_rate;
            entry.fuel_demand = det
                .units
                .iter()
                .flat_map(|u| u.equipment.iter())
                .filter_map(|e| armory.get(e.weapon).map(|w| w.fuel_per_minute * e.on_hand as f64))
                .sum::<f64>()
                * doctrine.fuel_rate;
        }

        self.fire = Salvo::default();
        accumulate(&self.line, true, &mut self.roster, detachments, armory, &mut self.fire);
        accumulate(&self.artillery, false, &mut self.roster, detachments, armory, &mut self.fire);

        self.power = self.fire.power(config);
        self.line_power = self.fire.direct_power(config);
        self.demand = self.roster.iter().map(|e| e.ammo_demand).sum();
    }

    /// Randomize this pass's ammunition ratio from the side's stock
    pub fn ration(
        &mut self,
        detachments: &Arena<DetachmentId, Detachment>,
        config: &CombatConfig,
        dice: &mut Dice,
        elapsed: f64,
    ) -> f64 {
        self.available_ammo = self
            .roster
            .iter()
            .filter_map(|e| detachments.get(e.detachment))
            .map(|d| d.ammunition)
            .sum();
        let multiplier = dice
            .log_normal(config.ammo_multiplier_mu, config.ammo_multiplier_sigma)
            .clamp(config.ammo_multiplier_min, config.ammo_multiplier_max);
        self.ammo_ratio = ammo_ratio(self.available_ammo, self.demand, elapsed, multiplier, config);
        self.ammo_ratio
    }

    /// Fix the committed share of fire for this pass
    pub fn commit(&mut self, involved: f64, elapsed: f64) {
        let share = elapsed * self.ammo_ratio * involved;
        self.total_salvo = self.demand * share;
        self.rounds = self.fire.scaled(share);
    }

    /// Spend ammunition and fuel and accrue fatigue for `elapsed` minutes
    pub fn consume(
        &self,
        detachments: &mut Arena<DetachmentId, Detachment>,
        config: &CombatConfig,
        elapsed: f64,
        involved: f64,
        anomalies: &mut Vec<Anomaly>,
    ) {
        for entry in &self.roster {
            let Some(det) = detachments.get_mut(entry.detachment) else {
                continue;
            };
            let ammo = entry.ammo_demand * elapsed * self.ammo_ratio * involved;
            if det.consume_ammunition(ammo) + AMMO_EPSILON < ammo {
                tracing::warn!("{} ran out of ammunition", det.name);
                anomalies.push(Anomaly::OutOfAmmunition(det.id));
            }
            let fuel = entry.fuel_demand * elapsed;
            if det.consume_fuel(fuel) + AMMO_EPSILON < fuel {
                tracing::warn!("{} ran out of fuel", det.name);
                anomalies.push(Anomaly::OutOfFuel(det.id));
            }
            det.add_fatigue(config.combat_fatigue_per_minute * elapsed * entry.fatigue_rate);
        }
    }

    /// Absorb one loss step of incoming fire; returns items destroyed
    #[allow(clippy::too_many_arguments)]
    pub fn absorb(
        &mut self,
        step: LossStep,
        incoming: &Salvo,
        detachments: &mut Arena<DetachmentId, Detachment>,
        armory: &Armory,
        config: &CombatConfig,
        cover: f64,
        dice: &mut Dice,
    ) -> u32 {
        let mut destroyed = 0;
        for class in 0..step.classes() {
            let rounds = stochastic_round(step.rounds(incoming, class), dice);
            if rounds == 0 {
                continue;
            }
            let targets = self.targets(step, detachments, armory);
            let mut pool: u64 = targets.iter().map(|t| t.count as u64).sum();
            let mut remaining = rounds;

            for target in targets {
                if remaining == 0 || pool == 0 {
                    break;
                }
                let hits = dice.binomial(remaining, target.count as f64 / pool as f64);
                remaining -= hits;
                pool -= target.count as u64;
                // Anti-tank rounds that land on soft items are wasted
                if hits == 0 || (step == LossStep::AntiTank && !target.armor.is_hard()) {
                    continue;
                }

                let p = (step.kill_probability(config, class, target.armor)
                    * self.exposure(target.detachment, cover, config))
                .clamp(0.0, 1.0);
                let budget = self.target_count.saturating_sub(self.pass_kills) as u64;
                let kills = dice
                    .binomial(hits, p)
                    .min(target.count as u64)
                    .min(budget) as u32;
                if kills == 0 {
                    continue;
                }

                let lost = apply_loss(detachments, armory, &target, kills);
                self.pass_kills += lost;
                destroyed += lost;
                if self.lost.len() <= target.weapon.0 {
                    self.lost.resize(target.weapon.0 + 1, 0);
                }
                self.lost[target.weapon.0] += lost;
            }
        }
        destroyed
    }

    /// Loss multiplier for a member: defenders shelter behind cover,
    /// attackers suffer for the edge they crossed
    fn exposure(&self, detachment: DetachmentId, cover: f64, config: &CombatConfig) -> f64 {
        match self.side {
            Side::Defender => 1.0 / cover.max(1.0),
            Side::Attacker => self
                .involved(detachment)
                .map_or(1.0, |e| config.crossing_multiplier[e.crossing.index()]),
        }
    }

    fn targets(
        &self,
        step: LossStep,
        detachments: &Arena<DetachmentId, Detachment>,
        armory: &Armory,
    ) -> Vec<Target> {
        let categories = match step {
            LossStep::RearArtillery => vec![&self.artillery, &self.passive],
            _ => vec![&self.line],
        };
        let mut targets = Vec::new();
        for category in categories {
            for involved in category.iter() {
                let Some(unit) = involved.resolve(detachments) else {
                    continue;
                };
                for (line, item) in unit.equipment.iter().enumerate() {
                    if item.on_hand == 0 {
                        continue;
                    }
                    let armor = armory.get(item.weapon).map(|w| w.armor).unwrap_or_default();
                    targets.push(Target {
                        detachment: involved.detachment,
                        unit: involved.unit,
                        line,
                        weapon: item.weapon,
                        armor,
                        count: item.on_hand,
                    });
                }
            }
        }
        targets
    }

    /// Recount current holdings of the side
    pub fn rebuild_tally(&mut self, detachments: &Arena<DetachmentId, Detachment>, weapons: usize) {
        let mut tally = Tally::new(weapons);
        for det in self.roster.iter().filter_map(|e| detachments.get(e.detachment)) {
            tally.merge(&det.tally(weapons));
        }
        self.tally = tally;
    }

    pub fn total_lost(&self) -> u32 {
        self.lost.iter().sum()
    }
}

/// Add one category's fire to the salvo and its ammunition demand to the
/// owning roster entries. Only the line fires direct.
fn accumulate(
    category: &TroopCategory,
    direct: bool,
    roster: &mut [InvolvedDetachment],
    detachments: &Arena<DetachmentId, Detachment>,
    armory: &Armory,
    fire: &mut Salvo,
) {
    for involved in category.iter() {
        let Some(entry) = roster.iter_mut().find(|e| e.detachment == involved.detachment) else {
            continue;
        };
        let Some(unit) = involved.resolve(detachments) else {
            continue;
        };
        for item in &unit.equipment {
            let Some(weapon) = armory.get(item.weapon) else {
                continue;
            };
            let n = item.on_hand as f64 * entry.fire_multiplier;
            let mut rounds = 0.0;
            if direct {
                fire.ap += weapon.ap_rate * n;
                fire.at[weapon.penetration.index()] += weapon.at_rate * n;
                rounds += (weapon.ap_rate + weapon.at_rate) * n;
            }
            if let Some(indirect) = weapon.indirect {
                let shells = indirect.rate * n;
                match indirect.reach {
                    IndirectReach::LineOnly => fire.art_line[indirect.weight.index()] += shells,
                    IndirectReach::Anywhere => fire.art_rear[indirect.weight.index()] += shells,
                }
                rounds += shells;
            }
            entry.ammo_demand += rounds * weapon.ammo_per_round;
        }
    }
}

/// Destroy items of one inventory line, draining the fuel they carried
fn apply_loss(
    detachments: &mut Arena<DetachmentId, Detachment>,
    armory: &Armory,
    target: &Target,
    kills: u32,
) -> u32 {
    let Some(det) = detachments.get_mut(target.detachment) else {
        return 0;
    };
    let carried = det.fuel_carried(armory);
    let Some(unit) = det.units.get_mut(target.unit) else {
        return 0;
    };
    let lost = unit.destroy(target.line, kills);
    if lost > 0 && carried > 0.0 {
        let per_item = armory.get(target.weapon).map_or(0.0, |w| w.fuel_carried);
        det.drain_fuel(per_item * lost as f64 / carried);
    }
    lost
}

/// Round a fractional count up or down with probability equal to the
/// fraction, so expectations are preserved for short passes
fn stochastic_round(value: f64, dice: &mut Dice) -> u64 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    let whole = value.floor();
    let extra = u64::from(dice.uniform() < value - whole);
    whole as u64 + extra
}

/// Share of potential fire a side can sustain this pass
///
/// Stock over one day of demand, scaled by the random multiplier, capped so
/// the pass never burns more than `max_ammo_fraction_per_pass` of the stock,
/// and clamped to [0, 1].
pub fn ammo_ratio(
    available: f64,
    demand: f64,
    elapsed: f64,
    multiplier: f64,
    config: &CombatConfig,
) -> f64 {
    if demand <= 0.0 || available <= 0.0 {
        return 0.0;
    }
    let mut ratio = available / (demand * MINUTES_PER_DAY as f64) * multiplier;
    let cap = config.max_ammo_fraction_per_pass * available;
    if elapsed > 0.0 && demand * elapsed * ratio > cap {
        ratio = cap / (demand * elapsed);
    }
    if ratio.is_nan() {
        return 0.0;
    }
    ratio.clamp(0.0, 1.0)
}

/// Fraction of defensive potential committed in a non-meeting combat
///
/// Follows the odds over the density, never below the configured minimum,
/// and capped so the defender's salvo stays within
/// `max_defense_commitment` of its stock.
pub fn involved_defense(
    ratio: f64,
    density: f64,
    demand: f64,
    elapsed: f64,
    ammo_ratio: f64,
    available: f64,
    config: &CombatConfig,
) -> f64 {
    let raw = if density > 0.0 { ratio / density } else { 1.0 };
    let mut involved = if raw.is_finite() {
        raw.clamp(config.min_involved_defense, 1.0)
    } else {
        1.0
    };
    let salvo = demand * elapsed * ammo_ratio * involved;
    let cap = config.max_defense_commitment * available;
    if salvo > cap && salvo > 0.0 {
        involved *= cap / salvo;
    }
    involved
}
