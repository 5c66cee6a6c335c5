//! Detachments - the deployed, map-located participants of combat
//!
//! A detachment owns its fuel, ammunition and fatigue. Combat groups compute
//! aggregate consumption but always spend through [`Detachment::consume_fuel`]
//! and [`Detachment::consume_ammunition`].

use serde::{Deserialize, Serialize};

use crate::core::config::CombatConfig;
use crate::core::types::{CombatId, DetachmentId, ForceId, Minute};
use crate::force::equipment::Armory;
use crate::force::tally::Tally;
use crate::force::unit::{Unit, UnitRole};
use crate::map::HexCoord;

/// Closed set of detachment kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DetachmentKind {
    #[default]
    Combat,
    Headquarters,
    Supply,
}

/// Current posture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Mode {
    #[default]
    Idle,
    Moving,
    Attacking,
    Defending,
    Disrupted,
    Retreating,
    Regrouping,
}

impl Mode {
    /// Postures in which a detachment cannot fight
    pub fn is_broken(&self) -> bool {
        matches!(self, Mode::Disrupted | Mode::Retreating | Mode::Regrouping)
    }
}

/// Why a detachment is marching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovePurpose {
    Order,
    Advance,
    Retreat,
}

/// What the detachment is doing right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Action {
    #[default]
    Idle,
    Move { to: HexCoord, purpose: MovePurpose },
}

/// Lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Status {
    #[default]
    Active,
    Destroyed,
    Surrendered,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detachment {
    pub id: DetachmentId,
    pub name: String,
    pub force: ForceId,
    pub kind: DetachmentKind,
    pub units: Vec<Unit>,

    // Position
    pub location: HexCoord,
    pub headquarters: Option<HexCoord>,

    // Supplies (tons)
    pub fuel: f64,
    pub fuel_capacity: f64,
    pub ammunition: f64,
    pub ammo_capacity: f64,

    // State
    pub fatigue: f64, // 0.0 (fresh) to 1.0 (exhausted)
    pub mode: Mode,
    pub action: Action,
    pub status: Status,
    pub doctrine: String,
    pub disrupted_until: Option<Minute>,
    pub combat: Option<CombatId>,
    pub last_updated: Minute,
}

impl Detachment {
    pub fn new(id: DetachmentId, name: &str, force: ForceId, location: HexCoord) -> Self {
        Self {
            id,
            name: name.to_string(),
            force,
            kind: DetachmentKind::Combat,
            units: Vec::new(),
            location,
            headquarters: None,
            fuel: 0.0,
            fuel_capacity: 0.0,
            ammunition: 0.0,
            ammo_capacity: 0.0,
            fatigue: 0.0,
            mode: Mode::Idle,
            action: Action::Idle,
            status: Status::Active,
            doctrine: "standard".to_string(),
            disrupted_until: None,
            combat: None,
            last_updated: 0,
        }
    }

    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.units.push(unit);
        self
    }

    /// Fill fuel and ammunition to the given capacities
    pub fn with_supplies(mut self, fuel: f64, ammunition: f64) -> Self {
        self.fuel = fuel;
        self.fuel_capacity = fuel;
        self.ammunition = ammunition;
        self.ammo_capacity = ammunition;
        self
    }

    pub fn with_kind(mut self, kind: DetachmentKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_headquarters(mut self, hq: HexCoord) -> Self {
        self.headquarters = Some(hq);
        self
    }

    pub fn with_doctrine(mut self, doctrine: &str) -> Self {
        self.doctrine = doctrine.to_string();
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_fatigue(mut self, fatigue: f64) -> Self {
        self.fatigue = fatigue.clamp(0.0, 1.0);
        self
    }

    /// Items left across all units
    pub fn strength(&self) -> u32 {
        self.units.iter().map(|u| u.strength()).sum()
    }

    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }

    pub fn is_destroyed(&self) -> bool {
        self.strength() == 0
    }

    pub fn opposes(&self, other: &Detachment) -> bool {
        self.force.opposes(other.force)
    }

    /// Whether the detachment is marching into a given hex
    pub fn is_entering(&self, hex: HexCoord) -> bool {
        matches!(self.action, Action::Move { to, purpose } if to == hex && purpose != MovePurpose::Retreat)
    }

    pub fn is_disrupted(&self, now: Minute) -> bool {
        self.disrupted_until.is_some_and(|until| until > now)
    }

    /// Whether the detachment projects a zone of control into its neighbors
    pub fn exerts_zoc(&self) -> bool {
        self.is_active()
            && self.kind == DetachmentKind::Combat
            && matches!(self.mode, Mode::Idle | Mode::Defending | Mode::Attacking)
            && matches!(self.action, Action::Idle)
            && self
                .units
                .iter()
                .any(|u| u.role.is_combat() && !u.is_destroyed())
    }

    /// Spend fuel; returns the amount actually available and spent
    pub fn consume_fuel(&mut self, amount: f64) -> f64 {
        let spent = amount.max(0.0).min(self.fuel);
        self.fuel -= spent;
        spent
    }

    /// Spend ammunition; returns the amount actually available and spent
    pub fn consume_ammunition(&mut self, amount: f64) -> f64 {
        let spent = amount.max(0.0).min(self.ammunition);
        self.ammunition -= spent;
        spent
    }

    /// Lose a fraction of carried fuel along with destroyed vehicles
    pub fn drain_fuel(&mut self, fraction: f64) {
        self.fuel *= 1.0 - fraction.clamp(0.0, 1.0);
    }

    pub fn add_fatigue(&mut self, delta: f64) {
        self.fatigue = (self.fatigue + delta).clamp(0.0, 1.0);
    }

    /// Fuel carried by the vehicles of all units
    pub fn fuel_carried(&self, armory: &Armory) -> f64 {
        self.units.iter().map(|u| u.fuel_carried(armory)).sum()
    }

    pub fn has_role(&self, role: UnitRole) -> bool {
        self.units.iter().any(|u| u.role == role && !u.is_destroyed())
    }

    pub fn tally(&self, weapons: usize) -> Tally {
        let mut tally = Tally::new(weapons);
        for unit in &self.units {
            unit.add_to_tally(&mut tally);
        }
        tally
    }

    /// Start a disruption lasting until `until`
    pub fn disrupt(&mut self, until: Minute) {
        self.disrupted_until = Some(until);
        self.mode = Mode::Disrupted;
    }

    /// Resume standing orders
    pub fn go_idle(&mut self) {
        self.mode = Mode::Idle;
        self.action = Action::Idle;
    }

    /// Bring time-dependent state up to `now`
    ///
    /// Out of combat, fatigue recovers. An expired disruption is cleared.
    /// Returns true when the posture changed.
    pub fn make_current(&mut self, now: Minute, config: &CombatConfig) -> bool {
        if now <= self.last_updated {
            return false;
        }
        let elapsed = (now - self.last_updated) as f64;
        self.last_updated = now;

        let resting = self.combat.is_none()
            && matches!(self.mode, Mode::Idle | Mode::Defending | Mode::Regrouping);
        if resting {
            self.add_fatigue(-config.rest_recovery_per_minute * elapsed);
        }

        if self.mode == Mode::Disrupted && !self.is_disrupted(now) {
            self.disrupted_until = None;
            self.mode = if self.combat.is_some() {
                Mode::Defending
            } else {
                Mode::Idle
            };
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::arena::Handle;

    fn test_detachment() -> Detachment {
        let armory = Armory::standard();
        let rifles = armory.find("rifle squad").unwrap();
        Detachment::new(
            DetachmentId(Handle::new(0, 0)),
            "1st Bn",
            ForceId(1),
            HexCoord::new(2, 2),
        )
        .with_unit(Unit::new("A Coy", UnitRole::Infantry).with(rifles, 9))
        .with_supplies(10.0, 20.0)
    }

    #[test]
    fn test_consumption_never_goes_negative() {
        let mut det = test_detachment();
        assert_eq!(det.consume_fuel(4.0), 4.0);
        assert_eq!(det.consume_fuel(40.0), 6.0);
        assert_eq!(det.fuel, 0.0);
        assert_eq!(det.consume_ammunition(-3.0), 0.0);
        assert_eq!(det.ammunition, 20.0);
    }

    #[test]
    fn test_zoc_requires_idle_combat_unit() {
        let mut det = test_detachment();
        assert!(det.exerts_zoc());

        det.mode = Mode::Retreating;
        assert!(!det.exerts_zoc());

        det.mode = Mode::Idle;
        det.action = Action::Move {
            to: HexCoord::new(3, 2),
            purpose: MovePurpose::Order,
        };
        assert!(!det.exerts_zoc());

        det.action = Action::Idle;
        det.kind = DetachmentKind::Supply;
        assert!(!det.exerts_zoc());
    }

    #[test]
    fn test_disruption_expires_on_make_current() {
        let config = CombatConfig::default();
        let mut det = test_detachment();
        det.disrupt(100);
        assert!(det.is_disrupted(50));

        assert!(!det.make_current(50, &config));
        assert_eq!(det.mode, Mode::Disrupted);

        assert!(det.make_current(100, &config));
        assert_eq!(det.mode, Mode::Idle);
        assert!(det.disrupted_until.is_none());
    }

    #[test]
    fn test_rest_recovers_fatigue() {
        let config = CombatConfig::default();
        let mut det = test_detachment().with_fatigue(0.5);
        det.make_current(1000, &config);
        assert!(det.fatigue < 0.5);
        assert!(det.fatigue >= 0.0);
    }

    #[test]
    fn test_entering_ignores_retreat() {
        let mut det = test_detachment();
        let hex = HexCoord::new(3, 2);
        det.action = Action::Move {
            to: hex,
            purpose: MovePurpose::Order,
        };
        assert!(det.is_entering(hex));
        det.action = Action::Move {
            to: hex,
            purpose: MovePurpose::Retreat,
        };
        assert!(!det.is_entering(hex));
    }
}
