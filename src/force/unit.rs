//! Atomic combat units and their weapon inventories

use serde::{Deserialize, Serialize};

use crate::force::equipment::{Armory, WeaponId};
use crate::force::tally::Tally;

/// Combat role of a unit, which drives its troop category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UnitRole {
    #[default]
    Infantry,
    Armor,
    AntiTank,
    Artillery,
    Support,
}

impl UnitRole {
    /// Roles that can hold a line
    pub fn is_combat(&self) -> bool {
        matches!(self, Self::Infantry | Self::Armor | Self::AntiTank)
    }
}

/// One line of a unit's inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    pub weapon: WeaponId,
    pub on_hand: u32,
    pub authorized: u32,
}

/// Smallest combat element (company/battery): no sub-units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub name: String,
    pub role: UnitRole,
    pub equipment: Vec<Equipment>,
}

impl Unit {
    pub fn new(name: &str, role: UnitRole) -> Self {
        Self {
            name: name.to_string(),
            role,
            equipment: Vec::new(),
        }
    }

    /// Add equipment at full authorized strength
    pub fn with(mut self, weapon: WeaponId, count: u32) -> Self {
        self.equipment.push(Equipment {
            weapon,
            on_hand: count,
            authorized: count,
        });
        self
    }

    /// Items left, across all weapons
    pub fn strength(&self) -> u32 {
        self.equipment.iter().map(|e| e.on_hand).sum()
    }

    pub fn is_destroyed(&self) -> bool {
        self.strength() == 0
    }

    /// Fuel carried in this unit's vehicles
    pub fn fuel_carried(&self, armory: &Armory) -> f64 {
        self.equipment
            .iter()
            .filter_map(|e| armory.get(e.weapon).map(|w| w.fuel_carried * e.on_hand as f64))
            .sum()
    }

    /// Destroy up to `count` items of one inventory line; returns items lost
    pub fn destroy(&mut self, line: usize, count: u32) -> u32 {
        match self.equipment.get_mut(line) {
            Some(item) => {
                let lost = count.min(item.on_hand);
                item.on_hand -= lost;
                lost
            }
            None => 0,
        }
    }

    pub fn add_to_tally(&self, tally: &mut Tally) {
        for item in &self.equipment {
            tally.add(item.weapon, item.on_hand, item.authorized);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destroy_caps_at_on_hand() {
        let armory = Armory::standard();
        let rifles = armory.find("rifle squad").unwrap();
        let mut unit = Unit::new("A Coy", UnitRole::Infantry).with(rifles, 9);

        assert_eq!(unit.destroy(0, 4), 4);
        assert_eq!(unit.strength(), 5);
        assert_eq!(unit.destroy(0, 40), 5);
        assert!(unit.is_destroyed());
        assert_eq!(unit.destroy(3, 1), 0);
    }

    #[test]
    fn test_tally_keeps_authorized() {
        let armory = Armory::standard();
        let tanks = armory.find("medium tank").unwrap();
        let mut unit = Unit::new("1 Sqn", UnitRole::Armor).with(tanks, 14);
        unit.destroy(0, 4);

        let mut tally = Tally::new(armory.len());
        unit.add_to_tally(&mut tally);
        assert_eq!(tally.on_hand(tanks), 10);
        assert_eq!(tally.authorized(tanks), 14);
        assert!((unit.fuel_carried(&armory) - 4.0).abs() < 1e-9);
    }
}
