//! Weapon definitions
//!
//! The armory is the weapon table every unit's inventory indexes into. It is
//! built once per theater and only read afterwards.

use serde::{Deserialize, Serialize};

use crate::core::config::{ARMOR_CLASSES, PENETRATION_CLASSES, WEIGHT_CLASSES};

/// Index into the [`Armory`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WeaponId(pub usize);

/// Protection of an equipment item when it is the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ArmorClass {
    #[default]
    Soft,
    Light,
    Medium,
    Heavy,
}

impl ArmorClass {
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn is_hard(&self) -> bool {
        !matches!(self, ArmorClass::Soft)
    }

    pub fn all() -> [ArmorClass; ARMOR_CLASSES] {
        [
            ArmorClass::Soft,
            ArmorClass::Light,
            ArmorClass::Medium,
            ArmorClass::Heavy,
        ]
    }
}

/// Anti-tank penetration class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Penetration {
    #[default]
    Light,
    Medium,
    Heavy,
}

impl Penetration {
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn all() -> [Penetration; PENETRATION_CLASSES] {
        [Penetration::Light, Penetration::Medium, Penetration::Heavy]
    }
}

/// Artillery shell weight class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ShellWeight {
    #[default]
    Light,
    Medium,
    Heavy,
}

impl ShellWeight {
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn all() -> [ShellWeight; WEIGHT_CLASSES] {
        [ShellWeight::Light, ShellWeight::Medium, ShellWeight::Heavy]
    }
}

/// How deep into a contested hex indirect fire reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndirectReach {
    /// Only the opponent's front line (mortars, infantry guns)
    LineOnly,
    /// Anywhere in the hex, including artillery and rear echelons
    Anywhere,
}

/// Indirect fire capability of a weapon
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndirectFire {
    pub rate: f64,
    pub reach: IndirectReach,
    pub weight: ShellWeight,
}

/// A weapon type with its doctrine-independent rates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponSpec {
    pub name: String,
    /// Protection of the item itself
    pub armor: ArmorClass,
    /// Direct anti-personnel rounds per minute
    #[serde(default)]
    pub ap_rate: f64,
    /// Direct anti-tank rounds per minute
    #[serde(default)]
    pub at_rate: f64,
    #[serde(default)]
    pub penetration: Penetration,
    #[serde(default)]
    pub indirect: Option<IndirectFire>,
    /// Tons of ammunition per round
    pub ammo_per_round: f64,
    /// Fuel burned per minute of combat
    #[serde(default)]
    pub fuel_per_minute: f64,
    /// Fuel carried by one item, lost with it
    #[serde(default)]
    pub fuel_carried: f64,
}

impl WeaponSpec {
    /// A weapon that fires nothing (trucks, command vehicles)
    pub fn passive(name: &str, armor: ArmorClass) -> Self {
        Self {
            name: name.to_string(),
            armor,
            ap_rate: 0.0,
            at_rate: 0.0,
            penetration: Penetration::Light,
            indirect: None,
            ammo_per_round: 0.0,
            fuel_per_minute: 0.0,
            fuel_carried: 0.0,
        }
    }

    pub fn fires_direct(&self) -> bool {
        self.ap_rate > 0.0 || self.at_rate > 0.0
    }

    pub fn fires_indirect(&self) -> bool {
        self.indirect.is_some_and(|i| i.rate > 0.0)
    }
}

/// The weapon table
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Armory {
    weapons: Vec<WeaponSpec>,
}

impl Armory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, weapon: WeaponSpec) -> WeaponId {
        self.weapons.push(weapon);
        WeaponId(self.weapons.len() - 1)
    }

    pub fn get(&self, id: WeaponId) -> Option<&WeaponSpec> {
        self.weapons.get(id.0)
    }

    pub fn find(&self, name: &str) -> Option<WeaponId> {
        self.weapons.iter().position(|w| w.name == name).map(WeaponId)
    }

    pub fn len(&self) -> usize {
        self.weapons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weapons.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (WeaponId, &WeaponSpec)> {
        self.weapons.iter().enumerate().map(|(i, w)| (WeaponId(i), w))
    }

    /// Built-in mid-century weapon set
    pub fn standard() -> Self {
        let mut armory = Self::new();
        armory.add(WeaponSpec {
            name: "rifle squad".into(),
            armor: ArmorClass::Soft,
            ap_rate: 0.3,
            ammo_per_round: 0.0005,
            ..WeaponSpec::passive("", ArmorClass::Soft)
        });
        armory.add(WeaponSpec {
            name: "machine gun".into(),
            armor: ArmorClass::Soft,
            ap_rate: 0.8,
            ammo_per_round: 0.0008,
            ..WeaponSpec::passive("", ArmorClass::Soft)
        });
        armory.add(WeaponSpec {
            name: "at gun".into(),
            armor: ArmorClass::Soft,
            ap_rate: 0.05,
            at_rate: 0.2,
            penetration: Penetration::Medium,
            ammo_per_round: 0.01,
            ..WeaponSpec::passive("", ArmorClass::Soft)
        });
        armory.add(WeaponSpec {
            name: "medium tank".into(),
            armor: ArmorClass::Medium,
            ap_rate: 0.4,
            at_rate: 0.25,
            penetration: Penetration::Medium,
            ammo_per_round: 0.012,
            fuel_per_minute: 0.002,
            fuel_carried: 0.4,
            ..WeaponSpec::passive("", ArmorClass::Medium)
        });
        armory.add(WeaponSpec {
            name: "heavy tank".into(),
            armor: ArmorClass::Heavy,
            ap_rate: 0.4,
            at_rate: 0.25,
            penetration: Penetration::Heavy,
            ammo_per_round: 0.02,
            fuel_per_minute: 0.004,
            fuel_carried: 0.6,
            ..WeaponSpec::passive("", ArmorClass::Heavy)
        });
        armory.add(WeaponSpec {
            name: "mortar".into(),
            armor: ArmorClass::Soft,
            indirect: Some(IndirectFire {
                rate: 0.2,
                reach: IndirectReach::LineOnly,
                weight: ShellWeight::Light,
            }),
            ammo_per_round: 0.005,
            ..WeaponSpec::passive("", ArmorClass::Soft)
        });
        armory.add(WeaponSpec {
            name: "field howitzer".into(),
            armor: ArmorClass::Soft,
            indirect: Some(IndirectFire {
                rate: 0.1,
                reach: IndirectReach::Anywhere,
                weight: ShellWeight::Medium,
            }),
            ammo_per_round: 0.03,
            ..WeaponSpec::passive("", ArmorClass::Soft)
        });
        armory.add(WeaponSpec {
            name: "halftrack".into(),
            armor: ArmorClass::Light,
            ap_rate: 0.2,
            ammo_per_round: 0.0008,
            fuel_per_minute: 0.001,
            fuel_carried: 0.2,
            ..WeaponSpec::passive("", ArmorClass::Light)
        });
        armory.add(WeaponSpec {
            fuel_carried: 1.0,
            ..WeaponSpec::passive("truck", ArmorClass::Soft)
        });
        armory
    }
}
