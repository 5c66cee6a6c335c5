//! Combat configuration with documented constants
//!
//! All tunable numbers of the resolution model live here. The config is
//! built once at theater start (defaults, or a TOML file) and passed by
//! reference to everything that needs it.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SimError};

/// Number of armor classes (Soft, Light, Medium, Heavy)
pub const ARMOR_CLASSES: usize = 4;
/// Number of anti-tank penetration classes (Light, Medium, Heavy)
pub const PENETRATION_CLASSES: usize = 3;
/// Number of artillery shell weight classes (Light, Medium, Heavy)
pub const WEIGHT_CLASSES: usize = 3;

/// Fire and fatigue multipliers of a doctrine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Doctrine {
    /// Multiplier on rate of fire when attacking
    pub attack_fire: f64,
    /// Multiplier on rate of fire when defending
    pub defense_fire: f64,
    /// Multiplier on fuel burned in combat
    pub fuel_rate: f64,
    /// Multiplier on fatigue accrued in combat
    pub fatigue_rate: f64,
}

impl Default for Doctrine {
    fn default() -> Self {
        Self {
            attack_fire: 1.0,
            defense_fire: 1.0,
            fuel_rate: 1.0,
            fatigue_rate: 1.0,
        }
    }
}

/// Configuration for combat resolution
///
/// Times are in minutes, ammunition in tons, rates per minute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    // === ENDURANCE ===
    /// Mean of the basic combat endurance draw
    ///
    /// A fresh detachment facing even odds at density 1.0 on open ground
    /// breaks after roughly this many minutes.
    pub endurance_mean: f64,

    /// Standard deviation of the basic combat endurance draw
    pub endurance_std_dev: f64,

    /// Floor of the fatigue modifier
    ///
    /// Endurance is scaled by `floor + (1 - floor) * (1 - fatigue)`, so a
    /// completely exhausted detachment keeps this fraction of its endurance.
    pub fatigue_floor: f64,

    /// Fraction of endurance after which a fresh detachment disrupts
    pub disrupt_fraction: f64,

    /// Defender endurance divisor when blocked + semi-blocked hexes reach 6
    pub encirclement_penalty: f64,

    /// Defender density under which the low-density penalty applies
    pub low_density_threshold: f64,

    /// Defender endurance divisor at low density
    pub low_density_penalty: f64,

    /// Bounds on the endurance modifier (ratio over density and cover)
    pub min_endurance_modifier: f64,
    pub max_endurance_modifier: f64,

    /// Longest time until a next event, however lopsided the combat
    pub max_endurance: f64,

    // === DISRUPTION ===
    /// Mean disruption duration before density/fatigue/ratio scaling
    pub disruption_mean: f64,
    pub disruption_std_dev: f64,
    /// Disruption never lasts longer than this
    pub max_disruption: f64,

    // === AMMUNITION ===
    /// Parameters of the log-normal ammunition multiplier (underlying normal)
    pub ammo_multiplier_mu: f64,
    pub ammo_multiplier_sigma: f64,
    /// Clamp applied to the log-normal multiplier
    pub ammo_multiplier_min: f64,
    pub ammo_multiplier_max: f64,

    /// Largest share of a side's stock one resolution pass may use
    pub max_ammo_fraction_per_pass: f64,

    /// Largest share of the defender's stock its committed fire may use
    pub max_defense_commitment: f64,

    /// Lower bound on the committed fraction of defensive potential
    pub min_involved_defense: f64,

    // === DENSITY ===
    /// `dress_line` stops pulling reserves once density reaches this
    pub density_threshold: f64,

    /// Defensive power one hex of frontage holds at density 1.0
    pub frontage_capacity: f64,

    // === POWER WEIGHTS ===
    /// Power contributed per direct anti-personnel round per minute
    pub ap_power: f64,
    /// Power contributed per anti-tank round per minute
    pub at_power: f64,
    /// Power contributed per indirect round per minute
    pub artillery_power: f64,

    // === KILL PROBABILITIES ===
    /// Chance an AP hit destroys an item, by target armor class
    pub ap_kill: [f64; ARMOR_CLASSES],
    /// Chance an AT hit destroys an item, by penetration then armor class
    pub at_kill: [[f64; ARMOR_CLASSES]; PENETRATION_CLASSES],
    /// Chance a shell hit destroys an item, by shell weight then armor class
    pub artillery_kill: [[f64; ARMOR_CLASSES]; WEIGHT_CLASSES],

    // === EDGE CROSSINGS ===
    /// Casualty multiplier for attackers by crossing (plain, river, coast)
    pub crossing_multiplier: [f64; 3],

    // === PREPARATION ===
    /// Preparation beyond this many minutes gives no further bonus
    pub max_preparation: f64,
    /// Fire bonus at full preparation (0.5 = +50%)
    pub preparation_bonus: f64,

    // === FATIGUE ===
    /// Fatigue accrued per minute of combat
    pub combat_fatigue_per_minute: f64,
    /// Fatigue recovered per minute out of combat
    pub rest_recovery_per_minute: f64,

    // === MOVEMENT ===
    /// Share of a step's march time an advance after combat still takes
    pub advance_delay_fraction: f64,
    /// Time a retreated detachment needs before it is idle again
    pub regroup_minutes: f64,
    /// Retreat score penalty for a hex in hostile zone of control
    pub retreat_zoc_penalty: f64,
    /// Retreat score bonus per hex closer to headquarters
    pub retreat_hq_bias: f64,

    // === CAPTURE ===
    /// Fortification kept when a hex changes hands
    pub captured_fortification_factor: f64,

    // === DOCTRINES ===
    pub doctrines: BTreeMap<String, Doctrine>,
}

impl Default for CombatConfig {
    fn default() -> Self {
        let mut doctrines = BTreeMap::new();
        doctrines.insert("standard".to_string(), Doctrine::default());
        doctrines.insert(
            "elastic".to_string(),
            Doctrine {
                attack_fire: 0.9,
                defense_fire: 1.2,
                fuel_rate: 1.0,
                fatigue_rate: 0.8,
            },
        );
        doctrines.insert(
            "shock".to_string(),
            Doctrine {
                attack_fire: 1.3,
                defense_fire: 0.9,
                fuel_rate: 1.4,
                fatigue_rate: 1.3,
            },
        );

        Self {
            // Endurance (about four hours at even odds)
            endurance_mean: 240.0,
            endurance_std_dev: 60.0,
            fatigue_floor: 0.3,
            disrupt_fraction: 0.6,
            encirclement_penalty: 2.0,
            low_density_threshold: 0.5,
            low_density_penalty: 1.5,
            min_endurance_modifier: 0.05,
            max_endurance_modifier: 20.0,
            max_endurance: 10_080.0,

            // Disruption
            disruption_mean: 90.0,
            disruption_std_dev: 30.0,
            max_disruption: 360.0,

            // Ammunition
            ammo_multiplier_mu: 0.0,
            ammo_multiplier_sigma: 0.25,
            ammo_multiplier_min: 0.5,
            ammo_multiplier_max: 1.5,
            max_ammo_fraction_per_pass: 0.5,
            max_defense_commitment: 0.8,
            min_involved_defense: 0.2,

            // Density
            density_threshold: 1.0,
            frontage_capacity: 100.0,

            // Power
            ap_power: 1.0,
            at_power: 2.0,
            artillery_power: 1.5,

            // Kill tables: soft, light, medium, heavy
            ap_kill: [0.08, 0.01, 0.0, 0.0],
            at_kill: [
                [0.05, 0.30, 0.05, 0.00],
                [0.05, 0.50, 0.30, 0.05],
                [0.05, 0.60, 0.50, 0.35],
            ],
            artillery_kill: [
                [0.03, 0.005, 0.0, 0.0],
                [0.06, 0.02, 0.005, 0.0],
                [0.10, 0.05, 0.02, 0.01],
            ],

            crossing_multiplier: [1.0, 1.5, 2.0],

            max_preparation: 240.0,
            preparation_bonus: 0.5,

            // Fatigue (about 0.7 per day of continuous fighting)
            combat_fatigue_per_minute: 0.0005,
            rest_recovery_per_minute: 0.0003,

            advance_delay_fraction: 0.5,
            regroup_minutes: 120.0,
            retreat_zoc_penalty: 5.0,
            retreat_hq_bias: 1.0,

            captured_fortification_factor: 0.5,

            doctrines,
        }
    }
}

impl CombatConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML. Missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: CombatConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Look up a doctrine, falling back to the default multipliers
    pub fn doctrine(&self, name: &str) -> Option<&Doctrine> {
        self.doctrines.get(name)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.endurance_mean <= 0.0 || self.endurance_std_dev < 0.0 {
            return Err(SimError::Config(
                "endurance_mean must be positive and endurance_std_dev non-negative".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.fatigue_floor) {
            return Err(SimError::Config(format!(
                "fatigue_floor ({}) must lie in [0, 1]",
                self.fatigue_floor
            )));
        }

        if !(0.0..1.0).contains(&self.disrupt_fraction) || self.disrupt_fraction == 0.0 {
            return Err(SimError::Config(format!(
                "disrupt_fraction ({}) must lie in (0, 1)",
                self.disrupt_fraction
            )));
        }

        if self.ammo_multiplier_min > self.ammo_multiplier_max {
            return Err(SimError::Config(format!(
                "ammo_multiplier_min ({}) exceeds ammo_multiplier_max ({})",
                self.ammo_multiplier_min, self.ammo_multiplier_max
            )));
        }

        // Pass caps are fractions of stock
        for (name, value) in [
            ("max_ammo_fraction_per_pass", self.max_ammo_fraction_per_pass),
            ("max_defense_commitment", self.max_defense_commitment),
            ("min_involved_defense", self.min_involved_defense),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SimError::Config(format!("{} ({}) must lie in [0, 1]", name, value)));
            }
        }

        if self.min_endurance_modifier <= 0.0
            || self.min_endurance_modifier > self.max_endurance_modifier
        {
            return Err(SimError::Config("endurance modifier bounds are inverted".into()));
        }

        if self.frontage_capacity <= 0.0 {
            return Err(SimError::Config("frontage_capacity must be positive".into()));
        }

        let tables = self
            .ap_kill
            .iter()
            .chain(self.at_kill.iter().flatten())
            .chain(self.artillery_kill.iter().flatten());
        for p in tables {
            if !(0.0..=1.0).contains(p) {
                return Err(SimError::Config(format!("kill probability {} outside [0, 1]", p)));
            }
        }

        Ok(())
    }
}
