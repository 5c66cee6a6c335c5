//! Combat resolution
//!
//! Troop categories and combat groups do the fire exchange; endurance
//! decides when someone breaks; the combat record ties a hex's two sides
//! together.

pub mod category;
pub mod endurance;
pub mod engagement;
pub mod group;

pub use category::{CategoryKind, InvolvedUnit, TroopCategory};
pub use endurance::{Breakpoint, NextBreak};
pub use engagement::{Battlefield, Combat, CombatKind, CombatStats};
pub use group::{ammo_ratio, involved_defense, CombatGroup, InvolvedDetachment, LossStep, Salvo};
