//! Participants: detachments, their units and weapons
//!
//! Detachment → Unit → Equipment. Units are atomic; a detachment is the
//! map-located formation that fights, consumes and retreats as one.

pub mod detachment;
pub mod equipment;
pub mod tally;
pub mod unit;

pub use detachment::{Action, Detachment, DetachmentKind, Mode, MovePurpose, Status};
pub use equipment::{
    ArmorClass, Armory, IndirectFire, IndirectReach, Penetration, ShellWeight, WeaponId,
    WeaponSpec,
};
pub use tally::Tally;
pub use unit::{Equipment, Unit, UnitRole};
