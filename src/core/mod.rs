pub mod arena;
pub mod config;
pub mod dice;
pub mod error;
pub mod types;

pub use arena::{Arena, ArenaKey, Handle};
pub use config::{CombatConfig, Doctrine};
pub use dice::Dice;
pub use error::{Anomaly, Result, SimError};
pub use types::{CombatId, DetachmentId, EventId, ForceId, Minute, Side, MINUTES_PER_DAY};
