use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::{CombatId, DetachmentId};
use crate::map::HexCoord;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Detachment not found: {0}")]
    DetachmentNotFound(DetachmentId),

    #[error("Combat not found: {0}")]
    CombatNotFound(CombatId),

    #[error("{0} is not engaged in {1}")]
    NotEngaged(DetachmentId, CombatId),

    #[error("Invalid move: {0}")]
    InvalidMove(String),

    #[error("Hex off map: {0:?}")]
    OffMap(HexCoord),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;

/// Abort on a broken invariant. These indicate programmer error or
/// corrupted data, never a condition the simulation can recover from.
#[track_caller]
pub fn fatal(message: &str) -> ! {
    tracing::error!("fatal: {}", message);
    panic!("{}", message)
}

/// Recoverable conditions met during resolution
///
/// These are logged and recorded, and resolution carries on with degraded
/// values.
#[derive(Debug, Display, Clone, PartialEq, Serialize, Deserialize)]
pub enum Anomaly {
    #[display(fmt = "bad ratio in {}", _0)]
    BadRatio(CombatId),

    #[display(fmt = "{} out of fuel", _0)]
    OutOfFuel(DetachmentId),

    #[display(fmt = "{} out of ammunition", _0)]
    OutOfAmmunition(DetachmentId),

    #[display(fmt = "{} missing", _0)]
    MissingDetachment(DetachmentId),

    #[display(fmt = "{} has unknown doctrine '{}'", _0, _1)]
    UnknownDoctrine(DetachmentId, String),
}
