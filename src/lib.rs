//! Arc Operations - lazy discrete-event combat resolution on a hex map

pub mod combat;
pub mod core;
pub mod events;
pub mod force;
pub mod map;
pub mod theater;
