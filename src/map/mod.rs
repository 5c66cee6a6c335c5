//! Operational map collaborator: hexes, terrain, occupancy, combat slots

pub mod grid;
pub mod hex;
pub mod terrain;

pub use grid::{HexCell, HexMap, MAX_FORTIFICATION};
pub use hex::{HexCoord, HexDirection};
pub use terrain::{EdgeCrossing, Terrain, TerrainModifiers};
