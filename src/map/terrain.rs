//! Terrain types and the modifiers combat reads from them

use serde::{Deserialize, Serialize};

/// Terrain of an operational hex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Terrain {
    #[default]
    Clear,
    Forest,
    Hills,
    Mountains,
    Marsh,
    Urban,
    Water,
}

impl Terrain {
    /// Cover the terrain gives defenders (divides their loss rate)
    pub fn defense(&self) -> f64 {
        match self {
            Self::Clear => 1.0,
            Self::Forest => 1.3,
            Self::Hills => 1.4,
            Self::Mountains => 2.0,
            Self::Marsh => 1.2,
            Self::Urban => 1.8,
            Self::Water => 1.0,
        }
    }

    /// How much defensive power a hex of this terrain packs per frontage
    pub fn density(&self) -> f64 {
        match self {
            Self::Clear => 1.0,
            Self::Forest => 1.3,
            Self::Hills => 1.2,
            Self::Mountains => 1.6,
            Self::Marsh => 0.8,
            Self::Urban => 1.5,
            Self::Water => 1.0,
        }
    }

    /// Extra defensive value of broken ground
    pub fn rough_defense(&self) -> f64 {
        match self {
            Self::Clear => 1.0,
            Self::Forest => 1.1,
            Self::Hills => 1.2,
            Self::Mountains => 1.5,
            Self::Marsh => 1.3,
            Self::Urban => 1.2,
            Self::Water => 1.0,
        }
    }

    /// March time to enter a hex of this terrain, `None` if impassable
    pub fn movement_minutes(&self) -> Option<f64> {
        match self {
            Self::Clear => Some(120.0),
            Self::Forest => Some(240.0),
            Self::Hills => Some(240.0),
            Self::Mountains => Some(480.0),
            Self::Marsh => Some(360.0),
            Self::Urban => Some(180.0),
            Self::Water => None,
        }
    }

    pub fn is_passable(&self) -> bool {
        self.movement_minutes().is_some()
    }
}

/// Type of hex edge crossed when entering a combat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EdgeCrossing {
    #[default]
    Plain,
    River,
    Coast,
}

impl EdgeCrossing {
    /// Index into per-crossing tables
    pub fn index(&self) -> usize {
        match self {
            Self::Plain => 0,
            Self::River => 1,
            Self::Coast => 2,
        }
    }
}

/// Terrain and fortification modifiers cached by a combat
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainModifiers {
    pub defense: f64,
    pub density: f64,
    pub rough_defense: f64,
    pub fortification: f64,
}

impl Default for TerrainModifiers {
    fn default() -> Self {
        Self {
            defense: 1.0,
            density: 1.0,
            rough_defense: 1.0,
            fortification: 1.0,
        }
    }
}

impl TerrainModifiers {
    /// Divisor applied to defender loss probabilities
    pub fn cover(&self) -> f64 {
        (self.defense * self.fortification).max(1.0)
    }

    /// Multiplier applied to raw defensive power when computing density
    pub fn density_factor(&self) -> f64 {
        self.density * self.fortification * self.rough_defense
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_water_impassable() {
        assert!(!Terrain::Water.is_passable());
        assert!(Terrain::Clear.is_passable());
    }

    #[test]
    fn test_rougher_terrain_defends_better() {
        assert!(Terrain::Hills.defense() > Terrain::Clear.defense());
        assert!(Terrain::Mountains.defense() > Terrain::Hills.defense());
    }

    #[test]
    fn test_cover_never_below_one() {
        let mods = TerrainModifiers {
            defense: 0.5,
            ..TerrainModifiers::default()
        };
        assert_eq!(mods.cover(), 1.0);
    }

    #[test]
    fn test_crossing_indices() {
        assert_eq!(EdgeCrossing::Plain.index(), 0);
        assert_eq!(EdgeCrossing::River.index(), 1);
        assert_eq!(EdgeCrossing::Coast.index(), 2);
    }
}
