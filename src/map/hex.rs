//! Hex coordinate system for the operational map (axial coordinates)

use serde::{Deserialize, Serialize};

/// Axial hex coordinate (q, r system)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct HexCoord {
    pub q: i32, // Column
    pub r: i32, // Row
}

impl HexCoord {
    pub fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// Cube coordinate S (derived from q and r)
    pub fn s(&self) -> i32 {
        -self.q - self.r
    }

    /// Get all 6 adjacent hexes, in [`HexDirection::all`] order
    pub fn neighbors(&self) -> [HexCoord; 6] {
        HexDirection::all().map(|d| self.step(d))
    }

    /// The adjacent hex in a direction
    pub fn step(&self, direction: HexDirection) -> HexCoord {
        let offset = direction.offset();
        HexCoord::new(self.q + offset.q, self.r + offset.r)
    }

    /// Distance in hex steps using axial coordinate formula
    pub fn distance(&self, other: &HexCoord) -> i32 {
        let dq = (self.q - other.q).abs();
        let dr = (self.r - other.r).abs();
        let ds = (self.s() - other.s()).abs();
        (dq + dr + ds) / 2
    }

    pub fn is_adjacent(&self, other: &HexCoord) -> bool {
        self.distance(other) == 1
    }

    /// Direction of an adjacent hex, `None` if not adjacent
    pub fn direction_to(&self, other: &HexCoord) -> Option<HexDirection> {
        HexDirection::all()
            .into_iter()
            .find(|d| self.step(*d) == *other)
    }
}

/// Direction enum for hex edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum HexDirection {
    #[default]
    East,
    NorthEast,
    NorthWest,
    West,
    SouthWest,
    SouthEast,
}

impl HexDirection {
    /// Get the hex offset for this direction
    pub fn offset(&self) -> HexCoord {
        match self {
            HexDirection::East => HexCoord::new(1, 0),
            HexDirection::NorthEast => HexCoord::new(1, -1),
            HexDirection::NorthWest => HexCoord::new(0, -1),
            HexDirection::West => HexCoord::new(-1, 0),
            HexDirection::SouthWest => HexCoord::new(-1, 1),
            HexDirection::SouthEast => HexCoord::new(0, 1),
        }
    }

    /// Get opposite direction
    pub fn opposite(&self) -> Self {
        match self {
            HexDirection::East => HexDirection::West,
            HexDirection::NorthEast => HexDirection::SouthWest,
            HexDirection::NorthWest => HexDirection::SouthEast,
            HexDirection::West => HexDirection::East,
            HexDirection::SouthWest => HexDirection::NorthEast,
            HexDirection::SouthEast => HexDirection::NorthWest,
        }
    }

    /// Bit of this edge in a per-cell edge mask
    pub fn bit(&self) -> u8 {
        1 << (*self as u8)
    }

    /// All directions
    pub fn all() -> [HexDirection; 6] {
        [
            HexDirection::East,
            HexDirection::NorthEast,
            HexDirection::NorthWest,
            HexDirection::West,
            HexDirection::SouthWest,
            HexDirection::SouthEast,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_coord_distance() {
        let a = HexCoord::new(0, 0);
        let b = HexCoord::new(2, 1);
        assert_eq!(a.distance(&b), 3);

        let c = HexCoord::new(0, 0);
        let d = HexCoord::new(0, 3);
        assert_eq!(c.distance(&d), 3);
    }

    #[test]
    fn test_hex_neighbors() {
        let center = HexCoord::new(0, 0);
        let neighbors = center.neighbors();
        assert_eq!(neighbors.len(), 6);

        // All neighbors should be distance 1 away
        for n in neighbors {
            assert_eq!(center.distance(&n), 1);
        }
    }

    #[test]
    fn test_direction_roundtrip() {
        let center = HexCoord::new(3, 4);
        for direction in HexDirection::all() {
            let neighbor = center.step(direction);
            assert_eq!(center.direction_to(&neighbor), Some(direction));
            assert_eq!(neighbor.step(direction.opposite()), center);
        }
        assert_eq!(center.direction_to(&HexCoord::new(9, 9)), None);
    }

    #[test]
    fn test_edge_bits_distinct() {
        let mask = HexDirection::all().iter().fold(0u8, |m, d| m | d.bit());
        assert_eq!(mask, 0b0011_1111);
    }
}
