//! Operational map - hex cells with terrain, occupancy and combat slots
//!
//! The map is the single place that knows which combat (if any) is being
//! fought in a hex. Only combat creation and termination write that slot.

use serde::{Deserialize, Serialize};

use crate::core::types::{CombatId, DetachmentId, ForceId};
use crate::map::hex::HexCoord;
use crate::map::terrain::{EdgeCrossing, Terrain, TerrainModifiers};

/// Extra march time for crossing a river edge
pub const RIVER_CROSSING_MINUTES: f64 = 60.0;

/// Highest fortification level a hex can hold
pub const MAX_FORTIFICATION: f64 = 3.0;

/// Defensive value added per fortification level
const FORTIFICATION_STEP: f64 = 0.25;

/// A single hex on the operational map
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HexCell {
    pub terrain: Terrain,
    /// 0.0 (open) to MAX_FORTIFICATION (fortress)
    pub fortification: f64,
    /// Edges carrying a river, by [`HexDirection::bit`](crate::map::HexDirection::bit)
    pub river_edges: u8,
    /// Edges that are a landing beach
    pub coast_edges: u8,
    pub owner: Option<ForceId>,
    pub occupants: Vec<DetachmentId>,
    pub combat: Option<CombatId>,
}

impl HexCell {
    pub fn new(terrain: Terrain) -> Self {
        Self {
            terrain,
            ..Self::default()
        }
    }

    pub fn fortification_modifier(&self) -> f64 {
        1.0 + self.fortification.clamp(0.0, MAX_FORTIFICATION) * FORTIFICATION_STEP
    }
}

/// Rectangular axial map, q in 0..width and r in 0..height
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HexMap {
    pub width: i32,
    pub height: i32,
    cells: Vec<HexCell>,
}

impl HexMap {
    /// Create an all-clear map
    pub fn new(width: i32, height: i32) -> Self {
        let count = (width.max(0) * height.max(0)) as usize;
        Self {
            width,
            height,
            cells: vec![HexCell::new(Terrain::Clear); count],
        }
    }

    /// Generate a simple map with varied terrain
    pub fn generate(width: i32, height: i32, seed: u64) -> Self {
        let mut map = Self::new(width, height);

        for q in 0..width {
            for r in 0..height {
                let hash = Self::simple_hash(q, r, seed);
                let terrain = match hash % 10 {
                    0..=4 => Terrain::Clear,
                    5 => Terrain::Forest,
                    6 => Terrain::Hills,
                    7 => Terrain::Marsh,
                    8 => Terrain::Urban,
                    _ => Terrain::Mountains,
                };
                if let Some(cell) = map.cell_mut(HexCoord::new(q, r)) {
                    cell.terrain = terrain;
                }
            }
        }

        map
    }

    fn simple_hash(q: i32, r: i32, seed: u64) -> u64 {
        let mut h = seed;
        h = h.wrapping_mul(31).wrapping_add(q as u64);
        h = h.wrapping_mul(31).wrapping_add(r as u64);
        h ^ (h >> 16)
    }

    fn index(&self, coord: HexCoord) -> Option<usize> {
        if coord.q < 0 || coord.r < 0 || coord.q >= self.width || coord.r >= self.height {
            return None;
        }
        Some((coord.q * self.height + coord.r) as usize)
    }

    /// Check if a coordinate is within the map bounds
    pub fn contains(&self, coord: HexCoord) -> bool {
        self.index(coord).is_some()
    }

    pub fn cell(&self, coord: HexCoord) -> Option<&HexCell> {
        self.index(coord).map(|i| &self.cells[i])
    }

    pub fn cell_mut(&mut self, coord: HexCoord) -> Option<&mut HexCell> {
        self.index(coord).map(move |i| &mut self.cells[i])
    }

    pub fn terrain(&self, coord: HexCoord) -> Option<Terrain> {
        self.cell(coord).map(|c| c.terrain)
    }

    pub fn set_terrain(&mut self, coord: HexCoord, terrain: Terrain) {
        if let Some(cell) = self.cell_mut(coord) {
            cell.terrain = terrain;
        }
    }

    pub fn set_fortification(&mut self, coord: HexCoord, level: f64) {
        if let Some(cell) = self.cell_mut(coord) {
            cell.fortification = level.clamp(0.0, MAX_FORTIFICATION);
        }
    }

    /// Mark the shared edge of two adjacent hexes as a river
    pub fn set_river(&mut self, a: HexCoord, b: HexCoord) {
        self.mark_edge(a, b, |cell, bit| cell.river_edges |= bit);
    }

    /// Mark the shared edge of two adjacent hexes as a landing beach
    pub fn set_coast(&mut self, a: HexCoord, b: HexCoord) {
        self.mark_edge(a, b, |cell, bit| cell.coast_edges |= bit);
    }

    fn mark_edge(&mut self, a: HexCoord, b: HexCoord, mark: impl Fn(&mut HexCell, u8)) {
        let Some(direction) = a.direction_to(&b) else {
            return;
        };
        if let Some(cell) = self.cell_mut(a) {
            mark(cell, direction.bit());
        }
        if let Some(cell) = self.cell_mut(b) {
            mark(cell, direction.opposite().bit());
        }
    }

    /// Classify the edge crossed moving from `from` into `to`
    pub fn crossing(&self, from: HexCoord, to: HexCoord) -> EdgeCrossing {
        let (Some(direction), Some(cell)) = (from.direction_to(&to), self.cell(from)) else {
            return EdgeCrossing::Plain;
        };
        if cell.coast_edges & direction.bit() != 0 {
            EdgeCrossing::Coast
        } else if cell.river_edges & direction.bit() != 0 {
            EdgeCrossing::River
        } else {
            EdgeCrossing::Plain
        }
    }

    /// March time for a single step, `None` if the step is impossible
    pub fn step_minutes(&self, from: HexCoord, to: HexCoord) -> Option<f64> {
        if !from.is_adjacent(&to) || !self.contains(from) {
            return None;
        }
        let base = self.terrain(to)?.movement_minutes()?;
        let extra = match self.crossing(from, to) {
            EdgeCrossing::Plain => 0.0,
            EdgeCrossing::River | EdgeCrossing::Coast => RIVER_CROSSING_MINUTES,
        };
        Some(base + extra)
    }

    pub fn is_passable(&self, coord: HexCoord) -> bool {
        self.terrain(coord).is_some_and(|t| t.is_passable())
    }

    /// In-bounds neighbors of a hex
    pub fn neighbors(&self, coord: HexCoord) -> Vec<HexCoord> {
        coord
            .neighbors()
            .into_iter()
            .filter(|n| self.contains(*n))
            .collect()
    }

    pub fn occupants(&self, coord: HexCoord) -> &[DetachmentId] {
        self.cell(coord).map(|c| c.occupants.as_slice()).unwrap_or(&[])
    }

    pub fn add_occupant(&mut self, coord: HexCoord, detachment: DetachmentId) {
        if let Some(cell) = self.cell_mut(coord) {
            if !cell.occupants.contains(&detachment) {
                cell.occupants.push(detachment);
            }
        }
    }

    pub fn remove_occupant(&mut self, coord: HexCoord, detachment: DetachmentId) {
        if let Some(cell) = self.cell_mut(coord) {
            cell.occupants.retain(|d| *d != detachment);
        }
    }

    /// The combat currently registered at a hex
    pub fn combat_at(&self, coord: HexCoord) -> Option<CombatId> {
        self.cell(coord).and_then(|c| c.combat)
    }

    pub fn set_combat(&mut self, coord: HexCoord, combat: Option<CombatId>) {
        if let Some(cell) = self.cell_mut(coord) {
            cell.combat = combat;
        }
    }

    /// Hand a hex to a new owner, knocking down part of its fortification
    pub fn capture(&mut self, coord: HexCoord, owner: ForceId, fortification_kept: f64) {
        if let Some(cell) = self.cell_mut(coord) {
            if cell.owner != Some(owner) {
                cell.owner = Some(owner);
                cell.fortification = (cell.fortification * fortification_kept).max(0.0);
            }
        }
    }

    /// Modifiers a combat caches for this hex
    pub fn modifiers(&self, coord: HexCoord) -> TerrainModifiers {
        match self.cell(coord) {
            Some(cell) => TerrainModifiers {
                defense: cell.terrain.defense(),
                density: cell.terrain.density(),
                rough_defense: cell.terrain.rough_defense(),
                fortification: cell.fortification_modifier(),
            },
            None => TerrainModifiers::default(),
        }
    }
}
