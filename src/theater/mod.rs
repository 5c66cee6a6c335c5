//! The simulation context
//!
//! A theater owns the clock (through its event queue), the map, every
//! detachment and combat, the dice and the configuration. All operations
//! that cross object boundaries are methods here, so a combat that ends
//! in the middle of a call is simply gone from the arena and every caller
//! finds out by re-checking its handle.

mod execute;
mod resolve;
mod retreat;
mod triggers;

pub use retreat::RetreatOutcome;
pub use triggers::MoveOutcome;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::combat::{Combat, CombatKind};
use crate::core::arena::Arena;
use crate::core::config::CombatConfig;
use crate::core::dice::Dice;
use crate::core::error::{fatal, Anomaly, Result, SimError};
use crate::core::types::{CombatId, DetachmentId, ForceId, Minute, Side};
use crate::events::{EventLog, EventQueue, Subject};
use crate::force::{Armory, Detachment, Status};
use crate::map::{HexCoord, HexMap};

/// Summary of a finished combat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatReport {
    pub combat: CombatId,
    pub cell: HexCoord,
    pub kind: CombatKind,
    pub started: Minute,
    pub ended: Minute,
    pub survivors: Option<Side>,
    pub attacker_losses: u32,
    pub defender_losses: u32,
    pub passes: u32,
}

/// A detachment that left play
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Casualty {
    pub time: Minute,
    pub name: String,
    pub force: ForceId,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theater {
    config: CombatConfig,
    armory: Armory,
    map: HexMap,
    detachments: Arena<DetachmentId, Detachment>,
    combats: Arena<CombatId, Combat>,
    queue: EventQueue,
    log: EventLog,
    dice: Dice,
    anomalies: Vec<(Minute, Anomaly)>,
    reports: Vec<CombatReport>,
    fallen: Vec<Casualty>,
}

impl Theater {
    pub fn new(config: CombatConfig, armory: Armory, map: HexMap, seed: u64) -> Self {
        Self {
            config,
            armory,
            map,
            detachments: Arena::new(),
            combats: Arena::new(),
            queue: EventQueue::new(),
            log: EventLog::new(),
            dice: Dice::new(seed),
            anomalies: Vec::new(),
            reports: Vec::new(),
            fallen: Vec::new(),
        }
    }

    /// Default config and the standard armory
    pub fn with_map(map: HexMap, seed: u64) -> Self {
        Self::new(CombatConfig::default(), Armory::standard(), map, seed)
    }

    pub fn now(&self) -> Minute {
        self.queue.now()
    }

    pub fn config(&self) -> &CombatConfig {
        &self.config
    }

    pub fn armory(&self) -> &Armory {
        &self.armory
    }

    pub fn map(&self) -> &HexMap {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut HexMap {
        &mut self.map
    }

    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn dice_mut(&mut self) -> &mut Dice {
        &mut self.dice
    }

    pub fn anomalies(&self) -> &[(Minute, Anomaly)] {
        &self.anomalies
    }

    pub fn reports(&self) -> &[CombatReport] {
        &self.reports
    }

    pub fn fallen(&self) -> &[Casualty] {
        &self.fallen
    }

    /// Raw detachment state, without bringing it up to date
    pub fn detachment(&self, id: DetachmentId) -> Option<&Detachment> {
        self.detachments.get(id)
    }

    pub fn detachment_mut(&mut self, id: DetachmentId) -> Option<&mut Detachment> {
        self.detachments.get_mut(id)
    }

    pub fn detachments(&self) -> impl Iterator<Item = (DetachmentId, &Detachment)> {
        self.detachments.iter()
    }

    pub fn combat(&self, id: CombatId) -> Option<&Combat> {
        self.combats.get(id)
    }

    pub fn combats(&self) -> impl Iterator<Item = (CombatId, &Combat)> {
        self.combats.iter()
    }

    /// The combat registered at a hex
    pub fn combat_at(&self, cell: HexCoord) -> Option<CombatId> {
        self.map.combat_at(cell)
    }

    /// Place a detachment on the map and hand out its handle
    pub fn add_detachment(&mut self, detachment: Detachment) -> Result<DetachmentId> {
        let location = detachment.location;
        if !self.map.contains(location) {
            return Err(SimError::OffMap(location));
        }
        let now = self.now();
        let id = self.detachments.insert_with(move |id| {
            let mut detachment = detachment;
            detachment.id = id;
            detachment.last_updated = now;
            detachment
        });
        self.map.add_occupant(location, id);
        Ok(id)
    }

    /// Bring a detachment (and its combat) up to date and return it
    pub fn observe(&mut self, id: DetachmentId) -> Option<&Detachment> {
        if let Some(combat) = self.detachments.get(id)?.combat {
            self.make_current(combat, true);
        }
        let side = self
            .detachments
            .get(id)?
            .combat
            .and_then(|c| self.combats.get(c))
            .and_then(|c| c.side_of(id));
        self.catch_up(id, side);
        self.detachments.get(id)
    }

    /// Bring every combat up to date
    pub fn make_all_current(&mut self) {
        for id in self.combats.keys() {
            self.make_current(id, true);
        }
    }

    /// Drop every queued event acting on a detachment
    ///
    /// A combat whose breaking point named the detachment is re-planned, so
    /// it keeps resolving without being observed.
    pub fn purge(&mut self, id: DetachmentId) -> usize {
        let (count, stranded) = self.drop_events(id);
        for combat in stranded {
            self.make_current(combat, true);
        }
        count
    }

    /// Purge the queue for a detachment and clear any combat's link to a
    /// removed event. Returns the number removed and the combats that lost
    /// their next event.
    pub(crate) fn drop_events(&mut self, id: DetachmentId) -> (usize, Vec<CombatId>) {
        let removed = self.queue.purge(id);
        let mut stranded = Vec::new();
        for event in &removed {
            let Subject::Combat(c) = event.kind.subject() else {
                continue;
            };
            if let Some(combat) = self.combats.get_mut(c) {
                if combat.next_event.is_some() && combat.next_event == event.id {
                    combat.next_event = None;
                    stranded.push(c);
                }
            }
        }
        (removed.len(), stranded)
    }

    /// Fire every event due up to `end`, then move the clock to `end`
    pub fn process_events(&mut self, end: Minute) {
        if end < self.now() {
            fatal(&format!(
                "bad time sequence: processing to {} at clock {}",
                end,
                self.now()
            ));
        }
        while let Some(event) = self.queue.pop_due(end) {
            tracing::trace!("{} at {}", event.kind.name(), event.time);
            self.execute(&event);
            self.log.record(event);
        }
        self.queue.advance_to(end);
    }

    pub(crate) fn note(&mut self, found: Vec<Anomaly>) {
        let now = self.now();
        self.anomalies.extend(found.into_iter().map(|a| (now, a)));
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::force::{Unit, UnitRole};

    fn rifle_company(theater: &Theater, force: u8, at: HexCoord) -> Detachment {
        let rifles = theater.armory().find("rifle squad").unwrap();
        Detachment::new(DetachmentId::UNASSIGNED, "Coy", ForceId(force), at)
            .with_unit(Unit::new("1 Pl", UnitRole::Infantry).with(rifles, 9))
            .with_supplies(1.0, 5.0)
    }

    #[test]
    fn test_add_detachment_assigns_handle_and_occupancy() {
        let mut theater = Theater::with_map(HexMap::new(6, 6), 1);
        let at = HexCoord::new(2, 3);
        let det = rifle_company(&theater, 1, at);
        let id = theater.add_detachment(det).unwrap();

        assert_eq!(theater.detachment(id).unwrap().id, id);
        assert_eq!(theater.map().occupants(at), &[id]);
    }

    #[test]
    fn test_add_detachment_off_map() {
        let mut theater = Theater::with_map(HexMap::new(6, 6), 1);
        let det = rifle_company(&theater, 1, HexCoord::new(9, 9));
        assert!(matches!(
            theater.add_detachment(det),
            Err(SimError::OffMap(_))
        ));
    }

    #[test]
    fn test_process_events_advances_clock() {
        let mut theater = Theater::with_map(HexMap::new(6, 6), 1);
        theater.process_events(500);
        assert_eq!(theater.now(), 500);
    }

    #[test]
    #[should_panic(expected = "bad time sequence")]
    fn test_process_events_backwards_is_fatal() {
        let mut theater = Theater::with_map(HexMap::new(6, 6), 1);
        theater.process_events(500);
        theater.process_events(499);
    }
}
