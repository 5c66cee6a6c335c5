//! Lazy resolution and combat termination

use crate::combat::{Battlefield, Breakpoint, CombatKind};
use crate::core::types::{CombatId, DetachmentId, ForceId, Minute, Side};
use crate::events::EventKind;
use crate::force::{Action, Mode, MovePurpose, Status};
use crate::map::HexCoord;

use super::{Casualty, CombatReport, Theater};

impl Theater {
    /// Fast-forward a combat to the current minute
    ///
    /// Returns false when the combat no longer exists afterwards, either
    /// because the handle was stale or because a side was wiped out and the
    /// combat terminated. With `schedule`, the next breaking point is
    /// re-planned.
    pub fn make_current(&mut self, id: CombatId, schedule: bool) -> bool {
        let now = self.now();
        let Some(combat) = self.combats.get(id) else {
            return false;
        };
        if combat.last_checked >= now {
            let pending = combat.next_event.is_some_and(|ev| self.queue.get(ev).is_some());
            if schedule && !pending {
                self.schedule_next_event(id);
            }
            return true;
        }

        self.refresh_surroundings(id);
        for side in [Side::Attacker, Side::Defender] {
            let ids = match self.combats.get(id) {
                Some(combat) => combat.group(side).detachments(),
                None => return false,
            };
            for det in ids {
                self.catch_up(det, Some(side));
            }
        }

        let mut found = Vec::new();
        let participants = match self.combats.get_mut(id) {
            Some(combat) => {
                let mut field = Battlefield {
                    detachments: &mut self.detachments,
                    armory: &self.armory,
                    config: &self.config,
                    dice: &mut self.dice,
                    anomalies: &mut found,
                };
                combat.resolve(now, &mut field);
                combat.participants()
            }
            None => return false,
        };
        self.note(found);

        for det in participants {
            if self.detachments.get(det).is_some_and(|d| d.is_destroyed()) {
                self.eliminate(det, Status::Destroyed);
            }
        }
        if self.settle(id) {
            return false;
        }
        if schedule {
            self.schedule_next_event(id);
        }
        true
    }

    /// Bring one detachment's own clock up to date
    pub(crate) fn catch_up(&mut self, det: DetachmentId, side: Option<Side>) {
        let now = self.now();
        if let Some(d) = self.detachments.get_mut(det) {
            if d.make_current(now, &self.config)
                && side == Some(Side::Attacker)
                && d.mode == Mode::Defending
            {
                d.mode = Mode::Attacking;
            }
        }
    }

    /// Rebuild a combat's categories and ratio without letting time pass
    pub(crate) fn reassess(&mut self, id: CombatId) {
        let mut found = Vec::new();
        if let Some(combat) = self.combats.get_mut(id) {
            let mut field = Battlefield {
                detachments: &mut self.detachments,
                armory: &self.armory,
                config: &self.config,
                dice: &mut self.dice,
                anomalies: &mut found,
            };
            combat.assess(&mut field);
        }
        self.note(found);
    }

    /// Replace the combat's pending breaking point with a fresh one
    pub(crate) fn schedule_next_event(&mut self, id: CombatId) {
        let now = self.now();
        let Some(combat) = self.combats.get(id) else {
            return;
        };
        if let Some(old) = combat.next_event {
            self.queue.unschedule(old);
        }

        let mut found = Vec::new();
        let next = {
            let mut field = Battlefield {
                detachments: &mut self.detachments,
                armory: &self.armory,
                config: &self.config,
                dice: &mut self.dice,
                anomalies: &mut found,
            };
            combat.plan_next_break(now, &mut field)
        };
        self.note(found);

        let event = next.map(|next| {
            let kind = match next.breakpoint {
                Breakpoint::Disrupt => EventKind::Disrupt {
                    combat: id,
                    detachment: next.detachment,
                },
                Breakpoint::Retreat => EventKind::Retreat {
                    combat: id,
                    detachment: next.detachment,
                },
            };
            self.queue.schedule(next.at, kind)
        });
        if let Some(combat) = self.combats.get_mut(id) {
            combat.next_event = event;
        }
    }

    /// Re-evaluate a combat after its composition or postures changed
    pub fn reshuffle(&mut self, id: CombatId) {
        if !self.make_current(id, false) {
            return;
        }
        self.reassess(id);
        if self.settle(id) {
            return;
        }
        self.schedule_next_event(id);
    }

    /// Re-read terrain and recount blocked and semi-blocked neighbors
    /// around the defenders
    pub(crate) fn refresh_surroundings(&mut self, id: CombatId) {
        let Some(combat) = self.combats.get(id) else {
            return;
        };
        let terrain = self.map.modifiers(combat.cell);
        let (blocked, semi) = match combat.defenders.force {
            Some(force) => self.surroundings(combat.cell, force),
            None => (0, 0),
        };
        if let Some(combat) = self.combats.get_mut(id) {
            combat.terrain = terrain;
            combat.stats.blocked_hexes = blocked;
            combat.stats.semi_blocked_hexes = semi;
        }
    }

    /// Neighbors of `cell` closed to `force`, and those merely under hostile
    /// zone of control
    pub fn surroundings(&self, cell: HexCoord, force: ForceId) -> (u8, u8) {
        let mut blocked = 0;
        let mut semi = 0;
        for hex in cell.neighbors() {
            if !self.map.is_passable(hex) || !self.enemies_in(hex, force).is_empty() {
                blocked += 1;
            } else if self.in_hostile_zoc(hex, force) {
                semi += 1;
            }
        }
        (blocked, semi)
    }

    /// Active detachments located in a hex that oppose `force`
    pub fn enemies_in(&self, hex: HexCoord, force: ForceId) -> Vec<DetachmentId> {
        self.map
            .occupants(hex)
            .iter()
            .copied()
            .filter(|id| {
                self.detachments
                    .get(*id)
                    .is_some_and(|d| d.is_active() && d.force.opposes(force))
            })
            .collect()
    }

    /// Opposing detachments marching into a hex and not yet fighting
    pub fn entrants(&self, hex: HexCoord, force: ForceId) -> Vec<DetachmentId> {
        self.detachments
            .iter()
            .filter(|(_, d)| {
                d.is_active()
                    && d.force.opposes(force)
                    && d.combat.is_none()
                    && d.is_entering(hex)
            })
            .map(|(id, _)| id)
            .collect()
    }

    /// Opposing detachments whose zone of control covers a hex
    pub fn zoc_exerters(&self, hex: HexCoord, force: ForceId) -> Vec<DetachmentId> {
        let mut exerters = Vec::new();
        for neighbor in self.map.neighbors(hex) {
            for id in self.map.occupants(neighbor) {
                if self
                    .detachments
                    .get(*id)
                    .is_some_and(|d| d.force.opposes(force) && d.exerts_zoc())
                {
                    exerters.push(*id);
                }
            }
        }
        exerters
    }

    pub fn in_hostile_zoc(&self, hex: HexCoord, force: ForceId) -> bool {
        !self.zoc_exerters(hex, force).is_empty()
    }

    /// Remove a detachment from play
    pub(crate) fn eliminate(&mut self, det: DetachmentId, status: Status) {
        let Some(mut removed) = self.detachments.remove(det) else {
            return;
        };
        self.map.remove_occupant(removed.location, det);
        self.drop_events(det);
        if let Some(id) = removed.combat {
            if let Some(combat) = self.combats.get_mut(id) {
                combat.attackers.withdraw(det);
                combat.defenders.withdraw(det);
            }
        }
        removed.status = status;
        tracing::info!(
            "{} ({}) {:?} at {:?}",
            removed.name,
            removed.force,
            status,
            removed.location
        );
        self.fallen.push(Casualty {
            time: self.now(),
            name: removed.name,
            force: removed.force,
            status,
        });
    }

    /// Terminate the combat if a side is empty; true if it did
    pub(crate) fn settle(&mut self, id: CombatId) -> bool {
        match self.combats.get(id) {
            Some(combat) if combat.is_over() => {
                self.terminate(id);
                true
            }
            _ => false,
        }
    }

    /// Close a combat and hand its survivors their next orders
    pub(crate) fn terminate(&mut self, id: CombatId) {
        let Some(combat) = self.combats.remove(id) else {
            return;
        };
        let now = self.now();
        if self.map.combat_at(combat.cell) == Some(id) {
            self.map.set_combat(combat.cell, None);
        }
        if let Some(event) = combat.next_event {
            self.queue.unschedule(event);
        }

        let survivors = combat.survivors();
        tracing::info!(
            "{} at {:?} over after {} min, {} passes, survivors {:?}",
            combat.kind,
            combat.cell,
            now.saturating_sub(combat.started),
            combat.stats.passes,
            survivors
        );
        self.reports.push(CombatReport {
            combat: id,
            cell: combat.cell,
            kind: combat.kind,
            started: combat.started,
            ended: now,
            survivors,
            attacker_losses: combat.attackers.total_lost(),
            defender_losses: combat.defenders.total_lost(),
            passes: combat.stats.passes,
        });

        for det in combat.participants() {
            if let Some(d) = self.detachments.get_mut(det) {
                d.combat = None;
            }
        }

        match survivors {
            Some(Side::Attacker) => {
                let winners = combat.attackers.detachments();
                for det in &winners {
                    self.advance(*det, combat.cell);
                }
                if combat.kind == CombatKind::Assault {
                    self.meet_entrants(combat.cell, &winners);
                }
            }
            Some(Side::Defender) => {
                for det in combat.defenders.detachments() {
                    self.release(det);
                }
            }
            None => {}
        }
    }

    /// After an assault, advancing winners may run into enemies marching in
    fn meet_entrants(&mut self, cell: HexCoord, winners: &[DetachmentId]) {
        let advancing: Vec<DetachmentId> = winners
            .iter()
            .copied()
            .filter(|w| self.detachments.get(*w).is_some_and(|d| d.is_entering(cell)))
            .collect();
        let Some(force) = advancing
            .first()
            .and_then(|w| self.detachments.get(*w))
            .map(|d| d.force)
        else {
            return;
        };
        let entrants = self.entrants(cell, force);
        if entrants.is_empty() || self.map.combat_at(cell).is_some() {
            return;
        }
        let defenders: Vec<(DetachmentId, f64)> = advancing.into_iter().map(|w| (w, 0.0)).collect();
        self.open_combat(cell, CombatKind::Meeting, &entrants, &defenders);
    }

    /// Move a winner into the won hex; false if it was released instead
    pub(crate) fn advance(&mut self, det: DetachmentId, cell: HexCoord) -> bool {
        let now = self.now();
        let Some(d) = self.detachments.get(det) else {
            return false;
        };
        let minutes = if d.is_active() && !d.mode.is_broken() && d.is_entering(cell) {
            self.map.step_minutes(d.location, cell)
        } else {
            None
        };
        let Some(minutes) = minutes else {
            self.release(det);
            return false;
        };

        self.drop_events(det);
        if let Some(d) = self.detachments.get_mut(det) {
            d.mode = Mode::Moving;
            d.action = Action::Move {
                to: cell,
                purpose: MovePurpose::Advance,
            };
        }
        let delay = (minutes * self.config.advance_delay_fraction).ceil().max(0.0) as Minute;
        self.queue.schedule(
            now + delay,
            EventKind::Arrive {
                detachment: det,
                to: cell,
                purpose: MovePurpose::Advance,
            },
        );
        true
    }

    /// Return a survivor to standing orders
    pub(crate) fn release(&mut self, det: DetachmentId) {
        if let Some(d) = self.detachments.get_mut(det) {
            if !d.mode.is_broken() {
                d.go_idle();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::force::{Detachment, Unit, UnitRole};
    use crate::map::{HexMap, Terrain};

    fn company(theater: &Theater, force: u8, at: HexCoord, squads: u32) -> Detachment {
        let rifles = theater.armory().find("rifle squad").unwrap();
        let mgs = theater.armory().find("machine gun").unwrap();
        Detachment::new(DetachmentId::UNASSIGNED, "Coy", ForceId(force), at)
            .with_unit(
                Unit::new("Rifles", UnitRole::Infantry)
                    .with(rifles, squads)
                    .with(mgs, squads / 3),
            )
            .with_supplies(2.0, 30.0)
    }

    #[test]
    fn test_surroundings_counts_edges_and_enemies() {
        let mut theater = Theater::with_map(HexMap::new(8, 8), 5);
        let cell = HexCoord::new(0, 3);
        let enemy = company(&theater, 2, HexCoord::new(1, 3), 9);
        theater.add_detachment(enemy).unwrap();

        let (blocked, semi) = theater.surroundings(cell, ForceId(1));
        // Two neighbors fall off the west edge, one holds the enemy
        assert_eq!(blocked, 3);
        // The enemy's zone of control reaches the shared neighbors
        assert!(semi >= 1);
    }

    #[test]
    fn test_impassable_neighbor_is_blocked() {
        let mut theater = Theater::with_map(HexMap::new(8, 8), 5);
        let cell = HexCoord::new(3, 3);
        theater.map_mut().set_terrain(HexCoord::new(4, 3), Terrain::Water);
        assert_eq!(theater.surroundings(cell, ForceId(1)), (1, 0));
    }

    #[test]
    fn test_make_current_unknown_combat() {
        let mut theater = Theater::with_map(HexMap::new(4, 4), 5);
        let bogus = CombatId(crate::core::arena::Handle::new(7, 3));
        assert!(!theater.make_current(bogus, true));
    }
}
