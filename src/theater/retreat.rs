//! Falling back out of a combat

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SimError};
use crate::core::types::{CombatId, DetachmentId, ForceId, Minute};
use crate::events::EventKind;
use crate::force::{Action, Mode, MovePurpose, Status};
use crate::map::HexCoord;

use super::Theater;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetreatOutcome {
    /// Was never in the contested hex; regroups where it stands
    Withdrawn,
    Retreated(HexCoord),
    /// Nowhere to go
    Surrendered,
}

impl Theater {
    /// Pull a broken detachment out of its combat
    ///
    /// The best neighbor is free of enemies and of other combats, away from
    /// hostile zones of control and towards headquarters. With no such hex
    /// the detachment surrenders.
    pub fn start_retreat(&mut self, id: CombatId, det: DetachmentId) -> Result<RetreatOutcome> {
        let combat = self.combats.get(id).ok_or(SimError::CombatNotFound(id))?;
        if !combat.contains(det) {
            return Err(SimError::NotEngaged(det, id));
        }
        self.refresh_surroundings(id);

        let (cell, encircled) = match self.combats.get(id) {
            Some(c) => (c.cell, c.stats.blocked_hexes >= 6),
            None => return Err(SimError::CombatNotFound(id)),
        };
        let d = self
            .detachments
            .get(det)
            .ok_or(SimError::DetachmentNotFound(det))?;
        let now = self.now();

        if d.location != cell {
            self.disengage(id, det);
            self.drop_events(det);
            if let Some(d) = self.detachments.get_mut(det) {
                d.mode = Mode::Regrouping;
                d.action = Action::Idle;
                d.disrupted_until = None;
            }
            let regroup = self.config.regroup_minutes.ceil().max(0.0) as Minute;
            self.queue
                .schedule(now + regroup, EventKind::Recover { detachment: det });
            self.after_departure(id);
            return Ok(RetreatOutcome::Withdrawn);
        }

        let force = d.force;
        let headquarters = d.headquarters;
        let destination = if encircled {
            None
        } else {
            self.map
                .neighbors(cell)
                .into_iter()
                .filter(|hex| {
                    self.map.is_passable(*hex)
                        && self.map.combat_at(*hex).is_none()
                        && self.enemies_in(*hex, force).is_empty()
                        && self.map.step_minutes(cell, *hex).is_some()
                })
                .max_by_key(|hex| OrderedFloat(self.retreat_score(*hex, force, headquarters)))
        };

        let Some(hex) = destination else {
            self.eliminate(det, Status::Surrendered);
            self.after_departure(id);
            return Ok(RetreatOutcome::Surrendered);
        };

        let minutes = self.map.step_minutes(cell, hex).unwrap_or_default();
        self.drop_events(det);
        self.disengage(id, det);
        self.map.remove_occupant(cell, det);
        self.map.add_occupant(hex, det);
        if let Some(d) = self.detachments.get_mut(det) {
            d.location = hex;
            d.mode = Mode::Retreating;
            d.action = Action::Move {
                to: hex,
                purpose: MovePurpose::Retreat,
            };
            d.disrupted_until = None;
        }
        self.queue.schedule(
            now + minutes.ceil() as Minute,
            EventKind::Arrive {
                detachment: det,
                to: hex,
                purpose: MovePurpose::Retreat,
            },
        );
        tracing::info!("{} retreats from {:?} to {:?}", det, cell, hex);
        self.after_departure(id);
        Ok(RetreatOutcome::Retreated(hex))
    }

    fn retreat_score(&self, hex: HexCoord, force: ForceId, hq: Option<HexCoord>) -> f64 {
        let mut score = 0.0;
        if self.in_hostile_zoc(hex, force) {
            score -= self.config.retreat_zoc_penalty;
        }
        if let Some(hq) = hq {
            score -= self.config.retreat_hq_bias * hex.distance(&hq) as f64;
        }
        score
    }

    /// Drop from both rosters without touching posture
    fn disengage(&mut self, id: CombatId, det: DetachmentId) {
        if let Some(combat) = self.combats.get_mut(id) {
            combat.attackers.withdraw(det);
            combat.defenders.withdraw(det);
        }
        if let Some(d) = self.detachments.get_mut(det) {
            d.combat = None;
        }
    }

    fn after_departure(&mut self, id: CombatId) {
        if !self.settle(id) {
            self.reshuffle(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Side;
    use crate::force::{Detachment, Unit, UnitRole};
    use crate::map::HexMap;
    use crate::theater::MoveOutcome;

    fn company(theater: &Theater, force: u8, at: HexCoord, squads: u32) -> Detachment {
        let rifles = theater.armory().find("rifle squad").unwrap();
        Detachment::new(DetachmentId::UNASSIGNED, "Coy", ForceId(force), at)
            .with_unit(Unit::new("Rifles", UnitRole::Infantry).with(rifles, squads))
            .with_supplies(2.0, 30.0)
    }

    /// Assault from the west on a lone defender
    fn engaged() -> (Theater, CombatId, DetachmentId, DetachmentId) {
        let mut theater = Theater::with_map(HexMap::new(10, 10), 13);
        let a = company(&theater, 1, HexCoord::new(3, 4), 27);
        let d = company(&theater, 2, HexCoord::new(4, 4), 9).with_headquarters(HexCoord::new(8, 4));
        let a = theater.add_detachment(a).unwrap();
        let d = theater.add_detachment(d).unwrap();
        let MoveOutcome::Assault(c) = theater.begin_move(a, HexCoord::new(4, 4)).unwrap() else {
            panic!("expected an assault");
        };
        (theater, c, a, d)
    }

    #[test]
    fn test_retreat_heads_for_headquarters() {
        let (mut theater, c, _, d) = engaged();
        let outcome = theater.start_retreat(c, d).unwrap();
        assert_eq!(outcome, RetreatOutcome::Retreated(HexCoord::new(5, 4)));

        let det = theater.detachment(d).unwrap();
        assert_eq!(det.location, HexCoord::new(5, 4));
        assert_eq!(det.mode, Mode::Retreating);
        assert!(det.combat.is_none());
        assert_eq!(theater.map().occupants(HexCoord::new(5, 4)), &[d]);
        // The defenders are gone, so the attacker advances
        assert!(theater.combat(c).is_none());
        assert_eq!(theater.reports()[0].survivors, Some(Side::Attacker));
    }

    #[test]
    fn test_encircled_defender_surrenders() {
        let (mut theater, c, _, d) = engaged();
        for hex in HexCoord::new(4, 4).neighbors() {
            if hex != HexCoord::new(3, 4) {
                let blocker = company(&theater, 1, hex, 3);
                theater.add_detachment(blocker).unwrap();
            }
        }
        assert_eq!(theater.start_retreat(c, d).unwrap(), RetreatOutcome::Surrendered);
        assert!(theater.detachment(d).is_none());
        assert_eq!(theater.fallen().len(), 1);
        assert_eq!(theater.fallen()[0].status, Status::Surrendered);
    }

    #[test]
    fn test_not_engaged() {
        let (mut theater, c, _, _) = engaged();
        let bystander = company(&theater, 2, HexCoord::new(0, 0), 3);
        let b = theater.add_detachment(bystander).unwrap();
        assert!(matches!(
            theater.start_retreat(c, b),
            Err(SimError::NotEngaged(_, _))
        ));
    }
}
