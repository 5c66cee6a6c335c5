//! Event handlers

use crate::combat::endurance::disruption_minutes;
use crate::combat::CombatKind;
use crate::core::error::Anomaly;
use crate::core::types::{CombatId, DetachmentId, Minute, Side};
use crate::events::{Event, EventKind};
use crate::force::{Action, Mode, MovePurpose};
use crate::map::HexCoord;

use super::Theater;

impl Theater {
    pub(crate) fn execute(&mut self, event: &Event) {
        match event.kind {
            EventKind::Disrupt { combat, detachment } => self.on_disrupt(combat, detachment),
            EventKind::Retreat { combat, detachment } => self.on_retreat(combat, detachment),
            EventKind::Arrive {
                detachment,
                to,
                purpose,
            } => self.on_arrive(detachment, to, purpose),
            EventKind::Recover { detachment } => self.on_recover(detachment),
        }
    }

    fn clear_next_event(&mut self, id: CombatId) -> bool {
        match self.combats.get_mut(id) {
            Some(combat) => {
                combat.next_event = None;
                true
            }
            None => false,
        }
    }

    fn on_disrupt(&mut self, id: CombatId, det: DetachmentId) {
        if !self.clear_next_event(id) || !self.make_current(id, false) {
            return;
        }
        let now = self.now();
        let Some(combat) = self.combats.get(id) else {
            return;
        };
        let (Some(side), Some(d)) = (combat.side_of(det), self.detachments.get(det)) else {
            self.reshuffle(id);
            return;
        };
        let stats = combat.stats;
        let (ratio, density) = match side {
            Side::Defender => (stats.ratio, stats.density),
            Side::Attacker => {
                let inverse = if stats.ratio > 0.0 {
                    1.0 / stats.ratio
                } else {
                    f64::INFINITY
                };
                (inverse, stats.attacker_density)
            }
        };
        let screening = combat.kind == CombatKind::Infiltration
            && side == Side::Defender
            && d.location != combat.cell;
        let minutes = disruption_minutes(&mut self.dice, &self.config, d.fatigue, ratio, density);
        let until = now + minutes.max(1);

        self.drop_events(det);
        if let Some(d) = self.detachments.get_mut(det) {
            d.disrupt(until);
            tracing::info!("{} disrupted until {}", d.name, until);
        }
        self.queue
            .schedule(until, EventKind::Recover { detachment: det });

        // A disrupted screen no longer holds the infiltrator back
        if screening {
            self.cancel(id, det);
        } else {
            self.reshuffle(id);
        }
    }

    fn on_retreat(&mut self, id: CombatId, det: DetachmentId) {
        if !self.clear_next_event(id) || !self.make_current(id, false) {
            return;
        }
        match self.start_retreat(id, det) {
            Ok(outcome) => tracing::debug!("{} retreat: {:?}", det, outcome),
            Err(e) => {
                tracing::warn!("retreat of {} failed: {}", det, e);
                self.reshuffle(id);
            }
        }
    }

    fn on_arrive(&mut self, det: DetachmentId, to: HexCoord, purpose: MovePurpose) {
        let now = self.now();
        let Some(d) = self.detachments.get(det) else {
            tracing::warn!("arrival for missing {}", det);
            self.anomalies.push((now, Anomaly::MissingDetachment(det)));
            return;
        };
        if !d.is_active() {
            return;
        }
        let force = d.force;
        let from = d.location;

        if purpose == MovePurpose::Retreat {
            if let Some(d) = self.detachments.get_mut(det) {
                d.mode = Mode::Regrouping;
                d.action = Action::Idle;
            }
            let regroup = self.config.regroup_minutes.ceil().max(0.0) as Minute;
            self.queue
                .schedule(now + regroup, EventKind::Recover { detachment: det });
            return;
        }

        if let Some(id) = self.map.combat_at(to) {
            self.include(id, det, 0.0);
            return;
        }
        let enemies = self.enemies_in(to, force);
        if !enemies.is_empty() {
            let defenders: Vec<(DetachmentId, f64)> = enemies.into_iter().map(|e| (e, 0.0)).collect();
            self.open_combat(to, CombatKind::Assault, &[det], &defenders);
            return;
        }

        self.map.remove_occupant(from, det);
        self.map.add_occupant(to, det);
        self.map
            .capture(to, force, self.config.captured_fortification_factor);
        if let Some(d) = self.detachments.get_mut(det) {
            d.location = to;
            d.go_idle();
        }
        tracing::debug!("{} arrived at {:?}", det, to);
    }

    fn on_recover(&mut self, det: DetachmentId) {
        let Some(d) = self.detachments.get(det) else {
            return;
        };
        let combat = d.combat;
        let side = combat
            .and_then(|c| self.combats.get(c))
            .and_then(|c| c.side_of(det));
        self.catch_up(det, side);
        if let Some(d) = self.detachments.get_mut(det) {
            if d.mode == Mode::Regrouping {
                d.go_idle();
            }
        }
        if let Some(id) = combat {
            self.reshuffle(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ForceId;
    use crate::force::{Detachment, Unit, UnitRole};
    use crate::map::HexMap;
    use crate::theater::MoveOutcome;

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
    fn test_arrival_relocates_and_captures() {
        let mut theater = Theater::with_map(HexMap::new(8, 8), 2);
        let det = company(&theater, 1, HexCoord::new(2, 2), 9);
        let id = theater.add_detachment(det).unwrap();
        let dest = HexCoord::new(3, 2);
        let MoveOutcome::Marching { arrival } = theater.begin_move(id, dest).unwrap() else {
            panic!("expected a march");
        };

        theater.process_events(arrival);
        let d = theater.detachment(id).unwrap();
        assert_eq!(d.location, dest);
        assert_eq!(d.mode, Mode::Idle);
        assert!(theater.map().occupants(HexCoord::new(2, 2)).is_empty());
        assert_eq!(theater.map().cell(dest).unwrap().owner, Some(ForceId(1)));
        assert_eq!(theater.log().len(), 1);
    }

    #[test]
    fn test_arrival_for_missing_detachment_is_recorded() {
        let mut theater = Theater::with_map(HexMap::new(8, 8), 2);
        let det = company(&theater, 1, HexCoord::new(2, 2), 9);
        let id = theater.add_detachment(det).unwrap();
        let MoveOutcome::Marching { arrival } = theater.begin_move(id, HexCoord::new(3, 2)).unwrap()
        else {
            panic!("expected a march");
        };
        // Pull it out behind the queue's back
        theater.detachments.remove(id);

        theater.process_events(arrival);
        assert_eq!(
            theater.anomalies().last().map(|(_, a)| a.clone()),
            Some(Anomaly::MissingDetachment(id))
        );
    }

    #[test]
    fn test_disrupt_schedules_recovery() {
        let mut theater = Theater::with_map(HexMap::new(8, 8), 4);
        let a = company(&theater, 1, HexCoord::new(2, 2), 27);
        let d = company(&theater, 2, HexCoord::new(3, 2), 9);
        let a = theater.add_detachment(a).unwrap();
        let d = theater.add_detachment(d).unwrap();
        let MoveOutcome::Assault(c) = theater.begin_move(a, HexCoord::new(3, 2)).unwrap() else {
            panic!("expected an assault");
        };
        let next = theater.combat(c).unwrap().next_event.unwrap();
        let event = theater.queue().get(next).cloned().unwrap();
        let EventKind::Disrupt { detachment, .. } = event.kind else {
            panic!("fresh combat should plan a disruption");
        };
        assert!(detachment == a || detachment == d);

        theater.process_events(event.time);
        let Some(broken) = theater.detachment(detachment) else {
            // Wiped out on the way
            return;
        };
        if broken.combat.is_some() {
            assert_eq!(broken.mode, Mode::Disrupted);
            assert!(theater.queue().iter().any(|ev| ev.kind
                == EventKind::Recover {
                    detachment
                }));
        }
    }
}
