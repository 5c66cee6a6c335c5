//! Operations that start, join or leave combats

use serde::{Deserialize, Serialize};

use crate::combat::{Combat, CombatKind};
use crate::core::error::{Result, SimError};
use crate::core::types::{CombatId, DetachmentId, Minute, Side};
use crate::events::EventKind;
use crate::force::{Action, Mode, MovePurpose};
use crate::map::EdgeCrossing;
use crate::map::HexCoord;

use super::Theater;

/// What an ordered move turned into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveOutcome {
    /// Unopposed; the detachment arrives at the given minute
    Marching { arrival: Minute },
    /// Joined the combat already raging in the destination
    Joined(CombatId),
    Assault(CombatId),
    Meeting(CombatId),
    Infiltration(CombatId),
    /// The combat in the destination was decided during the move itself
    Decided(CombatId),
}

impl Theater {
    /// Order a detachment one hex onward
    pub fn begin_move(&mut self, det: DetachmentId, dest: HexCoord) -> Result<MoveOutcome> {
        let d = self
            .detachments
            .get(det)
            .ok_or(SimError::DetachmentNotFound(det))?;
        if !d.is_active() {
            return Err(SimError::InvalidMove(format!("{} is out of play", d.name)));
        }
        if d.mode.is_broken() {
            return Err(SimError::InvalidMove(format!(
                "{} cannot move while {:?}",
                d.name, d.mode
            )));
        }
        if !self.map.contains(dest) {
            return Err(SimError::OffMap(dest));
        }
        let minutes = self.map.step_minutes(d.location, dest).ok_or_else(|| {
            SimError::InvalidMove(format!("{} cannot step to {:?}", d.name, dest))
        })?;
        let force = d.force;
        let current = d.combat;

        if let Some(current) = current {
            self.cancel(current, det);
        }
        self.catch_up(det, None);
        self.drop_events(det);
        if let Some(d) = self.detachments.get_mut(det) {
            d.mode = Mode::Moving;
            d.action = Action::Move {
                to: dest,
                purpose: MovePurpose::Order,
            };
        }

        // A combat that ends while being brought up to date no longer blocks
        // the hex; the move is judged on what is left there.
        if let Some(id) = self.map.combat_at(dest) {
            if self.make_current(id, false) {
                let joined = self.include(id, det, 0.0);
                return Ok(self.settled_outcome(dest, id, joined, MoveOutcome::Joined(id)));
            }
        }

        let enemies = self.enemies_in(dest, force);
        if !enemies.is_empty() {
            let defenders = self.with_preparation(&enemies);
            let id = self.open_combat(dest, CombatKind::Assault, &[det], &defenders);
            return Ok(self.settled_outcome(dest, id, true, MoveOutcome::Assault(id)));
        }

        let entrants = self.entrants(dest, force);
        if !entrants.is_empty() {
            let id = self.open_combat(dest, CombatKind::Meeting, &entrants, &[(det, 0.0)]);
            return Ok(self.settled_outcome(dest, id, true, MoveOutcome::Meeting(id)));
        }

        let exerters: Vec<DetachmentId> = self
            .zoc_exerters(dest, force)
            .into_iter()
            .filter(|e| self.detachments.get(*e).is_some_and(|d| d.combat.is_none()))
            .collect();
        if !exerters.is_empty() {
            let defenders = self.with_preparation(&exerters);
            let id = self.open_combat(dest, CombatKind::Infiltration, &[det], &defenders);
            return Ok(self.settled_outcome(dest, id, true, MoveOutcome::Infiltration(id)));
        }

        let arrival = self.now() + minutes.ceil() as Minute;
        self.queue.schedule(
            arrival,
            EventKind::Arrive {
                detachment: det,
                to: dest,
                purpose: MovePurpose::Order,
            },
        );
        tracing::debug!("{} marching to {:?}, arrives {}", det, dest, arrival);
        Ok(MoveOutcome::Marching { arrival })
    }

    /// Re-check the destination after a call that may have resolved the
    /// combat there
    fn settled_outcome(
        &self,
        dest: HexCoord,
        id: CombatId,
        ok: bool,
        outcome: MoveOutcome,
    ) -> MoveOutcome {
        if ok && self.map.combat_at(dest) == Some(id) {
            outcome
        } else {
            MoveOutcome::Decided(id)
        }
    }

    /// Change a detachment's posture, re-evaluating its combat
    pub fn set_mode(&mut self, det: DetachmentId, mode: Mode) -> Result<()> {
        let combat = self
            .detachments
            .get(det)
            .ok_or(SimError::DetachmentNotFound(det))?
            .combat;
        if let Some(id) = combat {
            self.make_current(id, false);
        }
        let d = self
            .detachments
            .get_mut(det)
            .ok_or(SimError::DetachmentNotFound(det))?;
        d.mode = mode;
        let Some(id) = d.combat else {
            return Ok(());
        };

        // A zone-of-control defender that stops exerting its zone drops out
        let exerts = d.exerts_zoc();
        let drops_out = self.combats.get(id).is_some_and(|c| {
            c.kind == CombatKind::Infiltration && c.side_of(det) == Some(Side::Defender) && !exerts
        });
        if drops_out {
            self.cancel(id, det);
        } else {
            self.reshuffle(id);
        }
        Ok(())
    }

    /// Create a combat at `cell` and enlist both sides
    pub(crate) fn open_combat(
        &mut self,
        cell: HexCoord,
        kind: CombatKind,
        attackers: &[DetachmentId],
        defenders: &[(DetachmentId, f64)],
    ) -> CombatId {
        let now = self.now();
        let terrain = self.map.modifiers(cell);
        let id = self
            .combats
            .insert_with(|id| Combat::new(id, cell, kind, now, terrain));
        self.map.set_combat(cell, Some(id));
        for det in attackers {
            self.enlist(id, *det, Side::Attacker, 0.0);
        }
        for (det, preparation) in defenders {
            self.enlist(id, *det, Side::Defender, *preparation);
        }
        tracing::info!(
            "{} opens at {:?}: {} attacking, {} defending",
            kind,
            cell,
            attackers.len(),
            defenders.len()
        );
        self.reshuffle(id);
        id
    }

    /// Add a detachment to a running combat
    ///
    /// It joins the side of its own force. An infiltration becomes a
    /// meeting engagement once a defender marches into the contested hex.
    pub fn include(&mut self, id: CombatId, det: DetachmentId, preparation: f64) -> bool {
        if !self.make_current(id, false) {
            return false;
        }
        let Some(current) = self.detachments.get(det).map(|d| d.combat) else {
            return false;
        };
        match current {
            Some(other) if other == id => return true,
            Some(other) => {
                self.cancel(other, det);
            }
            None => {}
        }

        let (Some(combat), Some(d)) = (self.combats.get(id), self.detachments.get(det)) else {
            return false;
        };
        let side = if combat.attackers.force == Some(d.force) {
            Side::Attacker
        } else if combat.defenders.force == Some(d.force) {
            Side::Defender
        } else if combat.attackers.force.is_some_and(|f| f.opposes(d.force)) {
            Side::Defender
        } else {
            Side::Attacker
        };
        let becomes_meeting = combat.kind == CombatKind::Infiltration
            && side == Side::Defender
            && d.is_entering(combat.cell);
        if becomes_meeting {
            if let Some(combat) = self.combats.get_mut(id) {
                tracing::debug!("infiltration at {:?} turns into a meeting", combat.cell);
                combat.kind = CombatKind::Meeting;
            }
        }

        let joined = self.enlist(id, det, side, preparation);
        self.reshuffle(id);
        joined && self.combats.contains(id)
    }

    /// Put a detachment on one side's roster and set its posture
    pub(crate) fn enlist(
        &mut self,
        id: CombatId,
        det: DetachmentId,
        side: Side,
        preparation: f64,
    ) -> bool {
        let (Some(combat), Some(d)) = (self.combats.get_mut(id), self.detachments.get_mut(det))
        else {
            return false;
        };
        let cell = combat.cell;
        let in_place = d.location == cell;
        let entering = d.is_entering(cell);
        let crossing = if in_place {
            EdgeCrossing::Plain
        } else {
            self.map.crossing(d.location, cell)
        };
        if !combat.group_mut(side).enlist(d, preparation, crossing) {
            return false;
        }

        d.combat = Some(id);
        if !d.mode.is_broken() {
            match side {
                Side::Attacker => d.mode = Mode::Attacking,
                Side::Defender if in_place => d.mode = Mode::Defending,
                Side::Defender if entering && combat.kind == CombatKind::Meeting => {
                    d.mode = Mode::Attacking
                }
                // Reserves and zone-of-control defenders keep their posture
                Side::Defender => {}
            }
        }
        if entering {
            self.drop_events(det);
        }
        true
    }

    /// Take a detachment out of a combat
    pub fn cancel(&mut self, id: CombatId, det: DetachmentId) -> bool {
        if !self.make_current(id, false) {
            return self.detachments.get(det).is_some_and(|d| d.combat.is_none());
        }
        let Some(combat) = self.combats.get_mut(id) else {
            return false;
        };
        let cell = combat.cell;
        let removed = combat.attackers.withdraw(det) || combat.defenders.withdraw(det);
        if !removed {
            return false;
        }
        if let Some(d) = self.detachments.get_mut(det) {
            d.combat = None;
            if matches!(d.mode, Mode::Attacking | Mode::Defending) {
                d.mode = Mode::Idle;
            }
            if d.is_entering(cell) {
                d.action = Action::Idle;
            }
        }
        if !self.settle(id) {
            self.reshuffle(id);
        }
        true
    }

    /// Pair defenders with their preparation
    fn with_preparation(&self, defenders: &[DetachmentId]) -> Vec<(DetachmentId, f64)> {
        defenders
            .iter()
            .map(|id| {
                let dug_in = self
                    .detachments
                    .get(*id)
                    .is_some_and(|d| d.mode == Mode::Defending);
                let preparation = if dug_in {
                    self.config.max_preparation
                } else {
                    0.0
                };
                (*id, preparation)
            })
            .collect()
    }
}
