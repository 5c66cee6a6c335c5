//! Combat integration tests
//!
//! Whole scenarios driven through the theater: moves open combats, the
//! event queue runs them and every observation sees consistent state.

use arc_operations::combat::CombatKind;
use arc_operations::core::{CombatId, DetachmentId, ForceId, Side};
use arc_operations::force::{Detachment, Mode, Status, Unit, UnitRole};
use arc_operations::map::{HexCoord, HexMap};
use arc_operations::theater::{MoveOutcome, RetreatOutcome, Theater};

fn company(theater: &Theater, force: u8, at: HexCoord, squads: u32) -> Detachment {
    let rifles = theater.armory().find("rifle squad").unwrap();
    let mgs = theater.armory().find("machine gun").unwrap();
    Detachment::new(DetachmentId::UNASSIGNED, "Coy", ForceId(force), at)
        .with_unit(
            Unit::new("Rifles", UnitRole::Infantry)
                .with(rifles, squads)
                .with(mgs, squads / 3),
        )
        .with_supplies(4.0, 60.0)
}

/// One attacker west of one defender on an open 12x12 map
fn assault(seed: u64, attack: u32, defend: u32) -> (Theater, CombatId, DetachmentId, DetachmentId) {
    let mut theater = Theater::with_map(HexMap::new(12, 12), seed);
    let a = company(&theater, 1, HexCoord::new(4, 5), attack);
    let d = company(&theater, 2, HexCoord::new(5, 5), defend).with_headquarters(HexCoord::new(10, 5));
    let a = theater.add_detachment(a).unwrap();
    let d = theater.add_detachment(d).unwrap();
    let MoveOutcome::Assault(c) = theater.begin_move(a, HexCoord::new(5, 5)).unwrap() else {
        panic!("expected an assault");
    };
    (theater, c, a, d)
}

/// Every live combat has two non-empty sides, owns its map slot, and its
/// participants point back at it
fn assert_consistent(theater: &Theater) {
    for (id, combat) in theater.combats() {
        assert!(!combat.attackers.is_empty(), "{} has no attackers", id);
        assert!(!combat.defenders.is_empty(), "{} has no defenders", id);
        assert_eq!(theater.combat_at(combat.cell), Some(id));
        assert!(combat.last_checked <= theater.now());
        for det in combat.participants() {
            let d = theater.detachment(det).expect("participant must exist");
            assert_eq!(d.combat, Some(id));
        }
    }
    for (id, d) in theater.detachments() {
        assert!(theater.map().occupants(d.location).contains(&id));
        if let Some(c) = d.combat {
            assert!(theater.combat(c).is_some_and(|c| c.contains(id)));
        }
    }
}

#[test]
fn test_overwhelming_attacker_takes_the_hex() {
    let (mut theater, c, a, d) = assault(42, 60, 3);

    theater.process_events(1440);
    theater.make_all_current();

    assert!(theater.combat(c).is_none());
    let report = &theater.reports()[0];
    assert_eq!(report.combat, c);
    assert_eq!(report.kind, CombatKind::Assault);
    assert_eq!(report.survivors, Some(Side::Attacker));
    assert!(report.passes > 0);

    // The defender left the hex one way or another
    let defender_gone = match theater.detachment(d) {
        Some(det) => det.location != HexCoord::new(5, 5),
        None => true,
    };
    assert!(defender_gone);

    // And the attacker advanced into it
    let attacker = theater.detachment(a).unwrap();
    assert_eq!(attacker.location, HexCoord::new(5, 5));
    assert_eq!(attacker.mode, Mode::Idle);
    assert_eq!(
        theater.map().cell(HexCoord::new(5, 5)).unwrap().owner,
        Some(ForceId(1))
    );
    assert_consistent(&theater);
}

#[test]
fn test_encircled_defender_surrenders() {
    let (mut theater, c, _, d) = assault(7, 27, 9);
    for hex in HexCoord::new(5, 5).neighbors() {
        if hex != HexCoord::new(4, 5) {
            let blocker = company(&theater, 1, hex, 3);
            theater.add_detachment(blocker).unwrap();
        }
    }

    assert_eq!(theater.start_retreat(c, d).unwrap(), RetreatOutcome::Surrendered);
    assert!(theater.detachment(d).is_none());
    let casualty = theater.fallen().last().unwrap();
    assert_eq!(casualty.status, Status::Surrendered);
    assert_eq!(casualty.force, ForceId(2));
    assert!(theater.combat(c).is_none());
    assert_consistent(&theater);
}

#[test]
fn test_screen_breaking_off_ends_infiltration() {
    let mut theater = Theater::with_map(HexMap::new(12, 12), 3);
    let mover = company(&theater, 1, HexCoord::new(3, 3), 9);
    let screen = company(&theater, 2, HexCoord::new(5, 3), 3);
    let m = theater.add_detachment(mover).unwrap();
    let s = theater.add_detachment(screen).unwrap();

    let MoveOutcome::Infiltration(c) = theater.begin_move(m, HexCoord::new(4, 3)).unwrap() else {
        panic!("expected an infiltration");
    };
    theater.process_events(5);
    if theater.combat(c).is_none() {
        // Already decided by the dice
        return;
    }

    theater.set_mode(s, Mode::Moving).unwrap();
    assert!(theater.combat(c).is_none());
    assert!(theater.detachment(s).unwrap().combat.is_none());
    let report = theater.reports().last().unwrap();
    assert_eq!(report.kind, CombatKind::Infiltration);
    assert_eq!(report.survivors, Some(Side::Attacker));
    assert_consistent(&theater);
}

#[test]
fn test_make_current_is_idempotent() {
    let (mut theater, c, _, _) = assault(11, 27, 18);
    theater.process_events(90);
    if !theater.make_current(c, true) {
        return;
    }

    let before = theater.clone();
    assert!(theater.make_current(c, true));
    assert_eq!(theater, before);
    assert_eq!(theater.combat(c).unwrap().last_checked, theater.now());
}

#[test]
fn test_combat_lags_until_observed() {
    let (mut theater, c, a, _) = assault(5, 27, 27);
    theater.process_events(10);
    let Some(combat) = theater.combat(c) else {
        return;
    };
    assert!(combat.last_checked <= theater.now());

    // Observing a participant brings its combat up to the clock
    theater.observe(a);
    if let Some(combat) = theater.combat(c) {
        assert_eq!(combat.last_checked, theater.now());
    }
}

#[test]
fn test_no_empty_combat_after_long_run() {
    for seed in [1, 2, 3] {
        let (mut theater, _, _, _) = assault(seed, 27, 18);
        for end in (60..=2880).step_by(60) {
            theater.process_events(end);
            assert_consistent(&theater);
        }
        theater.make_all_current();
        assert_consistent(&theater);
    }
}

#[test]
fn test_meeting_engagement_fights_both_ways() {
    let mut theater = Theater::with_map(HexMap::new(12, 12), 8);
    let west = company(&theater, 1, HexCoord::new(4, 6), 18);
    let east = company(&theater, 2, HexCoord::new(6, 6), 18);
    let w = theater.add_detachment(west).unwrap();
    let e = theater.add_detachment(east).unwrap();

    theater.set_mode(e, Mode::Moving).unwrap();
    theater.begin_move(w, HexCoord::new(5, 6)).unwrap();
    let MoveOutcome::Meeting(c) = theater.begin_move(e, HexCoord::new(5, 6)).unwrap() else {
        panic!("expected a meeting engagement");
    };
    assert_eq!(theater.detachment(e).unwrap().mode, Mode::Attacking);

    theater.process_events(60);
    if theater.make_current(c, true) {
        let combat = theater.combat(c).unwrap();
        assert_eq!(combat.kind, CombatKind::Meeting);
        assert!(combat.stats.passes > 0);
        assert_eq!(combat.stats.involved_defense, 1.0);
    }
    assert_consistent(&theater);
}

#[test]
fn test_purging_the_breaking_detachment_keeps_the_combat_running() {
    let (mut theater, c, _, _) = assault(13, 27, 18);
    let next = theater.combat(c).unwrap().next_event.expect("breaking point planned");
    let named = theater.queue().get(next).unwrap().kind.detachment();

    assert_eq!(theater.purge(named), 1);
    let replanned = theater.combat(c).unwrap().next_event.expect("breaking point re-planned");
    assert!(theater.queue().get(replanned).is_some());

    theater.process_events(100_000);
    match theater.combat(c) {
        Some(combat) => assert!(combat.stats.passes > 0),
        None => assert!(theater.reports().iter().any(|r| r.combat == c)),
    }
    assert_consistent(&theater);
}
