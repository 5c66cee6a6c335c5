//! Save games and config files

use arc_operations::core::{CombatConfig, DetachmentId, ForceId, SimError};
use arc_operations::force::{Detachment, Tally, Unit, UnitRole};
use arc_operations::map::{HexCoord, HexMap};
use arc_operations::theater::{MoveOutcome, Theater};

fn battle(seed: u64) -> Theater {
    let mut theater = Theater::with_map(HexMap::generate(10, 10, seed), seed);
    let rifles = theater.armory().find("rifle squad").unwrap();
    let tanks = theater.armory().find("medium tank").unwrap();
    let a = Detachment::new(DetachmentId::UNASSIGNED, "1st Bn", ForceId(1), HexCoord::new(4, 4))
        .with_unit(Unit::new("Rifles", UnitRole::Infantry).with(rifles, 18))
        .with_unit(Unit::new("Tanks", UnitRole::Armor).with(tanks, 6))
        .with_supplies(5.0, 40.0);
    let d = Detachment::new(DetachmentId::UNASSIGNED, "B Coy", ForceId(2), HexCoord::new(5, 4))
        .with_unit(Unit::new("Rifles", UnitRole::Infantry).with(rifles, 12))
        .with_supplies(1.0, 20.0);
    let a = theater.add_detachment(a).unwrap();
    theater.add_detachment(d).unwrap();
    // Generated terrain may make the step impossible; the save still has to work
    if let Ok(MoveOutcome::Assault(c)) = theater.begin_move(a, HexCoord::new(5, 4)) {
        theater.process_events(45);
        theater.make_current(c, true);
    }
    theater
}

#[test]
fn test_tally_round_trip() {
    let mut tally = Tally::new(4);
    tally.add(arc_operations::force::WeaponId(1), 7, 9);
    tally.add(arc_operations::force::WeaponId(3), 0, 2);

    let json = serde_json::to_string(&tally).unwrap();
    let back: Tally = serde_json::from_str(&json).unwrap();
    assert_eq!(back, tally);
    assert_eq!(back.total_on_hand(), 7);
    assert_eq!(back.total_authorized(), 11);
}

#[test]
fn test_theater_json_round_trip() {
    let theater = battle(17);
    let json = theater.to_json().unwrap();
    let restored = Theater::from_json(&json).unwrap();
    assert_eq!(restored, theater);
}

#[test]
fn test_saved_theater_continues_identically() {
    let mut original = battle(23);
    let path = std::env::temp_dir().join(format!("arc_operations_save_{}.json", std::process::id()));
    original.save_json(&path).unwrap();
    let mut restored = Theater::load_json(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    // Same seed state, same queue: the futures must not diverge
    original.process_events(600);
    restored.process_events(600);
    original.make_all_current();
    restored.make_all_current();
    assert_eq!(restored, original);
}

#[test]
fn test_shipped_config_loads_and_validates() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("data/combat.toml");
    let config = CombatConfig::load(&path).unwrap();
    config.validate().unwrap();
    assert!(config.doctrine("standard").is_some());
}

#[test]
fn test_garbage_save_is_an_error() {
    assert!(matches!(
        Theater::from_json("{ not json"),
        Err(SimError::SerdeError(_))
    ));
}
