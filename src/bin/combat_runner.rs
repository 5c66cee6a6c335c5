//! Headless Combat Runner
//!
//! Sets up a small scenario, runs the event loop for a number of minutes and
//! prints what happened.

use std::path::PathBuf;

use ahash::AHashMap;
use arc_operations::core::{CombatConfig, DetachmentId, ForceId, Minute, Result, SimError};
use arc_operations::force::{Armory, Detachment, Mode, Unit, UnitRole, WeaponId};
use arc_operations::map::{HexCoord, HexMap, Terrain};
use arc_operations::theater::{Casualty, CombatReport, MoveOutcome, Theater};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Scenario {
    /// A battalion attacks a dug-in company in the woods
    Assault,
    /// Two columns march into the same hex
    Meeting,
    /// A company slips past a screening platoon
    Infiltration,
}

/// Headless Combat Runner - resolve a scenario and print the outcome
#[derive(Parser, Debug)]
#[command(name = "combat_runner")]
#[command(about = "Run a combat scenario through the event queue and report the outcome")]
struct Args {
    #[arg(long, value_enum, default_value = "assault")]
    scenario: Scenario,

    /// Simulated minutes to run
    #[arg(long, default_value_t = 720)]
    minutes: Minute,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Combat tunables (TOML); built-in defaults when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,
}

#[derive(Serialize)]
struct Summary<'a> {
    scenario: String,
    seed: u64,
    minutes: Minute,
    reports: &'a [CombatReport],
    fallen: &'a [Casualty],
    running: Vec<String>,
    log: Vec<String>,
    anomalies: Vec<String>,
}

fn weapon(armory: &Armory, name: &str) -> Result<WeaponId> {
    armory
        .find(name)
        .ok_or_else(|| SimError::Config(format!("armory has no '{}'", name)))
}

fn battalion(armory: &Armory, name: &str, force: u8, at: HexCoord) -> Result<Detachment> {
    Ok(Detachment::new(DetachmentId::UNASSIGNED, name, ForceId(force), at)
        .with_unit(
            Unit::new("Rifle Coys", UnitRole::Infantry)
                .with(weapon(armory, "rifle squad")?, 27)
                .with(weapon(armory, "machine gun")?, 9),
        )
        .with_unit(Unit::new("AT Pl", UnitRole::AntiTank).with(weapon(armory, "at gun")?, 4))
        .with_unit(Unit::new("Mortar Pl", UnitRole::Artillery).with(weapon(armory, "mortar")?, 6))
        .with_supplies(4.0, 40.0))
}

fn company(armory: &Armory, name: &str, force: u8, at: HexCoord) -> Result<Detachment> {
    Ok(Detachment::new(DetachmentId::UNASSIGNED, name, ForceId(force), at)
        .with_unit(
            Unit::new("Rifles", UnitRole::Infantry)
                .with(weapon(armory, "rifle squad")?, 9)
                .with(weapon(armory, "machine gun")?, 3),
        )
        .with_supplies(1.0, 12.0))
}

fn setup(scenario: Scenario, config: CombatConfig, seed: u64) -> Result<Theater> {
    let mut map = HexMap::new(12, 12);
    map.set_terrain(HexCoord::new(6, 5), Terrain::Forest);
    map.set_fortification(HexCoord::new(6, 5), 1.0);
    let mut theater = Theater::new(config, Armory::standard(), map, seed);
    let armory = theater.armory().clone();

    match scenario {
        Scenario::Assault => {
            let attacker = theater.add_detachment(battalion(&armory, "1st Bn", 1, HexCoord::new(5, 5))?)?;
            let defender = company(&armory, "B Coy", 2, HexCoord::new(6, 5))?
                .with_mode(Mode::Defending)
                .with_headquarters(HexCoord::new(10, 5));
            theater.add_detachment(defender)?;
            let outcome = theater.begin_move(attacker, HexCoord::new(6, 5))?;
            tracing::info!("opening move: {:?}", outcome);
        }
        Scenario::Meeting => {
            let west = theater.add_detachment(battalion(&armory, "1st Bn", 1, HexCoord::new(4, 6))?)?;
            let east = theater.add_detachment(battalion(&armory, "II Btl", 2, HexCoord::new(6, 6))?)?;
            theater.set_mode(east, Mode::Moving)?;
            theater.begin_move(west, HexCoord::new(5, 6))?;
            let outcome = theater.begin_move(east, HexCoord::new(5, 6))?;
            tracing::info!("opening move: {:?}", outcome);
        }
        Scenario::Infiltration => {
            let mover = theater.add_detachment(company(&armory, "C Coy", 1, HexCoord::new(3, 3))?)?;
            theater.add_detachment(company(&armory, "Screen", 2, HexCoord::new(5, 3))?)?;
            let outcome = theater.begin_move(mover, HexCoord::new(4, 3))?;
            if let MoveOutcome::Marching { .. } = outcome {
                tracing::warn!("no screen in the way");
            }
        }
    }
    Ok(theater)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("arc_operations=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let seed = args.seed.unwrap_or_else(rand::random);
    let config = match &args.config {
        Some(path) => CombatConfig::load(path)?,
        None => CombatConfig::default(),
    };
    config.validate()?;

    let mut theater = setup(args.scenario, config, seed)?;
    theater.process_events(args.minutes);
    theater.make_all_current();

    let summary = Summary {
        scenario: format!("{:?}", args.scenario),
        seed,
        minutes: args.minutes,
        reports: theater.reports(),
        fallen: theater.fallen(),
        running: theater
            .combats()
            .map(|(_, c)| {
                format!(
                    "{} at {:?}: ratio {:.2}, {} passes",
                    c.kind, c.cell, c.stats.ratio, c.stats.passes
                )
            })
            .collect(),
        log: theater
            .log()
            .iter()
            .map(|e| format!("{:>5} {} {}", e.time, e.kind.name(), e.kind.detachment()))
            .collect(),
        anomalies: theater
            .anomalies()
            .iter()
            .map(|(t, a)| format!("{:>5} {}", t, a))
            .collect(),
    };

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&summary)?),
        _ => {
            println!("Combat Result");
            println!("=============");
            println!("Scenario: {}  Seed: {}  Minutes: {}", summary.scenario, seed, args.minutes);
            for r in summary.reports {
                println!(
                    "{} at {:?}: {}-{} min, survivors {:?}, losses {}/{}",
                    r.kind,
                    r.cell,
                    r.started,
                    r.ended,
                    r.survivors,
                    r.attacker_losses,
                    r.defender_losses
                );
            }
            for line in &summary.running {
                println!("running: {}", line);
            }
            let mut by_force: AHashMap<ForceId, usize> = AHashMap::new();
            for c in summary.fallen {
                println!("{:>5} {} ({}) {:?}", c.time, c.name, c.force, c.status);
                *by_force.entry(c.force).or_insert(0) += 1;
            }
            let mut by_force: Vec<_> = by_force.into_iter().collect();
            by_force.sort_by_key(|(force, _)| force.0);
            for (force, count) in by_force {
                println!("{}: {} detachments lost", force, count);
            }
            println!("\nEvent log (newest first):");
            for line in &summary.log {
                println!("  {}", line);
            }
            if !summary.anomalies.is_empty() {
                println!("\nAnomalies:");
                for line in &summary.anomalies {
                    println!("  {}", line);
                }
            }
        }
    }
    Ok(())
}
