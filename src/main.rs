use std::env;
use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

use block_limiter::world::{WorldDb, WorldRepository};
use block_limiter::{Limiter, LimiterConfig};

struct RunArgs {
    world_path: PathBuf,
    config_path: PathBuf,
    ticks: u64,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = match parse_args(env::args().skip(1).collect()) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}", message);
            eprintln!("Usage: block-limiter [--world <db>] [--config <json>] [--ticks <n>]");
            std::process::exit(1);
        }
    };

    if !args.world_path.exists() {
        eprintln!(
            "World DB not found at {}. Use --world <path> to point at a valid SQLite file.",
            args.world_path.display()
        );
        std::process::exit(1);
    }

    let world_repo: Box<dyn WorldRepository> = match WorldDb::open(&args.world_path) {
        Ok(db) => Box::new(db),
        Err(err) => {
            eprintln!("Failed to open world DB: {}", err);
            std::process::exit(1);
        }
    };
    let snapshot = match world_repo.load_snapshot() {
        Ok(snapshot) => snapshot,
        Err(err) => {
            eprintln!("Failed to load world: {}", err);
            std::process::exit(1);
        }
    };

    let config = match LimiterConfig::load_from_path(&args.config_path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load limits: {}", err);
            std::process::exit(1);
        }
    };

    println!(
        "Loaded {} grids, {} identities, {} factions and {} limits",
        snapshot.grids.len(),
        snapshot.identities.len(),
        snapshot.factions.len(),
        config.limits.len()
    );

    let mut limiter = Limiter::with_snapshot(config, &snapshot);
    for _ in 0..args.ticks {
        let summary = limiter.tick();
        if summary.report.total() == 0 {
            continue;
        }
        println!(
            "tick {}: applied={} skipped={} failed={}",
            summary.tick, summary.report.applied, summary.report.skipped, summary.report.failed
        );
        for event in &limiter.punishment_log().events {
            println!(
                "  {:?} {} on {}",
                event.punishment, event.pair_name, event.grid_name
            );
        }
    }

    print_usage(limiter.config());
}

fn parse_args(args: Vec<String>) -> Result<RunArgs, String> {
    let mut iter = args.iter();
    let mut run = RunArgs {
        world_path: PathBuf::from("./assets/db/world.db"),
        config_path: PathBuf::from("./assets/data/limits.json"),
        ticks: 1,
    };
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--world" => {
                if let Some(value) = iter.next() {
                    run.world_path = PathBuf::from(value);
                }
            }
            "--config" => {
                if let Some(value) = iter.next() {
                    run.config_path = PathBuf::from(value);
                }
            }
            "--ticks" => {
                let value = iter.next().ok_or("--ticks needs a value")?;
                run.ticks = value
                    .parse()
                    .map_err(|_| format!("Invalid tick count: {}", value))?;
            }
            other => return Err(format!("Unknown argument: {}", other)),
        }
    }
    Ok(run)
}

fn print_usage(config: &LimiterConfig) {
    for item in &config.limits {
        let mut owners: Vec<_> = item.found_entities.iter().collect();
        owners.sort();
        println!("{} (limit {}):", item.label(), item.limit);
        for (owner_id, count) in owners {
            println!("  owner {} -> {}", owner_id, count);
        }
    }
}
