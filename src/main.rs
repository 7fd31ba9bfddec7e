use std::path::PathBuf;

use clap::Parser;
use orbsim::reporting::RunReport;
use orbsim::{save_load, SimConfig, Simulation, TickOutcome};

#[derive(Parser, Debug, PartialEq)]
#[command(name = "orbsim", version, about = "Run the orb simulation headless and report on it")]
struct Args {
    /// Seed for the simulation's random source.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Stop after this many generations have died out.
    #[arg(long, default_value_t = 50)]
    generations: usize,

    /// Hard cap on ticks, in case a population never dies out.
    #[arg(long, default_value_t = 1_000_000)]
    max_ticks: u64,

    /// JSON settings file merged over the defaults.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Write the run report as JSON here.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Write a snapshot of the final engine state here.
    #[arg(long)]
    save: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    let args = Args::parse();

    let config = args
        .settings
        .as_ref()
        .map(SimConfig::load)
        .unwrap_or_default();
    let mut sim = Simulation::new(config, args.seed);
    log::info!(
        "orbsim starting: seed {}, {}x{} world, {} orbs",
        args.seed,
        sim.config().rows,
        sim.config().cols,
        sim.alive_count()
    );

    let mut completed = 0;
    while completed < args.generations && sim.tick_count() < args.max_ticks {
        if let TickOutcome::GenerationEnded { .. } = sim.advance_tick() {
            completed += 1;
        }
    }
    if completed < args.generations {
        log::warn!(
            "stopped at tick cap {} with {completed} of {} generations finished",
            args.max_ticks,
            args.generations
        );
    }

    let report = RunReport::from_simulation(args.seed, &sim);
    log::info!(
        "run finished: {} generations, longest {} turns, {} ticks",
        report.generations_completed,
        report.max_turns,
        report.ticks
    );

    if let Some(path) = &args.report {
        if let Err(e) = report.write_json(path) {
            log::error!("could not write report to {}: {e}", path.display());
            std::process::exit(1);
        }
    }
    if let Some(path) = &args.save {
        if let Err(e) = save_load::save_to_file(&sim, path) {
            log::error!("could not save snapshot: {e}");
            std::process::exit(1);
        }
    }
}
