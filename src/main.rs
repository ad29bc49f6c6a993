use anyhow::Context;
use clap::Parser;
use signal_sim::{scenario, SimulationAttributes, DT};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "signal-sim")]
#[command(about = "Headless simulation of a signalised four-way intersection")]
struct Cli {
    /// JSON file of simulation attributes
    #[arg(long)]
    config: Option<PathBuf>,

    /// Simulated seconds to run for, overriding the config
    #[arg(long)]
    duration: Option<f64>,

    /// Let a Q-learning agent control the lights
    #[arg(long)]
    q_learning: bool,

    /// Seed for the random number generator
    #[arg(long)]
    seed: Option<u64>,

    /// Print a JSON snapshot of the final state
    #[arg(long)]
    snapshot: bool,
}

/// Log a progress line every this many simulated seconds.
const REPORT_INTERVAL: f64 = 10.0;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut attributes = match &cli.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            SimulationAttributes::from_json(&json)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => SimulationAttributes::default(),
    };
    if let Some(duration) = cli.duration {
        attributes.max_duration = duration;
    }
    attributes.use_q_learning |= cli.q_learning;
    if cli.seed.is_some() {
        attributes.seed = cli.seed;
    }

    let mut sim = scenario::four_way_intersection(&attributes)?;
    log::info!(
        "simulating {:.0} s ({} lights, q-learning {})",
        sim.max_duration(),
        sim.iter_lights().count(),
        if sim.agent().is_some() { "on" } else { "off" },
    );

    let frames_per_report = (REPORT_INTERVAL / DT).round() as usize;
    while sim.is_running() {
        sim.run(frames_per_report);
        let on_network = sim.iter_vehicles().filter(|v| v.segment().is_some()).count();
        log::info!(
            "t={:.1}s vehicles={} on network={} reward={:.1}",
            sim.t(),
            sim.vehicle_count(),
            on_network,
            sim.calculate_reward(),
        );
    }

    match sim.average_wait_time() {
        Some(avg) => println!("Total average wait time: {:.2} seconds", avg),
        None => println!("No vehicles passed through the simulation."),
    }
    if cli.snapshot {
        println!("{}", sim.snapshot().to_json()?);
    }
    Ok(())
}
