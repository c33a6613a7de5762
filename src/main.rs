use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::info;

use intersection_sim::simulation::{
    Command, Direction, SignalPlan, SimConfig, SimDriver, SimWorld, DEFAULT_FRAME_MS,
};

#[derive(Parser)]
#[command(name = "intersection_sim")]
#[command(about = "Signalized intersection traffic simulation (headless)")]
struct Cli {
    /// Number of physics frames to run
    #[arg(long, default_value = "3000")]
    ticks: u64,

    /// Milliseconds per physics frame
    #[arg(long, default_value_t = DEFAULT_FRAME_MS)]
    frame_ms: f32,

    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// JSON config file; missing fields fall back to defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Signal plan, overrides the config file
    #[arg(long, value_enum)]
    plan: Option<PlanArg>,

    /// Spawn probability per lane per second, overrides the config file
    #[arg(long)]
    spawn_rate: Option<f32>,

    /// Lanes per approach, overrides the config file
    #[arg(long)]
    lanes: Option<u8>,

    /// Start in manual mode with this direction green (N, S, E or W)
    #[arg(long)]
    manual: Option<String>,

    /// Pace frames to wall-clock time
    #[arg(long)]
    realtime: bool,

    /// Simulated seconds between progress reports
    #[arg(long, default_value = "10")]
    report_every: u32,

    /// Print a text map with each progress report
    #[arg(long)]
    draw: bool,

    /// Print the final snapshot as JSON on stdout
    #[arg(long)]
    snapshot: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum PlanArg {
    TwoWay,
    FourPhase,
}

fn build_config(cli: &Cli) -> Result<SimConfig> {
    let mut config = match &cli.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    if let Some(plan) = cli.plan {
        config.signal_plan = match plan {
            PlanArg::TwoWay => SignalPlan::two_way(),
            PlanArg::FourPhase => SignalPlan::four_phase(),
        };
    }
    if let Some(rate) = cli.spawn_rate {
        config.spawn_rate = rate;
    }
    if let Some(lanes) = cli.lanes {
        config.lanes_per_direction = lanes;
    }
    config.validate().context("Invalid simulation settings")?;
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if !cli.frame_ms.is_finite() || cli.frame_ms <= 0.0 {
        anyhow::bail!("--frame-ms must be a positive number, got {}", cli.frame_ms);
    }

    let config = build_config(&cli)?;
    let world = match cli.seed {
        Some(seed) => SimWorld::new_with_seed(config, seed)?,
        None => SimWorld::new(config)?,
    };

    info!("Running intersection simulation in headless mode...");
    info!("Ticks: {}, Frame: {}ms", cli.ticks, cli.frame_ms);

    let (mut driver, handle) = SimDriver::new(world, cli.frame_ms);
    if let Some(manual) = &cli.manual {
        let direction: Direction = manual.parse()?;
        handle.send(Command::SetAutoMode(false))?;
        handle.send(Command::SetManualPhase(direction))?;
    }

    let report_frames =
        ((f64::from(cli.report_every) * 1000.0) / f64::from(cli.frame_ms)).ceil().max(1.0) as u64;
    let draw = cli.draw;

    driver.run(Some(cli.ticks), cli.realtime, |world, frame| {
        if frame % report_frames == 0 {
            info!(
                "--- After frame {} ({:.1}s simulated time) ---",
                frame,
                world.stats().elapsed_time
            );
            world.print_summary();
            if draw {
                println!("{}", world.draw_map());
            }
        }
    });
    handle.stop();

    let world = driver.into_world();
    info!("=== SIMULATION COMPLETE ===");
    world.stats().log_summary();

    if cli.snapshot {
        let json = serde_json::to_string_pretty(&world.snapshot())
            .context("Failed to serialize snapshot")?;
        println!("{json}");
    }

    Ok(())
}
