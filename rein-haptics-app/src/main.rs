//! Rein Haptics demo
//!
//! Runs the haptic control loop against a simulated arm whose tool is
//! pushed back and forth through the scene by a hand.
//!
//! # Usage
//!
//! ```bash
//! # Demo scene (a sphere and a box) for 10 seconds
//! rein-haptics
//!
//! # Custom scene, 400 Hz, transport on a worker thread
//! rein-haptics --config scene.json --rate 400 --buffered
//!
//! # Print the effective configuration
//! rein-haptics --dump-config
//! ```

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use glam::Vec3;
use rein_haptics::{
    BufferedLink, ControlLoop, HandMotion, HapticController, HapticsConfig, RobotLink,
    SimulatedRobot,
};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Rein haptic force-rendering demo
#[derive(Parser, Debug)]
#[command(name = "rein-haptics")]
#[command(author, version, about = "Haptic force rendering against a simulated arm", long_about = None)]
struct Cli {
    /// JSON configuration file; the built-in demo scene is used otherwise
    #[arg(short, long)]
    config: Option<String>,

    /// Run time in seconds
    #[arg(short, long, default_value = "10")]
    duration: f64,

    /// Override the control tick rate (Hz)
    #[arg(short, long)]
    rate: Option<f64>,

    /// Run the robot transport on a worker thread
    #[arg(short, long)]
    buffered: bool,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    dump_config: bool,

    /// Logging verbosity level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Rein Haptics v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &cli.config {
        Some(path) => HapticsConfig::load(path).with_context(|| format!("loading {path}"))?,
        None => HapticsConfig::demo()?,
    };
    if let Some(rate) = cli.rate {
        config.control.tick_rate_hz = rate;
    }
    config.validate()?;

    if cli.dump_config {
        println!("{}", config.to_json_pretty()?);
        return Ok(());
    }

    let robot = simulated_robot(&config);
    let link: Box<dyn RobotLink> = if cli.buffered {
        info!("robot transport on worker thread");
        Box::new(BufferedLink::spawn(robot, config.link)?)
    } else {
        Box::new(robot)
    };

    let mut controller = HapticController::new(
        link,
        config.shapes.clone(),
        config.frame,
        config.telemetry,
        config.safety,
    )?;
    let control_loop = ControlLoop::new(config.control)?;

    controller.start().context("enabling robot")?;

    let report_every = config.control.tick_rate_hz.round().max(1.0) as u64;
    let mut tick = 0u64;
    let mut contact_ticks = 0u64;
    let mut peak_command = 0.0f32;
    let stats = control_loop.run(
        &mut controller,
        Some(Duration::from_secs_f64(cli.duration.max(0.0))),
        |report| {
            tick += 1;
            if report.active_contacts > 0 {
                contact_ticks += 1;
            }
            peak_command = peak_command.max(report.command.length());
            if tick % report_every == 0 {
                info!(
                    contacts = report.active_contacts,
                    force = ?report.force,
                    command = ?report.command,
                    health = ?report.health,
                    "tick {tick}"
                );
            }
        },
    );

    if let Err(e) = controller.shutdown() {
        warn!("shutdown incomplete: {e}");
    }

    info!(
        ticks = stats.ticks,
        skipped = stats.skipped_ticks,
        overruns = stats.overruns,
        max_tick_us = stats.max_tick_time.as_micros() as u64,
        contact_ticks,
        peak_command,
        "done in {:.2}s",
        stats.elapsed.as_secs_f64()
    );
    Ok(())
}

/// Simulated arm whose hand sweeps the tool along the scene's x axis
/// through every shape, integrated against the wall clock so buffered and
/// direct runs move at the same pace.
fn simulated_robot(config: &HapticsConfig) -> SimulatedRobot {
    let frame = &config.frame;
    let centers: Vec<Vec3> = config.shapes.iter().map(|s| s.geometry.center()).collect();
    let home = if centers.is_empty() {
        Vec3::ZERO
    } else {
        centers.iter().copied().sum::<Vec3>() / centers.len() as f32
    };
    let reach = centers
        .iter()
        .map(|c| (c.x - home.x).abs())
        .fold(0.0f32, f32::max)
        + 1.0;

    let hand = HandMotion {
        center: frame.position_to_robot(home),
        axis: frame.position_to_robot(Vec3::X * reach),
        period: 4.0,
        stiffness: 300.0,
    };
    let dt = config.control.period().as_secs_f32();
    SimulatedRobot::new(hand.center, dt)
        .with_damping(20.0)
        .with_hand(hand)
        .real_time()
}
