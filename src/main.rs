// src/main.rs
// Entry point for the rescue controller. Loads configuration, builds the headless
// kinematic host and the victim reporter, optionally arms path replay, then runs the
// control loop until the mission completes or the simulation ends.

use log::{error, info, warn};
use rescue_bot::{
    CognitiveReporter, CycleOutcome, KinematicSim, PathPlayback, RecordedPath, RescueBot,
    RescueConfig,
};
use std::error::Error;
use std::path::Path;

const CONFIG_PATH: &str = "config/rescue.yaml";

fn main() -> Result<(), Box<dyn Error>> {
    // Initialize logging; RUST_LOG=debug shows per-tick telemetry
    env_logger::init();
    info!("Starting rescue controller...");

    let config = if Path::new(CONFIG_PATH).exists() {
        RescueConfig::load(CONFIG_PATH)?
    } else {
        warn!("{} not found, using built-in defaults", CONFIG_PATH);
        RescueConfig::default()
    };

    let host = KinematicSim::new(&config.simulation, &config.drive);
    let reporter = CognitiveReporter::from_config(&config.reporting)?;
    let max_velocity = config.drive.max_velocity;
    let path_file = config.replay.path_file.clone();

    let mut bot = RescueBot::new(config, host, Box::new(reporter))?;

    if let Some(path) = path_file {
        match RecordedPath::load(&path) {
            Ok(recorded) if !recorded.is_empty() => {
                bot = bot.with_playback(PathPlayback::new(&recorded, max_velocity));
            }
            Ok(_) => info!("No path steps available, using normal navigation"),
            Err(e) => error!("Could not load recorded path {}: {}", path.display(), e),
        }
    }

    let outcome = bot.run();
    let status = bot.status();
    match outcome {
        CycleOutcome::MissionComplete => info!(
            "Mission complete at t={:.2} s, {} reports recorded",
            status.time, status.reports_recorded
        ),
        _ => info!(
            "Stopped at t={:.2} s in {} (target {}), {} reports recorded",
            status.time, status.behavior, status.target_index, status.reports_recorded
        ),
    }
    Ok(())
}
