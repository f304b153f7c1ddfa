//! Rescue - reactive behavior controller for a simulated rescue robot
//!
//! Each control tick the mission runner advances the host clock, samples every sensor
//! once, lets the arbiter pick exactly one behavior (trap escape, hole escape, wall
//! following or goal seeking with stuck recovery) and sends the resulting wheel command.
//! Victim reporting and recorded-path replay are layered on top of that loop.

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

/// Fixed-priority behavior selection
pub mod arbiter;
/// Hazard escapes and wall following
pub mod behavior;
/// Perception, classifiers, localization and behavior state
pub mod core;
pub mod navigation;
pub mod replay;
pub mod reporting;
pub mod sim_interface;

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Re-export commonly used items for easier access
pub use arbiter::{Arbiter, TickDecision};
pub use behavior::{HazardConfig, WallFollowConfig};
pub use crate::core::{BehaviorState, ClassifierConfig, Perception, Pose, Rgb, SensorFrame, WallSide};
pub use navigation::{DriveConfig, GoalNavigator, MotionCommand, NavigationConfig, RecoveryConfig};
pub use replay::{PathPlayback, RecordedPath, ReplayConfig};
pub use reporting::{
    CognitiveReporter, ReportError, ReportOutcome, ReportScheduler, ReportingConfig, VictimReport,
    VictimReporter, VictimType,
};
pub use sim_interface::{KinematicSim, RobotHost, SimConfig};

/// Control loop timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Simulated milliseconds per tick
    pub tick_ms: u32,
}

impl TimingConfig {
    /// Tick length in seconds
    pub fn dt(&self) -> f64 {
        self.tick_ms as f64 / 1000.0
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig { tick_ms: 32 }
    }
}

/// Main configuration structure for the rescue controller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RescueConfig {
    /// Tick length
    pub timing: TimingConfig,
    /// Wheel speeds and drive geometry
    pub drive: DriveConfig,
    /// Color and proximity thresholds
    pub classifier: ClassifierConfig,
    /// Hole and trap escape timing
    pub hazard: HazardConfig,
    /// Wall follower tuning
    pub wall: WallFollowConfig,
    /// Stuck detection and recovery
    pub recovery: RecoveryConfig,
    /// Waypoints and arrival tolerance
    pub navigation: NavigationConfig,
    /// Reporter, sinks and report throttling
    pub reporting: ReportingConfig,
    /// Recorded path replay
    pub replay: ReplayConfig,
    /// Headless host used when no external simulator is attached
    pub simulation: SimConfig,
}

impl RescueConfig {
    /// Loads configuration from a YAML file; missing sections take their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RescueError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| RescueError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: RescueConfig = serde_yaml::from_reader(file)?;
        config.validate()?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Rejects values the controller cannot run with
    pub fn validate(&self) -> Result<(), RescueError> {
        let fail = |msg: &str| Err(RescueError::ConfigError(msg.to_string()));
        if self.timing.tick_ms == 0 {
            return fail("timing.tick_ms must be positive");
        }
        if self.navigation.waypoints.is_empty() {
            return fail("navigation.waypoints must not be empty");
        }
        if self.navigation.tolerance <= 0.0 {
            return fail("navigation.tolerance must be positive");
        }
        if self.drive.max_velocity <= 0.0 || self.drive.navigation_speed <= 0.0 {
            return fail("drive velocities must be positive");
        }
        if self.drive.wheel_radius <= 0.0 || self.drive.axle_track <= 0.0 {
            return fail("drive.wheel_radius and drive.axle_track must be positive");
        }
        if self.recovery.history_size < 2 {
            return fail("recovery.history_size must be at least 2");
        }
        if self.classifier.hole_debounce < 0.0 || self.reporting.interval < 0.0 {
            return fail("durations must not be negative");
        }
        Ok(())
    }
}

/// Rescue controller error types
#[derive(Debug, Error)]
pub enum RescueError {
    /// Invalid configuration value
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// File could not be opened or read
    #[error("I/O error on {path}: {source}")]
    IoError {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Malformed YAML configuration
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Malformed JSON path or phrase file
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Reporter could not be built
    #[error("reporting error: {0}")]
    ReportingError(#[from] ReportError),
}

/// Result of one control cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Keep cycling
    Continue,
    /// Every waypoint reached; the robot is stopped
    MissionComplete,
    /// The host clock stopped; nothing further was sent
    Terminated,
}

/// Snapshot of mission progress
#[derive(Debug, Clone, PartialEq)]
pub struct MissionStatus {
    /// Active behavior label
    pub behavior: &'static str,
    /// Waypoint cursor
    pub target_index: usize,
    /// All waypoints reached
    pub mission_complete: bool,
    /// Recorded path still driving the motors
    pub replaying: bool,
    /// Reporter calls made
    pub reports_issued: u32,
    /// Calls that produced a new record
    pub reports_recorded: u32,
    /// Distance to the current target at the last navigator tick
    pub last_distance: Option<f64>,
    /// Simulated seconds
    pub time: f64,
}

/// Mission runner: owns the host and drives the perception-decision-action loop
pub struct RescueBot<H: RobotHost> {
    config: RescueConfig,
    host: H,
    perception: Perception,
    arbiter: Arbiter,
    scheduler: ReportScheduler,
    reporter: Box<dyn VictimReporter>,
    playback: Option<PathPlayback>,
    reports_recorded: u32,
    terminated: bool,
}

impl<H: RobotHost> RescueBot<H> {
    /// Validates the configuration and wires every component to the host
    pub fn new(
        config: RescueConfig,
        host: H,
        reporter: Box<dyn VictimReporter>,
    ) -> Result<Self, RescueError> {
        config.validate()?;
        let scheduler = ReportScheduler::new(&config.reporting, host.now());
        let arbiter = Arbiter::new(&config);
        info!(
            "Rescue controller ready: {} waypoints, tick {} ms",
            config.navigation.waypoints.len(),
            config.timing.tick_ms
        );
        Ok(RescueBot {
            config,
            host,
            perception: Perception::new(),
            arbiter,
            scheduler,
            reporter,
            playback: None,
            reports_recorded: 0,
            terminated: false,
        })
    }

    /// Replays a recorded path before handing control to the reactive core
    pub fn with_playback(mut self, playback: PathPlayback) -> Self {
        if playback.remaining_steps() > 0 {
            info!(
                "Path replay armed: {} entries, {} steps",
                playback.entries(),
                playback.remaining_steps()
            );
            self.playback = Some(playback);
        } else {
            info!("Recorded path is empty, using reactive navigation");
        }
        self
    }

    /// Runs one tick: advance, sense, decide, report, actuate
    pub fn run_cycle(&mut self) -> CycleOutcome {
        if self.terminated {
            return CycleOutcome::Terminated;
        }
        if self.arbiter.is_complete() {
            return CycleOutcome::MissionComplete;
        }
        if !self.host.advance(self.config.timing.tick_ms) {
            self.terminated = true;
            info!("Simulation ended, shutting down all behaviors");
            return CycleOutcome::Terminated;
        }

        let now = self.host.now();
        let frame = self.perception.sample(&mut self.host, now);

        let (command, victim_detected) = match self.playback.as_mut().map(|p| p.next_command()) {
            Some(Some(command)) => {
                self.arbiter.track_external(&frame, command);
                (command, false)
            }
            Some(None) => {
                self.playback = None;
                self.finish_replay(&frame)
            }
            None => {
                let decision = self.arbiter.tick(&frame);
                (decision.command, decision.victim_detected)
            }
        };

        self.dispatch_reports(&frame, victim_detected);
        self.host.set_velocity(command.left, command.right);
        self.log_telemetry(&frame);

        if self.arbiter.is_complete() {
            CycleOutcome::MissionComplete
        } else {
            CycleOutcome::Continue
        }
    }

    /// Runs cycles until the mission completes or the simulation ends
    pub fn run(&mut self) -> CycleOutcome {
        loop {
            let outcome = self.run_cycle();
            if outcome != CycleOutcome::Continue {
                info!("Mission loop finished: {:?}", outcome);
                return outcome;
            }
        }
    }

    fn finish_replay(&mut self, frame: &SensorFrame) -> (MotionCommand, bool) {
        let navigator = self.arbiter.navigator();
        let goal = navigator.final_waypoint();
        let tolerance = navigator.tolerance();
        match goal.map(|g| frame.pose.distance_to(&g)) {
            Some(distance) if distance <= tolerance => {
                info!("Path replay reached the goal ({:.3} m)", distance);
                self.arbiter.complete_mission();
                (MotionCommand::STOP, false)
            }
            distance => {
                warn!(
                    "Path replay ended {:.3} m from the goal, falling back to reactive navigation",
                    distance.unwrap_or(f64::NAN)
                );
                let decision = self.arbiter.tick(frame);
                (decision.command, decision.victim_detected)
            }
        }
    }

    fn dispatch_reports(&mut self, frame: &SensorFrame, victim_detected: bool) {
        let hazard_active = self.arbiter.is_hazard_active();
        let detected = if victim_detected {
            self.scheduler
                .request_detected(frame.time, frame.pose, hazard_active)
        } else {
            None
        };
        let request = detected.or_else(|| {
            self.scheduler
                .poll_timed(frame.time, frame.pose, hazard_active)
        });

        let Some(report) = request else {
            return;
        };
        match self.reporter.report(&report) {
            Ok(ReportOutcome::Recorded) => self.reports_recorded += 1,
            Ok(ReportOutcome::Duplicate) => {
                debug!("Report {} was a duplicate", report.sequence)
            }
            Err(e) => error!("Victim report {} failed: {}", report.sequence, e),
        }
    }

    fn log_telemetry(&self, frame: &SensorFrame) {
        let distance = self.arbiter.navigator().last_distance().unwrap_or(f64::NAN);
        let classifiers = self.arbiter.classifiers();
        debug!(
            "t={:.3} Pos: X:{:5.2} Z:{:5.2} | Dist: {:.2} | Floor R:{:3} G:{:3} B:{:3} | Camera R:{:3} G:{:3} B:{:3} | Trap:{} Wall:{} Victim:{} Obstacle:{} | {}",
            frame.time,
            frame.pose.x,
            frame.pose.z,
            distance,
            frame.floor.r,
            frame.floor.g,
            frame.floor.b,
            frame.camera.r,
            frame.camera.g,
            frame.camera.b,
            classifiers.is_trap(frame),
            classifiers.is_wall(frame),
            classifiers.is_victim(frame),
            classifiers.is_obstacle_ahead(frame),
            if self.playback.is_some() {
                "Replay"
            } else {
                self.arbiter.state().label()
            }
        );
    }

    /// Get current mission status
    pub fn status(&self) -> MissionStatus {
        let navigator = self.arbiter.navigator();
        MissionStatus {
            behavior: self.arbiter.state().label(),
            target_index: navigator.target_index(),
            mission_complete: self.arbiter.is_complete(),
            replaying: self.playback.is_some(),
            reports_issued: self.scheduler.issued(),
            reports_recorded: self.reports_recorded,
            last_distance: navigator.last_distance(),
            time: self.host.now(),
        }
    }

    /// The robot host
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutable access to the host, e.g. to inject sensor readings
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// The behavior arbiter
    pub fn arbiter(&self) -> &Arbiter {
        &self.arbiter
    }

    /// Configuration in use
    pub fn config(&self) -> &RescueConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        assert!(RescueConfig::default().validate().is_ok());
        assert_eq!(RescueConfig::default().timing.dt(), 0.032);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rescue.yaml");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "wall:\n  side: left\nreporting:\n  interval: 5.0").unwrap();

        let config = RescueConfig::load(&path).unwrap();
        assert_eq!(config.wall.side, WallSide::Left);
        assert_eq!(config.reporting.interval, 5.0);
        assert_eq!(config.navigation.tolerance, 0.05);
        assert_eq!(config.classifier.hole_threshold, 90);
    }

    #[test]
    fn test_empty_waypoints_rejected() {
        let mut config = RescueConfig::default();
        config.navigation.waypoints.clear();
        assert!(matches!(config.validate(), Err(RescueError::ConfigError(_))));
    }

    #[test]
    fn test_missing_config_file() {
        let err = RescueConfig::load("/nonexistent/rescue.yaml").unwrap_err();
        assert!(matches!(err, RescueError::IoError { .. }));
    }

    #[test]
    fn test_terminated_host_gets_no_commands() {
        let config = RescueConfig::default();
        let host = KinematicSim::new(&config.simulation, &config.drive).with_duration(0.0);
        let mut reporter = reporting::MockVictimReporter::new();
        reporter.expect_report().never();

        let mut bot = RescueBot::new(config, host, Box::new(reporter)).unwrap();
        assert_eq!(bot.run_cycle(), CycleOutcome::Terminated);
        assert_eq!(bot.run_cycle(), CycleOutcome::Terminated);
        assert_eq!(bot.host().steps(), 0);
        assert_eq!(bot.host().last_command(), MotionCommand::STOP);
    }
}
