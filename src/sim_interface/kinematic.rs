// sim_interface/kinematic.rs

// Headless differential-drive host. Integrates the last motor command through the same
// kinematic model the planner uses and paints the arena with rectangular color patches,
// which is enough to exercise every classifier without an external simulator.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::{Clock, MotorActuator, SensorSuite};
use crate::core::localization::Pose;
use crate::core::perception::{PROXIMITY_SENSOR_COUNT, Rgb};
use crate::navigation::controller::MotionCommand;
use crate::navigation::planner::{DifferentialDrive, DriveConfig, MotionModel};

/// Axis-aligned rectangle of color on the floor or in the camera view
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorPatch {
    /// Lower corner
    pub min: Pose,
    /// Upper corner
    pub max: Pose,
    /// Color reported inside
    pub color: Rgb,
}

impl ColorPatch {
    /// Patch covering `min..=max`
    pub fn new(min: Pose, max: Pose, color: Rgb) -> Self {
        ColorPatch { min, max, color }
    }

    /// Pose lies inside, edges included
    pub fn contains(&self, pose: &Pose) -> bool {
        (self.min.x..=self.max.x).contains(&pose.x) && (self.min.z..=self.max.z).contains(&pose.z)
    }
}

/// Headless host world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Simulated seconds before the clock stops
    pub duration: f64,
    /// Starting position
    pub start: Pose,
    /// Starting heading (rad)
    pub start_heading: f64,
    /// Floor color outside every patch
    pub floor: Rgb,
    /// Camera color outside every patch
    pub camera: Rgb,
    /// Floor patches; later ones paint over earlier ones
    pub floor_patches: Vec<ColorPatch>,
    /// Camera patches, looked up at the robot position
    pub camera_patches: Vec<ColorPatch>,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            duration: 600.0,
            start: Pose::default(),
            start_heading: 0.0,
            floor: Rgb::new(220, 220, 220),
            camera: Rgb::new(100, 100, 100),
            floor_patches: Vec::new(),
            camera_patches: Vec::new(),
        }
    }
}

/// Headless robot host: stepped clock, differential-drive kinematics and painted sensors
pub struct KinematicSim {
    model: DifferentialDrive,
    config: SimConfig,
    pose: Pose,
    heading: f64,
    time: f64,
    command: MotionCommand,
    proximity: [f64; PROXIMITY_SENSOR_COUNT],
    steps: u64,
}

impl KinematicSim {
    /// Host at the configured start pose with the clock at zero
    pub fn new(config: &SimConfig, drive: &DriveConfig) -> Self {
        info!(
            "Kinematic host ready: start ({:.2}, {:.2}), {} floor patches, {:.0} s limit",
            config.start.x,
            config.start.z,
            config.floor_patches.len(),
            config.duration
        );
        KinematicSim {
            model: DifferentialDrive::from_config(drive),
            config: config.clone(),
            pose: config.start,
            heading: config.start_heading,
            time: 0.0,
            command: MotionCommand::STOP,
            proximity: [0.0; PROXIMITY_SENSOR_COUNT],
            steps: 0,
        }
    }

    /// Adds a floor patch on top of the existing ones
    pub fn with_floor_patch(mut self, patch: ColorPatch) -> Self {
        self.config.floor_patches.push(patch);
        self
    }

    /// Adds a camera patch on top of the existing ones
    pub fn with_camera_patch(mut self, patch: ColorPatch) -> Self {
        self.config.camera_patches.push(patch);
        self
    }

    /// Overrides the simulated duration
    pub fn with_duration(mut self, duration: f64) -> Self {
        self.config.duration = duration;
        self
    }

    /// Sets the raw reading of sensor `index`; out-of-range indices are ignored
    pub fn set_proximity(&mut self, index: usize, value: f64) {
        if let Some(slot) = self.proximity.get_mut(index) {
            *slot = value;
        }
    }

    /// True position
    pub fn pose(&self) -> Pose {
        self.pose
    }

    /// True heading (rad)
    pub fn heading(&self) -> f64 {
        self.heading
    }

    /// Last wheel command received
    pub fn last_command(&self) -> MotionCommand {
        self.command
    }

    /// Clock steps taken
    pub fn steps(&self) -> u64 {
        self.steps
    }

    fn paint(patches: &[ColorPatch], pose: &Pose, base: Rgb) -> Rgb {
        patches
            .iter()
            .rev()
            .find(|p| p.contains(pose))
            .map_or(base, |p| p.color)
    }
}

impl Clock for KinematicSim {
    fn advance(&mut self, quantum_ms: u32) -> bool {
        if self.time >= self.config.duration {
            debug!("Simulation ended at t={:.3}", self.time);
            return false;
        }
        let dt = quantum_ms as f64 / 1000.0;
        let (pose, heading) = self.model.project(&self.pose, self.heading, &self.command, dt);
        self.pose = pose;
        self.heading = heading;
        self.time += dt;
        self.steps += 1;
        true
    }

    fn now(&self) -> f64 {
        self.time
    }
}

impl MotorActuator for KinematicSim {
    fn set_velocity(&mut self, left: f64, right: f64) {
        self.command = MotionCommand::new(left, right);
    }
}

impl SensorSuite for KinematicSim {
    fn floor_color(&mut self) -> Option<Rgb> {
        Some(Self::paint(&self.config.floor_patches, &self.pose, self.config.floor))
    }

    fn camera_color(&mut self) -> Option<Rgb> {
        Some(Self::paint(&self.config.camera_patches, &self.pose, self.config.camera))
    }

    fn proximity(&self, index: usize) -> f64 {
        self.proximity.get(index).copied().unwrap_or(0.0)
    }

    fn position(&self) -> Pose {
        self.pose
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_straight_drive_integrates_command() {
        let mut sim = KinematicSim::new(&SimConfig::default(), &DriveConfig::default());
        sim.set_velocity(5.0, 5.0);
        for _ in 0..10 {
            assert!(sim.advance(32));
        }
        assert_relative_eq!(sim.pose().x, 0.16, epsilon = 1e-9);
        assert_relative_eq!(sim.now(), 0.32, epsilon = 1e-9);
    }

    #[test]
    fn test_clock_stops_at_duration() {
        let mut sim =
            KinematicSim::new(&SimConfig::default(), &DriveConfig::default()).with_duration(0.1);
        let mut ticks = 0;
        while sim.advance(32) {
            ticks += 1;
        }
        assert_eq!(ticks, 4);
        assert!(!sim.advance(32));
    }

    #[test]
    fn test_patches_paint_sensors() {
        let hole = Rgb::new(10, 10, 10);
        let mut sim = KinematicSim::new(&SimConfig::default(), &DriveConfig::default())
            .with_floor_patch(ColorPatch::new(Pose::new(0.1, -0.1), Pose::new(0.3, 0.1), hole));
        assert_eq!(sim.floor_color(), Some(Rgb::new(220, 220, 220)));
        sim.set_velocity(5.0, 5.0);
        for _ in 0..8 {
            sim.advance(32);
        }
        assert_eq!(sim.floor_color(), Some(hole));
        sim.set_proximity(3, 42.0);
        assert_eq!(sim.proximity(3), 42.0);
        assert_eq!(sim.proximity(99), 0.0);
    }
}
