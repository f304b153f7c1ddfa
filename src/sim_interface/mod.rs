//! Device contracts between the controller and the robot host
//!
//! The controller never talks to a simulator directly. It consumes a stepped clock, a
//! motor pair and a bundle of sensors; anything implementing all three is a `RobotHost`.

mod kinematic;

pub use kinematic::{ColorPatch, KinematicSim, SimConfig};

use crate::core::localization::Pose;
use crate::core::perception::Rgb;

/// Stepped simulation clock
pub trait Clock {
    /// Advances by one quantum; false once the simulation has ended
    fn advance(&mut self, quantum_ms: u32) -> bool;

    /// Simulated seconds since start
    fn now(&self) -> f64;
}

/// Wheel motors
pub trait MotorActuator {
    /// Sets both wheel velocities
    fn set_velocity(&mut self, left: f64, right: f64);
}

/// Raw sensor access. Images may be missing on any tick.
#[cfg_attr(test, mockall::automock)]
pub trait SensorSuite {
    /// Floor-facing color sensor
    fn floor_color(&mut self) -> Option<Rgb>;
    /// Center pixel of the forward camera
    fn camera_color(&mut self) -> Option<Rgb>;
    /// Proximity sensor ps0..ps7; larger means closer
    fn proximity(&self, index: usize) -> f64;
    /// GPS position
    fn position(&self) -> Pose;
}

/// Everything the mission runner needs from its host
pub trait RobotHost: Clock + MotorActuator + SensorSuite {}

impl<T: Clock + MotorActuator + SensorSuite> RobotHost for T {}
