// core/localization.rs

// Tracks where the robot is and which way it faces. Position comes straight from the
// GPS every tick. Heading is never sensed, so it is dead-reckoned from the wheel command
// issued on the previous tick and snapped to the GPS bearing whenever the robot drove
// straight and actually moved.

// Dependencies
use log::trace;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

use crate::navigation::controller::MotionCommand;
use crate::navigation::planner::MotionModel;

/// Planar position in meters, on the simulator's x / z ground axes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Meters along x
    pub x: f64,
    /// Meters along z
    pub z: f64,
}

impl Pose {
    /// Pose at `(x, z)`
    pub const fn new(x: f64, z: f64) -> Self {
        Pose { x, z }
    }

    /// As an `(x, z)` vector
    pub fn as_vector(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.z)
    }

    /// From an `(x, z)` vector
    pub fn from_vector(v: Vector2<f64>) -> Self {
        Pose { x: v.x, z: v.y }
    }

    /// Euclidean distance between two poses
    pub fn distance_to(&self, other: &Pose) -> f64 {
        (self.as_vector() - other.as_vector()).norm()
    }
}

// Displacement (m) below which a GPS bearing is noise rather than motion
const BEARING_FIX_MIN_DISPLACEMENT: f64 = 1e-4;

/// Heading estimator fed by GPS fixes and the commands the controller issued.
#[derive(Debug, Clone)]
pub struct Odometry {
    heading: f64,
    last_pose: Option<Pose>,
    last_command: MotionCommand,
}

impl Odometry {
    /// Starts at `initial_heading` with no fix and a stop command on record
    pub fn new(initial_heading: f64) -> Self {
        Odometry {
            heading: normalize_angle(initial_heading),
            last_pose: None,
            last_command: MotionCommand::STOP,
        }
    }

    /// Current heading estimate in radians, within [-pi, pi)
    pub fn heading(&self) -> f64 {
        self.heading
    }

    /// Folds in the pose observed at the start of a tick. The command recorded on the
    /// previous tick is what moved the robot from the last pose to this one.
    pub fn observe<M: MotionModel>(&mut self, pose: Pose, model: &M, dt: f64) {
        if let Some(previous) = self.last_pose {
            let (_, predicted) = model.project(&previous, self.heading, &self.last_command, dt);
            self.heading = predicted;

            let displacement = pose.as_vector() - previous.as_vector();
            if self.last_command.is_straight() && displacement.norm() > BEARING_FIX_MIN_DISPLACEMENT {
                let bearing = displacement.y.atan2(displacement.x);
                self.heading = if self.last_command.is_reverse() {
                    bearing + PI
                } else {
                    bearing
                };
                trace!("Heading snapped to GPS bearing: {:.3} rad", self.heading);
            }
            self.heading = normalize_angle(self.heading);
        }
        self.last_pose = Some(pose);
    }

    /// Records the command sent to the motors this tick
    pub fn record_command(&mut self, command: MotionCommand) {
        self.last_command = command;
    }
}

/// Wraps an angle into [-pi, pi)
pub fn normalize_angle(angle: f64) -> f64 {
    (angle + PI).rem_euclid(TAU) - PI
}
