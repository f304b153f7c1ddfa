// src/navigation/planner.rs
// One-step greedy direction search. Each candidate steering action is projected one
// tick ahead through the kinematic model and the candidate that ends closest to the
// target wins. Nothing is actuated while scoring, so evaluation costs no simulated time.

use log::trace;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use super::controller::{MotionCommand, Steering};
use crate::core::localization::{Pose, normalize_angle};

/// Chassis and speed parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// Motor velocity ceiling; every ratio in the controller is a share of this
    pub max_velocity: f64,
    /// Wheel speed used by the goal navigator candidates and recovery reverse legs
    pub navigation_speed: f64,
    /// Wheel radius (m)
    pub wheel_radius: f64,
    /// Distance between the wheels (m)
    pub axle_track: f64,
}

impl Default for DriveConfig {
    fn default() -> Self {
        DriveConfig {
            max_velocity: 6.28,
            navigation_speed: 5.0,
            wheel_radius: 0.1,
            axle_track: 0.05,
        }
    }
}

/// Predicts where a command leaves the robot after `dt` seconds
pub trait MotionModel {
    /// Pose and heading after holding `command` for `dt`
    fn project(&self, pose: &Pose, heading: f64, command: &MotionCommand, dt: f64) -> (Pose, f64);
}

/// Differential drive with exact constant-twist arc integration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifferentialDrive {
    wheel_radius: f64,
    axle_track: f64,
}

impl DifferentialDrive {
    /// Model with the given geometry (m)
    pub fn new(wheel_radius: f64, axle_track: f64) -> Self {
        DifferentialDrive {
            wheel_radius,
            axle_track,
        }
    }

    /// Model from the drive section
    pub fn from_config(config: &DriveConfig) -> Self {
        DifferentialDrive::new(config.wheel_radius, config.axle_track)
    }
}

impl MotionModel for DifferentialDrive {
    fn project(&self, pose: &Pose, heading: f64, command: &MotionCommand, dt: f64) -> (Pose, f64) {
        let v_left = command.left * self.wheel_radius;
        let v_right = command.right * self.wheel_radius;
        let linear = (v_left + v_right) / 2.0;
        let angular = (v_right - v_left) / self.axle_track;

        if angular.abs() < 1e-9 {
            let step = Vector2::new(heading.cos(), heading.sin()) * (linear * dt);
            return (Pose::from_vector(pose.as_vector() + step), heading);
        }

        let next_heading = heading + angular * dt;
        let radius = linear / angular;
        let step = Vector2::new(
            radius * (next_heading.sin() - heading.sin()),
            -radius * (next_heading.cos() - heading.cos()),
        );
        (
            Pose::from_vector(pose.as_vector() + step),
            normalize_angle(next_heading),
        )
    }
}

/// Winning candidate of one greedy search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// Steering action
    pub steering: Steering,
    /// Its wheel command
    pub command: MotionCommand,
    /// Distance to the target after the projected tick
    pub distance: f64,
}

/// One-step greedy search over the four steering actions
pub struct GreedyPlanner<M: MotionModel> {
    model: M,
    speed: f64,
    dt: f64,
}

impl<M: MotionModel> GreedyPlanner<M> {
    /// Planner projecting candidates at `speed` over one tick of `dt`
    pub fn new(model: M, speed: f64, dt: f64) -> Self {
        GreedyPlanner { model, speed, dt }
    }

    /// Scores every steering action and keeps the first one with the smallest distance
    pub fn choose(&self, pose: &Pose, heading: f64, target: &Pose) -> Candidate {
        let mut best: Option<Candidate> = None;
        for steering in Steering::ALL {
            let command = steering.command(self.speed);
            let (projected, _) = self.model.project(pose, heading, &command, self.dt);
            let distance = projected.distance_to(target);
            trace!("Candidate {:?}: projected distance {:.4}", steering, distance);

            // Strict comparison keeps the earlier candidate on ties
            if best.is_none_or(|b| distance < b.distance) {
                best = Some(Candidate {
                    steering,
                    command,
                    distance,
                });
            }
        }
        best.unwrap_or(Candidate {
            steering: Steering::Forward,
            command: Steering::Forward.command(self.speed),
            distance: pose.distance_to(target),
        })
    }

    /// Motion model in use
    pub fn model(&self) -> &M {
        &self.model
    }
}
