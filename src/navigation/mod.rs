//! Goal navigation for the rescue controller
//!
//! Drives toward an ordered list of waypoints with a one-step greedy search, advancing
//! the cursor on arrival, and hands off to stuck recovery when the robot stops making
//! progress.

/// Wheel commands and timed motor sequences
pub mod controller;
/// Drive model and greedy candidate search
pub mod planner;
/// Stuck detection and recovery maneuvers
pub mod recovery;

use log::{debug, info};
use serde::{Deserialize, Serialize};

pub use controller::{MotionCommand, MotorSequence, Segment, Steering};
pub use planner::{Candidate, DifferentialDrive, DriveConfig, GreedyPlanner, MotionModel};
pub use recovery::{RecoveryConfig, RecoveryManeuver, RecoveryRun, RecoveryVerdict, StuckDetector};

use crate::core::localization::Pose;

/// Waypoint list and arrival tolerance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Ordered targets, visited once each
    pub waypoints: Vec<Pose>,
    /// Arrival radius (m)
    pub tolerance: f64,
    /// Heading (rad) assumed before the first motion
    pub initial_heading: f64,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        NavigationConfig {
            waypoints: vec![
                Pose::new(-0.49, -0.28),
                Pose::new(-0.42, -0.25),
                Pose::new(-0.24, 0.13),
                Pose::new(0.11, 0.16),
            ],
            tolerance: 0.05,
            initial_heading: 0.0,
        }
    }
}

/// Outcome of one navigator tick
#[derive(Debug, Clone, PartialEq)]
pub enum NavStep {
    /// Steer toward the current target
    Drive {
        /// Wheel command of the chosen candidate
        command: MotionCommand,
        /// Chosen candidate
        steering: Steering,
        /// Waypoint being approached
        target_index: usize,
        /// Distance to it (m)
        distance: f64,
    },
    /// Reached a waypoint that was not the last; stop for this tick
    Arrived {
        /// Waypoint reached
        index: usize,
        /// Distance to it (m)
        distance: f64,
    },
    /// Final waypoint reached
    MissionComplete,
    /// No progress; run this recovery maneuver
    Stuck(RecoveryRun),
}

/// Waypoint follower.
///
/// Each tick it records the pose for stuck detection, advances the cursor when the
/// current waypoint is within tolerance, starts a recovery run when the robot has stopped
/// making progress, and otherwise picks the greedy candidate that ends closest to the
/// target.
pub struct GoalNavigator {
    waypoints: Vec<Pose>,
    tolerance: f64,
    target_index: usize,
    planner: GreedyPlanner<DifferentialDrive>,
    stuck: StuckDetector,
    last_distance: Option<f64>,
    complete: bool,
}

impl GoalNavigator {
    /// Navigator aimed at the first waypoint. Recovery reverses at the navigation speed.
    pub fn new(
        config: &NavigationConfig,
        drive: &DriveConfig,
        recovery: &RecoveryConfig,
        dt: f64,
    ) -> Self {
        GoalNavigator {
            waypoints: config.waypoints.clone(),
            tolerance: config.tolerance,
            target_index: 0,
            planner: GreedyPlanner::new(
                DifferentialDrive::from_config(drive),
                drive.navigation_speed,
                dt,
            ),
            stuck: StuckDetector::new(recovery, drive.max_velocity, drive.navigation_speed),
            last_distance: None,
            complete: config.waypoints.is_empty(),
        }
    }

    /// Records the pose, then checks arrival, then stuck, then steers
    pub fn step(&mut self, pose: Pose, heading: f64, now: f64) -> NavStep {
        if self.complete {
            return NavStep::MissionComplete;
        }

        self.stuck.record(pose);

        let target = self.waypoints[self.target_index];
        let distance = pose.distance_to(&target);
        self.last_distance = Some(distance);

        if distance <= self.tolerance {
            let index = self.target_index;
            self.target_index += 1;
            self.stuck.clear_history();
            if self.target_index >= self.waypoints.len() {
                self.complete = true;
                info!(
                    "Reached final waypoint {} ({:.3}, {:.3}): mission complete",
                    index, target.x, target.z
                );
                return NavStep::MissionComplete;
            }
            info!(
                "Reached waypoint {} ({:.3}, {:.3}), next target {}",
                index, target.x, target.z, self.target_index
            );
            return NavStep::Arrived { index, distance };
        }

        if self.stuck.is_stuck(now) {
            return NavStep::Stuck(self.stuck.begin_attempt(pose, now));
        }

        let candidate = self.planner.choose(&pose, heading, &target);
        debug!(
            "Target {} at {:.3} m, steering {:?}",
            self.target_index, distance, candidate.steering
        );
        NavStep::Drive {
            command: candidate.command,
            steering: candidate.steering,
            target_index: self.target_index,
            distance,
        }
    }

    /// Hands a finished recovery maneuver back to the stuck detector
    pub fn conclude_recovery(&mut self, run: &RecoveryRun, pose: Pose, now: f64) -> RecoveryVerdict {
        self.stuck.conclude(run, pose, now)
    }

    /// Index of the current target; equals the waypoint count once complete
    pub fn target_index(&self) -> usize {
        self.target_index
    }

    /// Waypoint being approached
    pub fn current_target(&self) -> Option<Pose> {
        self.waypoints.get(self.target_index).copied()
    }

    /// Last waypoint of the mission
    pub fn final_waypoint(&self) -> Option<Pose> {
        self.waypoints.last().copied()
    }

    /// Arrival radius (m)
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Distance to the target at the last step
    pub fn last_distance(&self) -> Option<f64> {
        self.last_distance
    }

    /// Every waypoint reached
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Marks the mission finished without stepping (used after path replay)
    pub fn mark_complete(&mut self) {
        if !self.complete {
            info!("Mission marked complete");
        }
        self.target_index = self.waypoints.len();
        self.complete = true;
    }

    /// Stuck detector state
    pub fn stuck_detector(&self) -> &StuckDetector {
        &self.stuck
    }
}
