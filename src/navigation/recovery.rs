// src/navigation/recovery.rs
// Stuck detection and the escalating recovery schedule. The navigator records a pose
// every tick it steps; when the mean step over a full history window falls under the
// stuck threshold, one of four fixed maneuvers is queued, chosen by attempt count. A
// run of failed attempts ends in a longer hard reset.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::controller::{MotionCommand, MotorSequence};
use crate::core::localization::Pose;
use crate::core::memory::PositionHistory;

/// Stuck detection and recovery tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Mean step (m) below which the robot counts as not moving
    pub stuck_threshold: f64,
    /// Minimum seconds between two recovery attempts
    pub stuck_time: f64,
    /// Failed attempts before a hard reset
    pub max_attempts: u32,
    /// Poses kept for the mean-step test
    pub history_size: usize,
    /// Length of the main segment of every maneuver
    pub move_ticks: u32,
    /// Recovery counts as successful beyond this multiple of the stuck threshold
    pub success_factor: f64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        RecoveryConfig {
            stuck_threshold: 0.01,
            stuck_time: 2.0,
            max_attempts: 10,
            history_size: 10,
            move_ticks: 50,
            success_factor: 5.0,
        }
    }
}

const ROTATION_TICKS: u32 = 40;
const REVERSE_TRIM_TICKS: u32 = 20;
const HARD_RESET_REVERSE_TICKS: u32 = 100;
const HARD_RESET_SPIN_TICKS: u32 = 60;
const PIVOT_INNER_RATIO: f64 = 0.2;
const REVERSE_TRIM_RATIO: f64 = 0.7;

/// Fixed escape maneuvers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecoveryManeuver {
    /// Spin in place, then drive forward
    FullRotation,
    /// Forward pivot to the left
    LeftPivot,
    /// Forward pivot to the right
    RightPivot,
    /// Back up, then a short forward trim to the right
    Reverse,
    /// Long reverse then a spin, after too many failed attempts
    HardReset,
}

impl RecoveryManeuver {
    /// Round-robin schedule; %4 is checked before %3 before %2
    pub fn for_attempt(attempt: u32) -> Self {
        if attempt % 4 == 0 {
            RecoveryManeuver::FullRotation
        } else if attempt % 3 == 0 {
            RecoveryManeuver::LeftPivot
        } else if attempt % 2 == 0 {
            RecoveryManeuver::RightPivot
        } else {
            RecoveryManeuver::Reverse
        }
    }

    /// Motor sequence for this maneuver. Forward and spin legs run at `max`, reverse legs
    /// at `reverse_speed`.
    pub fn sequence(self, max: f64, reverse_speed: f64, move_ticks: u32) -> MotorSequence {
        let forward = MotionCommand::new(max, max);
        let spin = MotionCommand::new(max, -max);
        let back = MotionCommand::new(-reverse_speed, -reverse_speed);
        let sequence = MotorSequence::default();
        match self {
            RecoveryManeuver::FullRotation => sequence
                .then(spin, ROTATION_TICKS)
                .then(forward, move_ticks),
            RecoveryManeuver::LeftPivot => {
                sequence.then(MotionCommand::new(PIVOT_INNER_RATIO * max, max), move_ticks)
            }
            RecoveryManeuver::RightPivot => {
                sequence.then(MotionCommand::new(max, PIVOT_INNER_RATIO * max), move_ticks)
            }
            RecoveryManeuver::Reverse => sequence
                .then(back, move_ticks)
                .then(MotionCommand::new(max, REVERSE_TRIM_RATIO * max), REVERSE_TRIM_TICKS),
            RecoveryManeuver::HardReset => sequence
                .then(back, HARD_RESET_REVERSE_TICKS)
                .then(spin, HARD_RESET_SPIN_TICKS),
        }
    }
}

/// One queued recovery maneuver
#[derive(Clone, Debug, PartialEq)]
pub struct RecoveryRun {
    /// Attempt number; 0 for a hard reset
    pub attempt: u32,
    /// Maneuver being run
    pub maneuver: RecoveryManeuver,
    /// Pose when the robot was declared stuck
    pub origin: Pose,
    /// Time the maneuver was queued
    pub started_at: f64,
    /// Remaining motor commands
    pub sequence: MotorSequence,
}

/// How a finished maneuver went
#[derive(Clone, Debug, PartialEq)]
pub enum RecoveryVerdict {
    /// Moved far enough from the stuck pose
    Recovered,
    /// Did not move far enough; the next stuck detection escalates
    Failed,
    /// Attempt cap reached; run this before handing control back
    HardReset(RecoveryRun),
}

/// Mean-step stuck detector and recovery attempt counter
pub struct StuckDetector {
    config: RecoveryConfig,
    max_velocity: f64,
    reverse_speed: f64,
    history: PositionHistory,
    attempts: u32,
    last_recovery_at: f64,
}

impl StuckDetector {
    /// Detector with an empty history. Maneuvers run at `max_velocity` and back up at
    /// `reverse_speed`.
    pub fn new(config: &RecoveryConfig, max_velocity: f64, reverse_speed: f64) -> Self {
        StuckDetector {
            config: config.clone(),
            max_velocity,
            reverse_speed,
            history: PositionHistory::new(config.history_size),
            attempts: 0,
            last_recovery_at: 0.0,
        }
    }

    /// Adds the pose of a navigator tick to the history window
    pub fn record(&mut self, pose: Pose) {
        self.history.push(pose);
    }

    /// Empties the history window, e.g. after reaching a waypoint
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Full window, mean step under threshold and cooldown elapsed
    pub fn is_stuck(&self, now: f64) -> bool {
        if !self.history.is_full() || now - self.last_recovery_at < self.config.stuck_time {
            return false;
        }
        self.history
            .mean_step()
            .is_some_and(|step| step < self.config.stuck_threshold)
    }

    /// Counts an attempt and queues the maneuver it selects
    pub fn begin_attempt(&mut self, origin: Pose, now: f64) -> RecoveryRun {
        self.attempts += 1;
        self.last_recovery_at = now;
        let maneuver = RecoveryManeuver::for_attempt(self.attempts);
        warn!(
            "Stuck at ({:.3}, {:.3}), recovery attempt {} using {:?}",
            origin.x, origin.z, self.attempts, maneuver
        );
        RecoveryRun {
            attempt: self.attempts,
            maneuver,
            origin,
            started_at: now,
            sequence: maneuver.sequence(self.max_velocity, self.reverse_speed, self.config.move_ticks),
        }
    }

    /// Judges a finished maneuver against the pose recorded when it started
    pub fn conclude(&mut self, run: &RecoveryRun, pose: Pose, now: f64) -> RecoveryVerdict {
        let displacement = pose.distance_to(&run.origin);
        if displacement > self.config.success_factor * self.config.stuck_threshold {
            info!(
                "Recovery {:?} succeeded: moved {:.3} m",
                run.maneuver, displacement
            );
            self.attempts = 0;
            self.history.clear();
            return RecoveryVerdict::Recovered;
        }

        if self.attempts >= self.config.max_attempts {
            warn!(
                "Recovery failed {} times, performing hard reset",
                self.attempts
            );
            self.attempts = 0;
            self.history.clear();
            self.last_recovery_at = now;
            let maneuver = RecoveryManeuver::HardReset;
            return RecoveryVerdict::HardReset(RecoveryRun {
                attempt: 0,
                maneuver,
                origin: pose,
                started_at: now,
                sequence: maneuver.sequence(self.max_velocity, self.reverse_speed, self.config.move_ticks),
            });
        }

        info!(
            "Recovery {:?} failed: moved only {:.3} m",
            run.maneuver, displacement
        );
        RecoveryVerdict::Failed
    }

    /// Consecutive failed attempts so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Recorded poses
    pub fn history(&self) -> &PositionHistory {
        &self.history
    }
}
