// behavior/wall_follow.rs

// Keeps a blue wall on the configured side at a target standoff. Victim detection is
// checked first every tick: a new white blob stops the robot, raises a report request
// and holds position for a fixed pause. The latch that blocks repeat reports of the same
// blob clears only once the victim signal drops.

// Dependencies
use log::info;
use serde::{Deserialize, Serialize};

use crate::core::perception::SensorFrame;
use crate::core::state::WallSide;
use crate::navigation::controller::MotionCommand;

/// Wall follower tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WallFollowConfig {
    /// Side the wall is kept on
    pub side: WallSide,
    /// Side proximity reading under which the robot steers away
    pub standoff: f64,
    /// Seconds without a wall signal before the loss is logged
    pub lost_timeout: f64,
    /// Seconds held in place after spotting a victim
    pub victim_pause: f64,
    /// Wheel ratio on the wall-side wheel when too close
    pub near_ratio: f64,
    /// Wheel ratio on the far wheel while tracking
    pub track_ratio: f64,
}

impl Default for WallFollowConfig {
    fn default() -> Self {
        WallFollowConfig {
            side: WallSide::Right,
            standoff: 60.0,
            lost_timeout: 2.0,
            victim_pause: 3.0,
            near_ratio: 0.3,
            track_ratio: 0.8,
        }
    }
}

/// One wall-follower tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallStep {
    /// Motor command for the tick
    pub command: MotionCommand,
    /// Rising edge of the victim signal on this tick
    pub victim_detected: bool,
}

/// Side-configurable wall follower with a victim latch and stop-and-hold pause
pub struct WallFollower {
    config: WallFollowConfig,
    max_velocity: f64,
    victim_latched: bool,
    pause_until: Option<f64>,
}

impl WallFollower {
    /// Creates a follower with no latch and no pause
    pub fn new(config: &WallFollowConfig, max_velocity: f64) -> Self {
        WallFollower {
            config: config.clone(),
            max_velocity,
            victim_latched: false,
            pause_until: None,
        }
    }

    /// Side the wall is kept on
    pub fn side(&self) -> WallSide {
        self.config.side
    }

    /// Seconds without a wall before the loss is logged
    pub fn lost_timeout(&self) -> f64 {
        self.config.lost_timeout
    }

    /// Holding position after a victim sighting
    pub fn is_paused(&self, now: f64) -> bool {
        self.pause_until.is_some_and(|until| now < until)
    }

    /// The current blob was already reported
    pub fn victim_latched(&self) -> bool {
        self.victim_latched
    }

    /// Advances the follower one tick.
    ///
    /// A pause in progress returns STOP. A victim that is not latched starts the pause and
    /// sets `victim_detected`. Otherwise the robot steers against the side reading.
    pub fn step(&mut self, frame: &SensorFrame, victim_seen: bool) -> WallStep {
        let now = frame.time;
        if !victim_seen {
            self.victim_latched = false;
        }

        if self.is_paused(now) {
            return WallStep {
                command: MotionCommand::STOP,
                victim_detected: false,
            };
        }
        self.pause_until = None;

        if victim_seen && !self.victim_latched {
            self.victim_latched = true;
            self.pause_until = Some(now + self.config.victim_pause);
            info!(
                "Victim spotted at ({:.3}, {:.3}), holding for {:.1} s",
                frame.pose.x, frame.pose.z, self.config.victim_pause
            );
            return WallStep {
                command: MotionCommand::STOP,
                victim_detected: true,
            };
        }

        WallStep {
            command: self.steer(frame),
            victim_detected: false,
        }
    }

    fn steer(&self, frame: &SensorFrame) -> MotionCommand {
        let max = self.max_velocity;
        let near = max * self.config.near_ratio;
        let track = max * self.config.track_ratio;
        match self.config.side {
            WallSide::Right => {
                if frame.proximity.right < self.config.standoff {
                    MotionCommand::new(near, max)
                } else {
                    MotionCommand::new(max, track)
                }
            }
            WallSide::Left => {
                if frame.proximity.left < self.config.standoff {
                    MotionCommand::new(max, near)
                } else {
                    MotionCommand::new(track, max)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::localization::Pose;
    use crate::core::perception::{Proximity, Rgb};

    const MAX: f64 = 6.28;

    fn frame(time: f64, left: f64, right: f64) -> SensorFrame {
        SensorFrame {
            floor: Rgb::new(220, 220, 220),
            camera: Rgb::new(30, 60, 200),
            proximity: Proximity {
                left,
                right,
                ..Proximity::default()
            },
            pose: Pose::default(),
            time,
        }
    }

    #[test]
    fn test_right_side_steering() {
        let mut follower = WallFollower::new(&WallFollowConfig::default(), MAX);
        let close = follower.step(&frame(0.0, 0.0, 40.0), false);
        assert_eq!(close.command, MotionCommand::new(0.3 * MAX, MAX));
        let far = follower.step(&frame(0.032, 0.0, 75.0), false);
        assert_eq!(far.command, MotionCommand::new(MAX, 0.8 * MAX));
    }

    #[test]
    fn test_left_side_mirrors() {
        let config = WallFollowConfig {
            side: WallSide::Left,
            ..WallFollowConfig::default()
        };
        let mut follower = WallFollower::new(&config, MAX);
        let close = follower.step(&frame(0.0, 10.0, 0.0), false);
        assert_eq!(close.command, MotionCommand::new(MAX, 0.3 * MAX));
        let far = follower.step(&frame(0.032, 90.0, 0.0), false);
        assert_eq!(far.command, MotionCommand::new(0.8 * MAX, MAX));
    }

    #[test]
    fn test_victim_reported_once_per_encounter() {
        let mut follower = WallFollower::new(&WallFollowConfig::default(), MAX);

        let first = follower.step(&frame(1.0, 0.0, 70.0), true);
        assert!(first.victim_detected);
        assert_eq!(first.command, MotionCommand::STOP);

        // Held in place for the pause, no further reports
        let mut t = 1.032;
        while t < 4.0 {
            let step = follower.step(&frame(t, 0.0, 70.0), true);
            assert!(!step.victim_detected);
            assert_eq!(step.command, MotionCommand::STOP);
            t += 0.032;
        }

        // Still the same blob after the pause: latched, so drive on
        let after = follower.step(&frame(4.1, 0.0, 70.0), true);
        assert!(!after.victim_detected);
        assert!(!after.command.is_stop());

        // Signal drops, then a new sighting
        follower.step(&frame(4.2, 0.0, 70.0), false);
        assert!(!follower.victim_latched());
        assert!(follower.step(&frame(4.3, 0.0, 70.0), true).victim_detected);
    }
}
