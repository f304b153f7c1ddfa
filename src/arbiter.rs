// arbiter.rs

// Fixed-priority behavior selection. Every tick the arbiter first lets a running sequence
// (hole escape, trap escape, stuck recovery) keep the motors; otherwise it evaluates trap,
// hole, wall and goal in that order and hands the tick to the first match. Exactly one
// behavior produces the motor command.

// Dependencies
use log::{info, warn};
use std::mem;

use crate::RescueConfig;
use crate::behavior::hazard::{HazardConfig, HoleEscape, TrapEscape};
use crate::behavior::wall_follow::WallFollower;
use crate::core::classifiers::SignalClassifiers;
use crate::core::localization::{Odometry, Pose};
use crate::core::perception::SensorFrame;
use crate::core::state::BehaviorState;
use crate::navigation::controller::MotionCommand;
use crate::navigation::planner::DifferentialDrive;
use crate::navigation::recovery::{RecoveryRun, RecoveryVerdict};
use crate::navigation::{GoalNavigator, NavStep};

/// What the arbiter decided for one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickDecision {
    /// Wheel command to send
    pub command: MotionCommand,
    /// The wall follower saw a new victim this tick
    pub victim_detected: bool,
    /// Behavior active after the tick
    pub behavior: &'static str,
}

/// Fixed-priority behavior arbiter.
///
/// Owns the classifiers, both hazard escapes, the wall follower, the goal navigator and
/// the heading estimate. `tick` is called once per control cycle and returns exactly one
/// motor command.
pub struct Arbiter {
    classifiers: SignalClassifiers,
    hazard: HazardConfig,
    wall: WallFollower,
    navigator: GoalNavigator,
    odometry: Odometry,
    model: DifferentialDrive,
    dt: f64,
    max_velocity: f64,
    state: BehaviorState,
    /// Last time the follower had the wall, kept until the loss is logged
    wall_seen_at: Option<f64>,
}

impl Arbiter {
    /// Builds every behavior from the configuration, starting `Idle`
    pub fn new(config: &RescueConfig) -> Self {
        let dt = config.timing.dt();
        Arbiter {
            classifiers: SignalClassifiers::new(&config.classifier),
            hazard: config.hazard.clone(),
            wall: WallFollower::new(&config.wall, config.drive.max_velocity),
            navigator: GoalNavigator::new(&config.navigation, &config.drive, &config.recovery, dt),
            odometry: Odometry::new(config.navigation.initial_heading),
            model: DifferentialDrive::from_config(&config.drive),
            dt,
            max_velocity: config.drive.max_velocity,
            state: BehaviorState::Idle,
            wall_seen_at: None,
        }
    }

    /// Decides the motor command for one frame
    pub fn tick(&mut self, frame: &SensorFrame) -> TickDecision {
        self.odometry.observe(frame.pose, &self.model, self.dt);
        let (command, victim_detected) = self.decide(frame);
        self.odometry.record_command(command);
        TickDecision {
            command,
            victim_detected,
            behavior: self.state.label(),
        }
    }

    /// Keeps odometry current while something else drives the robot
    pub fn track_external(&mut self, frame: &SensorFrame, command: MotionCommand) {
        self.odometry.observe(frame.pose, &self.model, self.dt);
        self.odometry.record_command(command);
    }

    fn decide(&mut self, frame: &SensorFrame) -> (MotionCommand, bool) {
        let now = frame.time;
        match mem::take(&mut self.state) {
            BehaviorState::MissionComplete => {
                self.state = BehaviorState::MissionComplete;
                (MotionCommand::STOP, false)
            }
            BehaviorState::HoleEscape(mut escape) => {
                match escape.step(now, &self.hazard, self.max_velocity) {
                    Some(command) => {
                        self.state = BehaviorState::HoleEscape(escape);
                        (command, false)
                    }
                    None => {
                        self.classifiers.reset_hole();
                        info!("Transitioned to Idle: hole escape complete");
                        (MotionCommand::STOP, false)
                    }
                }
            }
            BehaviorState::TrapEscape(mut escape) => {
                match escape.step(now, &self.hazard, self.max_velocity) {
                    Some(command) => {
                        self.state = BehaviorState::TrapEscape(escape);
                        (command, false)
                    }
                    None => {
                        info!("Transitioned to Idle: trap escape complete");
                        (MotionCommand::STOP, false)
                    }
                }
            }
            BehaviorState::StuckRecovery(run) => (self.continue_recovery(run, frame.pose, now), false),
            previous => self.arbitrate(previous, frame),
        }
    }

    fn continue_recovery(&mut self, mut run: RecoveryRun, pose: Pose, now: f64) -> MotionCommand {
        if let Some(command) = run.sequence.next_command() {
            self.state = BehaviorState::StuckRecovery(run);
            return command;
        }
        match self.navigator.conclude_recovery(&run, pose, now) {
            RecoveryVerdict::HardReset(reset) => {
                warn!("Transitioned to StuckRecovery: hard reset");
                self.continue_recovery(reset, pose, now)
            }
            RecoveryVerdict::Recovered | RecoveryVerdict::Failed => {
                // Darkness seen before the maneuver must not count toward a hole now
                self.classifiers.reset_hole();
                info!("Transitioned to Idle: recovery finished");
                MotionCommand::STOP
            }
        }
    }

    fn arbitrate(&mut self, previous: BehaviorState, frame: &SensorFrame) -> (MotionCommand, bool) {
        let now = frame.time;

        if self.classifiers.is_trap(frame) {
            self.classifiers.reset_hole();
            info!(
                "Transitioned to TrapEscape: trap at ({:.3}, {:.3})",
                frame.pose.x, frame.pose.z
            );
            let mut escape = TrapEscape::start(now, self.hazard.trap_duration);
            let command = escape
                .step(now, &self.hazard, self.max_velocity)
                .unwrap_or(MotionCommand::STOP);
            self.state = BehaviorState::TrapEscape(escape);
            return (command, false);
        }

        if self.classifiers.is_hole(frame) {
            self.classifiers.reset_hole();
            info!(
                "Transitioned to HoleEscape: hole at ({:.3}, {:.3})",
                frame.pose.x, frame.pose.z
            );
            let mut escape = HoleEscape::start(now, self.hazard.hole_pause);
            let command = escape
                .step(now, &self.hazard, self.max_velocity)
                .unwrap_or(MotionCommand::STOP);
            self.state = BehaviorState::HoleEscape(escape);
            return (command, false);
        }

        let wall_seen = self.classifiers.is_wall(frame);
        let victim_seen = self.classifiers.is_victim(frame);
        let following = match previous {
            // A victim sits on the wall and hides it from the camera, so a victim in view
            // or an active victim pause keeps the follower in charge
            BehaviorState::WallFollow {
                last_wall_seen_at, ..
            } => {
                if wall_seen {
                    Some(now)
                } else if victim_seen || self.wall.is_paused(now) {
                    Some(last_wall_seen_at)
                } else {
                    info!("Transitioned to GoalSeek: wall out of view");
                    None
                }
            }
            _ if wall_seen => {
                info!("Transitioned to WallFollow: wall on the {:?} side", self.wall.side());
                Some(now)
            }
            _ => None,
        };

        if let Some(last_wall_seen_at) = following {
            self.wall_seen_at = Some(last_wall_seen_at);
            let step = self.wall.step(frame, victim_seen);
            self.state = BehaviorState::WallFollow {
                side: self.wall.side(),
                last_wall_seen_at,
            };
            return (step.command, step.victim_detected);
        }

        self.note_wall_lost(now);
        self.seek_goal(frame)
    }

    fn note_wall_lost(&mut self, now: f64) {
        let timeout = self.wall.lost_timeout();
        if let Some(seen_at) = self.wall_seen_at.filter(|&seen_at| now - seen_at > timeout) {
            info!("Wall lost for {:.2} s", now - seen_at);
            self.wall_seen_at = None;
        }
    }

    fn seek_goal(&mut self, frame: &SensorFrame) -> (MotionCommand, bool) {
        let heading = self.odometry.heading();
        match self.navigator.step(frame.pose, heading, frame.time) {
            NavStep::Drive {
                command,
                target_index,
                distance,
                ..
            } => {
                self.state = BehaviorState::GoalSeek {
                    target_index,
                    last_distance: distance,
                };
                (command, false)
            }
            NavStep::Arrived { index, distance } => {
                self.state = BehaviorState::GoalSeek {
                    target_index: index + 1,
                    last_distance: distance,
                };
                (MotionCommand::STOP, false)
            }
            NavStep::MissionComplete => {
                info!("Transitioned to MissionComplete");
                self.state = BehaviorState::MissionComplete;
                (MotionCommand::STOP, false)
            }
            NavStep::Stuck(run) => {
                self.classifiers.reset_hole();
                let command = self.continue_recovery(run, frame.pose, frame.time);
                (command, false)
            }
        }
    }

    /// Completes the mission from outside the reactive loop (replay reached the goal)
    pub fn complete_mission(&mut self) {
        self.navigator.mark_complete();
        self.state = BehaviorState::MissionComplete;
    }

    /// A hole or trap escape owns the motors
    pub fn is_hazard_active(&self) -> bool {
        self.state.is_hazard_escape()
    }

    /// All waypoints reached
    pub fn is_complete(&self) -> bool {
        self.state.is_terminal()
    }

    /// Current behavior state
    pub fn state(&self) -> &BehaviorState {
        &self.state
    }

    /// Goal navigator with the waypoint cursor
    pub fn navigator(&self) -> &GoalNavigator {
        &self.navigator
    }

    /// Heading estimate in radians
    pub fn heading(&self) -> f64 {
        self.odometry.heading()
    }

    /// Signal classifiers, for telemetry
    pub fn classifiers(&self) -> &SignalClassifiers {
        &self.classifiers
    }
}
