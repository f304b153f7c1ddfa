// src/navigation/controller.rs
// Motion primitives shared by every behavior: the wheel-speed command, the four steering
// candidates the goal navigator scores, and fixed motor sequences ("run N ticks, then
// the next segment") used by recovery, hazard escape and path replay.

use std::collections::VecDeque;

// Wheel speeds below this are treated as equal when classifying a command
const SPEED_EPSILON: f64 = 1e-9;

/// Left/right wheel velocities in simulator units (rad/s at the wheel)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MotionCommand {
    /// Left wheel
    pub left: f64,
    /// Right wheel
    pub right: f64,
}

impl MotionCommand {
    /// Both wheels at rest
    pub const STOP: MotionCommand = MotionCommand {
        left: 0.0,
        right: 0.0,
    };

    /// Command from explicit wheel speeds
    pub const fn new(left: f64, right: f64) -> Self {
        MotionCommand { left, right }
    }

    /// Both wheels at `fraction` of `max` in the same direction
    pub fn uniform(fraction: f64, max: f64) -> Self {
        MotionCommand::new(fraction * max, fraction * max)
    }

    /// Both wheels turning at the same nonzero speed
    pub fn is_straight(&self) -> bool {
        (self.left - self.right).abs() < SPEED_EPSILON && self.left.abs() > SPEED_EPSILON
    }

    /// Both wheels turning backwards
    pub fn is_reverse(&self) -> bool {
        self.left < 0.0 && self.right < 0.0
    }

    /// Both wheels at rest
    pub fn is_stop(&self) -> bool {
        self.left.abs() < SPEED_EPSILON && self.right.abs() < SPEED_EPSILON
    }
}

/// Share of full speed kept on the inner wheel while veering
pub const VEER_RATIO: f64 = 0.3;

/// Candidate steering actions, in tie-break order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Steering {
    /// Straight ahead
    Forward,
    /// Veer left
    Left,
    /// Veer right
    Right,
    /// Straight back
    Back,
}

impl Steering {
    /// Enumeration order decides ties: the earlier entry wins
    pub const ALL: [Steering; 4] = [
        Steering::Forward,
        Steering::Left,
        Steering::Right,
        Steering::Back,
    ];

    /// Wheel command for this action at `speed`
    pub fn command(self, speed: f64) -> MotionCommand {
        match self {
            Steering::Forward => MotionCommand::new(speed, speed),
            Steering::Left => MotionCommand::new(speed * VEER_RATIO, speed),
            Steering::Right => MotionCommand::new(speed, speed * VEER_RATIO),
            Steering::Back => MotionCommand::new(-speed, -speed),
        }
    }
}

/// A command held for a fixed number of ticks
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    /// Command to hold
    pub command: MotionCommand,
    /// Ticks to hold it for
    pub ticks: u32,
}

impl Segment {
    /// `command` held for `ticks`
    pub const fn new(command: MotionCommand, ticks: u32) -> Self {
        Segment { command, ticks }
    }
}

/// Queue of segments replayed one tick at a time
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MotorSequence {
    segments: VecDeque<Segment>,
}

impl MotorSequence {
    /// Sequence from segments; empty segments are dropped
    pub fn new<I: IntoIterator<Item = Segment>>(segments: I) -> Self {
        MotorSequence {
            segments: segments.into_iter().filter(|s| s.ticks > 0).collect(),
        }
    }

    /// Appends a segment
    pub fn then(mut self, command: MotionCommand, ticks: u32) -> Self {
        if ticks > 0 {
            self.segments.push_back(Segment::new(command, ticks));
        }
        self
    }

    /// Command for the current tick, or None once every segment has run out
    pub fn next_command(&mut self) -> Option<MotionCommand> {
        loop {
            let segment = self.segments.front_mut()?;
            if segment.ticks == 0 {
                self.segments.pop_front();
                continue;
            }
            segment.ticks -= 1;
            return Some(segment.command);
        }
    }

    /// Ticks left across all segments
    pub fn remaining_ticks(&self) -> u64 {
        self.segments.iter().map(|s| s.ticks as u64).sum()
    }

    /// Nothing left to run
    pub fn is_finished(&self) -> bool {
        self.remaining_ticks() == 0
    }
}
