// core/state.rs

// The single behavior state owned by the arbiter. Exactly one variant is active per tick;
// hazard escapes and stuck recovery carry their own sequence state so that no loose flags
// exist anywhere else in the controller.

// Dependencies
use serde::{Deserialize, Serialize};

use crate::behavior::hazard::{HoleEscape, TrapEscape};
use crate::navigation::recovery::RecoveryRun;

/// Which side of the chassis the wall follower keeps the wall on
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WallSide {
    /// Wall on the left
    Left,
    /// Wall on the right
    #[default]
    Right,
}

/// Robot behavior modes
#[derive(Clone, Debug, Default, PartialEq)]
pub enum BehaviorState {
    /// Nothing selected yet, or a sequence just ended
    #[default]
    Idle,
    /// Backing away from a confirmed hole
    HoleEscape(HoleEscape),
    /// Reversing off a trap tile
    TrapEscape(TrapEscape),
    /// Keeping a wall on one side
    WallFollow {
        /// Side the wall is on
        side: WallSide,
        /// Last tick the wall was in view
        last_wall_seen_at: f64,
    },
    /// Running a recovery maneuver
    StuckRecovery(RecoveryRun),
    /// Driving toward the current waypoint
    GoalSeek {
        /// Waypoint cursor
        target_index: usize,
        /// Distance to the target on this tick
        last_distance: f64,
    },
    /// Terminal
    MissionComplete,
}

impl BehaviorState {
    /// Short name used in telemetry and transition logs
    pub fn label(&self) -> &'static str {
        match self {
            BehaviorState::Idle => "Idle",
            BehaviorState::HoleEscape(_) => "HoleEscape",
            BehaviorState::TrapEscape(_) => "TrapEscape",
            BehaviorState::WallFollow { .. } => "WallFollow",
            BehaviorState::StuckRecovery(_) => "StuckRecovery",
            BehaviorState::GoalSeek { .. } => "GoalSeek",
            BehaviorState::MissionComplete => "MissionComplete",
        }
    }

    /// True while a hole or trap escape owns the motors
    pub fn is_hazard_escape(&self) -> bool {
        matches!(self, BehaviorState::HoleEscape(_) | BehaviorState::TrapEscape(_))
    }

    /// Mission finished; only STOP is issued from here on
    pub fn is_terminal(&self) -> bool {
        matches!(self, BehaviorState::MissionComplete)
    }
}
