// behavior/mod.rs

// Behaviors that take the motors away from the goal navigator: the two hazard escapes
// and the wall follower.

/// Hole and trap escape sequences
pub mod hazard;
/// Wall follower with victim detection
pub mod wall_follow;

pub use hazard::{HazardConfig, HoleEscape, HolePhase, TrapEscape};
pub use wall_follow::{WallFollowConfig, WallFollower, WallStep};
