// core/mod.rs

// Declares the sensing side of the controller: pose and heading tracking, per-tick
// perception, the signal classifiers, the short position memory and the behavior state.

/// Color and proximity predicates with the hole debounce
pub mod classifiers;
/// Pose and heading estimation
pub mod localization;
/// Bounded position history
pub mod memory;
/// Per-tick sensor sampling
pub mod perception;
/// Behavior state machine
pub mod state;

// Re-export key types for a unified API
pub use classifiers::{ClassifierConfig, HoleDebouncer, SignalClassifiers};
pub use localization::{Odometry, Pose, normalize_angle};
pub use memory::PositionHistory;
pub use perception::{Perception, Proximity, Rgb, SensorFrame};
pub use state::{BehaviorState, WallSide};
