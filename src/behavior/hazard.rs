// behavior/hazard.rs

// Hole and trap escape sequences. Each is a small phase machine advanced once per tick
// against the simulated clock; while one is running it owns the motors and the arbiter
// does not evaluate any other classifier.

// Dependencies
use log::info;
use serde::{Deserialize, Serialize};

use crate::navigation::controller::MotionCommand;

/// Escape timings and wheel ratios (shares of max velocity)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardConfig {
    /// Seconds stopped before backing out of a hole
    pub hole_pause: f64,
    /// Ticks of straight reverse
    pub hole_reverse_ticks: u32,
    /// Reverse speed
    pub hole_reverse_ratio: f64,
    /// Seconds of right arc after reversing
    pub hole_arc_duration: f64,
    /// Left wheel during the arc
    pub hole_arc_outer: f64,
    /// Right wheel during the arc
    pub hole_arc_inner: f64,
    /// Seconds of asymmetric reverse after touching a trap
    pub trap_duration: f64,
    /// Left wheel reverse share
    pub trap_left_ratio: f64,
    /// Right wheel reverse share
    pub trap_right_ratio: f64,
}

impl Default for HazardConfig {
    fn default() -> Self {
        HazardConfig {
            hole_pause: 1.0,
            hole_reverse_ticks: 52,
            hole_reverse_ratio: 0.5,
            hole_arc_duration: 2.0,
            hole_arc_outer: 0.7,
            hole_arc_inner: 0.3,
            trap_duration: 25.0,
            trap_left_ratio: 0.3,
            trap_right_ratio: 0.9,
        }
    }
}

/// Hole escape phases
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HolePhase {
    /// Stopped over the hole
    Pause {
        /// Pause end time
        until: f64,
    },
    /// Straight reverse
    Reverse {
        /// Ticks left
        remaining: u32,
    },
    /// Right arc away from the hole
    Arc {
        /// Arc end time, set on the first arc tick
        until: Option<f64>,
    },
    /// Sequence finished
    Done,
}

/// stop -> pause -> reverse -> arc right -> stop
#[derive(Clone, Debug, PartialEq)]
pub struct HoleEscape {
    /// Time the hole was confirmed
    pub started_at: f64,
    phase: HolePhase,
}

impl HoleEscape {
    /// Begins with the stop-and-pause phase
    pub fn start(now: f64, pause: f64) -> Self {
        HoleEscape {
            started_at: now,
            phase: HolePhase::Pause { until: now + pause },
        }
    }

    /// Current phase
    pub fn phase(&self) -> HolePhase {
        self.phase
    }

    /// Command for this tick; None once the sequence has finished
    pub fn step(&mut self, now: f64, config: &HazardConfig, max: f64) -> Option<MotionCommand> {
        loop {
            match self.phase {
                HolePhase::Pause { until } => {
                    if now < until {
                        return Some(MotionCommand::STOP);
                    }
                    info!("Hole escape: reversing");
                    self.phase = HolePhase::Reverse {
                        remaining: config.hole_reverse_ticks,
                    };
                }
                HolePhase::Reverse { remaining } => {
                    if remaining > 0 {
                        self.phase = HolePhase::Reverse {
                            remaining: remaining - 1,
                        };
                        return Some(MotionCommand::uniform(-config.hole_reverse_ratio, max));
                    }
                    info!("Hole escape: arcing right");
                    self.phase = HolePhase::Arc { until: None };
                }
                HolePhase::Arc { until } => {
                    // The arc window opens on its first tick
                    let until = until.unwrap_or(now + config.hole_arc_duration);
                    if now < until {
                        self.phase = HolePhase::Arc { until: Some(until) };
                        return Some(MotionCommand::new(
                            config.hole_arc_outer * max,
                            config.hole_arc_inner * max,
                        ));
                    }
                    self.phase = HolePhase::Done;
                }
                HolePhase::Done => return None,
            }
        }
    }
}

/// Sharp asymmetric reverse for a fixed duration
#[derive(Clone, Debug, PartialEq)]
pub struct TrapEscape {
    /// Time the trap was touched
    pub started_at: f64,
    until: f64,
}

impl TrapEscape {
    /// Begins a reverse lasting `duration` seconds
    pub fn start(now: f64, duration: f64) -> Self {
        TrapEscape {
            started_at: now,
            until: now + duration,
        }
    }

    /// Reverse command while the escape lasts; None once `now` reaches the end
    pub fn step(&mut self, now: f64, config: &HazardConfig, max: f64) -> Option<MotionCommand> {
        if now < self.until {
            Some(MotionCommand::new(
                -config.trap_left_ratio * max,
                -config.trap_right_ratio * max,
            ))
        } else {
            None
        }
    }

    /// Seconds left, never negative
    pub fn remaining(&self, now: f64) -> f64 {
        (self.until - now).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: f64 = 0.032;
    const MAX: f64 = 6.28;

    #[test]
    fn test_hole_escape_phases() {
        let config = HazardConfig::default();
        let start = 10.0;
        let mut escape = HoleEscape::start(start, config.hole_pause);

        let mut commands = Vec::new();
        let mut tick = 0u32;
        while let Some(command) = escape.step(start + tick as f64 * TICK, &config, MAX) {
            commands.push(command);
            tick += 1;
            assert!(tick < 1000, "hole escape never finished");
        }

        let stops = commands.iter().take_while(|c| c.is_stop()).count();
        let reverse = MotionCommand::uniform(-0.5, MAX);
        let arc = MotionCommand::new(0.7 * MAX, 0.3 * MAX);
        let reversing = commands[stops..].iter().take_while(|&&c| c == reverse).count();
        let arcing = commands[stops + reversing..].iter().take_while(|&&c| c == arc).count();

        assert_eq!(stops, 32);
        assert_eq!(reversing, 52);
        assert_eq!(arcing, 63);
        assert_eq!(commands.len(), stops + reversing + arcing);
        assert_eq!(escape.phase(), HolePhase::Done);
    }

    #[test]
    fn test_trap_escape_runs_for_duration() {
        let config = HazardConfig::default();
        let mut escape = TrapEscape::start(0.0, config.trap_duration);
        let first = escape.step(0.0, &config, MAX);
        assert_eq!(first, Some(MotionCommand::new(-0.3 * MAX, -0.9 * MAX)));
        assert!(escape.step(24.99, &config, MAX).is_some());
        assert_eq!(escape.step(25.0, &config, MAX), None);
        assert_eq!(escape.remaining(30.0), 0.0);
    }
}
