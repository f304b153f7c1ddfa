// core/classifiers.rs

// Pure predicates over a SensorFrame. Fixed thresholds are enough for a noise-free
// simulated camera; the only temporal filter is the hole debounce, which rejects
// single-frame shadows on the floor sensor.

use log::debug;
use serde::{Deserialize, Serialize};

use super::perception::{Rgb, SensorFrame};

/// Color and distance thresholds for every classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Every floor channel must be below this for a hole candidate
    pub hole_threshold: u8,
    /// Seconds a hole candidate must persist
    pub hole_debounce: f64,
    /// Trap floor: red above this
    pub trap_min_red: u8,
    /// Trap floor: green above this
    pub trap_min_green: u8,
    /// Trap floor: blue below this
    pub trap_max_blue: u8,
    /// Wall: blue above this
    pub wall_min_blue: u8,
    /// Wall: red below this
    pub wall_max_red: u8,
    /// Wall: green below this
    pub wall_max_green: u8,
    /// Every camera channel must exceed this for a victim
    pub victim_threshold: u8,
    /// Front proximity reading above which something is ahead
    pub obstacle_threshold: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        ClassifierConfig {
            hole_threshold: 90,
            hole_debounce: 0.15,
            trap_min_red: 200,
            trap_min_green: 100,
            trap_max_blue: 50,
            wall_min_blue: 120,
            wall_max_red: 80,
            wall_max_green: 140,
            victim_threshold: 200,
            obstacle_threshold: 80.0,
        }
    }
}

/// Orange floor tile; no debounce
pub fn is_trap(config: &ClassifierConfig, frame: &SensorFrame) -> bool {
    let Rgb { r, g, b } = frame.floor;
    r > config.trap_min_red && g > config.trap_min_green && b < config.trap_max_blue
}

/// Blue wall filling the camera center
pub fn is_wall(config: &ClassifierConfig, frame: &SensorFrame) -> bool {
    let Rgb { r, g, b } = frame.camera;
    b > config.wall_min_blue && r < config.wall_max_red && g < config.wall_max_green
}

/// White blob in the camera center
pub fn is_victim(config: &ClassifierConfig, frame: &SensorFrame) -> bool {
    frame
        .camera
        .channels()
        .iter()
        .all(|&c| c > config.victim_threshold)
}

/// Either front proximity sensor reads above the obstacle threshold
pub fn is_obstacle_ahead(config: &ClassifierConfig, frame: &SensorFrame) -> bool {
    frame.proximity.front_left > config.obstacle_threshold
        || frame.proximity.front_right > config.obstacle_threshold
}

fn is_dark(config: &ClassifierConfig, color: Rgb) -> bool {
    color.channels().iter().all(|&c| c < config.hole_threshold)
}

/// Edge-triggered hole debounce: remembers when the floor first went dark and forgets
/// it as soon as one bright frame arrives.
#[derive(Debug, Clone, Default)]
pub struct HoleDebouncer {
    first_dark_at: Option<f64>,
}

impl HoleDebouncer {
    /// Debouncer with no dark run in progress
    pub fn new() -> Self {
        HoleDebouncer::default()
    }

    /// Feeds one floor sample; true once darkness has lasted longer than `window`
    pub fn update(&mut self, dark: bool, now: f64, window: f64) -> bool {
        if !dark {
            self.first_dark_at = None;
            return false;
        }
        match self.first_dark_at {
            None => {
                self.first_dark_at = Some(now);
                false
            }
            Some(since) => now - since > window,
        }
    }

    /// Forgets the current dark run
    pub fn reset(&mut self) {
        self.first_dark_at = None;
    }

    /// When the current dark run began, if one is in progress
    pub fn pending_since(&self) -> Option<f64> {
        self.first_dark_at
    }
}

/// Classifier bank owning the only debounce state
#[derive(Debug, Clone)]
pub struct SignalClassifiers {
    config: ClassifierConfig,
    hole: HoleDebouncer,
}

impl SignalClassifiers {
    /// Classifier bank with a fresh hole debounce
    pub fn new(config: &ClassifierConfig) -> Self {
        SignalClassifiers {
            config: config.clone(),
            hole: HoleDebouncer::new(),
        }
    }

    /// Debounced hole check; feeds the floor sample into the debounce timer
    pub fn is_hole(&mut self, frame: &SensorFrame) -> bool {
        let dark = is_dark(&self.config, frame.floor);
        let confirmed = self.hole.update(dark, frame.time, self.config.hole_debounce);
        if confirmed {
            debug!(
                "Hole confirmed: floor R:{} G:{} B:{} dark since {:?}",
                frame.floor.r,
                frame.floor.g,
                frame.floor.b,
                self.hole.pending_since()
            );
        }
        confirmed
    }

    /// See [`is_trap`]
    pub fn is_trap(&self, frame: &SensorFrame) -> bool {
        is_trap(&self.config, frame)
    }

    /// See [`is_wall`]
    pub fn is_wall(&self, frame: &SensorFrame) -> bool {
        is_wall(&self.config, frame)
    }

    /// See [`is_victim`]
    pub fn is_victim(&self, frame: &SensorFrame) -> bool {
        is_victim(&self.config, frame)
    }

    /// See [`is_obstacle_ahead`]
    pub fn is_obstacle_ahead(&self, frame: &SensorFrame) -> bool {
        is_obstacle_ahead(&self.config, frame)
    }

    /// Clears the hole debounce timer
    pub fn reset_hole(&mut self) {
        self.hole.reset();
    }

    /// Thresholds in use
    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::localization::Pose;
    use crate::core::perception::Proximity;
    use rstest::rstest;

    const TICK: f64 = 0.032;

    fn frame(floor: Rgb, camera: Rgb, time: f64) -> SensorFrame {
        SensorFrame {
            floor,
            camera,
            proximity: Proximity::default(),
            pose: Pose::default(),
            time,
        }
    }

    fn floor_at(floor: Rgb, tick: u32) -> SensorFrame {
        frame(floor, Rgb::new(100, 100, 100), tick as f64 * TICK)
    }

    #[rstest]
    #[case(Rgb::new(201, 101, 49), true)]
    #[case(Rgb::new(255, 180, 0), true)]
    #[case(Rgb::new(200, 101, 49), false)]
    #[case(Rgb::new(201, 100, 49), false)]
    #[case(Rgb::new(201, 101, 50), false)]
    fn test_trap_thresholds(#[case] floor: Rgb, #[case] expected: bool) {
        let classifiers = SignalClassifiers::new(&ClassifierConfig::default());
        assert_eq!(classifiers.is_trap(&floor_at(floor, 0)), expected);
    }

    #[rstest]
    #[case(Rgb::new(30, 60, 200), true)]
    #[case(Rgb::new(80, 60, 200), false)]
    #[case(Rgb::new(30, 140, 200), false)]
    #[case(Rgb::new(30, 60, 120), false)]
    fn test_wall_thresholds(#[case] camera: Rgb, #[case] expected: bool) {
        let config = ClassifierConfig::default();
        assert_eq!(is_wall(&config, &frame(Rgb::BLACK, camera, 0.0)), expected);
    }

    #[rstest]
    #[case(Rgb::new(201, 201, 201), true)]
    #[case(Rgb::new(255, 255, 200), false)]
    #[case(Rgb::new(200, 255, 255), false)]
    fn test_victim_thresholds(#[case] camera: Rgb, #[case] expected: bool) {
        let config = ClassifierConfig::default();
        assert_eq!(is_victim(&config, &frame(Rgb::BLACK, camera, 0.0)), expected);
    }

    #[test]
    fn test_obstacle_ahead_uses_either_front_sensor() {
        let config = ClassifierConfig::default();
        let mut f = frame(Rgb::BLACK, Rgb::BLACK, 0.0);
        assert!(!is_obstacle_ahead(&config, &f));
        f.proximity.front_right = 81.0;
        assert!(is_obstacle_ahead(&config, &f));
        f.proximity.front_right = 0.0;
        f.proximity.front_left = 80.5;
        assert!(is_obstacle_ahead(&config, &f));
    }

    #[test]
    fn test_trap_fires_on_first_frame() {
        let mut classifiers = SignalClassifiers::new(&ClassifierConfig::default());
        let trap = floor_at(Rgb::new(230, 150, 20), 0);
        assert!(classifiers.is_trap(&trap));
        // Trap colors are never dark
        assert!(!classifiers.is_hole(&trap));
    }

    #[test]
    fn test_hole_requires_continuous_darkness() {
        let mut classifiers = SignalClassifiers::new(&ClassifierConfig::default());
        let dark = Rgb::new(20, 20, 20);

        // 0.000 .. 0.128 s: still inside the 0.15 s window
        for tick in 0..=4 {
            assert!(!classifiers.is_hole(&floor_at(dark, tick)), "tick {}", tick);
        }
        // 0.160 s: window exceeded
        assert!(classifiers.is_hole(&floor_at(dark, 5)));
    }

    #[test]
    fn test_single_dark_frame_never_triggers() {
        let mut classifiers = SignalClassifiers::new(&ClassifierConfig::default());
        let dark = Rgb::new(20, 20, 20);
        let bright = Rgb::new(220, 220, 220);

        let mut tick = 0;
        for _ in 0..20 {
            assert!(!classifiers.is_hole(&floor_at(dark, tick)));
            tick += 1;
            assert!(!classifiers.is_hole(&floor_at(bright, tick)));
            tick += 1;
        }
    }

    #[test]
    fn test_bright_frame_restarts_window() {
        let mut classifiers = SignalClassifiers::new(&ClassifierConfig::default());
        let dark = Rgb::new(20, 20, 20);

        for tick in 0..4 {
            classifiers.is_hole(&floor_at(dark, tick));
        }
        classifiers.is_hole(&floor_at(Rgb::new(95, 20, 20), 4));
        // New run starts at tick 5 and needs its own full window
        for tick in 5..=9 {
            assert!(!classifiers.is_hole(&floor_at(dark, tick)), "tick {}", tick);
        }
        assert!(classifiers.is_hole(&floor_at(dark, 10)));
    }
}
