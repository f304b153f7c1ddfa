// core/perception.rs

// Turns raw device samples into one immutable SensorFrame per tick: floor color, the
// center pixel of the forward camera, four logical proximity readings and the GPS pose.
// A missing image is a transient gap, not an error; it reads as black.

// Dependencies
use log::trace;
use serde::{Deserialize, Serialize};

use super::localization::Pose;
use crate::sim_interface::SensorSuite;

/// 8-bit color sample
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    /// Red
    pub r: u8,
    /// Green
    pub g: u8,
    /// Blue
    pub b: u8,
}

impl Rgb {
    /// Stand-in for a missing image
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    /// Color from its three channels
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    /// `[r, g, b]`
    pub fn channels(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

/// Logical proximity readings. Larger values mean a closer obstacle.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Proximity {
    /// ps0
    pub front_left: f64,
    /// ps7
    pub front_right: f64,
    /// Smaller of ps5 and ps6
    pub left: f64,
    /// Smaller of ps1 and ps2
    pub right: f64,
}

/// Everything the decision layer sees for one tick
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SensorFrame {
    /// Floor-facing color sensor
    pub floor: Rgb,
    /// Center pixel of the forward camera
    pub camera: Rgb,
    /// Grouped proximity readings
    pub proximity: Proximity,
    /// GPS position
    pub pose: Pose,
    /// Simulated time (s) at which the frame was captured
    pub time: f64,
}

/// Number of proximity sensors on the chassis (ps0..ps7)
pub const PROXIMITY_SENSOR_COUNT: usize = 8;

const FRONT_LEFT_SENSOR: usize = 0;
const FRONT_RIGHT_SENSOR: usize = 7;
const RIGHT_SENSORS: [usize; 2] = [1, 2];
const LEFT_SENSORS: [usize; 2] = [5, 6];

/// Perception adapter; counts capture gaps for diagnostics.
#[derive(Debug, Default)]
pub struct Perception {
    floor_gaps: u64,
    camera_gaps: u64,
}

impl Perception {
    /// Adapter with zeroed gap counters
    pub fn new() -> Self {
        Perception::default()
    }

    /// Samples every device once. Never fails and never blocks.
    pub fn sample<S: SensorSuite + ?Sized>(&mut self, sensors: &mut S, time: f64) -> SensorFrame {
        let floor = match sensors.floor_color() {
            Some(color) => color,
            None => {
                self.floor_gaps += 1;
                trace!("No floor image at t={:.3}, substituting black", time);
                Rgb::BLACK
            }
        };

        let camera = match sensors.camera_color() {
            Some(color) => color,
            None => {
                self.camera_gaps += 1;
                trace!("No camera image at t={:.3}, substituting black", time);
                Rgb::BLACK
            }
        };

        let group_min = |indices: [usize; 2]| {
            indices
                .iter()
                .map(|&i| sensors.proximity(i))
                .fold(f64::INFINITY, f64::min)
        };

        let proximity = Proximity {
            front_left: sensors.proximity(FRONT_LEFT_SENSOR),
            front_right: sensors.proximity(FRONT_RIGHT_SENSOR),
            left: group_min(LEFT_SENSORS),
            right: group_min(RIGHT_SENSORS),
        };

        SensorFrame {
            floor,
            camera,
            proximity,
            pose: sensors.position(),
            time,
        }
    }

    /// (floor, camera) capture gaps seen so far
    pub fn gaps(&self) -> (u64, u64) {
        (self.floor_gaps, self.camera_gaps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim_interface::MockSensorSuite;

    #[test]
    fn test_missing_images_read_as_black() {
        let mut sensors = MockSensorSuite::new();
        sensors.expect_floor_color().returning(|| None);
        sensors.expect_camera_color().returning(|| None);
        sensors.expect_proximity().returning(|_| 0.0);
        sensors.expect_position().returning(|| Pose::new(0.1, 0.2));

        let mut perception = Perception::new();
        let frame = perception.sample(&mut sensors, 1.0);

        assert_eq!(frame.floor, Rgb::BLACK);
        assert_eq!(frame.camera, Rgb::BLACK);
        assert_eq!(frame.pose, Pose::new(0.1, 0.2));
        assert_eq!(perception.gaps(), (1, 1));
    }

    #[test]
    fn test_proximity_grouping() {
        let mut sensors = MockSensorSuite::new();
        sensors.expect_floor_color().returning(|| Some(Rgb::new(200, 200, 200)));
        sensors.expect_camera_color().returning(|| Some(Rgb::new(10, 20, 30)));
        // ps_i reads 10 * (i + 1)
        sensors.expect_proximity().returning(|i| 10.0 * (i as f64 + 1.0));
        sensors.expect_position().returning(Pose::default);

        let frame = Perception::new().sample(&mut sensors, 0.0);

        assert_eq!(frame.proximity.front_left, 10.0);
        assert_eq!(frame.proximity.front_right, 80.0);
        assert_eq!(frame.proximity.right, 20.0);
        assert_eq!(frame.proximity.left, 60.0);
        assert_eq!(frame.camera, Rgb::new(10, 20, 30));
    }
}
