//! Recorded path playback
//!
//! A recorded path is a list of `{type, steps}` entries. Playback turns each entry into
//! a fixed wheel command held for its step count, bypassing the reactive core entirely.

use log::info;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::RescueError;
use crate::navigation::controller::{MotionCommand, MotorSequence};

/// Replay section of the configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// JSON path file; replay is off when unset or when the file holds no steps
    pub path_file: Option<PathBuf>,
}

/// Recorded motion primitive
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathAction {
    /// `F`: both wheels at 0.7 max
    #[serde(rename = "F")]
    Forward,
    /// `B`: both wheels at -0.5 max
    #[serde(rename = "B")]
    Back,
    /// `L`: left turn
    #[serde(rename = "L")]
    Left,
    /// `R`: right turn
    #[serde(rename = "R")]
    Right,
}

impl PathAction {
    /// Wheel command for this primitive
    pub fn command(self, max: f64) -> MotionCommand {
        match self {
            PathAction::Forward => MotionCommand::uniform(0.7, max),
            PathAction::Back => MotionCommand::uniform(-0.5, max),
            PathAction::Left => MotionCommand::new(0.3 * max, max),
            PathAction::Right => MotionCommand::new(max, 0.3 * max),
        }
    }
}

/// One `{type, steps}` entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathEntry {
    /// Primitive to hold
    #[serde(rename = "type")]
    pub action: PathAction,
    /// Ticks to hold it for
    pub steps: u32,
}

/// Contents of a path file
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordedPath {
    /// Entries in playback order
    #[serde(default)]
    pub path: Vec<PathEntry>,
}

impl RecordedPath {
    /// Reads a JSON path file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RescueError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| RescueError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let recorded: RecordedPath = serde_json::from_reader(file)?;
        info!(
            "Loaded recorded path: {} entries, {} steps",
            recorded.path.len(),
            recorded.total_steps()
        );
        Ok(recorded)
    }

    /// Ticks across every entry
    pub fn total_steps(&self) -> u64 {
        self.path.iter().map(|e| e.steps as u64).sum()
    }

    /// No ticks to play
    pub fn is_empty(&self) -> bool {
        self.total_steps() == 0
    }
}

/// Step-by-step playback of a recorded path
#[derive(Debug, Clone)]
pub struct PathPlayback {
    sequence: MotorSequence,
    entries: usize,
}

impl PathPlayback {
    /// Queues every entry as a segment scaled by `max_velocity`
    pub fn new(recorded: &RecordedPath, max_velocity: f64) -> Self {
        let sequence = recorded
            .path
            .iter()
            .fold(MotorSequence::default(), |seq, entry| {
                seq.then(entry.action.command(max_velocity), entry.steps)
            });
        PathPlayback {
            sequence,
            entries: recorded.path.len(),
        }
    }

    /// Next recorded command; None when playback is exhausted
    pub fn next_command(&mut self) -> Option<MotionCommand> {
        self.sequence.next_command()
    }

    /// Ticks left to play
    pub fn remaining_steps(&self) -> u64 {
        self.sequence.remaining_ticks()
    }

    /// Entries in the recording
    pub fn entries(&self) -> usize {
        self.entries
    }
}
