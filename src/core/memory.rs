// core/memory.rs

// Short positional memory used by stuck detection: a bounded FIFO of the most recent
// poses recorded by the goal navigator. Nothing here is persisted.

use std::collections::VecDeque;

use super::localization::Pose;

/// Bounded FIFO of recent poses
#[derive(Debug, Clone)]
pub struct PositionHistory {
    samples: VecDeque<Pose>,
    capacity: usize,
}

impl PositionHistory {
    /// Empty history holding at most `capacity` poses (at least one)
    pub fn new(capacity: usize) -> Self {
        PositionHistory {
            samples: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Appends a pose, evicting the oldest once full
    pub fn push(&mut self, pose: Pose) {
        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(pose);
    }

    /// Drops every sample
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Samples held
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// No samples held
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Holding `capacity` samples
    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.capacity
    }

    /// Maximum samples held
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent sample
    pub fn latest(&self) -> Option<&Pose> {
        self.samples.back()
    }

    /// Mean distance between consecutive samples; None with fewer than two
    pub fn mean_step(&self) -> Option<f64> {
        if self.samples.len() < 2 {
            return None;
        }
        let total: f64 = self
            .samples
            .iter()
            .zip(self.samples.iter().skip(1))
            .map(|(a, b)| a.distance_to(b))
            .sum();
        Some(total / (self.samples.len() - 1) as f64)
    }

    /// Samples, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Pose> {
        self.samples.iter()
    }
}
