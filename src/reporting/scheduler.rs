// reporting/scheduler.rs

// Core-side throttle in front of the reporter. At most one reporter call per interval,
// none while a hazard escape owns the motors. Timed reports rotate the configured type
// codes and draw a hazard tag from a seeded generator so runs are reproducible.

use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use super::{ReportingConfig, VictimReport, VictimType};
use crate::core::localization::Pose;

/// Decides when the mission runner calls the reporter
pub struct ReportScheduler {
    config: ReportingConfig,
    rng: StdRng,
    started_at: f64,
    last_call_at: Option<f64>,
    next_sequence: u32,
    timed_issued: usize,
}

impl ReportScheduler {
    /// Scheduler whose first timed report is measured from `started_at`
    pub fn new(config: &ReportingConfig, started_at: f64) -> Self {
        ReportScheduler {
            config: config.clone(),
            rng: StdRng::seed_from_u64(config.seed),
            started_at,
            last_call_at: None,
            next_sequence: 1,
            timed_issued: 0,
        }
    }

    /// Periodic report, due once more than one interval has passed since the last call
    pub fn poll_timed(&mut self, now: f64, pose: Pose, hazard_active: bool) -> Option<VictimReport> {
        if hazard_active {
            return None;
        }
        let baseline = self.last_call_at.unwrap_or(self.started_at);
        if now - baseline <= self.config.interval {
            return None;
        }

        let victim_type = if self.config.victim_types.is_empty() {
            VictimType::U
        } else {
            self.config.victim_types[self.timed_issued % self.config.victim_types.len()]
        };
        let hazard = self.config.hazard_tags.choose(&mut self.rng).cloned();
        self.timed_issued += 1;
        info!("Timed victim report due at t={:.2}", now);
        Some(self.issue(now, pose, victim_type, hazard))
    }

    /// Report for a victim the wall follower just spotted
    pub fn request_detected(
        &mut self,
        now: f64,
        pose: Pose,
        hazard_active: bool,
    ) -> Option<VictimReport> {
        if hazard_active {
            debug!("Victim report suppressed during hazard escape");
            return None;
        }
        if let Some(last) = self.last_call_at {
            if now - last < self.config.interval {
                info!(
                    "Victim report throttled: last call {:.1} s ago",
                    now - last
                );
                return None;
            }
        }
        let hazard = Some(self.config.detected_hazard.clone()).filter(|h| !h.is_empty());
        Some(self.issue(now, pose, self.config.detected_type, hazard))
    }

    fn issue(
        &mut self,
        now: f64,
        pose: Pose,
        victim_type: VictimType,
        hazard: Option<String>,
    ) -> VictimReport {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.last_call_at = Some(now);
        VictimReport {
            position: pose,
            victim_type,
            hazard,
            urgency: None,
            sequence,
            observer: pose,
        }
    }

    /// Reporter calls made so far
    pub fn issued(&self) -> u32 {
        self.next_sequence - 1
    }

    /// Time of the last reporter call
    pub fn last_call_at(&self) -> Option<f64> {
        self.last_call_at
    }
}
