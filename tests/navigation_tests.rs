use mockall::mock;
use rescue_bot::{
    BehaviorState, CycleOutcome, KinematicSim, Pose, RescueBot, RescueConfig, ReportError,
    ReportOutcome, VictimReport, VictimReporter,
};
use rescue_bot::sim_interface::Clock;

mock! {
    pub Reporter {}
    impl VictimReporter for Reporter {
        fn report(&mut self, report: &VictimReport) -> Result<ReportOutcome, ReportError>;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_reporter() -> MockReporter {
        let mut reporter = MockReporter::new();
        reporter
            .expect_report()
            .returning(|_| Ok(ReportOutcome::Recorded));
        reporter
    }

    // Four-waypoint course on an empty arena
    #[test]
    fn test_reaches_all_waypoints_monotonically() {
        let config = RescueConfig::default();
        let waypoints: Vec<Pose> = config.navigation.waypoints.clone();
        let host = KinematicSim::new(&config.simulation, &config.drive);
        let mut bot = RescueBot::new(config, host, Box::new(quiet_reporter())).unwrap();

        let mut previous: Option<(usize, f64)> = None;
        let mut outcome = CycleOutcome::Continue;
        for _ in 0..3000 {
            let target = bot.arbiter().navigator().target_index();
            outcome = bot.run_cycle();
            if outcome != CycleOutcome::Continue {
                break;
            }
            assert!(
                !matches!(bot.arbiter().state(), BehaviorState::StuckRecovery(_)),
                "unexpected recovery at t={:.3}",
                bot.host().now()
            );

            let distance = bot.host().pose().distance_to(&waypoints[target]);
            if let Some((last_target, last_distance)) = previous {
                if last_target == target {
                    assert!(
                        distance <= last_distance + 1e-9,
                        "distance to waypoint {} grew from {:.6} to {:.6}",
                        target,
                        last_distance,
                        distance
                    );
                }
            }
            previous = Some((target, distance));
            if bot.arbiter().navigator().target_index() != target {
                previous = None;
            }
        }

        assert_eq!(outcome, CycleOutcome::MissionComplete);
        let status = bot.status();
        assert!(status.mission_complete);
        assert_eq!(status.target_index, 4);
        assert_eq!(status.behavior, "MissionComplete");
        let last = waypoints[3];
        assert!(bot.host().pose().distance_to(&last) <= 0.05);

        // Terminal: further cycles neither move nor reopen the mission
        let steps = bot.host().steps();
        assert_eq!(bot.run_cycle(), CycleOutcome::MissionComplete);
        assert_eq!(bot.host().steps(), steps);
    }

    #[test]
    fn test_runs_until_simulation_ends() {
        let mut config = RescueConfig::default();
        config.navigation.waypoints = vec![Pose::new(50.0, 0.0)];
        config.simulation.duration = 1.0;
        let host = KinematicSim::new(&config.simulation, &config.drive);
        let mut bot = RescueBot::new(config, host, Box::new(quiet_reporter())).unwrap();

        assert_eq!(bot.run(), CycleOutcome::Terminated);
        let steps = bot.host().steps();
        assert_eq!(steps, 32);
        assert!(!bot.status().mission_complete);

        // No further stepping or commands once terminated
        let command = bot.host().last_command();
        assert_eq!(bot.run_cycle(), CycleOutcome::Terminated);
        assert_eq!(bot.host().steps(), steps);
        assert_eq!(bot.host().last_command(), command);
    }
}
