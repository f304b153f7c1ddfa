use mockall::mock;
use rescue_bot::reporting::{CsvReportSink, LogSpeech, PhraseTable, SpeechSink};
use rescue_bot::sim_interface::{Clock, ColorPatch};
use rescue_bot::{
    CognitiveReporter, CycleOutcome, KinematicSim, Pose, RescueBot, RescueConfig, ReportError, ReportOutcome,
    Rgb, VictimReport, VictimReporter, VictimType,
};

mock! {
    pub Reporter {}
    impl VictimReporter for Reporter {
        fn report(&mut self, report: &VictimReport) -> Result<ReportOutcome, ReportError>;
    }
}

// Blue wall in view at the start pose with a white victim patch just ahead-left
fn victim_by_wall(config: &RescueConfig) -> KinematicSim {
    KinematicSim::new(&config.simulation, &config.drive)
        .with_camera_patch(ColorPatch::new(
            Pose::new(-0.2, -0.2),
            Pose::new(0.2, 0.2),
            Rgb::new(30, 60, 200),
        ))
        .with_camera_patch(ColorPatch::new(
            Pose::new(0.03, 0.03),
            Pose::new(0.2, 0.2),
            Rgb::new(255, 255, 255),
        ))
}

fn sighting(x: f64, z: f64, victim_type: VictimType, hazard: Option<&str>, sequence: u32) -> VictimReport {
    VictimReport {
        position: Pose::new(x, z),
        victim_type,
        hazard: hazard.map(str::to_string),
        urgency: None,
        sequence,
        observer: Pose::new(0.0, 0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_csv_log_skips_duplicates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("victim_report.csv");
        let mut reporter = CognitiveReporter::new(
            PhraseTable::default(),
            Box::new(CsvReportSink::new(&path)),
            Box::new(LogSpeech),
            7,
        );

        let victims = [
            (2.0, 4.0, VictimType::H, Some("Flammable Gas")),
            (1.0, 3.0, VictimType::U, None),
            (1.5, 2.5, VictimType::S, Some("Organic Peroxide")),
            (2.0, 4.0, VictimType::H, Some("Flammable Gas")),
            (3.0, 3.2, VictimType::S, Some("Corrosive")),
            (3.5, 3.2, VictimType::U, Some("Poison")),
        ];
        let outcomes: Vec<ReportOutcome> = victims
            .iter()
            .enumerate()
            .map(|(i, &(x, z, victim_type, hazard))| {
                reporter
                    .report(&sighting(x, z, victim_type, hazard, i as u32 + 1))
                    .unwrap()
            })
            .collect();

        assert_eq!(outcomes[3], ReportOutcome::Duplicate);
        assert_eq!(
            outcomes.iter().filter(|&&o| o == ReportOutcome::Recorded).count(),
            5
        );

        let contents = fs::read_to_string(&path).unwrap();
        let rows: Vec<&str> = contents.lines().collect();
        assert_eq!(rows.len(), 5);
        assert!(rows[0].starts_with("2,4,H,"));
        assert!(rows[0].contains("Flammable Gas"));
        // Missing hazard is written as None
        assert!(rows[1].starts_with("1,3,U,"));
        assert!(rows[1].contains(",None,"));
        assert!(rows[4].starts_with("3.5,3.2,U,"));
        assert!(rows[4].contains("Area_Code6"));
    }

    #[test]
    fn test_speech_failure_still_records() {
        struct Mute;
        impl SpeechSink for Mute {
            fn speak(&mut self, _: u32, _: &str) -> Result<(), ReportError> {
                Err(ReportError::Speech("no audio device".to_string()))
            }
        }

        let dir = tempdir().unwrap();
        let path = dir.path().join("victim_report.csv");
        let mut reporter = CognitiveReporter::new(
            PhraseTable::default(),
            Box::new(CsvReportSink::new(&path)),
            Box::new(Mute),
            7,
        );
        let outcome = reporter
            .report(&sighting(0.5, 0.5, VictimType::S, Some("Corrosive"), 1))
            .unwrap();
        assert_eq!(outcome, ReportOutcome::Recorded);
        assert_eq!(reporter.reported_count(), 1);
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 1);
    }

    #[test]
    fn test_hazard_escape_suppresses_timed_reports() {
        let config = RescueConfig::default();
        // Trap under the start pose keeps the robot escaping for 25 s
        let host = KinematicSim::new(&config.simulation, &config.drive).with_floor_patch(
            ColorPatch::new(
                Pose::new(-0.01, -0.01),
                Pose::new(0.01, 0.01),
                Rgb::new(240, 150, 20),
            ),
        );
        let mut reporter = MockReporter::new();
        reporter.expect_report().never();
        let mut bot = RescueBot::new(config, host, Box::new(reporter)).unwrap();

        while bot.host().now() < 24.5 {
            bot.run_cycle();
            assert!(bot.arbiter().is_hazard_active(), "t={:.3}", bot.host().now());
        }
        // A timed report would otherwise have gone out just after 20 s
        assert_eq!(bot.status().reports_issued, 0);
    }

    #[test]
    fn test_spotted_victim_reported_once() {
        let config = RescueConfig::default();
        let host = victim_by_wall(&config);

        let mut reporter = MockReporter::new();
        reporter
            .expect_report()
            .withf(|r| {
                r.victim_type == VictimType::U
                    && r.hazard.as_deref() == Some("Poison")
                    && r.sequence == 1
                    && r.position == r.observer
            })
            .times(1)
            .returning(|_| Ok(ReportOutcome::Recorded));
        let mut bot = RescueBot::new(config, host, Box::new(reporter)).unwrap();

        for _ in 0..150 {
            bot.run_cycle();
        }
        let status = bot.status();
        assert_eq!(status.reports_issued, 1);
        assert_eq!(status.reports_recorded, 1);
        assert_eq!(status.behavior, "WallFollow");
    }

    #[test]
    fn test_reporter_failure_does_not_stop_the_mission() {
        let config = RescueConfig::default();
        let host = victim_by_wall(&config);

        let mut reporter = MockReporter::new();
        reporter
            .expect_report()
            .times(1)
            .returning(|_| Err(ReportError::Sink("disk full".to_string())));
        let mut bot = RescueBot::new(config, host, Box::new(reporter)).unwrap();

        let mut moving_after_pause = 0;
        for cycle in 1..=150 {
            assert_eq!(bot.run_cycle(), CycleOutcome::Continue, "cycle {}", cycle);
            assert_eq!(bot.host().steps(), cycle);
            // The victim pause ends a little after 3 s
            if cycle > 120 && !bot.host().last_command().is_stop() {
                moving_after_pause += 1;
            }
        }
        assert!(moving_after_pause > 0);

        let status = bot.status();
        assert_eq!(status.reports_issued, 1);
        assert_eq!(status.reports_recorded, 0);
    }
}
