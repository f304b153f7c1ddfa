//! Victim reporting
//!
//! The navigation core only hands a `VictimReport` to a `VictimReporter` and moves on.
//! `CognitiveReporter` is the shipped implementation: it deduplicates sightings by
//! rounded position and type, turns them into structured records through the phrase
//! table, persists them to a `ReportSink` and queues a spoken summary on a `SpeechSink`.

/// Priority labels, voice lines and hazard area codes
pub mod phrases;
/// Report throttling and timed report requests
pub mod scheduler;
/// Record and speech outputs
pub mod sink;

use chrono::Local;
use log::{info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;

pub use phrases::{PhraseTable, PriorityEntry};
pub use scheduler::ReportScheduler;
pub use sink::{CsvReportSink, LogSpeech, MemorySink, ReportSink, SpeechSink};

use crate::core::localization::Pose;

/// Errors raised by reporting collaborators. None of them stop the robot.
#[derive(Debug, Error)]
pub enum ReportError {
    /// File could not be opened or written
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Phrase table JSON did not parse
    #[error("invalid phrase table: {0}")]
    Phrases(#[from] serde_json::Error),

    /// Record sink rejected the write
    #[error("report sink unavailable: {0}")]
    Sink(String),

    /// Speech output failed
    #[error("speech output failed: {0}")]
    Speech(String),
}

/// Victim classification code
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VictimType {
    /// Unharmed
    U,
    /// Stable
    S,
    /// Harmed
    H,
}

impl VictimType {
    /// One-letter code used in records and the phrase table
    pub fn code(self) -> &'static str {
        match self {
            VictimType::U => "U",
            VictimType::S => "S",
            VictimType::H => "H",
        }
    }
}

/// One sighting handed to the reporter
#[derive(Debug, Clone, PartialEq)]
pub struct VictimReport {
    /// Where the victim is
    pub position: Pose,
    /// Classification
    pub victim_type: VictimType,
    /// Hazard tag, if any
    pub hazard: Option<String>,
    /// Overrides the phrase-table urgency when set
    pub urgency: Option<String>,
    /// Report number, used for the area code and zone
    pub sequence: u32,
    /// Robot pose when the report was made
    pub observer: Pose,
}

/// What the reporter did with a sighting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    /// New record written
    Recorded,
    /// Same rounded position and type already recorded
    Duplicate,
}

/// Fire-and-forget reporting seam used by the mission runner
#[cfg_attr(test, mockall::automock)]
pub trait VictimReporter {
    /// Handles one sighting. Errors are logged by the caller and never stop the robot.
    fn report(&mut self, report: &VictimReport) -> Result<ReportOutcome, ReportError>;
}

/// Persisted form of one report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VictimRecord {
    /// x rounded to centimeters
    pub x: f64,
    /// z rounded to centimeters
    pub z: f64,
    /// Type code
    pub victim_type: String,
    /// Priority label from the phrase table
    pub priority: String,
    /// Hazard tag, `None` when absent
    pub hazard: String,
    /// Distance from the robot (m)
    pub proximity: f64,
    /// Local time, `%m/%d/%Y %H:%M`
    pub timestamp: String,
    /// `Area_Code<sequence>`
    pub area_code: String,
    /// Urgency text
    pub urgency_message: String,
    /// `Zone-1` to `Zone-3`
    pub zone: String,
}

/// Reporting section of the configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportingConfig {
    /// Minimum seconds between two reporter calls
    pub interval: f64,
    /// CSV file receiving one row per report; none keeps records in memory
    pub csv_path: Option<PathBuf>,
    /// Phrase table JSON; the built-in table is used when unset
    pub phrases_path: Option<PathBuf>,
    /// Seed for voice-line and hazard-tag selection
    pub seed: u64,
    /// Type codes cycled by timed reports
    pub victim_types: Vec<VictimType>,
    /// Hazard tags drawn for timed reports
    pub hazard_tags: Vec<String>,
    /// Type and hazard used for victims spotted by the wall follower
    pub detected_type: VictimType,
    /// Hazard tag attached to wall-follower sightings
    pub detected_hazard: String,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        ReportingConfig {
            interval: 20.0,
            csv_path: None,
            phrases_path: None,
            seed: 7,
            victim_types: vec![VictimType::U, VictimType::S, VictimType::H],
            hazard_tags: vec![
                "Flammable Gas".to_string(),
                "Poison".to_string(),
                "Organic Peroxide".to_string(),
                "Corrosive".to_string(),
            ],
            detected_type: VictimType::U,
            detected_hazard: "Poison".to_string(),
        }
    }
}

/// Rounds to centimeters
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

type DedupKey = (i64, i64, VictimType);

fn dedup_key(x: f64, z: f64, victim_type: VictimType) -> DedupKey {
    ((x * 100.0).round() as i64, (z * 100.0).round() as i64, victim_type)
}

/// Deduplicating reporter writing records to a sink and summaries to speech
pub struct CognitiveReporter {
    phrases: PhraseTable,
    sink: Box<dyn ReportSink>,
    speech: Box<dyn SpeechSink>,
    reported: HashSet<DedupKey>,
    rng: StdRng,
}

impl CognitiveReporter {
    /// Reporter over explicit collaborators; `seed` drives voice-line choice
    pub fn new(
        phrases: PhraseTable,
        sink: Box<dyn ReportSink>,
        speech: Box<dyn SpeechSink>,
        seed: u64,
    ) -> Self {
        info!("Cognitive reporting module initialized");
        CognitiveReporter {
            phrases,
            sink,
            speech,
            reported: HashSet::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Builds a reporter from configuration: CSV sink when a path is set, logged speech
    pub fn from_config(config: &ReportingConfig) -> Result<Self, ReportError> {
        let phrases = match &config.phrases_path {
            Some(path) => PhraseTable::load(path)?,
            None => PhraseTable::default(),
        };
        let sink: Box<dyn ReportSink> = match &config.csv_path {
            Some(path) => Box::new(CsvReportSink::new(path)),
            None => Box::new(MemorySink::new()),
        };
        Ok(CognitiveReporter::new(
            phrases,
            sink,
            Box::new(LogSpeech),
            config.seed,
        ))
    }

    /// Distinct sightings recorded
    pub fn reported_count(&self) -> usize {
        self.reported.len()
    }

    fn compose_message(&self, voice_line: &str, record: &VictimRecord, hazard: &str) -> String {
        let parts = [
            format!(
                "{} Victim located at {} and {} meters.",
                voice_line, record.x, record.z
            ),
            format!("Classification: {}.", record.priority),
            format!("Distance from robot: {} meters.", record.proximity),
            self.phrases.hazard_phrase(hazard).to_string(),
            record.urgency_message.clone(),
        ];
        parts
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl VictimReporter for CognitiveReporter {
    fn report(&mut self, report: &VictimReport) -> Result<ReportOutcome, ReportError> {
        let x = round2(report.position.x);
        let z = round2(report.position.z);
        let key = dedup_key(x, z, report.victim_type);
        let proximity = round2(report.observer.distance_to(&Pose::new(x, z)));

        if self.reported.contains(&key) {
            info!(
                "Skipped duplicate report: {} at ({} m, {} m), {} m away",
                report.victim_type.code(),
                x,
                z,
                proximity
            );
            return Ok(ReportOutcome::Duplicate);
        }

        let entry = self.phrases.priority(report.victim_type.code());
        let voice_line = entry
            .voice_lines
            .choose(&mut self.rng)
            .cloned()
            .unwrap_or_default();
        let hazard = report.hazard.clone().unwrap_or_default();

        let record = VictimRecord {
            x,
            z,
            victim_type: report.victim_type.code().to_string(),
            priority: entry.label.clone(),
            hazard: if hazard.is_empty() {
                "None".to_string()
            } else {
                hazard.clone()
            },
            proximity,
            timestamp: Local::now().format("%m/%d/%Y %H:%M").to_string(),
            area_code: format!("Area_Code{}", report.sequence),
            urgency_message: report.urgency.clone().unwrap_or(entry.urgency.clone()),
            zone: format!("Zone-{}", (report.sequence % 3) + 1),
        };

        self.sink.append(&record)?;
        self.reported.insert(key);
        info!(
            "Victim at ({} m, {} m) classified {}, hazard {}",
            x, z, record.priority, record.hazard
        );

        let message = self.compose_message(&voice_line, &record, &hazard);
        if let Err(e) = self.speech.speak(report.sequence, &message) {
            warn!("Speech output failed for report {}: {}", report.sequence, e);
        }

        Ok(ReportOutcome::Recorded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(x: f64, z: f64, victim_type: VictimType, hazard: Option<&str>, sequence: u32) -> VictimReport {
        VictimReport {
            position: Pose::new(x, z),
            victim_type,
            hazard: hazard.map(str::to_string),
            urgency: None,
            sequence,
            observer: Pose::new(x, z),
        }
    }

    fn reporter() -> (CognitiveReporter, MemorySink) {
        let sink = MemorySink::new();
        let reporter = CognitiveReporter::new(
            PhraseTable::default(),
            Box::new(sink.clone()),
            Box::new(LogSpeech),
            1,
        );
        (reporter, sink)
    }

    #[test]
    fn test_duplicate_suppressed_regardless_of_hazard() {
        let (mut reporter, sink) = reporter();
        let first = reporter.report(&report(2.001, 4.0, VictimType::H, Some("Flammable Gas"), 1));
        let second = reporter.report(&report(1.999, 4.004, VictimType::H, Some("Corrosive"), 2));
        assert_eq!(first.unwrap(), ReportOutcome::Recorded);
        assert_eq!(second.unwrap(), ReportOutcome::Duplicate);
        assert_eq!(sink.records().len(), 1);
    }

    #[test]
    fn test_same_spot_different_type_is_new() {
        let (mut reporter, sink) = reporter();
        reporter.report(&report(1.0, 3.0, VictimType::U, None, 1)).unwrap();
        let outcome = reporter.report(&report(1.0, 3.0, VictimType::S, None, 2)).unwrap();
        assert_eq!(outcome, ReportOutcome::Recorded);
        assert_eq!(reporter.reported_count(), 2);
        assert_eq!(sink.records().len(), 2);
    }

    #[test]
    fn test_record_fields() {
        let (mut reporter, sink) = reporter();
        let mut sighting = report(0.123, -0.456, VictimType::S, Some("Corrosive"), 4);
        sighting.observer = Pose::new(0.42, -0.056);
        reporter.report(&sighting).unwrap();

        let records = sink.records();
        let record = &records[0];
        assert_eq!(record.x, 0.12);
        assert_eq!(record.z, -0.46);
        assert_eq!(record.victim_type, "S");
        assert_eq!(record.hazard, "Corrosive");
        assert_eq!(record.proximity, 0.5);
        assert_eq!(record.area_code, "Area_Code4");
        assert_eq!(record.zone, "Zone-2");
    }

    #[test]
    fn test_missing_hazard_reads_none() {
        let (mut reporter, sink) = reporter();
        reporter.report(&report(1.0, 1.0, VictimType::U, None, 3)).unwrap();
        assert_eq!(sink.records()[0].hazard, "None");
        assert_eq!(sink.records()[0].zone, "Zone-1");
    }

    #[test]
    fn test_failed_write_is_not_marked_reported() {
        struct Broken;
        impl ReportSink for Broken {
            fn append(&mut self, _: &VictimRecord) -> Result<(), ReportError> {
                Err(ReportError::Sink("disk full".to_string()))
            }
        }
        let mut reporter =
            CognitiveReporter::new(PhraseTable::default(), Box::new(Broken), Box::new(LogSpeech), 1);
        assert!(reporter.report(&report(1.0, 1.0, VictimType::U, None, 1)).is_err());
        assert_eq!(reporter.reported_count(), 0);
    }
}
