// reporting/sink.rs

// Where report records and spoken messages go. The CSV sink appends one escaped row per
// record to an existing file (creating it bare if needed); the memory sink keeps records
// for inspection; speech is handed off without waiting for playback.

use log::info;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::{ReportError, VictimRecord};

/// Persists victim records
pub trait ReportSink {
    /// Writes one record
    fn append(&mut self, record: &VictimRecord) -> Result<(), ReportError>;
}

/// Queues a spoken message; must not block on audio playback
pub trait SpeechSink {
    /// Queues `message` for report `sequence`
    fn speak(&mut self, sequence: u32, message: &str) -> Result<(), ReportError>;
}

/// Appends one CSV row per record
pub struct CsvReportSink {
    path: PathBuf,
}

impl CsvReportSink {
    /// Sink writing to `path`; the file is created on the first append
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        CsvReportSink {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Target file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportSink for CsvReportSink {
    fn append(&mut self, record: &VictimRecord) -> Result<(), ReportError> {
        let io_err = |e: std::io::Error| ReportError::Io {
            path: self.path.clone(),
            source: e,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(io_err)?;

        writeln!(
            file,
            "{},{},{},{},{},{},{},{},{},{}",
            record.x,
            record.z,
            escape_csv(&record.victim_type),
            escape_csv(&record.priority),
            escape_csv(&record.hazard),
            record.proximity,
            escape_csv(&record.timestamp),
            escape_csv(&record.area_code),
            escape_csv(&record.urgency_message),
            escape_csv(&record.zone)
        )
        .map_err(io_err)
    }
}

fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// In-memory sink; clones share the same record list
#[derive(Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<VictimRecord>>>,
}

impl MemorySink {
    /// Empty sink
    pub fn new() -> Self {
        MemorySink::default()
    }

    /// Copy of every record written so far
    pub fn records(&self) -> Vec<VictimRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

impl ReportSink for MemorySink {
    fn append(&mut self, record: &VictimRecord) -> Result<(), ReportError> {
        self.records
            .lock()
            .map_err(|e| ReportError::Sink(e.to_string()))?
            .push(record.clone());
        Ok(())
    }
}

/// Speech stand-in that logs the message
pub struct LogSpeech;

impl SpeechSink for LogSpeech {
    fn speak(&mut self, sequence: u32, message: &str) -> Result<(), ReportError> {
        info!("Report {} voice message: {}", sequence, message);
        Ok(())
    }
}
