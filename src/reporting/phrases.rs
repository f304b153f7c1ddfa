// reporting/phrases.rs

// Priority labels, voice lines and hazard phrases keyed by victim type code. Loaded
// from JSON; unknown codes fall back to the "S" entry, then to a built-in entry.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use super::ReportError;

const FALLBACK_CODE: &str = "S";

/// Wording for one victim type code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityEntry {
    /// Priority label written to records
    pub label: String,
    /// Openers, one drawn per report
    #[serde(default)]
    pub voice_lines: Vec<String>,
    /// Default urgency text
    #[serde(default)]
    pub urgency: String,
}

impl PriorityEntry {
    fn new(label: &str, voice_lines: &[&str], urgency: &str) -> Self {
        PriorityEntry {
            label: label.to_string(),
            voice_lines: voice_lines.iter().map(|l| l.to_string()).collect(),
            urgency: urgency.to_string(),
        }
    }

    fn builtin() -> Self {
        PriorityEntry::new("Unclassified", &["Victim found."], "")
    }
}

/// Phrase table keyed by type code and hazard tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseTable {
    /// Entries keyed by type code
    pub priorities: HashMap<String, PriorityEntry>,
    /// Spoken hazard descriptions keyed by tag
    #[serde(default)]
    pub hazards: HashMap<String, String>,
    #[serde(skip, default = "PriorityEntry::builtin")]
    fallback: PriorityEntry,
}

impl PhraseTable {
    /// Reads a phrase table JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ReportError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| ReportError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let table: PhraseTable = serde_json::from_reader(file)?;
        if !table.priorities.contains_key(FALLBACK_CODE) {
            warn!(
                "Phrase table {} has no \"{}\" entry; unknown codes use the built-in label",
                path.display(),
                FALLBACK_CODE
            );
        }
        info!(
            "Loaded {} priorities and {} hazard phrases from {}",
            table.priorities.len(),
            table.hazards.len(),
            path.display()
        );
        Ok(table)
    }

    /// Parses a phrase table from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ReportError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Entry for a type code, falling back to "S" and then the built-in entry
    pub fn priority(&self, code: &str) -> &PriorityEntry {
        self.priorities
            .get(code)
            .or_else(|| self.priorities.get(FALLBACK_CODE))
            .unwrap_or(&self.fallback)
    }

    /// Spoken hazard description; empty for unknown tags
    pub fn hazard_phrase(&self, tag: &str) -> &str {
        self.hazards.get(tag).map_or("", String::as_str)
    }
}

impl Default for PhraseTable {
    fn default() -> Self {
        let priorities = HashMap::from([
            (
                "H".to_string(),
                PriorityEntry::new(
                    "Critical",
                    &["Urgent! Injured person detected.", "Critical casualty found."],
                    "Immediate medical attention required.",
                ),
            ),
            (
                "S".to_string(),
                PriorityEntry::new(
                    "Moderate",
                    &["Stable victim detected.", "Person found in stable condition."],
                    "Assistance needed soon.",
                ),
            ),
            (
                "U".to_string(),
                PriorityEntry::new(
                    "Low",
                    &["Unharmed person located.", "Survivor found, no visible injuries."],
                    "Guide to safety when possible.",
                ),
            ),
        ]);
        let hazards = HashMap::from([
            (
                "Flammable Gas".to_string(),
                "Warning: flammable gas nearby.".to_string(),
            ),
            ("Poison".to_string(), "Caution: poisonous substance present.".to_string()),
            (
                "Organic Peroxide".to_string(),
                "Organic peroxide detected, avoid heat sources.".to_string(),
            ),
            ("Corrosive".to_string(), "Corrosive material in the area.".to_string()),
        ]);
        PhraseTable {
            priorities,
            hazards,
            fallback: PriorityEntry::builtin(),
        }
    }
}
