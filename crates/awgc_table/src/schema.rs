//! Command-table document
//!
//! Gantree: L5_Table → CommandTableDocument
//!
//! JSON document the instrument driver uploads:
//!
//! ```json
//! {"header": {"version": "1.2.0"},
//!  "table": [{"index": 0, "waveform": {"index": 1, "length": 80},
//!             "phase0": {"value": 0.0, "increment": false},
//!             "phase1": {"value": 90.0, "increment": false}},
//!            {"index": 33, "waveform": {"playZero": true, "length": 80}}]}
//! ```

use crate::entry::{CommandTable, CommandTableEntry, EntryAction, EntryIndex, PhaseSetting};
use awgc_core::{AwgcError, AwgcResult, CoreId, Samples};
use awgc_waveform::SlotId;
use serde::{Deserialize, Serialize};

/// Document header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableHeader {
    /// Schema version
    pub version: String,
}

/// `waveform` field of an entry
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaveformField {
    /// Waveform slot to play
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<SlotId>,
    /// Idle instead of playing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub play_zero: Option<bool>,
    /// Length in samples
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<Samples>,
}

/// `phase0` / `phase1` field of an entry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseField {
    /// Phase in degrees
    pub value: f64,
    /// Add to the running phase
    pub increment: bool,
}

/// One serialized entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryDocument {
    /// Entry index
    pub index: EntryIndex,
    /// Played waveform or idle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waveform: Option<WaveformField>,
    /// First oscillator phase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase0: Option<PhaseField>,
    /// Second oscillator phase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase1: Option<PhaseField>,
}

fn phase_fields(phase: Option<PhaseSetting>) -> (Option<PhaseField>, Option<PhaseField>) {
    match phase {
        Some(p) => (
            Some(PhaseField {
                value: p.phase0,
                increment: p.incremental,
            }),
            Some(PhaseField {
                value: p.phase1,
                increment: p.incremental,
            }),
        ),
        None => (None, None),
    }
}

impl From<&CommandTableEntry> for EntryDocument {
    fn from(entry: &CommandTableEntry) -> Self {
        let (waveform, phase) = match entry.action {
            EntryAction::PlayWaveform {
                slot,
                samples,
                phase,
            } => (
                Some(WaveformField {
                    index: Some(slot),
                    play_zero: None,
                    length: Some(samples),
                }),
                phase,
            ),
            EntryAction::PhaseOnly { phase } => (None, Some(phase)),
            EntryAction::Wait { samples } => (
                Some(WaveformField {
                    index: None,
                    play_zero: Some(true),
                    length: Some(samples),
                }),
                None,
            ),
        };
        let (phase0, phase1) = phase_fields(phase);
        Self {
            index: entry.index,
            waveform,
            phase0,
            phase1,
        }
    }
}

impl EntryDocument {
    /// Convert back into an entry
    pub fn to_entry(&self) -> AwgcResult<CommandTableEntry> {
        let phase = match (self.phase0, self.phase1) {
            (Some(p0), Some(p1)) => Some(PhaseSetting {
                phase0: p0.value,
                phase1: p1.value,
                incremental: p0.increment,
            }),
            (None, None) => None,
            _ => return Err(self.malformed("phase0 and phase1 must appear together")),
        };

        let action = match (&self.waveform, phase) {
            (Some(w), phase) if w.play_zero != Some(true) => {
                let slot = w.index.ok_or_else(|| self.malformed("waveform without index"))?;
                let samples = w.length.ok_or_else(|| self.malformed("waveform without length"))?;
                EntryAction::PlayWaveform {
                    slot,
                    samples,
                    phase,
                }
            }
            (Some(w), None) => EntryAction::Wait {
                samples: w.length.ok_or_else(|| self.malformed("playZero without length"))?,
            },
            (Some(_), Some(_)) => return Err(self.malformed("playZero entry with phases")),
            (None, Some(phase)) => EntryAction::PhaseOnly { phase },
            (None, None) => return Err(self.malformed("entry does nothing")),
        };

        Ok(CommandTableEntry {
            index: self.index,
            action,
        })
    }

    fn malformed(&self, reason: &str) -> AwgcError {
        AwgcError::InvalidConfig(format!("command-table entry {}: {}", self.index, reason))
    }
}

/// Uploadable command table
/// Gantree: CommandTableDocument // header + table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandTableDocument {
    /// Header
    pub header: TableHeader,
    /// Entries in index order
    pub table: Vec<EntryDocument>,
}

impl CommandTableDocument {
    /// Document of a table
    /// Gantree: from_table(table, version) -> CommandTableDocument
    pub fn from_table(table: &CommandTable, version: impl Into<String>) -> Self {
        Self {
            header: TableHeader {
                version: version.into(),
            },
            table: table.entries.iter().map(EntryDocument::from).collect(),
        }
    }

    /// Rebuild the table of a core
    pub fn to_table(&self, core: CoreId) -> AwgcResult<CommandTable> {
        let entries = self
            .table
            .iter()
            .map(EntryDocument::to_entry)
            .collect::<AwgcResult<Vec<_>>>()?;
        CommandTable::new(core, entries)
    }

    /// Compact JSON
    pub fn to_json(&self) -> AwgcResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Indented JSON
    pub fn to_json_pretty(&self) -> AwgcResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a document
    pub fn from_json(json: &str) -> AwgcResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
