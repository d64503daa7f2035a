//! Command-table entries
//!
//! Gantree: L5_Table → CommandTableEntry
//!
//! One entry is one hardware micro-operation addressed by
//! `executeTableEntry(index)`: play a waveform (optionally writing the
//! oscillator phases), write the phases only, or idle.

use awgc_core::hardware::COMMAND_TABLE_CAPACITY;
use awgc_core::{AwgcError, AwgcResult, CoreId, Degrees, Samples};
use awgc_timing::PhaseUpdate;
use awgc_waveform::SlotId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a command-table entry
pub type EntryIndex = u16;

/// Oscillator phases written by an entry
/// Gantree: PhaseSetting // phase0, phase1, incremental
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseSetting {
    /// First oscillator
    pub phase0: Degrees,
    /// Second oscillator
    pub phase1: Degrees,
    /// Add to the current phase instead of setting it
    pub incremental: bool,
}

impl From<PhaseUpdate> for PhaseSetting {
    fn from(update: PhaseUpdate) -> Self {
        Self {
            phase0: update.phase0(),
            phase1: update.phase1(),
            incremental: update.is_incremental(),
        }
    }
}

/// What an entry does
/// Gantree: EntryAction // PlayWaveform | PhaseOnly | Wait
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EntryAction {
    /// Play a waveform slot
    PlayWaveform {
        /// Waveform memory slot
        slot: SlotId,
        /// Waveform length
        samples: Samples,
        /// Phases written with the play; DC plays write none
        phase: Option<PhaseSetting>,
    },
    /// Write phases without playing
    PhaseOnly {
        /// Phases
        phase: PhaseSetting,
    },
    /// Idle
    Wait {
        /// Idle length
        samples: Samples,
    },
}

/// One entry of a command table
/// Gantree: CommandTableEntry // index + action
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommandTableEntry {
    /// Index, below the table capacity
    pub index: EntryIndex,
    /// Action
    pub action: EntryAction,
}

impl CommandTableEntry {
    /// Play entry
    pub fn play(index: EntryIndex, slot: SlotId, samples: Samples, phase: Option<PhaseUpdate>) -> Self {
        Self {
            index,
            action: EntryAction::PlayWaveform {
                slot,
                samples,
                phase: phase.map(PhaseSetting::from),
            },
        }
    }

    /// Phase-only entry writing the same increment to both oscillators
    pub fn phase_increment(index: EntryIndex, angle: Degrees) -> Self {
        Self {
            index,
            action: EntryAction::PhaseOnly {
                phase: PhaseUpdate::Increment(angle).into(),
            },
        }
    }

    /// Wait entry
    pub fn wait(index: EntryIndex, samples: Samples) -> Self {
        Self {
            index,
            action: EntryAction::Wait { samples },
        }
    }

    /// Samples the entry takes to execute
    pub fn duration_samples(&self) -> Samples {
        match self.action {
            EntryAction::PlayWaveform { samples, .. } | EntryAction::Wait { samples } => samples,
            EntryAction::PhaseOnly { .. } => 0,
        }
    }
}

impl fmt::Display for CommandTableEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>4}: ", self.index)?;
        match self.action {
            EntryAction::PlayWaveform { slot, samples, phase } => {
                write!(f, "play w{} ({} Sa)", slot, samples)?;
                if let Some(p) = phase {
                    write!(
                        f,
                        " {}{}/{}",
                        if p.incremental { "+" } else { "=" },
                        p.phase0,
                        p.phase1
                    )?;
                }
                Ok(())
            }
            EntryAction::PhaseOnly { phase } => {
                write!(f, "phase +{}/{}", phase.phase0, phase.phase1)
            }
            EntryAction::Wait { samples } => write!(f, "wait {} Sa", samples),
        }
    }
}

// ============================================================================
// CommandTable
// ============================================================================

/// Command table of one core, entries in index order
/// Gantree: CommandTable // 코어별 테이블
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandTable {
    /// Owning core
    pub core: CoreId,
    /// Entries, `entries[i].index == i`
    pub entries: Vec<CommandTableEntry>,
}

impl CommandTable {
    /// Build a table, checking index order and capacity
    pub fn new(core: CoreId, entries: Vec<CommandTableEntry>) -> AwgcResult<Self> {
        if entries.len() > COMMAND_TABLE_CAPACITY {
            return Err(AwgcError::CapacityExceeded {
                core,
                required: entries.len(),
                capacity: COMMAND_TABLE_CAPACITY,
            });
        }
        if let Some((i, entry)) = entries
            .iter()
            .enumerate()
            .find(|(i, e)| e.index as usize != *i)
        {
            return Err(AwgcError::InvalidConfig(format!(
                "command table of {} has entry {} at position {}",
                core, entry.index, i
            )));
        }
        Ok(Self { core, entries })
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the table has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at an index
    pub fn get(&self, index: EntryIndex) -> Option<&CommandTableEntry> {
        self.entries.get(index as usize)
    }

    /// Summed duration of a sequence of indices
    pub fn duration_of(&self, indices: &[EntryIndex]) -> u64 {
        indices
            .iter()
            .filter_map(|&i| self.get(i))
            .map(|e| e.duration_samples() as u64)
            .sum()
    }

    /// Fraction of the hardware capacity in use
    pub fn utilization(&self) -> f64 {
        self.entries.len() as f64 / COMMAND_TABLE_CAPACITY as f64
    }
}

impl fmt::Display for CommandTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "CommandTable {} ({}/{} entries)",
            self.core,
            self.len(),
            COMMAND_TABLE_CAPACITY
        )?;
        for entry in &self.entries {
            writeln!(f, "  {}", entry)?;
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn core() -> CoreId {
        CoreId::new("dev8001", 0)
    }

    #[test]
    fn test_absolute_play_writes_quadrature() {
        let e = CommandTableEntry::play(1, 1, 80, Some(PhaseUpdate::Absolute(-90.0)));
        match e.action {
            EntryAction::PlayWaveform {
                phase: Some(p), ..
            } => {
                assert_relative_eq!(p.phase0, -90.0);
                assert_relative_eq!(p.phase1, 0.0);
                assert!(!p.incremental);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(e.duration_samples(), 80);
    }

    #[test]
    fn test_durations() {
        let table = CommandTable::new(
            core(),
            vec![
                CommandTableEntry::play(0, 0, 160, None),
                CommandTableEntry::wait(1, 48),
                CommandTableEntry::phase_increment(2, 12.5),
            ],
        )
        .unwrap();
        assert_eq!(table.duration_of(&[0, 1, 2, 1]), 256);
        assert_eq!(table.get(2).unwrap().duration_samples(), 0);
    }

    #[test]
    fn test_index_order_enforced() {
        let err = CommandTable::new(
            core(),
            vec![CommandTableEntry::wait(0, 48), CommandTableEntry::wait(0, 64)],
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_capacity_enforced() {
        let entries: Vec<_> = (0..=COMMAND_TABLE_CAPACITY as u16)
            .map(|i| CommandTableEntry::wait(i, 48))
            .collect();
        assert!(matches!(
            CommandTable::new(core(), entries),
            Err(AwgcError::CapacityExceeded { required: 1025, .. })
        ));
    }
}
