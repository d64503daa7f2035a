//! Parsed gate-sequence lines
//!
//! Gantree: L1_Sequence → SequenceLine
//!
//! A line is one gate sequence of the GST file. It is divided into
//! steps; in every step every configured core holds exactly one
//! [`CoreSlot`], so all per-core tracks have the same length.

use crate::gate::{GateOp, GateToken};
use crate::types::{CoreId, Samples};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Tokens of one core in one step: one for RF cores, one per channel for DC cores
/// Gantree: CoreSlot // 코어 슬롯
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreSlot {
    /// Tokens in channel order
    pub tokens: Vec<GateToken>,
}

impl CoreSlot {
    /// Create a slot from its tokens
    pub fn new(tokens: Vec<GateToken>) -> Self {
        Self { tokens }
    }

    /// First token (the only one on RF cores)
    pub fn primary(&self) -> Option<&GateToken> {
        self.tokens.first()
    }

    /// True if no token was written in the source
    pub fn is_synthesized(&self) -> bool {
        self.tokens.iter().all(|t| t.synthesized)
    }

    /// Iterate over the operations
    pub fn ops(&self) -> impl Iterator<Item = &GateOp> {
        self.tokens.iter().map(|t| &t.op)
    }
}

/// One line of the gate-sequence file
/// Gantree: SequenceLine // line_index → core → [token]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceLine {
    /// 1-based line number in the source file
    pub number: usize,

    /// Duration of every step
    pub step_durations: Vec<Samples>,

    /// Per-core tracks, all `step_durations.len()` long
    pub tracks: BTreeMap<CoreId, Vec<CoreSlot>>,
}

impl SequenceLine {
    /// Create an empty line
    pub fn new(number: usize) -> Self {
        Self {
            number,
            step_durations: Vec::new(),
            tracks: BTreeMap::new(),
        }
    }

    /// Append a step: its duration and the slot of every core
    pub fn push_step(&mut self, duration: Samples, slots: BTreeMap<CoreId, CoreSlot>) {
        self.step_durations.push(duration);
        for (core, slot) in slots {
            self.tracks.entry(core).or_default().push(slot);
        }
    }

    /// Number of steps
    pub fn num_steps(&self) -> usize {
        self.step_durations.len()
    }

    /// Track of one core
    pub fn track(&self, core: &CoreId) -> Option<&[CoreSlot]> {
        self.tracks.get(core).map(|t| t.as_slice())
    }

    /// All cores' slots of one step
    pub fn step(&self, index: usize) -> impl Iterator<Item = (&CoreId, &CoreSlot)> {
        self.tracks
            .iter()
            .filter_map(move |(core, track)| track.get(index).map(|slot| (core, slot)))
    }

    /// Total duration of the line in samples
    pub fn total_samples(&self) -> u64 {
        self.step_durations.iter().map(|&d| d as u64).sum()
    }

    /// True if every track has one slot per step
    pub fn is_padded(&self) -> bool {
        self.tracks
            .values()
            .all(|track| track.len() == self.step_durations.len())
    }
}

impl fmt::Display for SequenceLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Line {} ({} steps, {} samples)",
            self.number,
            self.num_steps(),
            self.total_samples()
        )?;
        for (core, track) in &self.tracks {
            let ops: Vec<String> = track
                .iter()
                .map(|slot| {
                    slot.ops()
                        .map(|op| op.to_string())
                        .collect::<Vec<_>>()
                        .join("|")
                })
                .collect();
            writeln!(f, "  {}: {}", core, ops.join(" ; "))?;
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
