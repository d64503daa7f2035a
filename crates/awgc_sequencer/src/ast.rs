//! Sequencer program AST
//!
//! Gantree: L6_Sequencer → Instruction
//!
//! A program is a list of waveform declarations and a body of at most two
//! nested counted loops. There is no branching, so every consumer can
//! walk it structurally.

use awgc_core::{CoreId, Samples};
use awgc_table::EntryIndex;
use awgc_waveform::SlotId;
use serde::{Deserialize, Serialize};

/// Binds a waveform slot to a placeholder of its length
/// Gantree: WaveDeclaration // assignWaveIndex
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveDeclaration {
    /// Waveform memory slot
    pub slot: SlotId,
    /// Placeholder length
    pub samples: Samples,
    /// Semantic key, emitted as a comment
    pub name: String,
}

/// One sequencer instruction
/// Gantree: Instruction // Repeat | Trigger | Execute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// Counted loop
    Repeat {
        /// Iterations
        count: u32,
        /// Loop body
        body: Vec<Instruction>,
    },
    /// Start of a source line's block
    Line(usize),
    /// Wait for the digital trigger input
    WaitDigTrigger(u8),
    /// Drive the trigger output
    SetTrigger(u8),
    /// Wait for the shared DIO trigger
    WaitDioTrigger,
    /// Reset the oscillator phase
    ResetOscPhase,
    /// Execute one command-table entry
    ExecuteTableEntry(EntryIndex),
}

impl Instruction {
    /// True for instructions every core executes at the same instant
    pub fn is_sync_point(&self) -> bool {
        matches!(self, Instruction::WaitDioTrigger | Instruction::ResetOscPhase)
    }

    /// True for instructions only the trigger-source core emits
    pub fn is_trigger_drive(&self) -> bool {
        matches!(
            self,
            Instruction::WaitDigTrigger(_) | Instruction::SetTrigger(_)
        )
    }
}

/// Sequencer program of one core
/// Gantree: SequencerProgram // declarations + body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencerProgram {
    /// Owning core
    pub core: CoreId,
    /// True if this core drives the shared trigger
    pub trigger_source: bool,
    /// Waveform declarations in slot order
    pub declarations: Vec<WaveDeclaration>,
    /// Program body
    pub body: Vec<Instruction>,
}

impl SequencerProgram {
    /// Visit every instruction depth-first with its nesting depth
    pub fn walk<F: FnMut(&Instruction, usize)>(&self, mut visit: F) {
        fn go<F: FnMut(&Instruction, usize)>(body: &[Instruction], depth: usize, visit: &mut F) {
            for instruction in body {
                visit(instruction, depth);
                if let Instruction::Repeat { body, .. } = instruction {
                    go(body, depth + 1, visit);
                }
            }
        }
        go(&self.body, 0, &mut visit);
    }

    /// Total number of instructions, loops included
    pub fn instruction_count(&self) -> usize {
        let mut count = 0;
        self.walk(|_, _| count += 1);
        count
    }

    /// Entry indices executed per line, in program order
    pub fn line_entries(&self) -> Vec<(usize, Vec<EntryIndex>)> {
        let mut lines: Vec<(usize, Vec<EntryIndex>)> = Vec::new();
        self.walk(|instruction, _| match instruction {
            Instruction::Line(number) => lines.push((*number, Vec::new())),
            Instruction::ExecuteTableEntry(index) => {
                if let Some((_, entries)) = lines.last_mut() {
                    entries.push(*index);
                }
            }
            _ => {}
        });
        lines
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn program() -> SequencerProgram {
        SequencerProgram {
            core: CoreId::new("dev8001", 0),
            trigger_source: false,
            declarations: Vec::new(),
            body: vec![Instruction::Repeat {
                count: 1,
                body: vec![
                    Instruction::Line(2),
                    Instruction::Repeat {
                        count: 10,
                        body: vec![
                            Instruction::WaitDioTrigger,
                            Instruction::ResetOscPhase,
                            Instruction::ExecuteTableEntry(0),
                            Instruction::ExecuteTableEntry(33),
                        ],
                    },
                ],
            }],
        }
    }

    #[test]
    fn test_walk_depths() {
        let mut depths = Vec::new();
        program().walk(|_, depth| depths.push(depth));
        assert_eq!(depths, vec![0, 1, 1, 2, 2, 2, 2]);
        assert_eq!(program().instruction_count(), 7);
    }

    #[test]
    fn test_line_entries() {
        assert_eq!(program().line_entries(), vec![(2, vec![0, 33])]);
    }

    #[test]
    fn test_classification() {
        assert!(Instruction::WaitDioTrigger.is_sync_point());
        assert!(Instruction::SetTrigger(1).is_trigger_drive());
        assert!(!Instruction::ExecuteTableEntry(4).is_sync_point());
    }
}
