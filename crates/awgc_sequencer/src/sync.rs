//! Cross-Core Synchronization Contract
//!
//! Gantree: L6_Sequencer → SyncStateMachine
//!
//! Cores run independently after upload and meet only at the shared
//! trigger edge, so every core must spend the same number of samples
//! between two edges. [`SyncChecker`] proves that at compile time twice:
//! once on the command-table line plans, once on the generated programs.
//! [`SyncStateMachine`] models the runtime states of one core.

use crate::ast::{Instruction, SequencerProgram};
use awgc_core::{AwgcError, AwgcResult, CoreId};
use awgc_table::{AssembledCore, CommandTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// State Machine
// ============================================================================

/// Runtime state of one core
/// Gantree: SyncState // Idle → Armed → Executing(line) → … → Done
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncState {
    /// Not yet started
    Idle,
    /// Waiting for the next trigger edge
    ArmedWaitingTrigger,
    /// Playing a line
    Executing {
        /// Source line number
        line: usize,
    },
    /// Program finished
    Done,
}

/// Input of the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncEvent {
    /// Program uploaded and started
    Arm,
    /// Shared trigger edge starting a line
    TriggerEdge {
        /// Line the edge starts
        line: usize,
    },
    /// Last entry of the line finished
    LineComplete,
    /// Program body exhausted
    Finish,
}

/// State machine of one core
/// Gantree: SyncStateMachine // 동기화 상태
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStateMachine {
    state: SyncState,
    lines_executed: usize,
}

impl Default for SyncStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncStateMachine {
    /// Machine in [`SyncState::Idle`]
    pub fn new() -> Self {
        Self {
            state: SyncState::Idle,
            lines_executed: 0,
        }
    }

    /// Current state
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Lines completed so far
    pub fn lines_executed(&self) -> usize {
        self.lines_executed
    }

    /// Apply an event, rejecting illegal transitions
    /// Gantree: fire(event) -> Result<SyncState>
    pub fn fire(&mut self, event: SyncEvent) -> AwgcResult<SyncState> {
        let next = match (self.state, event) {
            (SyncState::Idle, SyncEvent::Arm) => SyncState::ArmedWaitingTrigger,
            (SyncState::ArmedWaitingTrigger, SyncEvent::TriggerEdge { line }) => {
                SyncState::Executing { line }
            }
            (SyncState::Executing { .. }, SyncEvent::LineComplete) => {
                self.lines_executed += 1;
                SyncState::ArmedWaitingTrigger
            }
            (SyncState::ArmedWaitingTrigger, SyncEvent::Finish) => SyncState::Done,
            (state, event) => {
                return Err(AwgcError::InvalidConfig(format!(
                    "illegal synchronization transition {:?} on {:?}",
                    event, state
                )))
            }
        };
        self.state = next;
        Ok(next)
    }
}

// ============================================================================
// Program Trace
// ============================================================================

/// Timing-relevant skeleton of a program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncStep {
    /// Loop entered
    Enter(u32),
    /// Loop left
    Exit,
    /// Line block starts
    Line(usize),
    /// Shared trigger wait
    Trigger,
    /// Oscillator reset
    Reset,
    /// Table entries between two sync points, in samples
    Segment(u64),
}

/// Trace of a program; trigger-drive instructions are dropped
pub fn sync_trace(program: &SequencerProgram, table: &CommandTable) -> AwgcResult<Vec<SyncStep>> {
    fn flush(pending: &mut u64, out: &mut Vec<SyncStep>) {
        if *pending > 0 {
            out.push(SyncStep::Segment(*pending));
            *pending = 0;
        }
    }

    fn go(
        body: &[Instruction],
        table: &CommandTable,
        pending: &mut u64,
        out: &mut Vec<SyncStep>,
    ) -> AwgcResult<()> {
        for instruction in body {
            match instruction {
                Instruction::Repeat { count, body } => {
                    flush(pending, out);
                    out.push(SyncStep::Enter(*count));
                    go(body, table, pending, out)?;
                    flush(pending, out);
                    out.push(SyncStep::Exit);
                }
                Instruction::Line(number) => {
                    flush(pending, out);
                    out.push(SyncStep::Line(*number));
                }
                Instruction::WaitDioTrigger => {
                    flush(pending, out);
                    out.push(SyncStep::Trigger);
                }
                Instruction::ResetOscPhase => {
                    flush(pending, out);
                    out.push(SyncStep::Reset);
                }
                Instruction::ExecuteTableEntry(index) => {
                    let entry = table.get(*index).ok_or_else(|| {
                        AwgcError::InvalidConfig(format!(
                            "program of {} executes entry {} beyond its table",
                            table.core, index
                        ))
                    })?;
                    *pending += entry.duration_samples() as u64;
                }
                Instruction::WaitDigTrigger(_) | Instruction::SetTrigger(_) => {}
            }
        }
        Ok(())
    }

    let mut pending = 0;
    let mut out = Vec::new();
    go(&program.body, table, &mut pending, &mut out)?;
    flush(&mut pending, &mut out);
    Ok(out)
}

/// Drive a state machine through one pass of a trace
pub fn replay(trace: &[SyncStep]) -> AwgcResult<SyncStateMachine> {
    let mut machine = SyncStateMachine::new();
    machine.fire(SyncEvent::Arm)?;
    let mut line = 0;
    for step in trace {
        match *step {
            SyncStep::Line(number) => line = number,
            SyncStep::Trigger => {
                machine.fire(SyncEvent::TriggerEdge { line })?;
            }
            SyncStep::Exit if matches!(machine.state(), SyncState::Executing { .. }) => {
                machine.fire(SyncEvent::LineComplete)?;
            }
            SyncStep::Enter(_) | SyncStep::Exit | SyncStep::Reset | SyncStep::Segment(_) => {}
        }
    }
    machine.fire(SyncEvent::Finish)?;
    Ok(machine)
}

// ============================================================================
// SyncChecker
// ============================================================================

/// Result of a successful check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Core driving the trigger
    pub trigger_source: CoreId,
    /// Duration of every line in samples
    pub line_samples: Vec<(usize, u64)>,
    /// Sync points per program pass
    pub sync_points: usize,
}

impl SyncReport {
    /// Total samples of one pass over all lines
    pub fn total_samples(&self) -> u64 {
        self.line_samples.iter().map(|&(_, s)| s).sum()
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SyncReport(source={}, lines={}, samples={}, sync_points={})",
            self.trigger_source,
            self.line_samples.len(),
            self.total_samples(),
            self.sync_points
        )
    }
}

/// Compile-time synchronization checks
/// Gantree: SyncChecker // 길이 + 구조 동형성
pub struct SyncChecker;

impl SyncChecker {
    /// Check tables and programs of all cores against the trigger source
    /// Gantree: verify(programs, assembled) -> Result<SyncReport>
    pub fn verify(
        programs: &BTreeMap<CoreId, SequencerProgram>,
        assembled: &BTreeMap<CoreId, AssembledCore>,
    ) -> AwgcResult<SyncReport> {
        let sources: Vec<&CoreId> = programs
            .values()
            .filter(|p| p.trigger_source)
            .map(|p| &p.core)
            .collect();
        let source = match sources.as_slice() {
            [source] => *source,
            _ => {
                return Err(AwgcError::TriggerSource {
                    count: sources.len(),
                })
            }
        };

        let line_samples = Self::check_line_durations(source, assembled)?;
        let sync_points = Self::check_programs(source, programs, assembled)?;

        let report = SyncReport {
            trigger_source: source.clone(),
            line_samples,
            sync_points,
        };
        log::debug!("{}", report);
        Ok(report)
    }

    /// Every core's line plans add up to the reference durations
    pub fn check_line_durations(
        reference: &CoreId,
        assembled: &BTreeMap<CoreId, AssembledCore>,
    ) -> AwgcResult<Vec<(usize, u64)>> {
        let durations = |core: &AssembledCore| -> Vec<(usize, u64)> {
            core.lines
                .iter()
                .map(|plan| (plan.line, core.table.duration_of(&plan.indices)))
                .collect()
        };
        let expected = assembled
            .get(reference)
            .map(durations)
            .ok_or_else(|| AwgcError::InvalidConfig(format!("no command table for {}", reference)))?;

        for (core, table) in assembled {
            let actual = durations(table);
            if actual.len() != expected.len() {
                return Err(AwgcError::InvalidConfig(format!(
                    "{} has {} lines, {} has {}",
                    core,
                    actual.len(),
                    reference,
                    expected.len()
                )));
            }
            for (&(line, samples_a), &(_, samples_b)) in expected.iter().zip(&actual) {
                if samples_a != samples_b {
                    return Err(AwgcError::DurationMismatch {
                        line,
                        core_a: reference.clone(),
                        samples_a,
                        core_b: core.clone(),
                        samples_b,
                    });
                }
            }
        }
        Ok(expected)
    }

    /// Every program has the reference program's trace
    pub fn check_programs(
        reference: &CoreId,
        programs: &BTreeMap<CoreId, SequencerProgram>,
        assembled: &BTreeMap<CoreId, AssembledCore>,
    ) -> AwgcResult<usize> {
        let trace_of = |core: &CoreId| -> AwgcResult<Vec<SyncStep>> {
            let program = programs
                .get(core)
                .ok_or_else(|| AwgcError::InvalidConfig(format!("no program for {}", core)))?;
            let table = assembled
                .get(core)
                .ok_or_else(|| AwgcError::InvalidConfig(format!("no command table for {}", core)))?;
            sync_trace(program, &table.table)
        };

        let expected = trace_of(reference)?;
        let machine = replay(&expected)?;
        log::trace!(
            "reference trace of {}: {} steps, {} lines",
            reference,
            expected.len(),
            machine.lines_executed()
        );

        for core in programs.keys() {
            let actual = trace_of(core)?;
            let mut line = 0;
            for (i, (a, b)) in expected.iter().zip(&actual).enumerate() {
                if let SyncStep::Line(number) = a {
                    line = *number;
                }
                match (a, b) {
                    (a, b) if a == b => {}
                    (SyncStep::Segment(samples_a), SyncStep::Segment(samples_b)) => {
                        return Err(AwgcError::DurationMismatch {
                            line,
                            core_a: reference.clone(),
                            samples_a: *samples_a,
                            core_b: core.clone(),
                            samples_b: *samples_b,
                        })
                    }
                    _ => {
                        return Err(AwgcError::InvalidConfig(format!(
                            "program of {} diverges from {} at step {}: {:?} vs {:?}",
                            core, reference, i, b, a
                        )))
                    }
                }
            }
            if actual.len() != expected.len() {
                return Err(AwgcError::InvalidConfig(format!(
                    "program of {} has {} sync steps, {} has {}",
                    core,
                    actual.len(),
                    reference,
                    expected.len()
                )));
            }
        }

        Ok(expected.iter().filter(|s| **s == SyncStep::Trigger).count())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use awgc_table::{CommandTableEntry, LinePlan};

    #[test]
    fn test_legal_run() {
        let mut m = SyncStateMachine::new();
        assert_eq!(m.fire(SyncEvent::Arm).unwrap(), SyncState::ArmedWaitingTrigger);
        assert_eq!(
            m.fire(SyncEvent::TriggerEdge { line: 1 }).unwrap(),
            SyncState::Executing { line: 1 }
        );
        m.fire(SyncEvent::LineComplete).unwrap();
        m.fire(SyncEvent::TriggerEdge { line: 2 }).unwrap();
        m.fire(SyncEvent::LineComplete).unwrap();
        assert_eq!(m.fire(SyncEvent::Finish).unwrap(), SyncState::Done);
        assert_eq!(m.lines_executed(), 2);
    }

    #[test]
    fn test_illegal_transitions() {
        let mut m = SyncStateMachine::new();
        assert!(m.fire(SyncEvent::TriggerEdge { line: 1 }).is_err());
        assert_eq!(m.state(), SyncState::Idle);

        m.fire(SyncEvent::Arm).unwrap();
        assert!(m.fire(SyncEvent::LineComplete).is_err());
        m.fire(SyncEvent::TriggerEdge { line: 1 }).unwrap();
        assert!(m.fire(SyncEvent::Finish).is_err());
        assert!(m.fire(SyncEvent::TriggerEdge { line: 2 }).is_err());
    }

    fn core(i: usize) -> CoreId {
        CoreId::new("dev8001", i)
    }

    fn assembled(i: usize, wait: u32) -> AssembledCore {
        let table = CommandTable::new(
            core(i),
            vec![
                CommandTableEntry::play(0, 0, 80, None),
                CommandTableEntry::wait(1, wait),
            ],
        )
        .unwrap();
        AssembledCore {
            core: core(i),
            table,
            lines: vec![LinePlan {
                line: 1,
                indices: vec![0, 1],
            }],
            z_allocations: Vec::new(),
            waveform_allocations: Vec::new(),
        }
    }

    fn program(i: usize, source: bool) -> SequencerProgram {
        let mut body = Vec::new();
        if source {
            body.push(Instruction::WaitDigTrigger(1));
        }
        body.extend([
            Instruction::WaitDioTrigger,
            Instruction::ResetOscPhase,
            Instruction::ExecuteTableEntry(0),
            Instruction::ExecuteTableEntry(1),
        ]);
        SequencerProgram {
            core: core(i),
            trigger_source: source,
            declarations: Vec::new(),
            body: vec![Instruction::Repeat {
                count: 1,
                body: vec![
                    Instruction::Line(1),
                    Instruction::Repeat { count: 4, body },
                ],
            }],
        }
    }

    #[test]
    fn test_trace_merges_entries() {
        let a = assembled(0, 48);
        let trace = sync_trace(&program(0, true), &a.table).unwrap();
        assert_eq!(
            trace,
            vec![
                SyncStep::Enter(1),
                SyncStep::Line(1),
                SyncStep::Enter(4),
                SyncStep::Trigger,
                SyncStep::Reset,
                SyncStep::Segment(128),
                SyncStep::Exit,
                SyncStep::Exit,
            ]
        );
        assert_eq!(replay(&trace).unwrap().lines_executed(), 1);
    }

    #[test]
    fn test_verify_accepts_matching_cores() {
        let programs = BTreeMap::from([(core(0), program(0, true)), (core(1), program(1, false))]);
        let tables = BTreeMap::from([(core(0), assembled(0, 48)), (core(1), assembled(1, 48))]);
        let report = SyncChecker::verify(&programs, &tables).unwrap();
        assert_eq!(report.trigger_source, core(0));
        assert_eq!(report.line_samples, vec![(1, 128)]);
        assert_eq!(report.sync_points, 1);
    }

    #[test]
    fn test_verify_reports_duration_mismatch() {
        let programs = BTreeMap::from([(core(0), program(0, true)), (core(1), program(1, false))]);
        let tables = BTreeMap::from([(core(0), assembled(0, 48)), (core(1), assembled(1, 64))]);
        assert_eq!(
            SyncChecker::verify(&programs, &tables),
            Err(AwgcError::DurationMismatch {
                line: 1,
                core_a: core(0),
                samples_a: 128,
                core_b: core(1),
                samples_b: 144,
            })
        );
    }

    #[test]
    fn test_verify_requires_one_source() {
        let programs = BTreeMap::from([(core(0), program(0, true)), (core(1), program(1, true))]);
        let tables = BTreeMap::from([(core(0), assembled(0, 48)), (core(1), assembled(1, 48))]);
        assert_eq!(
            SyncChecker::verify(&programs, &tables),
            Err(AwgcError::TriggerSource { count: 2 })
        );
    }

    #[test]
    fn test_structural_divergence() {
        let mut other = program(1, false);
        other.body.push(Instruction::WaitDioTrigger);
        let programs = BTreeMap::from([(core(0), program(0, true)), (core(1), other)]);
        let tables = BTreeMap::from([(core(0), assembled(0, 48)), (core(1), assembled(1, 48))]);
        assert!(matches!(
            SyncChecker::check_programs(&core(0), &programs, &tables),
            Err(AwgcError::InvalidConfig(_))
        ));
    }
}
