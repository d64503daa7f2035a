//! Sequencer Code Generator
//!
//! Gantree: L6_Sequencer → SequencerGenerator
//!
//! One program per core: a placeholder declaration for every catalog
//! slot, then an outer repeat holding one inner (averaging) repeat per
//! line. Every inner iteration waits for the shared trigger, resets the
//! oscillator phase and executes the line's command-table indices. The
//! trigger-source core additionally waits for the external trigger and
//! pulses its trigger output first.

use crate::ast::{Instruction, SequencerProgram, WaveDeclaration};
use awgc_core::sequencer::{
    DEFAULT_INNER_REPETITIONS, DEFAULT_OUTER_REPETITIONS, TRIGGER_INPUT, TRIGGER_OUTPUT,
};
use awgc_core::{AwgcError, AwgcResult, CoreDescriptor, CoreId, CoreRegistry};
use awgc_table::{AssembledCore, LinePlan};
use awgc_waveform::WaveformCatalog;
use std::collections::BTreeMap;

/// Builds sequencer programs
/// Gantree: SequencerGenerator // inner, outer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencerGenerator {
    inner: u32,
    outer: u32,
}

impl Default for SequencerGenerator {
    fn default() -> Self {
        Self {
            inner: DEFAULT_INNER_REPETITIONS,
            outer: DEFAULT_OUTER_REPETITIONS,
        }
    }
}

impl SequencerGenerator {
    /// Generator with explicit repetition counts
    pub fn new(inner: u32, outer: u32) -> AwgcResult<Self> {
        if inner == 0 || outer == 0 {
            return Err(AwgcError::InvalidConfig(format!(
                "repetition counts must be positive (inner {}, outer {})",
                inner, outer
            )));
        }
        Ok(Self { inner, outer })
    }

    /// Averaging repetitions per line
    pub fn inner(&self) -> u32 {
        self.inner
    }

    /// Repetitions of the whole program
    pub fn outer(&self) -> u32 {
        self.outer
    }

    /// Programs of every core
    /// Gantree: generate_all(registry, catalogs, assembled) -> Result<Map<CoreId, SequencerProgram>>
    pub fn generate_all(
        &self,
        registry: &CoreRegistry,
        catalogs: &BTreeMap<CoreId, WaveformCatalog>,
        assembled: &BTreeMap<CoreId, AssembledCore>,
    ) -> AwgcResult<BTreeMap<CoreId, SequencerProgram>> {
        registry
            .cores()
            .iter()
            .map(|core| {
                let missing = |what: &str| {
                    AwgcError::InvalidConfig(format!("no {} for {}", what, core.id))
                };
                let catalog = catalogs.get(&core.id).ok_or_else(|| missing("waveform catalog"))?;
                let table = assembled.get(&core.id).ok_or_else(|| missing("command table"))?;
                Ok((core.id.clone(), self.generate(core, catalog, table)))
            })
            .collect()
    }

    /// Program of one core
    /// Gantree: generate(core, catalog, assembled) -> SequencerProgram
    pub fn generate(
        &self,
        core: &CoreDescriptor,
        catalog: &WaveformCatalog,
        assembled: &AssembledCore,
    ) -> SequencerProgram {
        let declarations = catalog
            .descriptors()
            .iter()
            .map(|d| WaveDeclaration {
                slot: d.slot_id,
                samples: d.sample_count,
                name: d.semantic_key.clone(),
            })
            .collect();

        let lines = assembled
            .lines
            .iter()
            .flat_map(|plan| self.line_block(core.trigger_wired, plan))
            .collect();

        let program = SequencerProgram {
            core: core.id.clone(),
            trigger_source: core.trigger_wired,
            declarations,
            body: vec![Instruction::Repeat {
                count: self.outer,
                body: lines,
            }],
        };
        log::debug!(
            "generated sequencer program for {}: {} declarations, {} instructions",
            core.id,
            program.declarations.len(),
            program.instruction_count()
        );
        program
    }

    fn line_block(&self, trigger_source: bool, plan: &LinePlan) -> [Instruction; 2] {
        let mut body = Vec::with_capacity(plan.indices.len() + 5);
        if trigger_source {
            body.push(Instruction::WaitDigTrigger(TRIGGER_INPUT));
            body.push(Instruction::SetTrigger(TRIGGER_OUTPUT));
            body.push(Instruction::SetTrigger(0));
        }
        body.push(Instruction::WaitDioTrigger);
        body.push(Instruction::ResetOscPhase);
        body.extend(plan.indices.iter().map(|&i| Instruction::ExecuteTableEntry(i)));

        [
            Instruction::Line(plan.line),
            Instruction::Repeat {
                count: self.inner,
                body,
            },
        ]
    }
}

// ============================================================================
// Tests
// ============================================================================
