//! Compiler pipeline
//!
//! Gantree: L7_Integration → Compiler
//!
//! Runs every stage in order: lengths, parse, schedule, catalogs, command
//! tables, sequencer programs, synchronization checks. A failing stage
//! aborts the compile; no partial artifacts are returned.

use crate::config::CompilerConfig;
use awgc_core::{
    AwgcError, AwgcResult, ChannelRole, CoreDescriptor, CoreId, CoreRegistry, Degrees,
    GateParameterTable,
};
use awgc_parse::{GstProgram, ProgramParser};
use awgc_sequencer::{emit, SequencerGenerator, SequencerProgram, SyncChecker, SyncReport};
use awgc_table::{
    AssembledCore, CommandTable, CommandTableAssembler, CommandTableDocument, EntryIndex, LinePlan,
};
use awgc_timing::{LengthResolver, LengthTable, ScheduledLine, Scheduler};
use awgc_waveform::{render_catalog, CatalogBuilder, RenderedWaveform, SlotId, WaveformCatalog};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Instant;

// ============================================================================
// Artifacts
// ============================================================================

/// Everything compiled for one core
/// Gantree: CoreArtifacts // 코어별 산출물
#[derive(Debug, Clone)]
pub struct CoreArtifacts {
    /// Static core configuration
    pub descriptor: CoreDescriptor,
    /// Waveform memory layout
    pub catalog: WaveformCatalog,
    /// Command table
    pub table: CommandTable,
    /// Uploadable command-table document
    pub table_json: String,
    /// Entry indices per line
    pub lines: Vec<LinePlan>,
    /// `(index, angle)` of arbitrary Z entries
    pub z_allocations: Vec<(EntryIndex, Degrees)>,
    /// `(index, slot)` of dynamic waveform entries
    pub waveform_allocations: Vec<(EntryIndex, SlotId)>,
    /// Sequencer program
    pub program: SequencerProgram,
    /// Sequencer program text
    pub program_text: String,
    /// Modulation frequency of RF cores in Hz
    pub oscillator_freq_hz: Option<f64>,
}

impl CoreArtifacts {
    /// Core id
    pub fn id(&self) -> &CoreId {
        &self.descriptor.id
    }

    /// Samples of every catalog waveform
    pub fn waveforms(&self) -> Vec<RenderedWaveform> {
        render_catalog(&self.catalog)
    }

    /// Indices of one line
    pub fn line(&self, number: usize) -> Option<&[EntryIndex]> {
        self.lines
            .iter()
            .find(|p| p.line == number)
            .map(|p| p.indices.as_slice())
    }
}

/// Compile statistics
/// Gantree: CompileSummary // 요약
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompileSummary {
    /// Gate sequences compiled
    pub lines: usize,
    /// Steps over all lines
    pub steps: usize,
    /// RF cores
    pub rf_cores: usize,
    /// DC cores
    pub dc_cores: usize,
    /// Largest command table
    pub max_table_entries: usize,
    /// Command-table entries over all cores
    pub total_table_entries: usize,
    /// Arbitrary Z entries over all cores
    pub arbitrary_z: usize,
    /// Samples of one pass over every line
    pub samples_per_pass: u64,
    /// Wall-clock compile time
    pub elapsed_ms: f64,
}

impl fmt::Display for CompileSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CompileSummary({} lines, {} steps, {} RF + {} DC cores, tables max {} / total {}, {} arb Z, {} Sa/pass, {:.1} ms)",
            self.lines,
            self.steps,
            self.rf_cores,
            self.dc_cores,
            self.max_table_entries,
            self.total_table_entries,
            self.arbitrary_z,
            self.samples_per_pass,
            self.elapsed_ms
        )
    }
}

/// Result of a successful compile
/// Gantree: CompiledProgram // 전체 산출물
#[derive(Debug, Clone)]
pub struct CompiledProgram {
    /// Configuration used
    pub config: CompilerConfig,
    /// Header line of the source, if any
    pub header: Option<String>,
    /// Resolved lengths
    pub lengths: LengthTable,
    /// Scheduled lines
    pub lines: Vec<ScheduledLine>,
    /// Per-core artifacts
    pub cores: BTreeMap<CoreId, CoreArtifacts>,
    /// Synchronization report
    pub sync: SyncReport,
    /// Statistics
    pub summary: CompileSummary,
}

impl CompiledProgram {
    /// Artifacts of one core
    pub fn core(&self, id: &CoreId) -> Option<&CoreArtifacts> {
        self.cores.get(id)
    }

    /// Command-table documents of every core
    pub fn table_documents(&self) -> BTreeMap<CoreId, &str> {
        self.cores
            .iter()
            .map(|(id, a)| (id.clone(), a.table_json.as_str()))
            .collect()
    }

    /// Sequencer program texts of every core
    pub fn program_texts(&self) -> BTreeMap<CoreId, &str> {
        self.cores
            .iter()
            .map(|(id, a)| (id.clone(), a.program_text.as_str()))
            .collect()
    }
}

// ============================================================================
// Compiler
// ============================================================================

/// Gate-sequence compiler
/// Gantree: Compiler // 파이프라인
#[derive(Debug, Clone)]
pub struct Compiler {
    config: CompilerConfig,
    registry: CoreRegistry,
    params: GateParameterTable,
}

impl Compiler {
    // ========================================================================
    // Constructors
    // ========================================================================

    /// Compiler over validated inputs
    pub fn new(
        config: CompilerConfig,
        registry: CoreRegistry,
        params: GateParameterTable,
    ) -> AwgcResult<Self> {
        config.validate()?;
        params.validate_against(&registry)?;
        Ok(Self {
            config,
            registry,
            params,
        })
    }

    /// Compiler from a channel-map file and a parameter file
    pub fn from_json_files(
        config: CompilerConfig,
        channel_map: impl AsRef<Path>,
        parameters: impl AsRef<Path>,
    ) -> AwgcResult<Self> {
        let registry = CoreRegistry::from_json_file(channel_map)?;
        let params = GateParameterTable::from_json_file(parameters)?;
        Self::new(config, registry, params)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Configuration
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Core registry
    pub fn registry(&self) -> &CoreRegistry {
        &self.registry
    }

    /// Gate parameters
    pub fn params(&self) -> &GateParameterTable {
        &self.params
    }

    /// Standard lengths under this configuration
    pub fn lengths(&self) -> AwgcResult<LengthTable> {
        LengthResolver::new(self.config.sample_rate_gsa, self.config.side_padding_ns)?
            .resolve(&self.registry, &self.params)
    }

    // ========================================================================
    // Compilation
    // ========================================================================

    /// Compile GST text
    /// Gantree: compile_str(text) -> Result<CompiledProgram>
    pub fn compile_str(&self, text: &str) -> AwgcResult<CompiledProgram> {
        let start = Instant::now();
        let lengths = self.lengths()?;
        log::debug!(
            "lengths: pi/2={} pi={} plunger={:?} Sa",
            lengths.half_pi,
            lengths.pi,
            lengths.plunger
        );
        let program = ProgramParser::new(&self.registry, &lengths).parse_str(text)?;
        self.compile_parsed(start, lengths, program)
    }

    /// Compile a GST file
    pub fn compile_file(&self, path: impl AsRef<Path>) -> AwgcResult<CompiledProgram> {
        let start = Instant::now();
        let lengths = self.lengths()?;
        let program = ProgramParser::new(&self.registry, &lengths).parse_file(path)?;
        self.compile_parsed(start, lengths, program)
    }

    fn compile_parsed(
        &self,
        start: Instant,
        lengths: LengthTable,
        program: GstProgram,
    ) -> AwgcResult<CompiledProgram> {
        let scheduled = Scheduler::new(&lengths).schedule(&program.lines)?;
        log::debug!("scheduled {} lines", scheduled.len());

        let catalogs =
            CatalogBuilder::new(&self.registry, &self.params, &lengths).build(&scheduled)?;
        log::debug!(
            "catalogs: {}",
            catalogs
                .iter()
                .map(|(id, c)| format!("{}={}", id, c.len()))
                .collect::<Vec<_>>()
                .join(", ")
        );

        let assembled =
            CommandTableAssembler::new(&lengths).assemble(&self.registry, &catalogs, &scheduled)?;

        let generator =
            SequencerGenerator::new(self.config.inner_repetitions, self.config.outer_repetitions)?;
        let programs = generator.generate_all(&self.registry, &catalogs, &assembled)?;

        let sync = SyncChecker::verify(&programs, &assembled)?;

        let cores = self.collect_artifacts(catalogs, assembled, programs)?;
        let summary = summarize(&program, &cores, start);
        log::info!("{}", summary);

        Ok(CompiledProgram {
            config: self.config.clone(),
            header: program.header,
            lengths,
            lines: scheduled,
            cores,
            sync,
            summary,
        })
    }

    fn collect_artifacts(
        &self,
        mut catalogs: BTreeMap<CoreId, WaveformCatalog>,
        mut assembled: BTreeMap<CoreId, AssembledCore>,
        mut programs: BTreeMap<CoreId, SequencerProgram>,
    ) -> AwgcResult<BTreeMap<CoreId, CoreArtifacts>> {
        self.registry
            .cores()
            .iter()
            .map(|descriptor| {
                let id = &descriptor.id;
                let missing =
                    |what: &str| AwgcError::InvalidConfig(format!("no {} for {}", what, id));
                let catalog = catalogs.remove(id).ok_or_else(|| missing("waveform catalog"))?;
                let core = assembled.remove(id).ok_or_else(|| missing("command table"))?;
                let program = programs.remove(id).ok_or_else(|| missing("sequencer program"))?;

                let table_json =
                    CommandTableDocument::from_table(&core.table, &self.config.command_table_version)
                        .to_json_pretty()?;
                let oscillator_freq_hz = match descriptor.role {
                    ChannelRole::Rf => Some(self.params.rf(descriptor.channels[0])?.mod_freq),
                    ChannelRole::Dc => None,
                };

                Ok((
                    id.clone(),
                    CoreArtifacts {
                        descriptor: descriptor.clone(),
                        catalog,
                        table: core.table,
                        table_json,
                        lines: core.lines,
                        z_allocations: core.z_allocations,
                        waveform_allocations: core.waveform_allocations,
                        program_text: emit(&program),
                        program,
                        oscillator_freq_hz,
                    },
                ))
            })
            .collect()
    }
}

fn summarize(
    program: &GstProgram,
    cores: &BTreeMap<CoreId, CoreArtifacts>,
    start: Instant,
) -> CompileSummary {
    let count_role = |role: ChannelRole| cores.values().filter(|a| a.descriptor.role == role).count();
    CompileSummary {
        lines: program.num_lines(),
        steps: program.num_steps(),
        rf_cores: count_role(ChannelRole::Rf),
        dc_cores: count_role(ChannelRole::Dc),
        max_table_entries: cores.values().map(|a| a.table.len()).max().unwrap_or(0),
        total_table_entries: cores.values().map(|a| a.table.len()).sum(),
        arbitrary_z: cores.values().map(|a| a.z_allocations.len()).sum(),
        samples_per_pass: program.total_samples(),
        elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
    }
}

// ============================================================================
// Tests
// ============================================================================
