//! # AWGC Engine
//!
//! Compiles a GST gate-sequence file into one command table and one
//! sequencer program per AWG core.
//!
//! ## Gantree Architecture
//!
//! ```text
//! AWGC // Gate-sequence compiler (완료)
//!     L0_Foundation // 에러, 상수 (완료)
//!     L1_Sequence // GateToken, SequenceLine, CoreRegistry (완료)
//!     L2_Timing // LengthResolver, Frame, PhaseFrameTracker, Scheduler (완료)
//!     L3_Parse // Lexer, GateLineParser, ProgramParser (완료)
//!     L4_Waveform // CatalogBuilder, Render (완료)
//!     L5_Table // TableLayout, AllocationArena, CommandTableAssembler (완료)
//!     L6_Sequencer // SequencerGenerator, SyncChecker (완료)
//!     L7_Integration // CompilerConfig, Compiler (완료)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use awgc_engine::prelude::*;
//!
//! let registry = CoreRegistry::new(vec![
//!     CoreDescriptor::rf("dev8001", 0, 1).with_trigger(),
//!     CoreDescriptor::rf("dev8001", 1, 2),
//! ]).unwrap();
//! let params = GateParameterTable::new()
//!     .with_rf(1, RfParameters::new(66.0, 33.0, 0.5, 0.5, 1e8))
//!     .with_rf(2, RfParameters::new(66.0, 33.0, 0.5, 0.5, 1e8));
//!
//! let compiler = Compiler::new(CompilerConfig::standard(), registry, params).unwrap();
//! let compiled = compiler.compile_str("header\n(1)x;(2)t100;\n(1)t50;(2)y;\n").unwrap();
//!
//! let core1 = compiled.core(&CoreId::new("dev8001", 0)).unwrap();
//! assert_eq!(core1.line(2).unwrap()[0], 0); // initial x in the π/2 frame
//! println!("{}", core1.program_text);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// ============================================================================
// Module Declarations
// ============================================================================

/// Configuration (Gantree: L7_Integration → CompilerConfig)
pub mod config;

/// Pipeline (Gantree: L7_Integration → Compiler)
pub mod compiler;

// ============================================================================
// Re-exports
// ============================================================================

pub use compiler::{CompileSummary, CompiledProgram, Compiler, CoreArtifacts};
pub use config::CompilerConfig;

// Re-export from dependencies
pub use awgc_core::{
    AwgcError, AwgcResult, ChannelRole, CoreDescriptor, CoreId, CoreRegistry, GateParameterTable,
    PlungerParameters, RfParameters,
};
pub use awgc_sequencer::{SequencerProgram, SyncReport};
pub use awgc_table::{CommandTable, CommandTableDocument, LinePlan};

// ============================================================================
// Prelude
// ============================================================================

pub mod prelude {
    //! Convenient imports for common use cases

    pub use crate::compiler::{CompileSummary, CompiledProgram, Compiler, CoreArtifacts};
    pub use crate::config::CompilerConfig;

    pub use awgc_core::{
        AwgcError, AwgcResult, ChannelRole, CoreDescriptor, CoreId, CoreRegistry,
        GateParameterTable, PlungerParameters, RfParameters,
    };
    pub use awgc_sequencer::{SequencerProgram, SyncReport};
    pub use awgc_table::{CommandTable, CommandTableDocument, EntryAction, LinePlan};
}

// ============================================================================
// Version Information
// ============================================================================

/// AWGC engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Integration Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use approx::assert_relative_eq;
    use awgc_core::hardware::{MIN_WAVEFORM_SAMPLES, SAMPLE_ALIGNMENT};
    use std::collections::BTreeSet;

    fn rf_params(n: u32) -> GateParameterTable {
        (1..=n).fold(GateParameterTable::new(), |p, i| {
            p.with_rf(i, RfParameters::new(66.0, 33.0, 0.5, 0.5, 1e8))
        })
    }

    fn rf_compiler(n: usize) -> Compiler {
        let cores = (0..n)
            .map(|i| {
                let core = CoreDescriptor::rf("dev8001", i, i as u32 + 1);
                if i == 0 {
                    core.with_trigger()
                } else {
                    core
                }
            })
            .collect();
        Compiler::new(
            CompilerConfig::standard(),
            CoreRegistry::new(cores).unwrap(),
            rf_params(n as u32),
        )
        .unwrap()
    }

    fn mixed_compiler(config: CompilerConfig) -> Compiler {
        let registry = CoreRegistry::new(vec![
            CoreDescriptor::rf("dev8001", 0, 1).with_trigger(),
            CoreDescriptor::rf("dev8001", 1, 2),
            CoreDescriptor::dc("dev8002", 0, 3, 4),
            CoreDescriptor::dc("dev8002", 1, 5, 6),
        ])
        .unwrap();
        let params = GateParameterTable::new()
            .with_rf(1, RfParameters::new(66.0, 33.0, 0.5, 0.5, 1.0e8))
            .with_rf(2, RfParameters::new(58.0, 29.0, 0.4, 0.45, 1.1e8))
            .with_plunger(3, PlungerParameters::new(40.0, 0.2))
            .with_plunger(4, PlungerParameters::new(90.0, 0.15))
            .with_plunger(5, PlungerParameters::new(35.0, -0.1))
            .with_plunger(6, PlungerParameters::new(75.0, 0.3));
        Compiler::new(config, registry, params).unwrap()
    }

    const MIXED: &str = "\
GST sequences
(1)x(2)xx;(3)p(6)p;(2)z17.5;(1)t120;
(4)p(2)y;(3)p(4)p;(1)*drag[45,0.3,90];(5)*ramp[30,0.2];
(1)yyy;(2)myym(5)p;(1)z0z;(2)mxxm;

(2)t33;(1)xxx(6)p;(1)z17.5;(2)yy;
(1)x(3)p;(2)y(5)p;(1)t0;(1)z90;(1)y;
";

    fn core(awg: &str, i: usize) -> CoreId {
        CoreId::new(awg, i)
    }

    /// Every play and wait sits on the sample grid and meets the floor
    fn assert_on_grid(compiled: &CompiledProgram) {
        for artifacts in compiled.cores.values() {
            for entry in &artifacts.table.entries {
                let samples = match entry.action {
                    EntryAction::PlayWaveform { samples, .. } | EntryAction::Wait { samples } => {
                        samples
                    }
                    EntryAction::PhaseOnly { .. } => continue,
                };
                assert!(
                    samples % SAMPLE_ALIGNMENT == 0 && samples >= MIN_WAVEFORM_SAMPLES,
                    "{} entry {}: {} Sa",
                    artifacts.id(),
                    entry.index,
                    samples
                );
            }
        }
    }

    #[test]
    fn test_padding_invariant() {
        let compiled = mixed_compiler(CompilerConfig::standard())
            .compile_str(MIXED)
            .unwrap();
        assert_eq!(compiled.lines.len(), 5);
        for line in &compiled.lines {
            for artifacts in compiled.cores.values() {
                let indices = artifacts.line(line.number).unwrap();
                assert_eq!(
                    artifacts.table.duration_of(indices),
                    line.total_samples(),
                    "line {} on {}",
                    line.number,
                    artifacts.id()
                );
            }
        }
        assert_eq!(compiled.sync.line_samples.len(), 5);
        assert_on_grid(&compiled);
    }

    #[test]
    fn test_short_pads_fold_into_plays() {
        let compiled = mixed_compiler(CompilerConfig::standard())
            .compile_str("(1)x(3)p;\n(1)t0;\n")
            .unwrap();
        assert_on_grid(&compiled);

        let rf = compiled.core(&core("dev8001", 0)).unwrap();
        let plan = rf.line(1).unwrap();
        assert_eq!(plan.len(), 1);
        match rf.table.get(plan[0]).unwrap().action {
            EntryAction::PlayWaveform { slot, samples, .. } => {
                assert_eq!(samples, 96);
                assert_eq!(rf.catalog.descriptors()[slot as usize].semantic_key, "pi_2_pi2fr_96sa");
            }
            other => panic!("unexpected {:?}", other),
        }
        // t0 lasts nothing on every core
        for artifacts in compiled.cores.values() {
            assert!(artifacts.line(2).unwrap().is_empty());
        }
        assert_eq!(compiled.sync.line_samples, vec![(1, 96), (2, 0)]);
    }

    #[test]
    fn test_canonical_z_rides_on_next_rotation() {
        let compiled = rf_compiler(1).compile_str("(1)z90;\n(1)x;(1)z180;(1)x;\n").unwrap();
        let a = compiled.core(&core("dev8001", 0)).unwrap();
        assert!(a.z_allocations.is_empty());
        assert_eq!(compiled.summary.arbitrary_z, 0);
        assert_eq!(a.table.len(), 36);

        let plan = a.line(2).unwrap();
        match a.table.get(plan[2]).unwrap().action {
            EntryAction::PlayWaveform {
                phase: Some(p), ..
            } => {
                assert!(p.incremental);
                assert_relative_eq!(p.phase0, 180.0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_index_uniqueness_and_bound() {
        let compiled = mixed_compiler(CompilerConfig::padded(2.0))
            .compile_str(MIXED)
            .unwrap();
        for artifacts in compiled.cores.values() {
            let indices: BTreeSet<_> = artifacts.table.entries.iter().map(|e| e.index).collect();
            assert_eq!(indices.len(), artifacts.table.len());
            assert!(artifacts.table.len() <= 1024);
            assert!(artifacts
                .lines
                .iter()
                .flat_map(|p| &p.indices)
                .all(|&i| (i as usize) < artifacts.table.len()));
        }
    }

    #[test]
    fn test_capacity_bound() {
        let text: String = (1..=1025)
            .map(|k| format!("(1)z{:.3}z;\n", 0.25 * k as f64))
            .collect();
        match rf_compiler(1).compile_str(&text) {
            Err(AwgcError::CapacityExceeded {
                core: c,
                required,
                capacity,
            }) => {
                assert_eq!(c, core("dev8001", 0));
                assert_eq!(capacity, 1024);
                assert!(required > 1024);
            }
            other => panic!("expected CapacityExceeded, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_phase_round_trip() {
        let compiled = rf_compiler(1).compile_str("(1)x;(1)x;(1)x;(1)x;\n").unwrap();
        let a = compiled.core(&core("dev8001", 0)).unwrap();
        let indices = a.line(1).unwrap();
        assert_eq!(indices, &[0, 12, 12, 12]);

        let phases: Vec<(f64, bool)> = indices
            .iter()
            .map(|&i| match a.table.get(i).unwrap().action {
                EntryAction::PlayWaveform {
                    phase: Some(p), ..
                } => (p.phase0, p.incremental),
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_relative_eq!(phases[0].0, 0.0);
        assert!(!phases[0].1);
        for &(value, incremental) in &phases[1..] {
            assert_relative_eq!(value, 0.0);
            assert!(incremental);
        }
    }

    #[test]
    fn test_frame_tie_break() {
        let compiled = rf_compiler(2).compile_str("(1)x(2)xx;\n").unwrap();
        let a = compiled.core(&core("dev8001", 0)).unwrap();
        assert_eq!(a.line(1), Some(&[4][..]));

        let pi_frame_slot = a
            .catalog
            .descriptors()
            .iter()
            .find(|d| d.semantic_key == "pi_2_pifr")
            .map(|d| d.slot_id)
            .unwrap();
        match a.table.get(4).unwrap().action {
            EntryAction::PlayWaveform { slot, samples, .. } => {
                assert_eq!(slot, pi_frame_slot);
                assert_eq!(samples, compiled.lengths.pi);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_z_broadcast() {
        let compiled = rf_compiler(4).compile_str("(3)z45z;\n").unwrap();
        for i in 0..4 {
            let a = compiled.core(&core("dev8001", i)).unwrap();
            if i == 2 {
                assert_eq!(a.line(1), Some(&[36][..]));
                assert_eq!(a.z_allocations, vec![(36, 45.0)]);
            } else {
                assert_eq!(a.line(1), Some(&[35][..]));
                assert!(a.z_allocations.is_empty());
            }
        }
        assert_eq!(compiled.summary.arbitrary_z, 1);
    }

    #[test]
    fn test_idempotence() {
        let compiler = mixed_compiler(CompilerConfig::standard());
        let first = compiler.compile_str(MIXED).unwrap();
        let second = compiler.compile_str(MIXED).unwrap();
        assert_eq!(first.table_documents(), second.table_documents());
        assert_eq!(first.program_texts(), second.program_texts());
        for (id, a) in &first.cores {
            assert_eq!(a.program, second.cores[id].program);
            assert_eq!(a.table, second.cores[id].table);
        }
    }

    #[test]
    fn test_end_to_end_two_lines() {
        let compiled = rf_compiler(2)
            .compile_str("(1)x;(2)t100;\n(1)t50;(2)y;\n")
            .unwrap();
        assert_eq!(compiled.lengths.half_pi, 80);

        let c1 = compiled.core(&core("dev8001", 0)).unwrap();
        let c2 = compiled.core(&core("dev8001", 1)).unwrap();

        // x in the π/2 frame, then the 100 ns wait as the first extra entry
        assert_eq!(c1.line(1), Some(&[0, 36][..]));
        assert_eq!(c2.line(1), Some(&[33, 36][..]));
        // 50 ns wait, then the phase reset makes y absolute again
        assert_eq!(c1.line(2), Some(&[37, 33][..]));
        assert_eq!(c2.line(2), Some(&[37, 1][..]));

        for number in [1, 2] {
            assert_eq!(
                c1.table.duration_of(c1.line(number).unwrap()),
                c2.table.duration_of(c2.line(number).unwrap())
            );
        }
        assert_eq!(compiled.sync.trigger_source, core("dev8001", 0));
    }

    #[test]
    fn test_dc_frames_follow_longest_present() {
        let compiled = mixed_compiler(CompilerConfig::standard())
            .compile_str("(3)p(1)xx;(6)p;\n")
            .unwrap();
        let dc0 = compiled.core(&core("dev8002", 0)).unwrap();
        let dc1 = compiled.core(&core("dev8002", 1)).unwrap();
        // P1 of dev8002/core0 inside the RF π frame
        assert_eq!(dc0.line(1).unwrap()[0], 3);
        // P2 of dev8002/core1 alone in its own frame
        assert_eq!(dc1.line(1).unwrap()[1], 4);
    }

    #[test]
    fn test_json_inputs() {
        let dir = std::env::temp_dir().join(format!("awgc_engine_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let map = dir.join("channels.json");
        let params = dir.join("params.json");
        std::fs::write(
            &map,
            r#"{"dev8001": {"0": {"role": "rf", "channel_core_numbers": [1, 2],
                                 "channel_global_numbers": [1], "trigger_wiring": true}}}"#,
        )
        .unwrap();
        std::fs::write(&params, rf_params(1).to_json().unwrap()).unwrap();

        let compiler =
            Compiler::from_json_files(CompilerConfig::single_shot(), &map, &params).unwrap();
        let compiled = compiler.compile_str("(1)y;\n").unwrap();
        assert_eq!(compiled.cores.len(), 1);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
