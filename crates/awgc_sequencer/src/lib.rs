//! # AWGC Sequencer
//!
//! Sequencer programs that replay each core's command-table indices in
//! lock-step, and the compile-time checks that keep the cores aligned.
//!
//! ## Gantree Architecture
//!
//! ```text
//! awgc_sequencer // L6: Sequencer (완료)
//!     Instruction // Repeat, 트리거, executeTableEntry (완료)
//!     SequencerGenerator // 코어별 프로그램 (완료)
//!     Emit // 텍스트 직렬화 (완료)
//!     SyncStateMachine // Idle → Armed → Executing → Done (완료)
//!     SyncChecker // 라인 길이 + 구조 동형성 (완료)
//! ```
//!
//! ## Program Shape
//!
//! ```text
//! assignWaveIndex(placeholder(N), placeholder(N), slot);   // per catalog slot
//! repeat(outer) {
//!     // line k
//!     repeat(inner) {
//!         waitDigTrigger(1); setTrigger(1); setTrigger(0);  // trigger source only
//!         waitDIOTrigger();
//!         resetOscPhase();
//!         executeTableEntry(i); ...
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// ============================================================================
// Module Declarations
// ============================================================================

/// Program AST (Gantree: L6_Sequencer → Instruction)
pub mod ast;

/// Code generator (Gantree: L6_Sequencer → SequencerGenerator)
pub mod generator;

/// Text emission (Gantree: L6_Sequencer → Emit)
pub mod emit;

/// Synchronization contract (Gantree: L6_Sequencer → SyncStateMachine)
pub mod sync;

// ============================================================================
// Re-exports
// ============================================================================

pub use ast::{Instruction, SequencerProgram, WaveDeclaration};
pub use emit::emit;
pub use generator::SequencerGenerator;
pub use sync::{
    replay, sync_trace, SyncChecker, SyncEvent, SyncReport, SyncState, SyncStateMachine, SyncStep,
};

// ============================================================================
// Prelude
// ============================================================================

pub mod prelude {
    //! Convenient imports for common use cases

    pub use crate::ast::{Instruction, SequencerProgram, WaveDeclaration};
    pub use crate::emit::emit;
    pub use crate::generator::SequencerGenerator;
    pub use crate::sync::{SyncChecker, SyncReport, SyncState, SyncStateMachine};
}

// ============================================================================
// Version Information
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Integration Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use awgc_core::prelude::*;
    use awgc_parse::ProgramParser;
    use awgc_table::CommandTableAssembler;
    use awgc_timing::prelude::*;
    use awgc_waveform::CatalogBuilder;

    #[test]
    fn test_programs_of_a_parsed_file_are_isomorphic() {
        let registry = CoreRegistry::new(vec![
            CoreDescriptor::rf("dev8001", 0, 1).with_trigger(),
            CoreDescriptor::rf("dev8001", 1, 2),
            CoreDescriptor::dc("dev8002", 0, 3, 4),
        ])
        .unwrap();
        let params = GateParameterTable::new()
            .with_rf(1, RfParameters::new(66.0, 33.0, 0.5, 0.5, 1e8))
            .with_rf(2, RfParameters::new(60.0, 30.0, 0.4, 0.4, 1.2e8))
            .with_plunger(3, PlungerParameters::new(40.0, 0.2))
            .with_plunger(4, PlungerParameters::new(50.0, 0.2));
        let lengths = LengthResolver::new(2.4, 1.0)
            .unwrap()
            .resolve(&registry, &params)
            .unwrap();
        let program = ProgramParser::new(&registry, &lengths)
            .parse_str("header\n(1)x(2)xx;(3)p;(2)z12.5;\n(4)p(1)t70;(2)*gauss[25,0.3];\n")
            .unwrap();
        let scheduled = Scheduler::new(&lengths).schedule(&program.lines).unwrap();
        let catalogs = CatalogBuilder::new(&registry, &params, &lengths)
            .build(&scheduled)
            .unwrap();
        let assembled = CommandTableAssembler::new(&lengths)
            .assemble(&registry, &catalogs, &scheduled)
            .unwrap();

        let generator = SequencerGenerator::new(100, 2).unwrap();
        let programs = generator
            .generate_all(&registry, &catalogs, &assembled)
            .unwrap();
        let report = SyncChecker::verify(&programs, &assembled).unwrap();

        assert_eq!(report.trigger_source, CoreId::new("dev8001", 0));
        assert_eq!(report.line_samples.len(), 2);
        assert_eq!(report.sync_points, 2);
        for (&(_, samples), line) in report.line_samples.iter().zip(&program.lines) {
            assert_eq!(samples, line.total_samples());
        }

        let source = &programs[&CoreId::new("dev8001", 0)];
        let sink = &programs[&CoreId::new("dev8001", 1)];
        assert_eq!(source.declarations.len(), catalogs[&source.core].len());
        assert!(emit(source).contains("setTrigger(1);"));
        assert!(!emit(sink).contains("setTrigger"));
        assert_eq!(emit(sink).matches("waitDIOTrigger();").count(), 2);
    }
}
