//! # AWGC Parse
//!
//! Reader for the line-oriented GST gate-sequence format.
//!
//! ## Gantree Architecture
//!
//! ```text
//! awgc_parse // L3: Parse (완료)
//!     Lexer // (idx)op payload 토큰 분리 (완료)
//!     GateLineParser // 코어 바인딩, wait/z0z 합성 (완료)
//!     ProgramParser // 헤더, 라인 번호, 파일 (완료)
//! ```
//!
//! ## Grammar
//!
//! ```text
//! line  := step (';' step)* ';'?
//! step  := gate+
//! gate  := '(' index ')' op
//! op    := 'x' | 'y' | 'xx' | 'yy' | 'xxx' | 'yyy' | 'mxxm' | 'myym'
//!        | 'p' | 't' ns qual? | 'z' deg qual? | '*' label '[' num (',' num)* ']'
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// ============================================================================
// Module Declarations
// ============================================================================

/// Token lexer (Gantree: L3_Parse → Lexer)
pub mod token;

/// Line parser (Gantree: L3_Parse → GateLineParser)
pub mod line;

/// File reader (Gantree: L3_Parse → ProgramParser)
pub mod program;

// ============================================================================
// Re-exports
// ============================================================================

pub use line::GateLineParser;
pub use program::{GstProgram, ProgramParser};
pub use token::{lex_step, RawGate, RawOp};

// ============================================================================
// Prelude
// ============================================================================

pub mod prelude {
    //! Convenient imports for common use cases

    pub use crate::line::GateLineParser;
    pub use crate::program::{GstProgram, ProgramParser};
    pub use crate::token::{lex_step, RawGate, RawOp};
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Integration Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use awgc_core::prelude::*;
    use awgc_timing::prelude::*;

    #[test]
    fn test_parsed_lines_schedule_cleanly() {
        let registry = CoreRegistry::new(vec![
            CoreDescriptor::rf("dev8001", 0, 1).with_trigger(),
            CoreDescriptor::rf("dev8001", 1, 2),
            CoreDescriptor::dc("dev8002", 0, 3, 4),
        ])
        .unwrap();
        let params = GateParameterTable::new()
            .with_rf(1, RfParameters::new(66.0, 33.0, 0.5, 0.5, 1e8))
            .with_rf(2, RfParameters::new(66.0, 33.0, 0.5, 0.5, 1e8))
            .with_plunger(3, PlungerParameters::new(40.0, 0.2))
            .with_plunger(4, PlungerParameters::new(40.0, 0.2));
        let lengths = LengthResolver::new(2.4, 0.0)
            .unwrap()
            .resolve(&registry, &params)
            .unwrap();

        let program = ProgramParser::new(&registry, &lengths)
            .parse_str("Sequence\n(1)x(3)p;(2)xx;(1)z90z;(4)*ramp[60,0.5];\n")
            .unwrap();
        let scheduled = Scheduler::new(&lengths).schedule(&program.lines).unwrap();
        let line = &scheduled[0];
        let totals: Vec<u64> = registry
            .cores()
            .iter()
            .map(|c| line.core_samples(&c.id))
            .collect();
        assert!(totals.iter().all(|&t| t == totals[0]));
        // 96 (plunger > pi/2) + 160 + 0 + 144
        assert_eq!(totals[0], 400);
    }
}
