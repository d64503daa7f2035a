//! Sequencer text emission
//!
//! Gantree: L6_Sequencer → Emit
//!
//! Serializes a [`SequencerProgram`] to the instrument's sequencer
//! language. Emission is the only place programs become text.

use crate::ast::{Instruction, SequencerProgram};
use std::fmt::{self, Write};

const INDENT: &str = "    ";

/// Program text
/// Gantree: emit(program) -> String
pub fn emit(program: &SequencerProgram) -> String {
    program.to_string()
}

fn write_program(out: &mut impl Write, program: &SequencerProgram) -> fmt::Result {
    let role = if program.trigger_source {
        "trigger source"
    } else {
        "trigger sink"
    };
    writeln!(out, "// {} ({})", program.core, role)?;
    for d in &program.declarations {
        writeln!(
            out,
            "assignWaveIndex(placeholder({n}), placeholder({n}), {}); // {}",
            d.slot,
            d.name,
            n = d.samples
        )?;
    }
    writeln!(out)?;
    write_body(out, &program.body, 0)
}

fn write_body(out: &mut impl Write, body: &[Instruction], depth: usize) -> fmt::Result {
    let pad = INDENT.repeat(depth);
    for instruction in body {
        match instruction {
            Instruction::Repeat { count, body } => {
                writeln!(out, "{}repeat({}) {{", pad, count)?;
                write_body(out, body, depth + 1)?;
                writeln!(out, "{}}}", pad)?;
            }
            Instruction::Line(number) => writeln!(out, "{}// line {}", pad, number)?,
            Instruction::WaitDigTrigger(input) => writeln!(out, "{}waitDigTrigger({});", pad, input)?,
            Instruction::SetTrigger(value) => writeln!(out, "{}setTrigger({});", pad, value)?,
            Instruction::WaitDioTrigger => writeln!(out, "{}waitDIOTrigger();", pad)?,
            Instruction::ResetOscPhase => writeln!(out, "{}resetOscPhase();", pad)?,
            Instruction::ExecuteTableEntry(index) => {
                writeln!(out, "{}executeTableEntry({});", pad, index)?
            }
        }
    }
    Ok(())
}

impl fmt::Display for SequencerProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_program(f, self)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::WaveDeclaration;
    use awgc_core::CoreId;

    #[test]
    fn test_emitted_text() {
        let program = SequencerProgram {
            core: CoreId::new("dev8001", 0),
            trigger_source: true,
            declarations: vec![WaveDeclaration {
                slot: 0,
                samples: 160,
                name: "pi_pifr".to_string(),
            }],
            body: vec![Instruction::Repeat {
                count: 1,
                body: vec![
                    Instruction::Line(1),
                    Instruction::Repeat {
                        count: 1000,
                        body: vec![
                            Instruction::WaitDigTrigger(1),
                            Instruction::SetTrigger(1),
                            Instruction::SetTrigger(0),
                            Instruction::WaitDioTrigger,
                            Instruction::ResetOscPhase,
                            Instruction::ExecuteTableEntry(8),
                        ],
                    },
                ],
            }],
        };

        let expected = "\
// dev8001/core0 (trigger source)
assignWaveIndex(placeholder(160), placeholder(160), 0); // pi_pifr

repeat(1) {
    // line 1
    repeat(1000) {
        waitDigTrigger(1);
        setTrigger(1);
        setTrigger(0);
        waitDIOTrigger();
        resetOscPhase();
        executeTableEntry(8);
    }
}
";
        assert_eq!(emit(&program), expected);
        assert_eq!(program.to_string(), expected);
    }
}
