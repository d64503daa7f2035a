//! GST file reader
//!
//! Gantree: L3_Parse → ProgramParser
//!
//! A GST file is a header line followed by one gate sequence per line.
//! Line numbers in errors and in the parsed lines are 1-based source
//! line numbers, header included. A byte-order mark and indentation do not
//! turn a gate line into a header.

use crate::line::GateLineParser;
use awgc_core::{AwgcResult, CoreRegistry, SequenceLine};
use awgc_timing::LengthTable;
use std::fmt;
use std::path::Path;

const BYTE_ORDER_MARK: char = '\u{feff}';

/// Parsed gate-sequence file
/// Gantree: GstProgram // header + lines
#[derive(Debug, Clone, PartialEq)]
pub struct GstProgram {
    /// Discarded header line, if the file had one
    pub header: Option<String>,
    /// Gate sequences in file order
    pub lines: Vec<SequenceLine>,
}

impl GstProgram {
    /// Number of gate sequences
    pub fn num_lines(&self) -> usize {
        self.lines.len()
    }

    /// Number of steps over all lines
    pub fn num_steps(&self) -> usize {
        self.lines.iter().map(|l| l.num_steps()).sum()
    }

    /// Samples of one pass over every line
    pub fn total_samples(&self) -> u64 {
        self.lines.iter().map(|l| l.total_samples()).sum()
    }
}

impl fmt::Display for GstProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "GstProgram: {} lines, {} steps, {} samples",
            self.num_lines(),
            self.num_steps(),
            self.total_samples()
        )?;
        for line in &self.lines {
            write!(f, "{}", line)?;
        }
        Ok(())
    }
}

/// Whole-file parser
#[derive(Debug, Clone, Copy)]
pub struct ProgramParser<'a> {
    lines: GateLineParser<'a>,
}

impl<'a> ProgramParser<'a> {
    /// Create a parser over a registry and resolved lengths
    pub fn new(registry: &'a CoreRegistry, lengths: &'a LengthTable) -> Self {
        Self {
            lines: GateLineParser::new(registry, lengths),
        }
    }

    /// Parse GST text
    /// Gantree: parse_str(text) -> Result<GstProgram> // 파일 파싱
    pub fn parse_str(&self, text: &str) -> AwgcResult<GstProgram> {
        let mut header = None;
        let mut lines = Vec::new();

        let text = text.trim_start_matches(BYTE_ORDER_MARK);
        for (i, raw) in text.lines().enumerate() {
            let number = i + 1;
            let trimmed = raw.trim();
            if number == 1 && !trimmed.is_empty() && !trimmed.starts_with('(') {
                header = Some(trimmed.to_string());
                continue;
            }
            if trimmed.is_empty() {
                continue;
            }
            lines.push(self.lines.parse_line(number, trimmed)?);
        }

        log::debug!(
            "parsed {} gate sequences{}",
            lines.len(),
            if header.is_some() { " (header skipped)" } else { "" }
        );
        Ok(GstProgram { header, lines })
    }

    /// Read and parse a GST file
    pub fn parse_file(&self, path: impl AsRef<Path>) -> AwgcResult<GstProgram> {
        let text = std::fs::read_to_string(path)?;
        self.parse_str(&text)
    }
}

// ============================================================================
// Tests
// ============================================================================
