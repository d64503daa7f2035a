//! Compiler configuration
//!
//! Gantree: L7_Integration → CompilerConfig
//!
//! Everything the compiler needs besides the channel map, the gate
//! parameters and the program itself.

use awgc_core::hardware::{COMMAND_TABLE_VERSION, DEFAULT_SAMPLE_RATE_GSA, MAX_SIDE_PADDING_NS};
use awgc_core::sequencer::{DEFAULT_INNER_REPETITIONS, DEFAULT_OUTER_REPETITIONS};
use awgc_core::{AwgcError, AwgcResult, Nanoseconds};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Compiler configuration
/// Gantree: CompilerConfig // 컴파일 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    // ========================================================================
    // Timing
    // ========================================================================
    /// AWG sample rate in GSa/s
    pub sample_rate_gsa: f64,

    /// Padding added on both sides of every calibrated pulse
    pub side_padding_ns: Nanoseconds,

    // ========================================================================
    // Sequencer
    // ========================================================================
    /// Averaging repetitions per line
    pub inner_repetitions: u32,

    /// Repetitions of the whole program
    pub outer_repetitions: u32,

    // ========================================================================
    // Output
    // ========================================================================
    /// Version written into command-table documents
    pub command_table_version: String,
}

impl CompilerConfig {
    // ========================================================================
    // Constructors
    // ========================================================================

    /// Defaults of the 2.4 GSa/s instrument
    pub fn standard() -> Self {
        Self {
            sample_rate_gsa: DEFAULT_SAMPLE_RATE_GSA,
            side_padding_ns: 0.0,
            inner_repetitions: DEFAULT_INNER_REPETITIONS,
            outer_repetitions: DEFAULT_OUTER_REPETITIONS,
            command_table_version: COMMAND_TABLE_VERSION.to_string(),
        }
    }

    /// Every line played once, for inspecting a program on a scope
    pub fn single_shot() -> Self {
        Self {
            inner_repetitions: 1,
            outer_repetitions: 1,
            ..Self::standard()
        }
    }

    /// Standard configuration with side padding
    pub fn padded(side_padding_ns: Nanoseconds) -> Self {
        Self {
            side_padding_ns,
            ..Self::standard()
        }
    }

    // ========================================================================
    // Builder Methods
    // ========================================================================

    /// Set sample rate
    pub fn with_sample_rate(mut self, gsa: f64) -> Self {
        self.sample_rate_gsa = gsa;
        self
    }

    /// Set side padding
    pub fn with_side_padding(mut self, ns: Nanoseconds) -> Self {
        self.side_padding_ns = ns;
        self
    }

    /// Set averaging repetitions
    pub fn with_inner_repetitions(mut self, n: u32) -> Self {
        self.inner_repetitions = n;
        self
    }

    /// Set program repetitions
    pub fn with_outer_repetitions(mut self, n: u32) -> Self {
        self.outer_repetitions = n;
        self
    }

    /// Set command-table schema version
    pub fn with_command_table_version(mut self, version: impl Into<String>) -> Self {
        self.command_table_version = version.into();
        self
    }

    // ========================================================================
    // I/O
    // ========================================================================

    /// Parse from JSON; missing fields take their standard values
    pub fn from_json(json: &str) -> AwgcResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> AwgcResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Validate configuration
    pub fn validate(&self) -> AwgcResult<()> {
        if !(self.sample_rate_gsa.is_finite() && self.sample_rate_gsa > 0.0) {
            return Err(AwgcError::InvalidConfig(format!(
                "sample rate must be positive, got {} GSa/s",
                self.sample_rate_gsa
            )));
        }

        if !(0.0..=MAX_SIDE_PADDING_NS).contains(&self.side_padding_ns) {
            return Err(AwgcError::PaddingOutOfRange {
                requested_ns: self.side_padding_ns,
                max_ns: MAX_SIDE_PADDING_NS,
            });
        }

        if self.inner_repetitions == 0 || self.outer_repetitions == 0 {
            return Err(AwgcError::InvalidConfig(
                "repetition counts must be > 0".to_string(),
            ));
        }

        if self.command_table_version.is_empty() {
            return Err(AwgcError::InvalidConfig(
                "command-table version must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Display for CompilerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CompilerConfig({} GSa/s, pad={} ns, repeat={}x{}, ct v{})",
            self.sample_rate_gsa,
            self.side_padding_ns,
            self.outer_repetitions,
            self.inner_repetitions,
            self.command_table_version
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_standard() {
        let config = CompilerConfig::standard();
        assert_relative_eq!(config.sample_rate_gsa, 2.4);
        assert_eq!(config.inner_repetitions, 1000);
        assert_eq!(config.outer_repetitions, 1);
        assert_eq!(config.command_table_version, "1.2.0");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets() {
        assert_eq!(CompilerConfig::single_shot().inner_repetitions, 1);
        assert_relative_eq!(CompilerConfig::padded(2.5).side_padding_ns, 2.5);
    }

    #[test]
    fn test_padding_limit() {
        assert!(CompilerConfig::padded(5.0).validate().is_ok());
        assert_eq!(
            CompilerConfig::padded(5.5).validate(),
            Err(AwgcError::PaddingOutOfRange {
                requested_ns: 5.5,
                max_ns: 5.0
            })
        );
        assert!(CompilerConfig::padded(-1.0).validate().is_err());
    }

    #[test]
    fn test_invalid_values() {
        assert!(CompilerConfig::standard()
            .with_sample_rate(0.0)
            .validate()
            .is_err());
        assert!(CompilerConfig::standard()
            .with_inner_repetitions(0)
            .validate()
            .is_err());
        assert!(CompilerConfig::standard()
            .with_command_table_version("")
            .validate()
            .is_err());
    }

    #[test]
    fn test_partial_json() {
        let config = CompilerConfig::from_json(r#"{"inner_repetitions": 50}"#).unwrap();
        assert_eq!(config.inner_repetitions, 50);
        assert_relative_eq!(config.sample_rate_gsa, 2.4);
        assert!(config.to_string().contains("1x50"));
    }
}
