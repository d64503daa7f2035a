//! Error types for AWGC
//!
//! Gantree: L0_Foundation → Errors
//!
//! Every stage of the compiler fails synchronously with one of these
//! variants. Compilation is pure, so none of them is worth retrying.

// Error variant fields are self-documenting via error messages
#![allow(missing_docs)]

use crate::types::{ChannelIndex, CoreId};
use thiserror::Error;

/// Main error type for AWGC
/// Gantree: AwgcError // enum
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AwgcError {
    // ========================================================================
    // Parse Errors
    // ========================================================================
    /// Malformed gate token or unknown op code
    /// Gantree: Parse{{line,token}} // 파싱
    #[error("Parse error on line {line}, token '{token}': {reason}")]
    Parse {
        line: usize,
        token: String,
        reason: String,
    },

    // ========================================================================
    // Resource Errors
    // ========================================================================
    /// Command table would exceed the hardware entry ceiling
    /// Gantree: CapacityExceeded{{core,required}} // 용량 초과
    #[error("Command table for {core} needs {required} entries, capacity is {capacity}")]
    CapacityExceeded {
        core: CoreId,
        required: usize,
        capacity: usize,
    },

    /// Phase angle without a fixed command-table entry
    #[error("No command-table entry on {core} for phase {angle_deg}°")]
    UnknownFrameReference { core: CoreId, angle_deg: f64 },

    /// Same arbitrary waveform label used with different shapes on one core
    #[error("Arbitrary waveform '{label}' on {core} redefined with different parameters")]
    ConflictingWaveform { core: CoreId, label: String },

    // ========================================================================
    // Timing Errors
    // ========================================================================
    /// Two cores disagree on the duration of a line
    /// Gantree: DurationMismatch{{line}} // 길이 불일치
    #[error(
        "Line {line}: {core_a} runs {samples_a} samples but {core_b} runs {samples_b} samples"
    )]
    DurationMismatch {
        line: usize,
        core_a: CoreId,
        samples_a: u64,
        core_b: CoreId,
        samples_b: u64,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Side padding above the hardware limit
    /// Gantree: PaddingOutOfRange(f64) // 패딩 범위
    #[error("Side padding {requested_ns} ns out of range [0, {max_ns}] ns")]
    PaddingOutOfRange { requested_ns: f64, max_ns: f64 },

    /// Gate index not present in the channel map
    #[error("Channel index {0} is not present in the channel map")]
    UnknownChannel(ChannelIndex),

    /// Gate parameters missing for a configured channel
    #[error("No {kind} calibration for channel index {channel}")]
    MissingCalibration {
        channel: ChannelIndex,
        kind: &'static str,
    },

    /// Inconsistent channel map
    #[error("Invalid channel map: {0}")]
    InvalidChannelMap(String),

    /// Not exactly one trigger source core
    #[error("Expected exactly one trigger-wired core, found {count}")]
    TriggerSource { count: usize },

    /// Invalid compiler configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ========================================================================
    // I/O Errors
    // ========================================================================
    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(String),

    /// File I/O error
    #[error("File error: {0}")]
    File(String),
}

/// Result type alias for AWGC operations
/// Gantree: AwgcResult<T> // type alias
pub type AwgcResult<T> = Result<T, AwgcError>;

// ============================================================================
// Error Conversion Helpers
// ============================================================================

impl From<serde_json::Error> for AwgcError {
    fn from(err: serde_json::Error) -> Self {
        AwgcError::Json(err.to_string())
    }
}

impl From<std::io::Error> for AwgcError {
    fn from(err: std::io::Error) -> Self {
        AwgcError::File(err.to_string())
    }
}

// ============================================================================
// Error Helpers
// ============================================================================

impl AwgcError {
    /// Shorthand for a parse error
    pub fn parse(line: usize, token: impl Into<String>, reason: impl Into<String>) -> Self {
        AwgcError::Parse {
            line,
            token: token.into(),
            reason: reason.into(),
        }
    }

    /// Check if error stems from static configuration
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            AwgcError::PaddingOutOfRange { .. }
                | AwgcError::UnknownChannel(_)
                | AwgcError::MissingCalibration { .. }
                | AwgcError::InvalidChannelMap(_)
                | AwgcError::TriggerSource { .. }
                | AwgcError::InvalidConfig(_)
        )
    }

    /// Check if error is a hardware resource limit
    pub fn is_capacity_error(&self) -> bool {
        matches!(self, AwgcError::CapacityExceeded { .. })
    }

    /// Check if error points at the gate-sequence input
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            AwgcError::Parse { .. } | AwgcError::ConflictingWaveform { .. }
        )
    }

    /// Check if error indicates an internal inconsistency of the compiler
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            AwgcError::DurationMismatch { .. } | AwgcError::UnknownFrameReference { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
