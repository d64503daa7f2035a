//! Constants for AWGC
//!
//! Gantree: L0_Foundation → Constants
//!
//! Hardware limits of the target AWG, canonical phase increments and
//! sequencer defaults.

// ============================================================================
// Hardware Constants
// Gantree: hardware // 하드웨어 상수
// ============================================================================

pub mod hardware {
    //! Limits of the multi-channel AWG the compiler targets

    /// Default sample rate in GSa/s
    pub const DEFAULT_SAMPLE_RATE_GSA: f64 = 2.4;

    /// Waveform lengths must be a multiple of this many samples
    pub const SAMPLE_ALIGNMENT: u32 = 16;

    /// Shortest playable waveform in samples
    pub const MIN_WAVEFORM_SAMPLES: u32 = 48;

    /// Hard ceiling of command-table entries per core
    /// Gantree: COMMAND_TABLE_CAPACITY: usize = 1024
    pub const COMMAND_TABLE_CAPACITY: usize = 1024;

    /// Largest uniform side padding in nanoseconds
    pub const MAX_SIDE_PADDING_NS: f64 = 5.0;

    /// Fill ratio above which a table is reported as nearly full
    pub const CAPACITY_WARNING_RATIO: f64 = 0.9;

    /// Command-table schema version written into the document header
    pub const COMMAND_TABLE_VERSION: &str = "1.2.0";

    /// Tolerance applied before rounding a duration up to whole samples
    pub const SAMPLE_TOLERANCE: f64 = 1e-9;
}

// ============================================================================
// Phase Constants
// Gantree: phase // 위상 상수
// ============================================================================

pub mod phase {
    //! Phase conventions shared by the tracker and the table assembler

    /// Phase increments with a fixed command-table entry, in table order
    pub const CANONICAL_INCREMENTS_DEG: [f64; 7] = [0.0, 90.0, -90.0, 180.0, -180.0, 270.0, -270.0];

    /// Offset of the second oscillator phase for absolute IQ entries
    pub const IQ_QUADRATURE_DEG: f64 = 90.0;

    /// Angles closer than this are the same angle
    pub const ANGLE_EPSILON_DEG: f64 = 1e-6;

    /// Position of an increment in [`CANONICAL_INCREMENTS_DEG`]
    pub fn canonical_position(angle_deg: f64) -> Option<usize> {
        CANONICAL_INCREMENTS_DEG
            .iter()
            .position(|&c| (c - angle_deg).abs() < ANGLE_EPSILON_DEG)
    }

    /// Micro-degrees in one turn
    const MICRO_DEG_PER_TURN: i64 = 360_000_000;

    /// Integer key of an angle at micro-degree resolution, modulo one turn
    pub fn angle_key(angle_deg: f64) -> i64 {
        (((angle_deg % 360.0) * 1e6).round() as i64).rem_euclid(MICRO_DEG_PER_TURN)
    }

    /// True if the angle is zero within tolerance
    pub fn is_zero(angle_deg: f64) -> bool {
        angle_deg.abs() < ANGLE_EPSILON_DEG
    }
}

// ============================================================================
// Sequencer Constants
// Gantree: sequencer // 시퀀서 상수
// ============================================================================

pub mod sequencer {
    //! Defaults for generated sequencer programs

    /// Default averaging repetitions per line
    pub const DEFAULT_INNER_REPETITIONS: u32 = 1000;

    /// Default repetitions of the whole program
    pub const DEFAULT_OUTER_REPETITIONS: u32 = 1;

    /// Digital trigger input the source core waits on
    pub const TRIGGER_INPUT: u8 = 1;

    /// Trigger output bit the source core pulses
    pub const TRIGGER_OUTPUT: u8 = 1;
}

// ============================================================================
// Tests
// ============================================================================
