//! Core types for AWGC
//!
//! Gantree: L0_Foundation → CoreTypes
//!
//! Identifiers and small value types shared by every compiler stage.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Type Aliases
// ============================================================================

/// 1-based global channel index as written in GST tokens, `(3)x`
/// Gantree: ChannelIndex // pub type ChannelIndex = u32
pub type ChannelIndex = u32;

/// Waveform / wait length in hardware samples
/// Gantree: Samples // pub type Samples = u32
pub type Samples = u32;

/// Phase angle in degrees
pub type Degrees = f64;

/// Duration in nanoseconds
pub type Nanoseconds = f64;

// ============================================================================
// CoreId
// ============================================================================

/// One physical AWG output core: device id plus core index on that device
/// Gantree: CoreId // (awg, core)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CoreId {
    /// Instrument id, e.g. `dev8123`
    pub awg: String,
    /// Core index on the instrument
    pub core: usize,
}

impl CoreId {
    /// Create a new core id
    pub fn new(awg: impl Into<String>, core: usize) -> Self {
        Self {
            awg: awg.into(),
            core,
        }
    }
}

impl fmt::Display for CoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/core{}", self.awg, self.core)
    }
}

// ============================================================================
// ChannelRole
// ============================================================================

/// What a core drives
/// Gantree: ChannelRole // RF/DC
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelRole {
    /// IQ-modulated spin control
    Rf,
    /// Baseband plunger pulses
    Dc,
}

impl ChannelRole {
    /// Number of GST indices one core of this role owns
    pub fn channels_per_core(&self) -> usize {
        match self {
            ChannelRole::Rf => 1,
            ChannelRole::Dc => 2,
        }
    }
}

impl fmt::Display for ChannelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelRole::Rf => write!(f, "RF"),
            ChannelRole::Dc => write!(f, "DC"),
        }
    }
}

// ============================================================================
// DcChannel
// ============================================================================

/// Position of a plunger channel inside its DC core
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DcChannel {
    /// First output of the pair
    P1,
    /// Second output of the pair
    P2,
}

impl DcChannel {
    /// Both channels in output order
    pub const ALL: [DcChannel; 2] = [DcChannel::P1, DcChannel::P2];

    /// Zero-based position
    pub fn position(&self) -> usize {
        match self {
            DcChannel::P1 => 0,
            DcChannel::P2 => 1,
        }
    }

    /// From zero-based position
    pub fn from_position(position: usize) -> Option<Self> {
        match position {
            0 => Some(DcChannel::P1),
            1 => Some(DcChannel::P2),
            _ => None,
        }
    }

    /// The other channel of the pair
    pub fn other(&self) -> Self {
        match self {
            DcChannel::P1 => DcChannel::P2,
            DcChannel::P2 => DcChannel::P1,
        }
    }

    /// Short label used in waveform keys
    pub fn label(&self) -> &'static str {
        match self {
            DcChannel::P1 => "p1",
            DcChannel::P2 => "p2",
        }
    }
}

impl fmt::Display for DcChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_id_ordering() {
        let a = CoreId::new("dev8001", 1);
        let b = CoreId::new("dev8001", 2);
        let c = CoreId::new("dev8002", 0);
        assert!(a < b);
        assert!(b < c);
        assert_eq!(a.to_string(), "dev8001/core1");
    }

    #[test]
    fn test_dc_channel() {
        assert_eq!(DcChannel::P1.other(), DcChannel::P2);
        assert_eq!(DcChannel::from_position(1), Some(DcChannel::P2));
        assert_eq!(DcChannel::from_position(2), None);
        assert_eq!(DcChannel::P2.position(), 1);
    }

    #[test]
    fn test_role_serde() {
        let role: ChannelRole = serde_json::from_str("\"dc\"").unwrap();
        assert_eq!(role, ChannelRole::Dc);
        assert_eq!(ChannelRole::Rf.channels_per_core(), 1);
    }
}
