//! Gate tokens for AWGC
//!
//! Gantree: L1_Sequence → GateToken
//!
//! Closed set of operations a GST token can lower to. Every consumer
//! matches exhaustively; there is no string-keyed fallthrough.

use crate::types::{ChannelIndex, ChannelRole, CoreId, DcChannel, Degrees, Samples};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Rotation Kinds
// ============================================================================

/// Pulse family of a rotation
/// Gantree: GateFamily // π/2, π
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GateFamily {
    /// π/2 rotations
    HalfPi,
    /// π rotations
    Pi,
}

/// RF rotation gate
/// Gantree: RotationKind // x,y,xx,yy,xxx,yyy,mxxm,myym
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RotationKind {
    /// π/2 about +x
    X,
    /// π/2 about +y
    Y,
    /// π/2 about -x
    Xxx,
    /// π/2 about -y
    Yyy,
    /// π about +x
    Xx,
    /// π about +y
    Yy,
    /// π about -x
    Mxxm,
    /// π about -y
    Myym,
}

impl RotationKind {
    /// π/2 kinds in command-table order
    pub const HALF_PI: [RotationKind; 4] = [
        RotationKind::X,
        RotationKind::Y,
        RotationKind::Xxx,
        RotationKind::Yyy,
    ];

    /// π kinds in command-table order
    pub const PI: [RotationKind; 4] = [
        RotationKind::Xx,
        RotationKind::Yy,
        RotationKind::Mxxm,
        RotationKind::Myym,
    ];

    /// Family of the rotation
    pub fn family(&self) -> GateFamily {
        match self {
            RotationKind::X | RotationKind::Y | RotationKind::Xxx | RotationKind::Yyy => {
                GateFamily::HalfPi
            }
            RotationKind::Xx | RotationKind::Yy | RotationKind::Mxxm | RotationKind::Myym => {
                GateFamily::Pi
            }
        }
    }

    /// Oscillator phase the rotation must be played at
    /// Gantree: desired_phase(g) -> f64 // 목표 위상
    pub fn desired_phase_deg(&self) -> Degrees {
        match self {
            RotationKind::X | RotationKind::Xx => 0.0,
            RotationKind::Y | RotationKind::Yy => -90.0,
            RotationKind::Xxx | RotationKind::Mxxm => -180.0,
            RotationKind::Yyy | RotationKind::Myym => 90.0,
        }
    }

    /// Position inside its family, 0..4
    pub fn position(&self) -> usize {
        match self {
            RotationKind::X | RotationKind::Xx => 0,
            RotationKind::Y | RotationKind::Yy => 1,
            RotationKind::Xxx | RotationKind::Mxxm => 2,
            RotationKind::Yyy | RotationKind::Myym => 3,
        }
    }

    /// GST op code
    pub fn op_code(&self) -> &'static str {
        match self {
            RotationKind::X => "x",
            RotationKind::Y => "y",
            RotationKind::Xxx => "xxx",
            RotationKind::Yyy => "yyy",
            RotationKind::Xx => "xx",
            RotationKind::Yy => "yy",
            RotationKind::Mxxm => "mxxm",
            RotationKind::Myym => "myym",
        }
    }

    /// Parse a GST op code
    pub fn from_op_code(code: &str) -> Option<Self> {
        match code {
            "x" => Some(RotationKind::X),
            "y" => Some(RotationKind::Y),
            "xxx" => Some(RotationKind::Xxx),
            "yyy" => Some(RotationKind::Yyy),
            "xx" => Some(RotationKind::Xx),
            "yy" => Some(RotationKind::Yy),
            "mxxm" => Some(RotationKind::Mxxm),
            "myym" => Some(RotationKind::Myym),
            _ => None,
        }
    }
}

impl fmt::Display for RotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.op_code())
    }
}

// ============================================================================
// Arbitrary Pulse
// ============================================================================

/// User-defined pulse from a `*label[...]` token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbitraryPulse {
    /// Label as written in the token
    pub label: String,
    /// Requested duration
    pub duration_ns: f64,
    /// Peak amplitude
    pub amplitude: f64,
    /// Carrier phase of the envelope
    pub phase_deg: Degrees,
    /// Any further parameters, carried verbatim
    pub extra: Vec<f64>,
    /// Aligned length
    pub samples: Samples,
}

impl ArbitraryPulse {
    /// True if both pulses render the same samples
    pub fn same_shape(&self, other: &ArbitraryPulse) -> bool {
        self.samples == other.samples
            && self.amplitude == other.amplitude
            && self.phase_deg == other.phase_deg
            && self.extra == other.extra
    }
}

// ============================================================================
// Gate Operations
// ============================================================================

/// Operation carried by a token
/// Gantree: GateOp // 연산 enum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GateOp {
    /// RF rotation
    Rotation(RotationKind),
    /// Idle for the given number of samples
    Wait(Samples),
    /// Standard plunger pulse on a DC channel
    PlungerPulse(DcChannel),
    /// Virtual Z rotation
    ArbitraryZ(Degrees),
    /// User-defined pulse
    ArbitraryWaveform(ArbitraryPulse),
    /// Zero-duration, zero-phase placeholder (z0z)
    NoOp,
}

impl GateOp {
    /// Short name for logs and messages
    pub fn name(&self) -> &'static str {
        match self {
            GateOp::Rotation(kind) => kind.op_code(),
            GateOp::Wait(_) => "t",
            GateOp::PlungerPulse(_) => "p",
            GateOp::ArbitraryZ(_) => "z",
            GateOp::ArbitraryWaveform(_) => "*",
            GateOp::NoOp => "z0z",
        }
    }

    /// True for ops that play a waveform
    pub fn is_pulse(&self) -> bool {
        matches!(
            self,
            GateOp::Rotation(_) | GateOp::PlungerPulse(_) | GateOp::ArbitraryWaveform(_)
        )
    }

    /// True for virtual ops that take no time
    pub fn is_virtual(&self) -> bool {
        matches!(self, GateOp::ArbitraryZ(_) | GateOp::NoOp)
    }

    /// Rotation kind, if any
    pub fn rotation(&self) -> Option<RotationKind> {
        match self {
            GateOp::Rotation(kind) => Some(*kind),
            _ => None,
        }
    }
}

impl fmt::Display for GateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateOp::Rotation(kind) => write!(f, "{}", kind),
            GateOp::Wait(samples) => write!(f, "t[{} Sa]", samples),
            GateOp::PlungerPulse(channel) => write!(f, "p[{}]", channel),
            GateOp::ArbitraryZ(angle) => write!(f, "z{}z", angle),
            GateOp::ArbitraryWaveform(pulse) => write!(f, "*{}", pulse.label),
            GateOp::NoOp => write!(f, "z0z"),
        }
    }
}

/// One gate on one channel of one core
/// Gantree: GateToken // 토큰
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateToken {
    /// Owning core
    pub core: CoreId,
    /// Role of the owning core
    pub role: ChannelRole,
    /// GST index the token addresses
    pub channel: ChannelIndex,
    /// Operation
    pub op: GateOp,
    /// True if the parser filled this slot in
    pub synthesized: bool,
}

impl GateToken {
    /// Token written in the source
    pub fn explicit(core: CoreId, role: ChannelRole, channel: ChannelIndex, op: GateOp) -> Self {
        Self {
            core,
            role,
            channel,
            op,
            synthesized: false,
        }
    }

    /// Token filled in by the parser
    pub fn synthesized(
        core: CoreId,
        role: ChannelRole,
        channel: ChannelIndex,
        op: GateOp,
    ) -> Self {
        Self {
            core,
            role,
            channel,
            op,
            synthesized: true,
        }
    }
}

impl fmt::Display for GateToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}){}", self.channel, self.op)
    }
}

// ============================================================================
// Tests
// ============================================================================
