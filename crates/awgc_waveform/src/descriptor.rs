//! Waveform descriptors
//!
//! Gantree: L4_Waveform → WaveformDescriptor
//!
//! A descriptor names one waveform in a core's waveform memory: its
//! slot, its semantic key, its length and how to render it.

use awgc_core::{ArbitraryPulse, DcChannel, GateFamily, Samples};
use awgc_timing::{Frame, SlotOp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Waveform memory slot on one core
pub type SlotId = u32;

// ============================================================================
// Waveform Key
// ============================================================================

/// Identity of a waveform within one core's catalog
/// Gantree: WaveformKey // 파형 식별자
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WaveformKey {
    /// Standard rotation pulse padded to a frame
    Rotation {
        /// π or π/2
        family: GateFamily,
        /// Frame length
        frame: Frame,
    },
    /// Standard plunger pulse on one channel padded to a frame
    Plunger {
        /// Pulsing channel
        channel: DcChannel,
        /// Frame length
        frame: Frame,
    },
    /// Both plunger channels pulsing, padded to a frame
    PairedPlunger {
        /// Frame length
        frame: Frame,
    },
    /// User-defined RF pulse, shared by label
    ArbitraryRf {
        /// Label from the gate token
        label: String,
    },
    /// User-defined DC play of one step
    ArbitraryDc {
        /// Line number
        line: usize,
        /// Step index
        step: usize,
    },
    /// Another waveform lengthened to a whole step, same content centred
    Stretched {
        /// Waveform being lengthened
        base: Box<WaveformKey>,
        /// Length of the stretched window
        samples: Samples,
    },
}

impl WaveformKey {
    /// Human-readable key, e.g. `pi_pifr`, `p1_p2fr`
    pub fn semantic_key(&self) -> String {
        match self {
            WaveformKey::Rotation { family, frame } => {
                let pulse = match family {
                    GateFamily::Pi => "pi",
                    GateFamily::HalfPi => "pi_2",
                };
                format!("{}_{}", pulse, frame.label())
            }
            WaveformKey::Plunger { channel, frame } => {
                format!("{}_{}", channel.label(), frame.label())
            }
            WaveformKey::PairedPlunger { frame } => format!("p1p2_{}", frame.label()),
            WaveformKey::ArbitraryRf { label } => format!("arb_{}", label),
            WaveformKey::ArbitraryDc { line, step } => format!("dcarb_l{}_s{}", line, step),
            WaveformKey::Stretched { base, samples } => {
                format!("{}_{}sa", base.semantic_key(), samples)
            }
        }
    }

    /// True for keys created on demand while walking the program
    pub fn is_dynamic(&self) -> bool {
        matches!(
            self,
            WaveformKey::PairedPlunger { .. }
                | WaveformKey::ArbitraryRf { .. }
                | WaveformKey::ArbitraryDc { .. }
                | WaveformKey::Stretched { .. }
        )
    }

    /// True for lengthened copies of another waveform
    pub fn is_stretched(&self) -> bool {
        matches!(self, WaveformKey::Stretched { .. })
    }

    /// Same waveform in a window of `samples`
    pub fn stretched(self, samples: Samples) -> WaveformKey {
        WaveformKey::Stretched {
            base: Box::new(self),
            samples,
        }
    }

    /// Waveform a scheduled op plays, if any
    /// Gantree: of_slot(op) -> Option<WaveformKey> // 슬롯 → 파형
    pub fn of_slot(op: &SlotOp) -> Option<WaveformKey> {
        let key = match op {
            SlotOp::Rotation { kind, frame, .. } => WaveformKey::Rotation {
                family: kind.family(),
                frame: *frame,
            },
            SlotOp::Plunger { channel, frame } => WaveformKey::Plunger {
                channel: *channel,
                frame: *frame,
            },
            SlotOp::PairedPlunger { frame } => WaveformKey::PairedPlunger { frame: *frame },
            SlotOp::ArbitraryRf { pulse, .. } => WaveformKey::ArbitraryRf {
                label: pulse.label.clone(),
            },
            SlotOp::ArbitraryDc { line, step, .. } => WaveformKey::ArbitraryDc {
                line: *line,
                step: *step,
            },
            SlotOp::VirtualZ { .. } | SlotOp::Wait | SlotOp::NoOp => return None,
        };
        Some(key)
    }
}

impl fmt::Display for WaveformKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.semantic_key())
    }
}

// ============================================================================
// Channel Assignment & Shape
// ============================================================================

/// Which outputs a waveform drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelAssignment {
    /// I on the first output, Q on the second
    Iq {
        /// Output pair
        outputs: [u8; 2],
    },
    /// One plunger per output
    Plunger {
        /// Output pair
        outputs: [u8; 2],
        /// Outputs that are not held at zero
        active: [bool; 2],
    },
}

/// Content of one DC output
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DcShape {
    /// Held at zero
    Silent,
    /// Rectangular pulse of `active` samples, centred
    Pulse {
        /// Samples at `amp`
        active: Samples,
        /// Amplitude
        amp: f64,
    },
}

impl DcShape {
    /// True if the output is not held at zero
    pub fn is_active(&self) -> bool {
        matches!(self, DcShape::Pulse { .. })
    }
}

/// How to fill the samples of a waveform
/// Gantree: WaveformShape // 렌더링 정보
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WaveformShape {
    /// Rectangular IQ pulse, centred
    IqPulse {
        /// Samples at full amplitude
        active: Samples,
        /// In-phase amplitude
        i_amp: f64,
        /// Quadrature amplitude
        q_amp: f64,
    },
    /// User-defined IQ pulse, centred
    IqArbitrary {
        /// Samples at full amplitude
        active: Samples,
        /// Pulse parameters
        pulse: ArbitraryPulse,
    },
    /// Two baseband outputs
    Dc {
        /// Outputs in channel order
        channels: [DcShape; 2],
    },
}

// ============================================================================
// WaveformDescriptor
// ============================================================================

/// One entry of a core's waveform memory
/// Gantree: WaveformDescriptor // slot_id, semantic_key, sample_count, channel_assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveformDescriptor {
    /// Slot in waveform memory
    pub slot_id: SlotId,
    /// Identity within the catalog
    pub key: WaveformKey,
    /// Readable name
    pub semantic_key: String,
    /// Length in samples
    pub sample_count: Samples,
    /// Driven outputs
    pub channel_assignment: ChannelAssignment,
    /// Sample content
    pub shape: WaveformShape,
}

impl fmt::Display for WaveformDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:>3}] {:<16} {:>6} Sa",
            self.slot_id, self.semantic_key, self.sample_count
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use awgc_core::RotationKind;
    use awgc_timing::PhaseUpdate;

    #[test]
    fn test_semantic_keys() {
        let key = WaveformKey::Rotation {
            family: GateFamily::HalfPi,
            frame: Frame::Pi,
        };
        assert_eq!(key.semantic_key(), "pi_2_pifr");
        assert!(!key.is_dynamic());

        let key = WaveformKey::Plunger {
            channel: DcChannel::P1,
            frame: Frame::Plunger(DcChannel::P2),
        };
        assert_eq!(key.to_string(), "p1_p2fr");

        let key = WaveformKey::PairedPlunger { frame: Frame::HalfPi };
        assert_eq!(key.semantic_key(), "p1p2_pi2fr");
        assert!(key.is_dynamic());

        let key = WaveformKey::ArbitraryDc { line: 4, step: 2 };
        assert_eq!(key.semantic_key(), "dcarb_l4_s2");

        let key = WaveformKey::Rotation {
            family: GateFamily::HalfPi,
            frame: Frame::HalfPi,
        }
        .stretched(96);
        assert_eq!(key.semantic_key(), "pi_2_pi2fr_96sa");
        assert!(key.is_dynamic() && key.is_stretched());
    }

    #[test]
    fn test_key_of_slot() {
        let op = SlotOp::Rotation {
            kind: RotationKind::Myym,
            frame: Frame::Pi,
            phase: PhaseUpdate::Absolute(90.0),
        };
        assert_eq!(
            WaveformKey::of_slot(&op),
            Some(WaveformKey::Rotation {
                family: GateFamily::Pi,
                frame: Frame::Pi
            })
        );
        assert_eq!(WaveformKey::of_slot(&SlotOp::Wait), None);
        assert_eq!(WaveformKey::of_slot(&SlotOp::VirtualZ { angle: 12.0 }), None);
    }

    #[test]
    fn test_dc_shape_activity() {
        assert!(!DcShape::Silent.is_active());
        assert!(DcShape::Pulse { active: 10, amp: 0.1 }.is_active());
    }
}
