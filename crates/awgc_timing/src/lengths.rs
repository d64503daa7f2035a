//! Length & Padding Resolver
//!
//! Gantree: L2_Timing → LengthResolver
//!
//! Converts calibrated nanosecond lengths into sample counts on the
//! hardware grid and derives the standard lengths every core shares.

use crate::frame::Frame;
use awgc_core::hardware::{
    MAX_SIDE_PADDING_NS, MIN_WAVEFORM_SAMPLES, SAMPLE_ALIGNMENT, SAMPLE_TOLERANCE,
};
use awgc_core::{
    AwgcError, AwgcResult, ChannelRole, CoreId, CoreRegistry, DcChannel, GateFamily, GateOp,
    GateParameterTable, Nanoseconds, Samples,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Sample Grid
// ============================================================================

/// Round a sample count up to the alignment grid, with the hardware floor
/// Gantree: align(n) -> Samples // 16배수, 최소 48
pub fn align_samples(samples: u64) -> Option<Samples> {
    let align = SAMPLE_ALIGNMENT as u64;
    let aligned = samples.div_ceil(align) * align;
    Samples::try_from(aligned.max(MIN_WAVEFORM_SAMPLES as u64)).ok()
}

/// Length of a calibrated pulse before and after alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulseLength {
    /// Samples the pulse is actually on (calibrated length, no padding)
    pub active: Samples,
    /// Padded and aligned length
    pub aligned: Samples,
}

// ============================================================================
// LengthResolver
// ============================================================================

/// Sample-rate and padding aware length conversion
/// Gantree: LengthResolver // 길이 계산기
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LengthResolver {
    sample_rate_gsa: f64,
    side_padding_ns: Nanoseconds,
}

impl LengthResolver {
    /// Create a resolver; padding is checked before anything is built
    /// Gantree: new(rate, pad) -> Result<Self> // PaddingOutOfRange
    pub fn new(sample_rate_gsa: f64, side_padding_ns: Nanoseconds) -> AwgcResult<Self> {
        if !sample_rate_gsa.is_finite() || sample_rate_gsa <= 0.0 {
            return Err(AwgcError::InvalidConfig(format!(
                "sample rate must be positive, got {} GSa/s",
                sample_rate_gsa
            )));
        }
        if !(0.0..=MAX_SIDE_PADDING_NS).contains(&side_padding_ns) {
            return Err(AwgcError::PaddingOutOfRange {
                requested_ns: side_padding_ns,
                max_ns: MAX_SIDE_PADDING_NS,
            });
        }
        Ok(Self {
            sample_rate_gsa,
            side_padding_ns,
        })
    }

    /// Sample rate (GSa/s)
    pub fn sample_rate_gsa(&self) -> f64 {
        self.sample_rate_gsa
    }

    /// Side padding (ns)
    pub fn side_padding_ns(&self) -> Nanoseconds {
        self.side_padding_ns
    }

    /// Unaligned sample count of a duration
    pub fn raw_samples(&self, ns: Nanoseconds) -> Option<u64> {
        if !ns.is_finite() || ns < 0.0 {
            return None;
        }
        let exact = (ns * self.sample_rate_gsa - SAMPLE_TOLERANCE).ceil().max(0.0);
        if exact > u32::MAX as f64 {
            return None;
        }
        Some(exact as u64)
    }

    /// Aligned sample count of a duration
    /// Gantree: samples(ns) -> Samples // ceil + align
    pub fn aligned_samples(&self, ns: Nanoseconds) -> Option<Samples> {
        self.raw_samples(ns).and_then(align_samples)
    }

    /// Duration of a sample count
    pub fn samples_to_ns(&self, samples: Samples) -> Nanoseconds {
        samples as f64 / self.sample_rate_gsa
    }

    /// Length of a calibrated pulse with side padding on both sides
    pub fn pulse(&self, tau_ns: Nanoseconds) -> AwgcResult<PulseLength> {
        let invalid = || AwgcError::InvalidConfig(format!("pulse length {} ns out of range", tau_ns));
        let active = self.raw_samples(tau_ns).ok_or_else(invalid)?;
        let aligned = self
            .aligned_samples(tau_ns + 2.0 * self.side_padding_ns)
            .ok_or_else(invalid)?;
        Ok(PulseLength {
            active: active as Samples,
            aligned,
        })
    }

    /// Resolve every calibrated pulse and the shared standard lengths
    /// Gantree: resolve(registry, params) -> Result<LengthTable> // 표준 길이
    pub fn resolve(
        &self,
        registry: &CoreRegistry,
        params: &GateParameterTable,
    ) -> AwgcResult<LengthTable> {
        let mut cores = BTreeMap::new();
        let mut half_pi = None::<Samples>;
        let mut pi = None::<Samples>;
        let mut plunger: [Option<Samples>; 2] = [None, None];

        for descriptor in registry.cores() {
            let lengths = match descriptor.role {
                ChannelRole::Rf => {
                    let channel = descriptor.channels[0];
                    let p = params.rf(channel)?;
                    let l_half = self.pulse(p.tau_pi_2)?;
                    let l_pi = self.pulse(p.tau_pi)?;
                    half_pi = half_pi.max(Some(l_half.aligned));
                    pi = pi.max(Some(l_pi.aligned));
                    CoreLengths::Rf {
                        half_pi: l_half,
                        pi: l_pi,
                    }
                }
                ChannelRole::Dc => {
                    let mut pulses = [PulseLength {
                        active: 0,
                        aligned: MIN_WAVEFORM_SAMPLES,
                    }; 2];
                    for dc in DcChannel::ALL {
                        let channel = descriptor.channels[dc.position()];
                        let pulse = self.pulse(params.plunger(channel)?.tau)?;
                        plunger[dc.position()] = plunger[dc.position()].max(Some(pulse.aligned));
                        pulses[dc.position()] = pulse;
                    }
                    CoreLengths::Dc { plunger: pulses }
                }
            };
            cores.insert(descriptor.id.clone(), lengths);
        }

        Ok(LengthTable {
            sample_rate_gsa: self.sample_rate_gsa,
            side_padding_ns: self.side_padding_ns,
            half_pi: half_pi.unwrap_or(MIN_WAVEFORM_SAMPLES),
            pi: pi.unwrap_or(MIN_WAVEFORM_SAMPLES),
            plunger: [
                plunger[0].unwrap_or(MIN_WAVEFORM_SAMPLES),
                plunger[1].unwrap_or(MIN_WAVEFORM_SAMPLES),
            ],
            has_dc: registry.has_dc(),
            cores,
        })
    }
}

// ============================================================================
// LengthTable
// ============================================================================

/// Calibrated pulse lengths of one core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoreLengths {
    /// RF rotations
    Rf {
        /// π/2 pulse
        half_pi: PulseLength,
        /// π pulse
        pi: PulseLength,
    },
    /// Plunger pulses in channel order
    Dc {
        /// P1, P2
        plunger: [PulseLength; 2],
    },
}

/// Standard lengths and per-core pulse lengths of one compile
/// Gantree: LengthTable // 표준 π, π/2, plunger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LengthTable {
    /// Sample rate (GSa/s)
    pub sample_rate_gsa: f64,
    /// Side padding (ns)
    pub side_padding_ns: Nanoseconds,
    /// Standard π/2 length, max over RF cores
    pub half_pi: Samples,
    /// Standard π length, max over RF cores
    pub pi: Samples,
    /// Standard plunger length per channel position, max over DC cores
    pub plunger: [Samples; 2],
    /// True if any DC core is configured
    pub has_dc: bool,
    /// Per-core pulse lengths
    pub cores: BTreeMap<CoreId, CoreLengths>,
}

impl LengthTable {
    /// Standard length of a rotation family
    pub fn family_samples(&self, family: GateFamily) -> Samples {
        match family {
            GateFamily::HalfPi => self.half_pi,
            GateFamily::Pi => self.pi,
        }
    }

    /// Length of a frame
    pub fn frame_samples(&self, frame: Frame) -> Samples {
        match frame {
            Frame::HalfPi => self.half_pi,
            Frame::Pi => self.pi,
            Frame::Plunger(channel) => self.plunger[channel.position()],
        }
    }

    /// Time a gate needs on its own
    /// Gantree: natural_samples(op) -> Samples // 고유 길이
    pub fn natural_samples(&self, op: &GateOp) -> Samples {
        match op {
            GateOp::Rotation(kind) => self.family_samples(kind.family()),
            GateOp::PlungerPulse(channel) => self.plunger[channel.position()],
            GateOp::Wait(samples) => *samples,
            GateOp::ArbitraryWaveform(pulse) => pulse.samples,
            GateOp::ArbitraryZ(_) | GateOp::NoOp => 0,
        }
    }

    /// Distinct standard plunger lengths in channel order; empty without DC cores
    pub fn plunger_waits(&self) -> Vec<Samples> {
        if !self.has_dc {
            return Vec::new();
        }
        let mut waits = Vec::with_capacity(2);
        for length in self.plunger {
            if !waits.contains(&length) {
                waits.push(length);
            }
        }
        waits
    }

    fn resolver(&self) -> LengthResolver {
        LengthResolver {
            sample_rate_gsa: self.sample_rate_gsa,
            side_padding_ns: self.side_padding_ns,
        }
    }

    /// Aligned sample count of a duration at this table's sample rate
    pub fn aligned_samples(&self, ns: Nanoseconds) -> Option<Samples> {
        self.resolver().aligned_samples(ns)
    }

    /// Unaligned sample count of a duration at this table's sample rate
    pub fn raw_samples(&self, ns: Nanoseconds) -> Option<Samples> {
        self.resolver()
            .raw_samples(ns)
            .and_then(|s| Samples::try_from(s).ok())
    }

    /// Calibrated lengths of a core
    pub fn core(&self, core: &CoreId) -> Option<&CoreLengths> {
        self.cores.get(core)
    }
}

impl fmt::Display for LengthTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pi/2={} Sa, pi={} Sa, p1={} Sa, p2={} Sa @ {} GSa/s (pad {} ns)",
            self.half_pi,
            self.pi,
            self.plunger[0],
            self.plunger[1],
            self.sample_rate_gsa,
            self.side_padding_ns
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
