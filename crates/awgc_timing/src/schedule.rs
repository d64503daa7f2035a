//! Step scheduler
//!
//! Gantree: L2_Timing → Scheduler
//!
//! Resolves, for every slot of a parsed line, what the core actually
//! plays: the frame of each pulse, the phase update of each rotation and
//! the trailing padding that fills the slot up to its step duration.
//! Padding shorter than the shortest playable waveform cannot stand as a
//! wait of its own and is folded into the play.

use crate::frame::{Frame, StepContext};
use crate::lengths::LengthTable;
use crate::phase::{PhaseFrameTracker, PhaseUpdate};
use awgc_core::hardware::MIN_WAVEFORM_SAMPLES;
use awgc_core::phase::is_zero;
use awgc_core::{
    AwgcError, AwgcResult, ArbitraryPulse, ChannelRole, CoreId, CoreSlot, DcChannel, Degrees,
    GateOp, RotationKind, Samples, SequenceLine,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Scheduled Slots
// ============================================================================

/// What one channel of an arbitrary DC play carries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DcContent {
    /// Output held at zero
    Silent,
    /// Standard plunger pulse in its own frame
    Plunger,
    /// User-defined pulse
    Arbitrary(ArbitraryPulse),
}

/// Resolved operation of one slot
/// Gantree: SlotOp // 슬롯 연산
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SlotOp {
    /// RF rotation in a frame with its phase update
    Rotation {
        /// Gate kind
        kind: RotationKind,
        /// Frame the pulse is padded to
        frame: Frame,
        /// Phase written with the play
        phase: PhaseUpdate,
    },
    /// One plunger channel pulsing
    Plunger {
        /// Pulsing channel
        channel: DcChannel,
        /// Frame the pulse is padded to
        frame: Frame,
    },
    /// Both plunger channels of the core pulsing
    PairedPlunger {
        /// Frame both pulses are padded to
        frame: Frame,
    },
    /// User-defined RF pulse
    ArbitraryRf {
        /// Pulse
        pulse: ArbitraryPulse,
        /// Carried virtual Z shift written with the play
        shift: Degrees,
    },
    /// User-defined DC play covering both channels
    ArbitraryDc {
        /// Line number
        line: usize,
        /// Step index within the line
        step: usize,
        /// Channel contents in channel order
        contents: [DcContent; 2],
    },
    /// Phase-only rotation
    VirtualZ {
        /// Angle
        angle: Degrees,
    },
    /// Idle
    Wait,
    /// Zero-phase placeholder
    NoOp,
}

impl SlotOp {
    /// True if the op plays a waveform
    pub fn plays_waveform(&self) -> bool {
        matches!(
            self,
            SlotOp::Rotation { .. }
                | SlotOp::Plunger { .. }
                | SlotOp::PairedPlunger { .. }
                | SlotOp::ArbitraryRf { .. }
                | SlotOp::ArbitraryDc { .. }
        )
    }
}

/// One slot after scheduling
/// Gantree: ScheduledSlot // op + samples + pad
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledSlot {
    /// Resolved op
    pub op: SlotOp,
    /// Length of the play or wait
    pub samples: Samples,
    /// Trailing idle needed to reach the step duration
    pub pad: Samples,
}

impl ScheduledSlot {
    /// Total samples the slot occupies
    pub fn total(&self) -> u64 {
        self.samples as u64 + self.pad as u64
    }

    /// True if the pad is too short for a wait and joins the play
    pub fn folds_pad(&self) -> bool {
        self.pad > 0 && self.pad < MIN_WAVEFORM_SAMPLES && self.op.plays_waveform()
    }

    /// Length of the play entry, folded pad included
    pub fn play_samples(&self) -> Samples {
        if self.folds_pad() {
            self.samples + self.pad
        } else {
            self.samples
        }
    }

    /// Idle written after the play
    pub fn trailing_wait(&self) -> Samples {
        if self.folds_pad() {
            0
        } else {
            self.pad
        }
    }
}

impl fmt::Display for SlotOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotOp::Rotation { kind, frame, phase } => write!(f, "{}@{}{}", kind, frame, phase),
            SlotOp::Plunger { channel, frame } => write!(f, "{}@{}", channel, frame),
            SlotOp::PairedPlunger { frame } => write!(f, "p1p2@{}", frame),
            SlotOp::ArbitraryRf { pulse, shift } if is_zero(*shift) => {
                write!(f, "*{}", pulse.label)
            }
            SlotOp::ArbitraryRf { pulse, shift } => write!(f, "*{}+{}°", pulse.label, shift),
            SlotOp::ArbitraryDc { line, step, .. } => write!(f, "*dc[l{} s{}]", line, step),
            SlotOp::VirtualZ { angle } => write!(f, "z{}", angle),
            SlotOp::Wait => write!(f, "wait"),
            SlotOp::NoOp => write!(f, "z0z"),
        }
    }
}

// ============================================================================
// ScheduledLine
// ============================================================================

/// A line with every slot resolved
/// Gantree: ScheduledLine // 스케줄된 라인
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledLine {
    /// 1-based line number
    pub number: usize,
    /// Step durations
    pub step_durations: Vec<Samples>,
    /// Per-core slots, one per step
    pub slots: BTreeMap<CoreId, Vec<ScheduledSlot>>,
}

impl ScheduledLine {
    /// Samples a core spends on the line
    pub fn core_samples(&self, core: &CoreId) -> u64 {
        self.slots
            .get(core)
            .map(|slots| slots.iter().map(ScheduledSlot::total).sum())
            .unwrap_or(0)
    }

    /// Nominal line duration
    pub fn total_samples(&self) -> u64 {
        self.step_durations.iter().map(|&d| d as u64).sum()
    }

    /// Slots of a core
    pub fn track(&self, core: &CoreId) -> Option<&[ScheduledSlot]> {
        self.slots.get(core).map(|s| s.as_slice())
    }
}

// ============================================================================
// Scheduler
// ============================================================================

/// Frame and phase resolution over parsed lines
/// Gantree: Scheduler // 스케줄러
#[derive(Debug, Clone, Copy)]
pub struct Scheduler<'a> {
    lengths: &'a LengthTable,
}

impl<'a> Scheduler<'a> {
    /// Create a scheduler over resolved lengths
    pub fn new(lengths: &'a LengthTable) -> Self {
        Self { lengths }
    }

    /// Schedule every line in order
    pub fn schedule(&self, lines: &[SequenceLine]) -> AwgcResult<Vec<ScheduledLine>> {
        lines.iter().map(|line| self.schedule_line(line)).collect()
    }

    /// Schedule one line; phase frames restart at every line
    /// Gantree: schedule_line(line) -> Result<ScheduledLine> // 프레임+위상
    pub fn schedule_line(&self, line: &SequenceLine) -> AwgcResult<ScheduledLine> {
        let mut tracker = PhaseFrameTracker::new();
        let mut slots: BTreeMap<CoreId, Vec<ScheduledSlot>> = BTreeMap::new();

        for (step, &duration) in line.step_durations.iter().enumerate() {
            let ctx = StepContext::from_slots(line.step(step));
            for (core, slot) in line.step(step) {
                let (op, samples) = match slot.primary().map(|t| t.role) {
                    Some(ChannelRole::Rf) => self.rf_slot(line.number, core, slot, &ctx, &mut tracker)?,
                    Some(ChannelRole::Dc) => self.dc_slot(line.number, step, slot, &ctx)?,
                    None => (SlotOp::Wait, 0),
                };
                let samples = match op {
                    SlotOp::Wait => duration,
                    _ => samples,
                };
                log::trace!("line {} step {} {}: {} ({} Sa)", line.number, step, core, op, samples);
                slots.entry(core.clone()).or_default().push(ScheduledSlot {
                    op,
                    samples,
                    pad: duration.saturating_sub(samples),
                });
            }
        }

        Ok(ScheduledLine {
            number: line.number,
            step_durations: line.step_durations.clone(),
            slots,
        })
    }

    fn rf_slot(
        &self,
        line: usize,
        core: &CoreId,
        slot: &CoreSlot,
        ctx: &StepContext,
        tracker: &mut PhaseFrameTracker,
    ) -> AwgcResult<(SlotOp, Samples)> {
        let Some(token) = slot.primary() else {
            return Ok((SlotOp::Wait, 0));
        };
        let resolved = match &token.op {
            GateOp::Rotation(kind) => {
                let frame = ctx.rf_frame(core, kind.family());
                let phase = tracker.rotation(core, *kind);
                (
                    SlotOp::Rotation {
                        kind: *kind,
                        frame,
                        phase,
                    },
                    self.lengths.frame_samples(frame),
                )
            }
            GateOp::ArbitraryZ(angle) => match tracker.virtual_z(core, *angle) {
                Some(_) => (SlotOp::VirtualZ { angle: *angle }, 0),
                None => (SlotOp::NoOp, 0),
            },
            GateOp::ArbitraryWaveform(pulse) => (
                SlotOp::ArbitraryRf {
                    pulse: pulse.clone(),
                    shift: tracker.take_shift(core),
                },
                pulse.samples,
            ),
            GateOp::Wait(samples) => (SlotOp::Wait, *samples),
            GateOp::NoOp => (SlotOp::NoOp, 0),
            GateOp::PlungerPulse(_) => {
                return Err(AwgcError::parse(
                    line,
                    token.to_string(),
                    "plunger pulse on an RF core",
                ))
            }
        };
        Ok(resolved)
    }

    fn dc_slot(
        &self,
        line: usize,
        step: usize,
        slot: &CoreSlot,
        ctx: &StepContext,
    ) -> AwgcResult<(SlotOp, Samples)> {
        for token in &slot.tokens {
            if matches!(token.op, GateOp::Rotation(_) | GateOp::ArbitraryZ(_)) {
                return Err(AwgcError::parse(
                    line,
                    token.to_string(),
                    format!("'{}' is not allowed on a DC core", token.op.name()),
                ));
            }
        }

        if slot.ops().any(|op| matches!(op, GateOp::ArbitraryWaveform(_))) {
            return Ok(self.arbitrary_dc(line, step, slot));
        }

        let pulsing: Vec<DcChannel> = slot
            .ops()
            .filter_map(|op| match op {
                GateOp::PlungerPulse(channel) => Some(*channel),
                _ => None,
            })
            .collect();

        let resolved = match pulsing.as_slice() {
            [] if slot.ops().all(|op| *op == GateOp::NoOp) => (SlotOp::NoOp, 0),
            [] => (SlotOp::Wait, 0),
            [channel] => {
                let frame = ctx.plunger_frame(*channel, self.lengths);
                (
                    SlotOp::Plunger {
                        channel: *channel,
                        frame,
                    },
                    self.lengths.frame_samples(frame),
                )
            }
            _ => {
                let frame = ctx.paired_frame(self.lengths);
                (
                    SlotOp::PairedPlunger { frame },
                    self.lengths.frame_samples(frame),
                )
            }
        };
        Ok(resolved)
    }

    fn arbitrary_dc(&self, line: usize, step: usize, slot: &CoreSlot) -> (SlotOp, Samples) {
        let mut contents = [DcContent::Silent, DcContent::Silent];
        let mut samples = 0;
        for (position, op) in slot.ops().enumerate().take(2) {
            let (content, length) = match op {
                GateOp::ArbitraryWaveform(pulse) => (DcContent::Arbitrary(pulse.clone()), pulse.samples),
                GateOp::PlungerPulse(channel) => (DcContent::Plunger, self.lengths.plunger[channel.position()]),
                _ => (DcContent::Silent, 0),
            };
            contents[position] = content;
            samples = samples.max(length);
        }
        (
            SlotOp::ArbitraryDc {
                line,
                step,
                contents,
            },
            samples,
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
