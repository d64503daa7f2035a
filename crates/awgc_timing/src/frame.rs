//! Timing frames
//!
//! Gantree: L2_Timing → Frame
//!
//! A frame is the standard length a waveform is padded to. Every gate
//! in a step picks its frame from the standard lengths present in that
//! step, so cores finish their pulses on a shared grid.

use crate::lengths::LengthTable;
use awgc_core::{ChannelRole, CoreId, CoreSlot, DcChannel, GateFamily, GateOp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Reference length of a waveform
/// Gantree: Frame // π/2, π, P1, P2
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Frame {
    /// Standard π/2 length
    HalfPi,
    /// Standard π length
    Pi,
    /// Standard plunger length of a channel position
    Plunger(DcChannel),
}

impl Frame {
    /// Suffix used in waveform keys
    pub fn label(&self) -> &'static str {
        match self {
            Frame::HalfPi => "pi2fr",
            Frame::Pi => "pifr",
            Frame::Plunger(DcChannel::P1) => "p1fr",
            Frame::Plunger(DcChannel::P2) => "p2fr",
        }
    }

    /// Frame of a rotation family played in its own length
    pub fn of_family(family: GateFamily) -> Self {
        match family {
            GateFamily::HalfPi => Frame::HalfPi,
            GateFamily::Pi => Frame::Pi,
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ============================================================================
// Step Context
// ============================================================================

/// Which standard pulses occur in one step
/// Gantree: StepContext // 스텝 내 표준 펄스
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepContext {
    half_pi_cores: BTreeSet<CoreId>,
    pi_cores: BTreeSet<CoreId>,
    plunger: [bool; 2],
}

impl StepContext {
    /// Collect the standard pulses of a step
    pub fn from_slots<'a>(slots: impl IntoIterator<Item = (&'a CoreId, &'a CoreSlot)>) -> Self {
        let mut ctx = Self::default();
        for (core, slot) in slots {
            for token in &slot.tokens {
                match (&token.op, token.role) {
                    (GateOp::Rotation(kind), ChannelRole::Rf) => {
                        match kind.family() {
                            GateFamily::HalfPi => ctx.half_pi_cores.insert(core.clone()),
                            GateFamily::Pi => ctx.pi_cores.insert(core.clone()),
                        };
                    }
                    (GateOp::PlungerPulse(channel), ChannelRole::Dc) => {
                        ctx.plunger[channel.position()] = true;
                    }
                    _ => {}
                }
            }
        }
        ctx
    }

    /// True if an RF core other than `core` plays a π rotation
    pub fn pi_elsewhere(&self, core: &CoreId) -> bool {
        self.pi_cores.iter().any(|c| c != core)
    }

    /// True if any DC core pulses the channel position
    pub fn has_plunger(&self, channel: DcChannel) -> bool {
        self.plunger[channel.position()]
    }

    /// True if any RF π rotation is present
    pub fn has_pi(&self) -> bool {
        !self.pi_cores.is_empty()
    }

    /// True if any RF π/2 rotation is present
    pub fn has_half_pi(&self) -> bool {
        !self.half_pi_cores.is_empty()
    }

    // ========================================================================
    // Frame Selection
    // ========================================================================

    /// Frame of an RF rotation on `core`
    /// Gantree: rf_frame(core, family) -> Frame // π/2 → π if π elsewhere
    pub fn rf_frame(&self, core: &CoreId, family: GateFamily) -> Frame {
        match family {
            GateFamily::Pi => Frame::Pi,
            GateFamily::HalfPi if self.pi_elsewhere(core) => Frame::Pi,
            GateFamily::HalfPi => Frame::HalfPi,
        }
    }

    /// Frame of a single plunger pulse on `channel`
    /// Gantree: plunger_frame(channel) -> Frame // 최장 표준, own > other > π > π/2
    pub fn plunger_frame(&self, channel: DcChannel, lengths: &LengthTable) -> Frame {
        let mut candidates = vec![Frame::Plunger(channel)];
        if self.has_plunger(channel.other()) {
            candidates.push(Frame::Plunger(channel.other()));
        }
        self.push_rf_frames(&mut candidates);
        longest(&candidates, lengths)
    }

    /// Frame of a paired plunger play (both channels of one core)
    pub fn paired_frame(&self, lengths: &LengthTable) -> Frame {
        let mut candidates = vec![Frame::Plunger(DcChannel::P1), Frame::Plunger(DcChannel::P2)];
        self.push_rf_frames(&mut candidates);
        longest(&candidates, lengths)
    }

    fn push_rf_frames(&self, candidates: &mut Vec<Frame>) {
        if self.has_pi() {
            candidates.push(Frame::Pi);
        }
        if self.has_half_pi() {
            candidates.push(Frame::HalfPi);
        }
    }
}

/// Longest frame; earlier candidates win ties
fn longest(candidates: &[Frame], lengths: &LengthTable) -> Frame {
    let mut best = candidates[0];
    for &frame in &candidates[1..] {
        if lengths.frame_samples(frame) > lengths.frame_samples(best) {
            best = frame;
        }
    }
    best
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use awgc_core::{GateToken, RotationKind};
    use std::collections::BTreeMap;

    fn lengths(half_pi: u32, pi: u32, p1: u32, p2: u32) -> LengthTable {
        LengthTable {
            sample_rate_gsa: 2.4,
            side_padding_ns: 0.0,
            half_pi,
            pi,
            plunger: [p1, p2],
            has_dc: true,
            cores: BTreeMap::new(),
        }
    }

    fn rf(core: usize, kind: RotationKind) -> (CoreId, CoreSlot) {
        let id = CoreId::new("dev8001", core);
        let token = GateToken::explicit(id.clone(), ChannelRole::Rf, core as u32 + 1, GateOp::Rotation(kind));
        (id, CoreSlot::new(vec![token]))
    }

    fn dc(core: usize, ops: [GateOp; 2]) -> (CoreId, CoreSlot) {
        let id = CoreId::new("dev8002", core);
        let tokens = ops
            .into_iter()
            .enumerate()
            .map(|(i, op)| GateToken::explicit(id.clone(), ChannelRole::Dc, 10 + i as u32, op))
            .collect();
        (id, CoreSlot::new(tokens))
    }

    #[test]
    fn test_half_pi_redirected_by_pi_elsewhere() {
        let slots = vec![rf(0, RotationKind::X), rf(1, RotationKind::Xx)];
        let ctx = StepContext::from_slots(slots.iter().map(|(c, s)| (c, s)));
        let a = CoreId::new("dev8001", 0);
        let b = CoreId::new("dev8001", 1);
        assert_eq!(ctx.rf_frame(&a, GateFamily::HalfPi), Frame::Pi);
        assert_eq!(ctx.rf_frame(&b, GateFamily::Pi), Frame::Pi);
    }

    #[test]
    fn test_half_pi_alone_keeps_own_frame() {
        let slots = vec![rf(0, RotationKind::X), rf(1, RotationKind::Y)];
        let ctx = StepContext::from_slots(slots.iter().map(|(c, s)| (c, s)));
        assert_eq!(
            ctx.rf_frame(&CoreId::new("dev8001", 0), GateFamily::HalfPi),
            Frame::HalfPi
        );
    }

    #[test]
    fn test_plunger_frame_longest_present() {
        let table = lengths(80, 160, 96, 128);
        let slots = vec![
            dc(0, [GateOp::PlungerPulse(DcChannel::P1), GateOp::Wait(128)]),
            dc(1, [GateOp::Wait(128), GateOp::PlungerPulse(DcChannel::P2)]),
        ];
        let ctx = StepContext::from_slots(slots.iter().map(|(c, s)| (c, s)));
        assert_eq!(
            ctx.plunger_frame(DcChannel::P1, &table),
            Frame::Plunger(DcChannel::P2)
        );
        assert_eq!(
            ctx.plunger_frame(DcChannel::P2, &table),
            Frame::Plunger(DcChannel::P2)
        );

        let with_pi = vec![slots[0].clone(), rf(0, RotationKind::Yy)];
        let ctx = StepContext::from_slots(with_pi.iter().map(|(c, s)| (c, s)));
        assert_eq!(ctx.plunger_frame(DcChannel::P1, &table), Frame::Pi);
    }

    #[test]
    fn test_plunger_tie_prefers_own() {
        let table = lengths(96, 96, 96, 96);
        let slots = vec![
            dc(0, [GateOp::PlungerPulse(DcChannel::P1), GateOp::Wait(96)]),
            dc(1, [GateOp::Wait(96), GateOp::PlungerPulse(DcChannel::P2)]),
            rf(0, RotationKind::Xx),
        ];
        let ctx = StepContext::from_slots(slots.iter().map(|(c, s)| (c, s)));
        assert_eq!(
            ctx.plunger_frame(DcChannel::P2, &table),
            Frame::Plunger(DcChannel::P2)
        );
        assert_eq!(ctx.paired_frame(&table), Frame::Plunger(DcChannel::P1));
    }

    #[test]
    fn test_labels() {
        assert_eq!(Frame::Plunger(DcChannel::P2).label(), "p2fr");
        assert_eq!(Frame::of_family(GateFamily::HalfPi), Frame::HalfPi);
    }
}
