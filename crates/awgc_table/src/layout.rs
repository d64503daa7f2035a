//! Fixed command-table layouts
//!
//! Gantree: L5_Table → TableLayout
//!
//! The first entries of every table are fixed by core role. RF cores:
//!
//! ```text
//!  0..=3   initial x, y, xxx, yyy        in the π/2 frame  (absolute)
//!  4..=7   initial x, y, xxx, yyy        in the π frame    (absolute)
//!  8..=11  initial xx, yy, mxxm, myym    in the π frame    (absolute)
//! 12..=32  increments 0, 90, -90, 180, -180, 270, -270
//!          × [π/2 in π/2, π/2 in π, π in π]                (incremental)
//! 33, 34   wait π/2, wait π
//! 35..     wait per distinct standard plunger length
//! next     z0z phase no-op
//! ```
//!
//! DC cores:
//!
//! ```text
//!  0..=3   P1 plunger in frames P1, P2, π/2, π
//!  4..=7   P2 plunger in frames P2, P1, π/2, π
//!  8..=11  wait π/2, π, P1, P2
//! 12       phase no-op
//! ```

use crate::entry::{CommandTableEntry, EntryIndex};
use awgc_core::phase::{canonical_position, CANONICAL_INCREMENTS_DEG};
use awgc_core::{AwgcError, AwgcResult, DcChannel, GateFamily, RotationKind, Samples};
use awgc_timing::{Frame, LengthTable, PhaseUpdate};
use awgc_waveform::{WaveformCatalog, WaveformKey};

/// Fixed part of a command table
/// Gantree: TableLayout // trait
pub trait TableLayout {
    /// Number of fixed entries
    fn fixed_len(&self) -> usize;

    /// Materialise the fixed entries against the core's catalog
    fn fixed_entries(&self, catalog: &WaveformCatalog) -> AwgcResult<Vec<CommandTableEntry>>;

    /// Fixed wait entry of a length
    fn wait_index(&self, samples: Samples) -> Option<EntryIndex>;

    /// Zero-phase no-op entry
    fn noop_index(&self) -> EntryIndex;
}

fn waveform(catalog: &WaveformCatalog, key: &WaveformKey) -> AwgcResult<(u32, Samples)> {
    catalog
        .get(key)
        .map(|d| (d.slot_id, d.sample_count))
        .ok_or_else(|| {
            AwgcError::InvalidConfig(format!(
                "catalog of {} has no waveform '{}'",
                catalog.core(),
                key
            ))
        })
}

// ============================================================================
// RF Layout
// ============================================================================

/// Increment frame variant, in table order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameVariant {
    /// π/2 pulse in its own frame
    HalfPiInHalfPi,
    /// π/2 pulse in the π frame
    HalfPiInPi,
    /// π pulse in the π frame
    PiInPi,
}

impl FrameVariant {
    /// Variants in table order
    pub const ALL: [FrameVariant; 3] = [
        FrameVariant::HalfPiInHalfPi,
        FrameVariant::HalfPiInPi,
        FrameVariant::PiInPi,
    ];

    /// Variant of a rotation family played in a frame
    pub fn of(family: GateFamily, frame: Frame) -> Option<Self> {
        match (family, frame) {
            (GateFamily::HalfPi, Frame::HalfPi) => Some(FrameVariant::HalfPiInHalfPi),
            (GateFamily::HalfPi, Frame::Pi) => Some(FrameVariant::HalfPiInPi),
            (GateFamily::Pi, Frame::Pi) => Some(FrameVariant::PiInPi),
            _ => None,
        }
    }

    /// Position in table order
    pub fn position(&self) -> usize {
        match self {
            FrameVariant::HalfPiInHalfPi => 0,
            FrameVariant::HalfPiInPi => 1,
            FrameVariant::PiInPi => 2,
        }
    }

    /// Catalog key of the played waveform
    pub fn waveform_key(&self) -> WaveformKey {
        let (family, frame) = match self {
            FrameVariant::HalfPiInHalfPi => (GateFamily::HalfPi, Frame::HalfPi),
            FrameVariant::HalfPiInPi => (GateFamily::HalfPi, Frame::Pi),
            FrameVariant::PiInPi => (GateFamily::Pi, Frame::Pi),
        };
        WaveformKey::Rotation { family, frame }
    }
}

/// Fixed layout of RF cores
/// Gantree: RfLayout // 0..=z0z
#[derive(Debug, Clone, PartialEq)]
pub struct RfLayout {
    half_pi: Samples,
    pi: Samples,
    plunger_waits: Vec<Samples>,
}

impl RfLayout {
    /// First initial entry in the π/2 frame
    pub const INITIAL_HALF_PI_IN_HALF_PI: EntryIndex = 0;
    /// First initial entry of π/2 kinds in the π frame
    pub const INITIAL_HALF_PI_IN_PI: EntryIndex = 4;
    /// First initial entry of π kinds
    pub const INITIAL_PI: EntryIndex = 8;
    /// First increment entry
    pub const INCREMENT_BASE: EntryIndex = 12;
    /// Wait of the standard π/2 length
    pub const WAIT_HALF_PI: EntryIndex = 33;
    /// Wait of the standard π length
    pub const WAIT_PI: EntryIndex = 34;
    /// First plunger-length wait
    pub const PLUNGER_WAIT_BASE: EntryIndex = 35;

    /// Layout for resolved lengths
    pub fn new(lengths: &LengthTable) -> Self {
        Self {
            half_pi: lengths.half_pi,
            pi: lengths.pi,
            plunger_waits: lengths.plunger_waits(),
        }
    }

    /// Absolute-phase entry of a rotation in a frame
    /// Gantree: initial_index(kind, frame) -> Option<u16> // 0..=11
    pub fn initial_index(kind: RotationKind, frame: Frame) -> Option<EntryIndex> {
        let base = match (kind.family(), frame) {
            (GateFamily::HalfPi, Frame::HalfPi) => Self::INITIAL_HALF_PI_IN_HALF_PI,
            (GateFamily::HalfPi, Frame::Pi) => Self::INITIAL_HALF_PI_IN_PI,
            (GateFamily::Pi, Frame::Pi) => Self::INITIAL_PI,
            _ => return None,
        };
        Some(base + kind.position() as EntryIndex)
    }

    /// Incremental entry of a frame variant and angle
    /// Gantree: increment_index(variant, angle) -> Option<u16> // 12..=32
    pub fn increment_index(variant: FrameVariant, angle_deg: f64) -> Option<EntryIndex> {
        canonical_position(angle_deg).map(|pos| {
            Self::INCREMENT_BASE
                + (variant.position() * CANONICAL_INCREMENTS_DEG.len() + pos) as EntryIndex
        })
    }

    /// Entry of a rotation with its phase update
    pub fn rotation_index(kind: RotationKind, frame: Frame, phase: PhaseUpdate) -> Option<EntryIndex> {
        match phase {
            PhaseUpdate::Absolute(_) => Self::initial_index(kind, frame),
            PhaseUpdate::Increment(angle) => {
                FrameVariant::of(kind.family(), frame).and_then(|v| Self::increment_index(v, angle))
            }
        }
    }
}

impl TableLayout for RfLayout {
    fn fixed_len(&self) -> usize {
        self.noop_index() as usize + 1
    }

    fn fixed_entries(&self, catalog: &WaveformCatalog) -> AwgcResult<Vec<CommandTableEntry>> {
        let mut entries = Vec::with_capacity(self.fixed_len());

        let half_in_half = waveform(catalog, &FrameVariant::HalfPiInHalfPi.waveform_key())?;
        let half_in_pi = waveform(catalog, &FrameVariant::HalfPiInPi.waveform_key())?;
        let pi_in_pi = waveform(catalog, &FrameVariant::PiInPi.waveform_key())?;

        let initial = [
            (RotationKind::HALF_PI, half_in_half),
            (RotationKind::HALF_PI, half_in_pi),
            (RotationKind::PI, pi_in_pi),
        ];
        for (kinds, (slot, samples)) in initial {
            for kind in kinds {
                let index = entries.len() as EntryIndex;
                entries.push(CommandTableEntry::play(
                    index,
                    slot,
                    samples,
                    Some(PhaseUpdate::Absolute(kind.desired_phase_deg())),
                ));
            }
        }

        for (slot, samples) in [half_in_half, half_in_pi, pi_in_pi] {
            for angle in CANONICAL_INCREMENTS_DEG {
                let index = entries.len() as EntryIndex;
                entries.push(CommandTableEntry::play(
                    index,
                    slot,
                    samples,
                    Some(PhaseUpdate::Increment(angle)),
                ));
            }
        }

        for samples in [self.half_pi, self.pi].iter().chain(self.plunger_waits.iter()) {
            let index = entries.len() as EntryIndex;
            entries.push(CommandTableEntry::wait(index, *samples));
        }

        let index = entries.len() as EntryIndex;
        entries.push(CommandTableEntry::phase_increment(index, 0.0));
        Ok(entries)
    }

    fn wait_index(&self, samples: Samples) -> Option<EntryIndex> {
        if samples == self.half_pi {
            Some(Self::WAIT_HALF_PI)
        } else if samples == self.pi {
            Some(Self::WAIT_PI)
        } else {
            self.plunger_waits
                .iter()
                .position(|&w| w == samples)
                .map(|i| Self::PLUNGER_WAIT_BASE + i as EntryIndex)
        }
    }

    fn noop_index(&self) -> EntryIndex {
        Self::PLUNGER_WAIT_BASE + self.plunger_waits.len() as EntryIndex
    }
}

// ============================================================================
// DC Layout
// ============================================================================

/// Fixed layout of DC cores
/// Gantree: DcLayout // 0..=12
#[derive(Debug, Clone, PartialEq)]
pub struct DcLayout {
    waits: [Samples; 4],
}

impl DcLayout {
    /// First P1 plunger entry
    pub const PLUNGER_P1_BASE: EntryIndex = 0;
    /// First P2 plunger entry
    pub const PLUNGER_P2_BASE: EntryIndex = 4;
    /// First wait entry
    pub const WAIT_BASE: EntryIndex = 8;
    /// Phase no-op
    pub const PHASE_NOOP: EntryIndex = 12;

    /// Layout for resolved lengths
    pub fn new(lengths: &LengthTable) -> Self {
        Self {
            waits: [
                lengths.half_pi,
                lengths.pi,
                lengths.plunger[0],
                lengths.plunger[1],
            ],
        }
    }

    /// Frames of one channel in table order
    pub fn frames(channel: DcChannel) -> [Frame; 4] {
        [
            Frame::Plunger(channel),
            Frame::Plunger(channel.other()),
            Frame::HalfPi,
            Frame::Pi,
        ]
    }

    /// Entry of a single plunger pulse in a frame
    pub fn plunger_index(channel: DcChannel, frame: Frame) -> EntryIndex {
        let base = match channel {
            DcChannel::P1 => Self::PLUNGER_P1_BASE,
            DcChannel::P2 => Self::PLUNGER_P2_BASE,
        };
        let offset = Self::frames(channel)
            .iter()
            .position(|&f| f == frame)
            .unwrap_or(0);
        base + offset as EntryIndex
    }
}

impl TableLayout for DcLayout {
    fn fixed_len(&self) -> usize {
        Self::PHASE_NOOP as usize + 1
    }

    fn fixed_entries(&self, catalog: &WaveformCatalog) -> AwgcResult<Vec<CommandTableEntry>> {
        let mut entries = Vec::with_capacity(self.fixed_len());
        for channel in DcChannel::ALL {
            for frame in Self::frames(channel) {
                let (slot, samples) = waveform(catalog, &WaveformKey::Plunger { channel, frame })?;
                let index = entries.len() as EntryIndex;
                entries.push(CommandTableEntry::play(index, slot, samples, None));
            }
        }
        for samples in self.waits {
            let index = entries.len() as EntryIndex;
            entries.push(CommandTableEntry::wait(index, samples));
        }
        entries.push(CommandTableEntry::phase_increment(Self::PHASE_NOOP, 0.0));
        Ok(entries)
    }

    fn wait_index(&self, samples: Samples) -> Option<EntryIndex> {
        self.waits
            .iter()
            .position(|&w| w == samples)
            .map(|i| Self::WAIT_BASE + i as EntryIndex)
    }

    fn noop_index(&self) -> EntryIndex {
        Self::PHASE_NOOP
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn lengths(has_dc: bool) -> LengthTable {
        LengthTable {
            sample_rate_gsa: 2.4,
            side_padding_ns: 0.0,
            half_pi: 80,
            pi: 160,
            plunger: [96, 96],
            has_dc,
            cores: BTreeMap::new(),
        }
    }

    #[test]
    fn test_initial_indices() {
        assert_eq!(RfLayout::initial_index(RotationKind::X, Frame::HalfPi), Some(0));
        assert_eq!(RfLayout::initial_index(RotationKind::Yyy, Frame::HalfPi), Some(3));
        assert_eq!(RfLayout::initial_index(RotationKind::X, Frame::Pi), Some(4));
        assert_eq!(RfLayout::initial_index(RotationKind::Myym, Frame::Pi), Some(11));
        assert_eq!(RfLayout::initial_index(RotationKind::Xx, Frame::HalfPi), None);
    }

    #[test]
    fn test_increment_indices() {
        assert_eq!(RfLayout::increment_index(FrameVariant::HalfPiInHalfPi, 0.0), Some(12));
        assert_eq!(RfLayout::increment_index(FrameVariant::HalfPiInHalfPi, -270.0), Some(18));
        assert_eq!(RfLayout::increment_index(FrameVariant::HalfPiInPi, 90.0), Some(20));
        assert_eq!(RfLayout::increment_index(FrameVariant::PiInPi, -270.0), Some(32));
        assert_eq!(RfLayout::increment_index(FrameVariant::PiInPi, 45.0), None);
    }

    #[test]
    fn test_rf_noop_follows_plunger_waits() {
        assert_eq!(RfLayout::new(&lengths(false)).noop_index(), 35);
        let with_dc = RfLayout::new(&lengths(true));
        assert_eq!(with_dc.noop_index(), 36);
        assert_eq!(with_dc.fixed_len(), 37);
        assert_eq!(with_dc.wait_index(96), Some(35));
        assert_eq!(with_dc.wait_index(160), Some(34));
        assert_eq!(with_dc.wait_index(240), None);
    }

    #[test]
    fn test_dc_indices() {
        assert_eq!(DcLayout::plunger_index(DcChannel::P1, Frame::Plunger(DcChannel::P1)), 0);
        assert_eq!(DcLayout::plunger_index(DcChannel::P1, Frame::Pi), 3);
        assert_eq!(DcLayout::plunger_index(DcChannel::P2, Frame::Plunger(DcChannel::P1)), 5);
        assert_eq!(DcLayout::plunger_index(DcChannel::P2, Frame::HalfPi), 6);
        let layout = DcLayout::new(&lengths(true));
        // equal plunger lengths resolve to the P1 wait
        assert_eq!(layout.wait_index(80), Some(8));
        assert_eq!(layout.wait_index(96), Some(10));
        assert_eq!(layout.noop_index(), 12);
    }
}
