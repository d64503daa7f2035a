//! Waveform Catalog Builder
//!
//! Gantree: L4_Waveform → CatalogBuilder
//!
//! Enumerates the waveforms each core needs. Standard waveforms take the
//! first slots in a fixed order; paired plunger and arbitrary waveforms
//! follow in the order the program first uses them. A play whose step
//! leaves too short a gap for a wait gets a stretched copy filling the
//! whole step. Slots are never reused and never shared between cores.

use crate::descriptor::{
    ChannelAssignment, DcShape, SlotId, WaveformDescriptor, WaveformKey, WaveformShape,
};
use awgc_core::{
    AwgcError, AwgcResult, ArbitraryPulse, ChannelRole, CoreDescriptor, CoreId, CoreRegistry,
    DcChannel, GateFamily, GateParameterTable, Samples,
};
use awgc_timing::{
    CoreLengths, DcContent, Frame, LengthTable, PulseLength, ScheduledLine, ScheduledSlot, SlotOp,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// WaveformCatalog
// ============================================================================

/// Waveform memory layout of one core
/// Gantree: WaveformCatalog // 코어별 파형 목록
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaveformCatalog {
    core: CoreId,
    role: ChannelRole,
    descriptors: Vec<WaveformDescriptor>,
    #[serde(skip)]
    index: BTreeMap<WaveformKey, usize>,
}

impl WaveformCatalog {
    fn new(core: CoreId, role: ChannelRole) -> Self {
        Self {
            core,
            role,
            descriptors: Vec::new(),
            index: BTreeMap::new(),
        }
    }

    fn push(
        &mut self,
        key: WaveformKey,
        sample_count: Samples,
        channel_assignment: ChannelAssignment,
        shape: WaveformShape,
    ) -> SlotId {
        let slot_id = self.descriptors.len() as SlotId;
        self.index.insert(key.clone(), self.descriptors.len());
        self.descriptors.push(WaveformDescriptor {
            slot_id,
            semantic_key: key.semantic_key(),
            key,
            sample_count,
            channel_assignment,
            shape,
        });
        slot_id
    }

    /// Owning core
    pub fn core(&self) -> &CoreId {
        &self.core
    }

    /// Role of the owning core
    pub fn role(&self) -> ChannelRole {
        self.role
    }

    /// Descriptors in slot order
    pub fn descriptors(&self) -> &[WaveformDescriptor] {
        &self.descriptors
    }

    /// Number of waveforms
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// True if the catalog holds no waveform
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Descriptor of a key
    pub fn get(&self, key: &WaveformKey) -> Option<&WaveformDescriptor> {
        self.index.get(key).map(|&i| &self.descriptors[i])
    }

    /// Slot of a key
    pub fn slot(&self, key: &WaveformKey) -> Option<SlotId> {
        self.get(key).map(|d| d.slot_id)
    }

    /// Waveforms added while walking the program, in slot order
    pub fn dynamic(&self) -> impl Iterator<Item = &WaveformDescriptor> {
        self.descriptors.iter().filter(|d| d.key.is_dynamic())
    }

    /// Waveform memory used, in samples
    pub fn total_samples(&self) -> u64 {
        self.descriptors.iter().map(|d| d.sample_count as u64).sum()
    }
}

impl fmt::Display for WaveformCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "WaveformCatalog {} ({}, {} waveforms)",
            self.core,
            self.role,
            self.len()
        )?;
        for d in &self.descriptors {
            writeln!(f, "  {}", d)?;
        }
        Ok(())
    }
}

// ============================================================================
// CatalogBuilder
// ============================================================================

/// Builds the catalogs of every core
/// Gantree: CatalogBuilder // 파형 카탈로그 생성
#[derive(Debug, Clone, Copy)]
pub struct CatalogBuilder<'a> {
    registry: &'a CoreRegistry,
    params: &'a GateParameterTable,
    lengths: &'a LengthTable,
}

impl<'a> CatalogBuilder<'a> {
    /// Create a builder
    pub fn new(
        registry: &'a CoreRegistry,
        params: &'a GateParameterTable,
        lengths: &'a LengthTable,
    ) -> Self {
        Self {
            registry,
            params,
            lengths,
        }
    }

    /// Catalogs of all cores
    /// Gantree: build(lines) -> Result<Map<CoreId, WaveformCatalog>> // 전체 카탈로그
    pub fn build(&self, lines: &[ScheduledLine]) -> AwgcResult<BTreeMap<CoreId, WaveformCatalog>> {
        let mut catalogs = BTreeMap::new();
        for core in self.registry.cores() {
            let catalog = self.build_core(core, lines)?;
            log::debug!(
                "catalog {}: {} waveforms ({} dynamic)",
                core.id,
                catalog.len(),
                catalog.dynamic().count()
            );
            catalogs.insert(core.id.clone(), catalog);
        }
        Ok(catalogs)
    }

    /// Catalog of one core
    pub fn build_core(
        &self,
        core: &CoreDescriptor,
        lines: &[ScheduledLine],
    ) -> AwgcResult<WaveformCatalog> {
        let mut catalog = WaveformCatalog::new(core.id.clone(), core.role);
        match self.lengths.core(&core.id) {
            Some(CoreLengths::Rf { half_pi, pi }) => {
                self.rf_standard(&mut catalog, core, *half_pi, *pi)?;
                for slot in lines.iter().flat_map(|l| l.track(&core.id).unwrap_or_default()) {
                    if let SlotOp::ArbitraryRf { pulse, .. } = &slot.op {
                        self.rf_arbitrary(&mut catalog, core, pulse)?;
                    }
                    self.stretch(&mut catalog, slot)?;
                }
            }
            Some(CoreLengths::Dc { plunger }) => {
                let plunger = *plunger;
                self.dc_standard(&mut catalog, core, plunger)?;
                for slot in lines.iter().flat_map(|l| l.track(&core.id).unwrap_or_default()) {
                    self.dc_dynamic(&mut catalog, core, plunger, &slot.op, slot.samples)?;
                    self.stretch(&mut catalog, slot)?;
                }
            }
            None => {
                return Err(AwgcError::InvalidConfig(format!(
                    "no resolved pulse lengths for core {}",
                    core.id
                )))
            }
        }
        Ok(catalog)
    }

    // ========================================================================
    // RF
    // ========================================================================

    fn rf_standard(
        &self,
        catalog: &mut WaveformCatalog,
        core: &CoreDescriptor,
        half_pi: PulseLength,
        pi: PulseLength,
    ) -> AwgcResult<()> {
        let p = self.params.rf(core.channels[0])?;
        let assignment = ChannelAssignment::Iq {
            outputs: core.channel_pair,
        };
        let standard = [
            (GateFamily::Pi, Frame::Pi, pi),
            (GateFamily::HalfPi, Frame::HalfPi, half_pi),
            (GateFamily::HalfPi, Frame::Pi, half_pi),
        ];
        for (family, frame, pulse) in standard {
            let sample_count = self
                .lengths
                .frame_samples(frame)
                .max(self.lengths.family_samples(family));
            catalog.push(
                WaveformKey::Rotation { family, frame },
                sample_count,
                assignment,
                WaveformShape::IqPulse {
                    active: pulse.active,
                    i_amp: p.i_amp,
                    q_amp: p.q_amp,
                },
            );
        }
        Ok(())
    }

    fn rf_arbitrary(
        &self,
        catalog: &mut WaveformCatalog,
        core: &CoreDescriptor,
        pulse: &ArbitraryPulse,
    ) -> AwgcResult<()> {
        let key = WaveformKey::ArbitraryRf {
            label: pulse.label.clone(),
        };
        if let Some(existing) = catalog.get(&key) {
            return match &existing.shape {
                WaveformShape::IqArbitrary { pulse: known, .. } if known.same_shape(pulse) => Ok(()),
                _ => Err(AwgcError::ConflictingWaveform {
                    core: core.id.clone(),
                    label: pulse.label.clone(),
                }),
            };
        }
        catalog.push(
            key,
            pulse.samples,
            ChannelAssignment::Iq {
                outputs: core.channel_pair,
            },
            WaveformShape::IqArbitrary {
                active: self.active_samples(pulse),
                pulse: pulse.clone(),
            },
        );
        Ok(())
    }

    // ========================================================================
    // DC
    // ========================================================================

    fn plunger_shape(&self, core: &CoreDescriptor, plunger: [PulseLength; 2], channel: DcChannel) -> AwgcResult<DcShape> {
        let index = core.channels[channel.position()];
        Ok(DcShape::Pulse {
            active: plunger[channel.position()].active,
            amp: self.params.plunger(index)?.amp,
        })
    }

    fn dc_standard(
        &self,
        catalog: &mut WaveformCatalog,
        core: &CoreDescriptor,
        plunger: [PulseLength; 2],
    ) -> AwgcResult<()> {
        for channel in DcChannel::ALL {
            let frames = [
                Frame::Plunger(channel),
                Frame::Plunger(channel.other()),
                Frame::HalfPi,
                Frame::Pi,
            ];
            let mut channels = [DcShape::Silent, DcShape::Silent];
            channels[channel.position()] = self.plunger_shape(core, plunger, channel)?;
            let mut active = [false, false];
            active[channel.position()] = true;

            for frame in frames {
                let sample_count = self
                    .lengths
                    .frame_samples(frame)
                    .max(self.lengths.plunger[channel.position()]);
                catalog.push(
                    WaveformKey::Plunger { channel, frame },
                    sample_count,
                    ChannelAssignment::Plunger {
                        outputs: core.channel_pair,
                        active,
                    },
                    WaveformShape::Dc { channels },
                );
            }
        }
        Ok(())
    }

    fn dc_dynamic(
        &self,
        catalog: &mut WaveformCatalog,
        core: &CoreDescriptor,
        plunger: [PulseLength; 2],
        op: &SlotOp,
        samples: Samples,
    ) -> AwgcResult<()> {
        let (key, channels) = match op {
            SlotOp::PairedPlunger { frame } => {
                let key = WaveformKey::PairedPlunger { frame: *frame };
                if catalog.get(&key).is_some() {
                    return Ok(());
                }
                let channels = [
                    self.plunger_shape(core, plunger, DcChannel::P1)?,
                    self.plunger_shape(core, plunger, DcChannel::P2)?,
                ];
                (key, channels)
            }
            SlotOp::ArbitraryDc { line, step, contents } => {
                let mut channels = [DcShape::Silent, DcShape::Silent];
                for channel in DcChannel::ALL {
                    channels[channel.position()] = match &contents[channel.position()] {
                        DcContent::Silent => DcShape::Silent,
                        DcContent::Plunger => self.plunger_shape(core, plunger, channel)?,
                        DcContent::Arbitrary(pulse) => DcShape::Pulse {
                            active: self.active_samples(pulse),
                            amp: pulse.amplitude,
                        },
                    };
                }
                (
                    WaveformKey::ArbitraryDc {
                        line: *line,
                        step: *step,
                    },
                    channels,
                )
            }
            _ => return Ok(()),
        };

        catalog.push(
            key,
            samples,
            ChannelAssignment::Plunger {
                outputs: core.channel_pair,
                active: [channels[0].is_active(), channels[1].is_active()],
            },
            WaveformShape::Dc { channels },
        );
        Ok(())
    }

    // ========================================================================
    // Stretched
    // ========================================================================

    /// Copy of the slot's waveform spanning its whole step
    fn stretch(&self, catalog: &mut WaveformCatalog, slot: &ScheduledSlot) -> AwgcResult<()> {
        if !slot.folds_pad() {
            return Ok(());
        }
        let Some(base) = WaveformKey::of_slot(&slot.op) else {
            return Ok(());
        };
        let (assignment, shape) = catalog
            .get(&base)
            .map(|d| (d.channel_assignment, d.shape.clone()))
            .ok_or_else(|| {
                AwgcError::InvalidConfig(format!(
                    "catalog of {} has no waveform '{}' to stretch",
                    catalog.core(),
                    base
                ))
            })?;
        let key = base.stretched(slot.play_samples());
        if catalog.get(&key).is_none() {
            log::trace!("{}: {} folds a {} Sa pad", catalog.core(), key, slot.pad);
            catalog.push(key, slot.play_samples(), assignment, shape);
        }
        Ok(())
    }

    fn active_samples(&self, pulse: &ArbitraryPulse) -> Samples {
        self.lengths
            .raw_samples(pulse.duration_ns)
            .unwrap_or(pulse.samples)
            .min(pulse.samples)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use awgc_core::{PlungerParameters, RfParameters, RotationKind};
    use awgc_timing::{LengthResolver, PhaseUpdate};

    fn setup() -> (CoreRegistry, GateParameterTable, LengthTable) {
        let registry = CoreRegistry::new(vec![
            CoreDescriptor::rf("dev8001", 0, 1).with_trigger(),
            CoreDescriptor::dc("dev8002", 0, 5, 6),
        ])
        .unwrap();
        let params = GateParameterTable::new()
            .with_rf(1, RfParameters::new(66.0, 33.0, 0.5, 0.4, 1e8))
            .with_plunger(5, PlungerParameters::new(40.0, 0.2))
            .with_plunger(6, PlungerParameters::new(60.0, 0.3));
        let lengths = LengthResolver::new(2.4, 0.0)
            .unwrap()
            .resolve(&registry, &params)
            .unwrap();
        (registry, params, lengths)
    }

    fn line_with(core: &CoreId, ops: Vec<(SlotOp, Samples)>) -> ScheduledLine {
        padded_line(core, ops.into_iter().map(|(op, samples)| (op, samples, 0)).collect())
    }

    fn padded_line(core: &CoreId, ops: Vec<(SlotOp, Samples, Samples)>) -> ScheduledLine {
        let mut slots = BTreeMap::new();
        slots.insert(
            core.clone(),
            ops.into_iter()
                .map(|(op, samples, pad)| ScheduledSlot { op, samples, pad })
                .collect(),
        );
        ScheduledLine {
            number: 1,
            step_durations: Vec::new(),
            slots,
        }
    }

    fn pulse(label: &str, amplitude: f64) -> ArbitraryPulse {
        ArbitraryPulse {
            label: label.into(),
            duration_ns: 50.0,
            amplitude,
            phase_deg: 0.0,
            extra: Vec::new(),
            samples: 128,
        }
    }

    #[test]
    fn test_rf_standard_slots() {
        let (r, p, l) = setup();
        let catalogs = CatalogBuilder::new(&r, &p, &l).build(&[]).unwrap();
        let rf = &catalogs[&CoreId::new("dev8001", 0)];
        let keys: Vec<_> = rf.descriptors().iter().map(|d| d.semantic_key.as_str()).collect();
        assert_eq!(keys, vec!["pi_pifr", "pi_2_pi2fr", "pi_2_pifr"]);
        assert_eq!(rf.descriptors()[1].sample_count, 80);
        assert_eq!(rf.descriptors()[2].sample_count, 160);
    }

    #[test]
    fn test_dc_standard_slots() {
        let (r, p, l) = setup();
        let catalogs = CatalogBuilder::new(&r, &p, &l).build(&[]).unwrap();
        let dc = &catalogs[&CoreId::new("dev8002", 0)];
        let keys: Vec<_> = dc.descriptors().iter().map(|d| d.semantic_key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "p1_p1fr", "p1_p2fr", "p1_pi2fr", "p1_pifr", "p2_p2fr", "p2_p1fr", "p2_pi2fr",
                "p2_pifr"
            ]
        );
        // p2 standard is 144 samples, longer than the pi/2 frame
        assert_eq!(dc.descriptors()[6].sample_count, 144);
    }

    #[test]
    fn test_arbitrary_rf_shared_by_label() {
        let (r, p, l) = setup();
        let rf = CoreId::new("dev8001", 0);
        let arbitrary = |amplitude| SlotOp::ArbitraryRf {
            pulse: pulse("g", amplitude),
            shift: 0.0,
        };
        let lines = vec![
            line_with(&rf, vec![(arbitrary(0.5), 128)]),
            line_with(&rf, vec![(arbitrary(0.5), 128)]),
        ];
        let catalogs = CatalogBuilder::new(&r, &p, &l).build(&lines).unwrap();
        assert_eq!(catalogs[&rf].len(), 4);
        assert_eq!(
            catalogs[&rf].slot(&WaveformKey::ArbitraryRf { label: "g".into() }),
            Some(3)
        );

        let conflicting = vec![
            line_with(&rf, vec![(arbitrary(0.5), 128)]),
            line_with(&rf, vec![(arbitrary(0.9), 128)]),
        ];
        assert!(matches!(
            CatalogBuilder::new(&r, &p, &l).build(&conflicting),
            Err(AwgcError::ConflictingWaveform { .. })
        ));
    }

    #[test]
    fn test_dc_dynamic_order() {
        let (r, p, l) = setup();
        let dc = CoreId::new("dev8002", 0);
        let lines = vec![line_with(
            &dc,
            vec![
                (
                    SlotOp::ArbitraryDc {
                        line: 1,
                        step: 0,
                        contents: [DcContent::Plunger, DcContent::Arbitrary(pulse("r", 0.1))],
                    },
                    128,
                ),
                (SlotOp::PairedPlunger { frame: Frame::Plunger(DcChannel::P2) }, 144),
                (SlotOp::PairedPlunger { frame: Frame::Plunger(DcChannel::P2) }, 144),
            ],
        )];
        let catalogs = CatalogBuilder::new(&r, &p, &l).build(&lines).unwrap();
        let dynamic: Vec<_> = catalogs[&dc].dynamic().map(|d| d.semantic_key.clone()).collect();
        assert_eq!(dynamic, vec!["dcarb_l1_s0", "p1p2_p2fr"]);
        assert_eq!(catalogs[&dc].descriptors()[8].slot_id, 8);
        assert_eq!(
            catalogs[&dc].descriptors()[8].channel_assignment,
            ChannelAssignment::Plunger {
                outputs: [1, 2],
                active: [true, true]
            }
        );
    }

    #[test]
    fn test_short_pad_gets_stretched_copy() {
        let (r, p, l) = setup();
        let rf = CoreId::new("dev8001", 0);
        let x = SlotOp::Rotation {
            kind: RotationKind::X,
            frame: Frame::HalfPi,
            phase: PhaseUpdate::Absolute(0.0),
        };
        let lines = vec![padded_line(
            &rf,
            vec![(x.clone(), 80, 16), (x.clone(), 80, 16), (x, 80, 48)],
        )];
        let catalogs = CatalogBuilder::new(&r, &p, &l).build(&lines).unwrap();
        let keys: Vec<_> = catalogs[&rf].dynamic().map(|d| d.semantic_key.clone()).collect();
        assert_eq!(keys, vec!["pi_2_pi2fr_96sa"]);

        let stretched = &catalogs[&rf].descriptors()[3];
        assert_eq!(stretched.sample_count, 96);
        assert_eq!(stretched.shape, catalogs[&rf].descriptors()[1].shape);
    }
}
